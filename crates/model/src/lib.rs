use schemars::JsonSchema;
use std::fmt::Debug;

use serde::Serialize;
pub use serde_with;
use utility::id::{HasId, Id};

pub mod activity;
pub mod alert;
pub mod booking;
pub mod bus;
pub mod company;
pub mod loyalty;
pub mod notification;
pub mod route;
pub mod settings;
pub mod subscription;
pub mod trip;
pub mod user;
pub mod validation;

pub use validation::{Validate, ValidationErrors};

pub trait ExampleData {
    fn example_data() -> Self;
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub id: Id<V>,
    #[serde(flatten)]
    pub content: V,
}

impl<V> WithId<V>
where
    V: HasId,
    V::IdType: Serialize + Debug + Clone,
{
    pub fn new(id: Id<V>, content: V) -> Self {
        Self { id, content }
    }

    pub fn map<F>(self, f: F) -> Self
    where
        F: FnOnce(V) -> V,
    {
        Self {
            id: self.id,
            content: f(self.content),
        }
    }
}

/// Counts values by a key while keeping a fixed, meaningful key order,
/// e.g. every status of an enum even when nothing has that status.
pub fn count_by<K, T, F>(keys: &[K], values: &[T], key_of: F) -> indexmap::IndexMap<K, usize>
where
    K: std::hash::Hash + Eq + Clone,
    F: Fn(&T) -> K,
{
    let mut counts = keys
        .iter()
        .map(|key| (key.clone(), 0usize))
        .collect::<indexmap::IndexMap<_, _>>();
    for value in values {
        *counts.entry(key_of(value)).or_insert(0) += 1;
    }
    counts
}
