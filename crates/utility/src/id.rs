use std::{borrow::Cow, fmt, hash, marker::PhantomData, str::FromStr};

use schemars::{
    gen::SchemaGenerator,
    schema::{InstanceType, Schema, SchemaObject},
    JsonSchema,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub trait HasId {
    type IdType;
}

/// An id of an entity `T`. Ids of different entities can not be mixed up,
/// although they share the same representation.
pub struct Id<T: HasId>(T::IdType, PhantomData<T>);

impl<T: HasId> Id<T> {
    pub fn new(inner: T::IdType) -> Self {
        Self(inner, PhantomData)
    }
}

impl<T: HasId<IdType = Uuid>> Id<T> {
    /// Creates a new random (v4) id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4())
    }

    /// Parses an id from its hyphenated textual form, e.g. a path segment.
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl<T: HasId<IdType = Uuid>> FromStr for Id<T> {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self::new)
    }
}

impl<T: HasId> Id<T>
where
    T::IdType: Clone,
{
    pub fn raw(&self) -> T::IdType {
        self.0.clone()
    }
}

/// Unwraps optional ids for query parameters, `None` binds as SQL `NULL`.
pub trait IdWrapper<T: HasId>
where
    T::IdType: Clone,
{
    fn raw(self) -> Option<T::IdType>;
}

impl<T: HasId> IdWrapper<T> for Option<&Id<T>>
where
    T::IdType: Clone,
{
    fn raw(self) -> Option<T::IdType> {
        self.map(Id::raw)
    }
}

impl<T: HasId> fmt::Debug for Id<T>
where
    T::IdType: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Id").field(&self.0).finish()
    }
}

impl<T: HasId> fmt::Display for Id<T>
where
    T::IdType: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<T: HasId> Clone for Id<T>
where
    T::IdType: Clone,
{
    fn clone(&self) -> Self {
        Self::new(self.0.clone())
    }
}

impl<T: HasId> Copy for Id<T> where T::IdType: Copy {}

impl<T: HasId> hash::Hash for Id<T>
where
    T::IdType: hash::Hash,
{
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<T: HasId> PartialEq for Id<T>
where
    T::IdType: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<T: HasId> Eq for Id<T> where T::IdType: Eq {}

impl<'de, T: HasId> Deserialize<'de> for Id<T>
where
    T::IdType: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        T::IdType::deserialize(deserializer).map(Self::new)
    }
}

impl<T: HasId> Serialize for Id<T>
where
    T::IdType: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

/// Ids appear as uuid strings in the schema, named after their entity,
/// e.g. `BusId`.
impl<T: HasId + JsonSchema> JsonSchema for Id<T> {
    fn schema_name() -> String {
        format!("{}Id", T::schema_name())
    }

    fn schema_id() -> Cow<'static, str> {
        Cow::Owned(format!("{}::Id<{}>", module_path!(), T::schema_id()))
    }

    fn json_schema(_gen: &mut SchemaGenerator) -> Schema {
        SchemaObject {
            instance_type: Some(InstanceType::String.into()),
            format: Some("uuid".to_owned()),
            ..Default::default()
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;

    impl HasId for Thing {
        type IdType = Uuid;
    }

    #[test]
    fn parse_accepts_hyphenated_uuid() {
        let id = Id::<Thing>::generate();
        let parsed = Id::<Thing>::parse(&id.to_string());
        assert_eq!(parsed, Some(id));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Id::<Thing>::parse("not-an-id").is_none());
        assert!(Id::<Thing>::parse("").is_none());
    }

    #[test]
    fn optional_ids_unwrap_to_raw_values() {
        let id = Id::<Thing>::generate();
        assert_eq!(Some(&id).raw(), Some(id.raw()));
        assert_eq!(None::<&Id<Thing>>.raw(), None);
    }

    #[test]
    fn serializes_transparently() {
        let id = Id::<Thing>::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: Id<Thing> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
