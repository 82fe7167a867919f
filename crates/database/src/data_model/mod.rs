use model::WithId;
use utility::id::{HasId, Id};
use uuid::Uuid;

/// Declares a Postgres enum type mirroring a model enum, with conversions
/// in both directions. Variants are stored in SCREAMING_SNAKE_CASE.
macro_rules! pg_enum {
    ($name:ident, $type_name:literal, $model:ident { $($variant:ident),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
        #[sqlx(type_name = $type_name, rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),*
        }

        impl From<$name> for $model {
            fn from(value: $name) -> Self {
                match value {
                    $($name::$variant => $model::$variant),*
                }
            }
        }

        impl From<$model> for $name {
            fn from(value: $model) -> Self {
                match value {
                    $($model::$variant => $name::$variant),*
                }
            }
        }
    };
}

pub mod activity;
pub mod alert;
pub mod booking;
pub mod bus;
pub mod company;
pub mod loyalty;
pub mod notification;
pub mod route;
pub mod session;
pub mod settings;
pub mod subscription;
pub mod trip;
pub mod user;

pub trait DatabaseRow {
    type Model: HasId<IdType = Uuid>;

    fn get_id(&self) -> Id<Self::Model>;
    fn to_model(self) -> Self::Model;
}

pub fn with_ids<R: DatabaseRow>(rows: Vec<R>) -> Vec<WithId<R::Model>> {
    rows.into_iter().map(with_id).collect::<Vec<_>>()
}

pub fn with_id<R: DatabaseRow>(row: R) -> WithId<R::Model> {
    WithId::new(row.get_id(), row.to_model())
}
