use platform::database::DatabaseError;

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

/// Postgres error code of unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(error) if error.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            DatabaseError::Conflict(error.constraint().unwrap_or_default().to_owned())
        }
        _ => DatabaseError::Other(Box::new(why)),
    }
}
