use std::error::Error;

use model::ValidationErrors;
use thiserror::Error;

pub mod client;
pub mod database;
#[cfg(any(test, feature = "memory"))]
pub mod memory;
pub mod security;

pub use client::{Actor, Client};

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("resource not found")]
    NotFound,
    #[error("not authenticated: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("platform is in maintenance mode")]
    Unavailable,
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

impl RequestError {
    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }

    pub fn unauthenticated() -> Self {
        Self::Unauthorized("Non authentifié".to_owned())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict(message.into())
    }

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(ValidationErrors::single(field, message))
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Conflict(constraint) => {
                log::debug!("unique constraint violated: {}", constraint);
                Self::Conflict("Cette ressource existe déjà".to_owned())
            }
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

pub fn not_found_to_none<O>(result: RequestResult<O>) -> RequestResult<Option<O>> {
    if let Err(RequestError::NotFound) = result {
        Ok(None)
    } else {
        result.map(Some)
    }
}
