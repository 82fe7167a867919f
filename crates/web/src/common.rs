use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        OriginalUri, Query, Request,
    },
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    routing::MethodFilter,
    Json,
};
use axum_extra::extract::WithRejection;
use model::{ExampleData, ValidationErrors};
use platform::RequestError;
use schemars::{schema_for, schema_for_value, JsonSchema};
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};
use uuid::Uuid;

use crate::hateoas;

pub type RouteResult<O> = Result<O, RouteErrorResponse>;
pub type HateoasResult<O> = RouteResult<Json<hateoas::Response<O>>>;
pub type CreatedResult<O> = RouteResult<(StatusCode, Json<hateoas::Response<O>>)>;

/// A JSON request body, malformed bodies are answered with a JSON 400.
pub type Body<T> = WithRejection<Json<T>, RouteErrorResponse>;
/// Query parameters, invalid ones are answered with a JSON 400.
pub type Params<T> = WithRejection<Query<T>, RouteErrorResponse>;

/// A `MethodFilter` that matches all http methods.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl PageQuery {
    pub fn page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> usize {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VecResponse<T> {
    pub data: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> VecResponse<T> {
    pub fn non_paginated(data: Vec<T>) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    /// Cuts the requested page out of all items. Pages past the end are empty.
    pub fn paginated(items: Vec<T>, query: &PageQuery) -> Self {
        let total_items = items.len();
        let page_size = query.page_size();
        let current_page = query.page();
        let data = items
            .into_iter()
            .skip((current_page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();
        Self {
            data,
            pagination: Some(Pagination {
                current_page,
                total_pages: total_items.div_ceil(page_size),
                total_items,
                page_size,
            }),
        }
    }

    pub fn map<U, F>(self, f: F) -> VecResponse<U>
    where
        F: FnMut(T) -> U,
    {
        VecResponse {
            data: self.data.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }

    pub fn hateoas(self) -> hateoas::Response<Self> {
        hateoas::Response::new(self)
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

// - Services returning commonly used responses -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SchemaParams {
    #[serde(default = "Default::default")]
    example_data: bool,
}

pub(crate) async fn schema<T: ExampleData + JsonSchema + Serialize>(
    Query(params): Query<SchemaParams>,
) -> impl IntoResponse {
    if params.example_data {
        Json(schema_for_value!(T::example_data()))
    } else {
        Json(schema_for!(T))
    }
}

pub(crate) async fn route_not_found(
    OriginalUri(original_uri): OriginalUri,
    req: Request,
) -> impl IntoResponse {
    RouteErrorResponse::not_found(req.method(), original_uri.path())
}

/// Maps a service error to a response that names the failed request.
pub(crate) fn on_error<'a>(
    method: &'a Method,
    uri: &'a Uri,
) -> impl FnOnce(RequestError) -> RouteErrorResponse + 'a {
    move |why| {
        RouteErrorResponse::from(why)
            .with_method(method)
            .with_uri(uri.path())
    }
}

/// Path ids that are no valid uuid can not name any resource.
pub(crate) fn parse_id<T>(raw: &str, method: &Method, uri: &Uri) -> RouteResult<Id<T>>
where
    T: HasId<IdType = Uuid>,
{
    Id::parse(raw).ok_or_else(|| RouteErrorResponse::not_found(method, uri.path()))
}

// - Commonly used responses -

pub const NOT_FOUND: &str = "Ressource introuvable";
pub const INVALID_DATA: &str = "Données invalides";
pub const INVALID_BODY: &str = "Corps de requête invalide";
pub const INVALID_QUERY: &str = "Paramètres de requête invalides";
pub const MAINTENANCE: &str = "La plateforme est en maintenance";
pub const INTERNAL_ERROR: &str = "Erreur interne du serveur";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteErrorResponse {
    #[serde(skip)]
    pub status_code: StatusCode,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_uri: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<ValidationErrors>,
}

impl RouteErrorResponse {
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            http_method: None,
            requested_uri: None,
            message: None,
            errors: None,
        }
    }

    pub fn not_found(method: &Method, uri: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND)
            .with_method(method)
            .with_uri(uri)
            .with_message(NOT_FOUND)
    }

    pub fn unauthenticated(method: &Method, uri: impl Into<String>) -> Self {
        Self::from(RequestError::unauthenticated())
            .with_method(method)
            .with_uri(uri)
    }

    pub fn with_method(mut self, method: &Method) -> Self {
        self.http_method = Some(method.to_string());
        self
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.requested_uri = Some(uri.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_errors(mut self, errors: ValidationErrors) -> Self {
        self.errors = Some(errors);
        self
    }
}

impl From<RequestError> for RouteErrorResponse {
    fn from(value: RequestError) -> Self {
        match value {
            RequestError::NotFound => Self::new(StatusCode::NOT_FOUND).with_message(NOT_FOUND),
            RequestError::Unauthorized(message) => {
                Self::new(StatusCode::UNAUTHORIZED).with_message(message)
            }
            RequestError::Forbidden(message) => {
                Self::new(StatusCode::FORBIDDEN).with_message(message)
            }
            RequestError::Validation(errors) => Self::new(StatusCode::BAD_REQUEST)
                .with_message(INVALID_DATA)
                .with_errors(errors),
            RequestError::Conflict(message) => Self::new(StatusCode::CONFLICT).with_message(message),
            RequestError::Unavailable => {
                Self::new(StatusCode::SERVICE_UNAVAILABLE).with_message(MAINTENANCE)
            }
            RequestError::Other(other) => {
                log::error!("request failed: {}", other);
                Self::new(StatusCode::INTERNAL_SERVER_ERROR).with_message(INTERNAL_ERROR)
            }
        }
    }
}

impl From<JsonRejection> for RouteErrorResponse {
    fn from(value: JsonRejection) -> Self {
        log::debug!("rejected request body: {}", value.body_text());
        Self::new(StatusCode::BAD_REQUEST).with_message(INVALID_BODY)
    }
}

impl From<QueryRejection> for RouteErrorResponse {
    fn from(value: QueryRejection) -> Self {
        log::debug!("rejected query: {}", value.body_text());
        Self::new(StatusCode::BAD_REQUEST).with_message(INVALID_QUERY)
    }
}

impl IntoResponse for RouteErrorResponse {
    fn into_response(self) -> axum::response::Response {
        (self.status_code, Json(self)).into_response()
    }
}
