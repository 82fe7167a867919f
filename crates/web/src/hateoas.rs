use std::sync::Arc;

use axum::Json;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::middleware::base_url::BaseUrl;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Link {
    #[serde(rename = "rel")]
    pub relation: String,

    #[serde(rename = "href")]
    pub hypertext_reference: String,
}

/// A resource with links to itself, to related resources and to the
/// actions currently allowed on it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Response<T> {
    #[serde(flatten)]
    pub content: T,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub links: Vec<Link>,
}

impl<T> Response<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            links: Vec::new(),
        }
    }

    pub fn builder(content: T, base_url: Arc<BaseUrl>) -> ResponseBuilder<T> {
        ResponseBuilder {
            content,
            links: Vec::new(),
            base_url,
        }
    }

    pub fn json(self) -> Json<Self> {
        Json(self)
    }
}

/// Collects links as paths and resolves them against the url the client
/// used to reach the api.
pub struct ResponseBuilder<T> {
    content: T,
    links: Vec<Link>,
    base_url: Arc<BaseUrl>,
}

impl<T> ResponseBuilder<T> {
    pub fn link<R, H>(mut self, relation: R, path: H) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        let hypertext_reference = self.base_url.full_url(path);
        self.links.push(Link {
            relation: relation.into(),
            hypertext_reference,
        });
        self
    }

    /// Links only when there is a path, e.g. an action the resource's state allows.
    pub fn link_option<R, H>(self, relation: R, path: Option<H>) -> Self
    where
        R: Into<String>,
        H: Into<String>,
    {
        match path {
            Some(path) => self.link(relation, path),
            None => self,
        }
    }

    pub fn build(self) -> Response<T> {
        Response {
            content: self.content,
            links: self.links,
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn base_url() -> Arc<BaseUrl> {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("busline.sn"));
        Arc::new(BaseUrl::from_headers(&headers))
    }

    #[test]
    fn links_resolve_against_the_base_url() {
        let response = Response::builder(json!({ "seats": 2 }), base_url())
            .link("self", "/api/v1/bookings/1")
            .link_option("cancel", None::<String>)
            .build();
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "seats": 2,
                "links": [{ "rel": "self", "href": "http://busline.sn/api/v1/bookings/1" }]
            })
        );
    }

    #[test]
    fn responses_without_links_stay_flat() {
        let response = Response::new(json!({ "seats": 2 }));
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({ "seats": 2 }));
    }
}
