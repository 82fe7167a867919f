use axum::{
    async_trait,
    extract::{FromRequestParts, OriginalUri},
    http::{request::Parts, HeaderMap},
};
use cookie::{Cookie, SameSite};
use headers::{authorization::Bearer, Authorization, HeaderMapExt};
use model::user::Session;
use platform::{database::Database, Actor};
use tower_cookies::Cookies;

use crate::{common::RouteErrorResponse, config::WebConfig, WebState};

pub const SESSION_COOKIE: &str = "session";

/// The session tokens a request carries: the session cookie first, then an
/// `Authorization: Bearer` header.
fn session_tokens(parts: &Parts) -> Vec<String> {
    let from_cookie = parts
        .extensions
        .get::<Cookies>()
        .and_then(|cookies| cookies.get(SESSION_COOKIE))
        .map(|cookie| cookie.value().to_owned());
    let mut tokens: Vec<String> = from_cookie
        .into_iter()
        .chain(bearer_token(&parts.headers))
        .filter(|token| !token.is_empty())
        .collect();
    tokens.dedup();
    tokens
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|authorization| authorization.token().to_owned())
}

/// Path of the request as sent, before nested routers stripped their prefix.
fn requested_path(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map(|uri| uri.path().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned())
}

/// The token `CurrentActor` authenticated the request with.
#[derive(Debug, Clone)]
struct AuthenticatedToken(String);

/// The token of the current session: the one that authenticated the request
/// when `CurrentActor` was extracted before, else the first one sent.
/// Never fails.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = match parts.extensions.get::<AuthenticatedToken>() {
            Some(AuthenticatedToken(token)) => Some(token.clone()),
            None => session_tokens(parts).into_iter().next(),
        };
        Ok(SessionToken(token))
    }
}

/// Every session token the request carries. Never fails.
#[derive(Debug, Clone)]
pub struct SessionTokens(pub Vec<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionTokens
where
    S: Send + Sync,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionTokens(session_tokens(parts)))
    }
}

/// The authenticated user of the request. The cookie is tried before the
/// bearer token, a stale cookie does not hide a valid bearer token.
/// Requests without a valid session are answered with 401.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

#[async_trait]
impl<D> FromRequestParts<WebState<D>> for CurrentActor
where
    D: Database,
{
    type Rejection = RouteErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &WebState<D>,
    ) -> Result<Self, Self::Rejection> {
        let mut failure = None;
        for token in session_tokens(parts) {
            match state.client.authenticate(&token).await {
                Ok(actor) => {
                    parts.extensions.insert(AuthenticatedToken(token));
                    return Ok(CurrentActor(actor));
                }
                Err(why) => failure = Some(why),
            }
        }
        Err(match failure {
            Some(why) => RouteErrorResponse::from(why)
                .with_method(&parts.method)
                .with_uri(requested_path(parts)),
            None => RouteErrorResponse::unauthenticated(&parts.method, requested_path(parts)),
        })
    }
}

pub fn set_session_cookie(cookies: &Cookies, session: &Session, config: &WebConfig) {
    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(cookie::time::Duration::hours(config.session_ttl_hours))
        .build();
    cookies.add(cookie);
}

pub fn clear_session_cookie(cookies: &Cookies) {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
}
