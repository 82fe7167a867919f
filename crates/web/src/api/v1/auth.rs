use axum::{
    extract::{OriginalUri, State},
    http::{Method, StatusCode},
    routing::{get, on, post, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use model::user::{LoginForm, PasswordChangeForm, RegistrationForm, User};
use platform::{client::auth::SessionInfo, database::Database};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::{
    common::{on_error, route_not_found, schema, Body, METHOD_FILTER_ALL},
    middleware::session::{
        clear_session_cookie, set_session_cookie, CurrentActor, SessionToken, SessionTokens,
    },
    RouteResult, WebState,
};

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<User>))
        .route("/register", post(register::<D>))
        .route("/login", post(login::<D>))
        .route("/logout", post(logout::<D>))
        .route("/session", get(session::<D>))
        .route("/password", put(change_password::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

/// Answer to a successful login. The token is also set as session cookie,
/// clients without cookies send it as bearer token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
    expires_at: DateTime<Utc>,
    #[serde(flatten)]
    session: SessionInfo,
}

async fn register<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    WithRejection(Json(form), _): Body<RegistrationForm>,
) -> RouteResult<(StatusCode, Json<SessionInfo>)> {
    client
        .register(form)
        .await
        .map(|info| (StatusCode::CREATED, Json(info)))
        .map_err(on_error(&method, &uri))
}

async fn login<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, config }): State<WebState<D>>,
    cookies: Cookies,
    WithRejection(Json(form), _): Body<LoginForm>,
) -> RouteResult<Json<LoginResponse>> {
    let (session, info) = client.login(form).await.map_err(on_error(&method, &uri))?;
    set_session_cookie(&cookies, &session, &config);
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        session: info,
    }))
}

async fn logout<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    cookies: Cookies,
    SessionTokens(tokens): SessionTokens,
) -> RouteResult<StatusCode> {
    for token in tokens {
        client.logout(&token).await.map_err(on_error(&method, &uri))?;
    }
    clear_session_cookie(&cookies);
    Ok(StatusCode::NO_CONTENT)
}

async fn session<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<SessionInfo>> {
    client
        .session_info(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn change_password<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    SessionToken(token): SessionToken,
    WithRejection(Json(form), _): Body<PasswordChangeForm>,
) -> RouteResult<StatusCode> {
    client
        .change_password(&actor, token.as_deref(), form)
        .await
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(on_error(&method, &uri))
}
