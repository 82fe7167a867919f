use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    notification::{Notification, NotificationPreferences},
    WithId,
};
use platform::database::Database;
use serde::{Deserialize, Serialize};

use crate::{
    common::{
        on_error, parse_id, route_not_found, schema, Body, PageQuery, Params, VecResponse,
        METHOD_FILTER_ALL,
    },
    middleware::session::CurrentActor,
    RouteResult, WebState,
};

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Notification>))
        .route("/", get(get_notifications::<D>))
        .route("/read-all", post(mark_all_read::<D>))
        .route(
            "/preferences",
            get(get_preferences::<D>).put(update_preferences::<D>),
        )
        .route("/:id/read", post(mark_read::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NotificationsQuery {
    #[serde(default)]
    unread_only: bool,
}

#[derive(Debug, Serialize)]
struct MarkedRead {
    updated: u64,
}

async fn get_notifications<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<NotificationsQuery>,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<Notification>>>> {
    client
        .notifications(&actor, params.unread_only)
        .await
        .map(|notifications| VecResponse::paginated(notifications, &page).json())
        .map_err(on_error(&method, &uri))
}

async fn mark_read<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<WithId<Notification>>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .mark_read(&actor, &id)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn mark_all_read<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<MarkedRead>> {
    client
        .mark_all_read(&actor)
        .await
        .map(|updated| Json(MarkedRead { updated }))
        .map_err(on_error(&method, &uri))
}

async fn get_preferences<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<NotificationPreferences>> {
    client
        .preferences(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn update_preferences<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(preferences), _): Body<NotificationPreferences>,
) -> RouteResult<Json<NotificationPreferences>> {
    client
        .update_preferences(&actor, preferences)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}
