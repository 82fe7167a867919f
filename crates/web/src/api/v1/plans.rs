use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{subscription::SubscriptionPlan, WithId};
use platform::database::Database;

use crate::{
    common::{
        on_error, route_not_found, schema, PageQuery, Params, VecResponse, METHOD_FILTER_ALL,
    },
    RouteResult, WebState,
};

/// The active subscription plans, readable without a session.
pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<SubscriptionPlan>))
        .route("/", get(get_plans::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_plans<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<SubscriptionPlan>>>> {
    client
        .plans()
        .await
        .map(|plans| VecResponse::paginated(plans, &page).json())
        .map_err(on_error(&method, &uri))
}
