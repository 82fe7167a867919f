use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    route::{Route, RouteForm},
    WithId,
};
use platform::database::Database;

use crate::{
    common::{
        on_error, parse_id, route_not_found, schema, Body, CreatedResult, HateoasResult,
        PageQuery, Params, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{base_url::BaseUrl, session::CurrentActor},
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/routes{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Route>))
        .route(
            "/:id",
            get(get_route::<D>)
                .put(update_route::<D>)
                .delete(archive_route::<D>),
        )
        .route("/", get(get_routes::<D>).post(create_route::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_routes<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Route>>>> {
    client
        .routes(&actor)
        .await
        .map(|routes| {
            VecResponse::paginated(routes, &page)
                .map(|route| route_hateoas(route, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn get_route<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Route>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .route(&actor, &id)
        .await
        .map(|route| route_hateoas(route, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn create_route<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<RouteForm>,
) -> CreatedResult<WithId<Route>> {
    client
        .create_route(&actor, form)
        .await
        .map(|route| (StatusCode::CREATED, route_hateoas(route, base_url).json()))
        .map_err(on_error(&method, &uri))
}

async fn update_route<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<RouteForm>,
) -> HateoasResult<WithId<Route>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_route(&actor, &id, form)
        .await
        .map(|route| route_hateoas(route, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn archive_route<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Route>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .archive_route(&actor, &id)
        .await
        .map(|route| route_hateoas(route, base_url).json())
        .map_err(on_error(&method, &uri))
}

pub(crate) fn route_hateoas(
    route: WithId<Route>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Route>> {
    let id = route.id.raw();
    hateoas::Response::builder(route, base_url)
        .link("self", resource!("/{}", id))
        .build()
}
