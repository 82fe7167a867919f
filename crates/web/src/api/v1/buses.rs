use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    bus::{Bus, BusForm},
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
        crate::api::v1::resource!("/buses{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Bus>))
        .route(
            "/:id",
            get(get_bus::<D>).put(update_bus::<D>).delete(archive_bus::<D>),
        )
        .route("/", get(get_buses::<D>).post(create_bus::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_buses<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Bus>>>> {
    client
        .buses(&actor)
        .await
        .map(|buses| {
            VecResponse::paginated(buses, &page)
                .map(|bus| bus_hateoas(bus, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn get_bus<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Bus>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .bus(&actor, &id)
        .await
        .map(|bus| bus_hateoas(bus, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn create_bus<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<BusForm>,
) -> CreatedResult<WithId<Bus>> {
    client
        .create_bus(&actor, form)
        .await
        .map(|bus| (StatusCode::CREATED, bus_hateoas(bus, base_url).json()))
        .map_err(on_error(&method, &uri))
}

async fn update_bus<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<BusForm>,
) -> HateoasResult<WithId<Bus>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_bus(&actor, &id, form)
        .await
        .map(|bus| bus_hateoas(bus, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn archive_bus<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Bus>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .archive_bus(&actor, &id)
        .await
        .map(|bus| bus_hateoas(bus, base_url).json())
        .map_err(on_error(&method, &uri))
}

pub(crate) fn bus_hateoas(bus: WithId<Bus>, base_url: Arc<BaseUrl>) -> hateoas::Response<WithId<Bus>> {
    let id = bus.id.raw();
    hateoas::Response::builder(bus, base_url)
        .link("self", resource!("/{}", id))
        .build()
}
