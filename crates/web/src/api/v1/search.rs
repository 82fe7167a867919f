use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Router,
};
use axum_extra::extract::WithRejection;
use model::trip::{Trip, TripSearch};
use platform::{client::trips::TripDetails, database::Database};

use crate::{
    common::{
        on_error, parse_id, route_not_found, schema, HateoasResult, PageQuery, Params,
        VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::base_url::BaseUrl,
    WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/search{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

/// Public routes, no session needed.
pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Trip>))
        .route("/trips", get(search_trips::<D>))
        .route("/trips/:id", get(get_trip::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn search_trips<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    WithRejection(Query(search), _): Params<TripSearch>,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<TripDetails>>> {
    client
        .search_trips(&search)
        .await
        .map(|trips| {
            VecResponse::paginated(trips, &page)
                .map(|details| public_trip_hateoas(details, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn get_trip<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<TripDetails> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .public_trip(&id)
        .await
        .map(|details| public_trip_hateoas(details, base_url).json())
        .map_err(on_error(&method, &uri))
}

fn public_trip_hateoas(
    details: TripDetails,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<TripDetails> {
    let id = details.trip.id.raw();
    hateoas::Response::builder(details, base_url)
        .link("self", resource!("/trips/{}", id))
        .link("book", super::bookings::resource!("/"))
        .build()
}
