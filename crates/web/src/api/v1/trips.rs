use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on, patch},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    booking::Booking,
    trip::{Trip, TripForm, TripStatus, TripStatusForm},
    WithId,
};
use platform::{client::trips::TripDetails, database::Database};
use serde::Deserialize;

use crate::{
    common::{
        on_error, parse_id, route_not_found, schema, Body, CreatedResult, HateoasResult,
        PageQuery, Params, VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{base_url::BaseUrl, session::CurrentActor},
    RouteResult, WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/trips{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Trip>))
        .route("/:id/status", patch(update_trip_status::<D>))
        .route("/:id/manifest", get(get_manifest::<D>))
        .route(
            "/:id",
            get(get_trip::<D>).put(update_trip::<D>).delete(cancel_trip::<D>),
        )
        .route("/", get(get_trips::<D>).post(create_trip::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

#[derive(Debug, Deserialize)]
struct TripsQuery {
    status: Option<TripStatus>,
}

async fn get_trips<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<TripsQuery>,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Trip>>>> {
    client
        .trips(&actor, params.status)
        .await
        .map(|trips| {
            VecResponse::paginated(trips, &page)
                .map(|trip| trip_hateoas(trip, base_url.clone()))
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
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<TripDetails> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .trip(&actor, &id)
        .await
        .map(|details| trip_details_hateoas(details, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn create_trip<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<TripForm>,
) -> CreatedResult<TripDetails> {
    client
        .create_trip(&actor, form)
        .await
        .map(|details| {
            (
                StatusCode::CREATED,
                trip_details_hateoas(details, base_url).json(),
            )
        })
        .map_err(on_error(&method, &uri))
}

async fn update_trip<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<TripForm>,
) -> HateoasResult<TripDetails> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_trip(&actor, &id, form)
        .await
        .map(|details| trip_details_hateoas(details, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn update_trip_status<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<TripStatusForm>,
) -> HateoasResult<TripDetails> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_trip_status(&actor, &id, form)
        .await
        .map(|details| trip_details_hateoas(details, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn cancel_trip<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<TripDetails> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .cancel_trip(&actor, &id)
        .await
        .map(|details| trip_details_hateoas(details, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn get_manifest<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<VecResponse<WithId<Booking>>>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .trip_manifest(&actor, &id)
        .await
        .map(|bookings| VecResponse::non_paginated(bookings).json())
        .map_err(on_error(&method, &uri))
}

pub(crate) fn trip_hateoas(
    trip: WithId<Trip>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Trip>> {
    let id = trip.id.raw();
    let route_id = trip.content.route_id.raw();
    let bus_id = trip.content.bus_id.raw();
    let open = !trip.content.status.is_final();
    hateoas::Response::builder(trip, base_url)
        .link("self", resource!("/{}", id))
        .link_option("status", open.then(|| resource!("/{}/status", id)))
        .link("manifest", resource!("/{}/manifest", id))
        .link("route", super::routes::resource!("/{}", route_id))
        .link("bus", super::buses::resource!("/{}", bus_id))
        .build()
}

fn trip_details_hateoas(
    details: TripDetails,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<TripDetails> {
    let id = details.trip.id.raw();
    let route_id = details.route.id.raw();
    let bus_id = details.bus.id.raw();
    let open = !details.trip.content.status.is_final();
    hateoas::Response::builder(details, base_url)
        .link("self", resource!("/{}", id))
        .link_option("status", open.then(|| resource!("/{}/status", id)))
        .link("manifest", resource!("/{}/manifest", id))
        .link("route", super::routes::resource!("/{}", route_id))
        .link("bus", super::buses::resource!("/{}", bus_id))
        .build()
}
