use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    booking::{Booking, BookingForm, BookingStatus, CounterSaleForm},
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
        crate::api::v1::resource!("/bookings{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Booking>))
        .route("/counter", post(counter_sale::<D>))
        .route("/:id/cancel", post(cancel_booking::<D>))
        .route("/:id", get(get_booking::<D>))
        .route("/", get(get_bookings::<D>).post(book::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_bookings<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Booking>>>> {
    client
        .bookings(&actor)
        .await
        .map(|bookings| {
            VecResponse::paginated(bookings, &page)
                .map(|booking| booking_hateoas(booking, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn get_booking<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Booking>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .booking(&actor, &id)
        .await
        .map(|booking| booking_hateoas(booking, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn book<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<BookingForm>,
) -> CreatedResult<WithId<Booking>> {
    client
        .book(&actor, form)
        .await
        .map(|booking| (StatusCode::CREATED, booking_hateoas(booking, base_url).json()))
        .map_err(on_error(&method, &uri))
}

async fn counter_sale<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<CounterSaleForm>,
) -> CreatedResult<WithId<Booking>> {
    client
        .counter_sale(&actor, form)
        .await
        .map(|booking| (StatusCode::CREATED, booking_hateoas(booking, base_url).json()))
        .map_err(on_error(&method, &uri))
}

async fn cancel_booking<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Booking>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .cancel_booking(&actor, &id)
        .await
        .map(|booking| booking_hateoas(booking, base_url).json())
        .map_err(on_error(&method, &uri))
}

fn booking_hateoas(
    booking: WithId<Booking>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Booking>> {
    let id = booking.id.raw();
    let trip_id = booking.content.trip_id.raw();
    let cancellable = booking.content.status == BookingStatus::Confirmed;
    hateoas::Response::builder(booking, base_url)
        .link("self", resource!("/{}", id))
        .link("trip", super::search::resource!("/trips/{}", trip_id))
        .link_option("cancel", cancellable.then(|| resource!("/{}/cancel", id)))
        .build()
}
