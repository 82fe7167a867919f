use axum::{routing::on, Router};
use platform::database::Database;

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    middleware::base_url::base_url_middleware,
    WebState,
};

mod admin;
mod auth;
mod bookings;
mod buses;
mod company;
mod employees;
mod loyalty;
mod notifications;
mod plans;
mod routes;
mod search;
mod trips;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::resource!("/v1{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .nest_service("/auth", auth::routes(state.clone()))
        .nest_service("/admin", admin::routes(state.clone()))
        .nest_service("/company", company::routes(state.clone()))
        .nest_service("/buses", buses::routes(state.clone()))
        .nest_service("/routes", routes::routes(state.clone()))
        .nest_service("/trips", trips::routes(state.clone()))
        .nest_service("/employees", employees::routes(state.clone()))
        .nest_service("/bookings", bookings::routes(state.clone()))
        .nest_service("/search", search::routes(state.clone()))
        .nest_service("/loyalty", loyalty::routes(state.clone()))
        .nest_service("/notifications", notifications::routes(state.clone()))
        .nest_service("/plans", plans::routes(state))
        .layer(axum::middleware::from_fn(base_url_middleware))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
