use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Query, State},
    http::Method,
    routing::{get, on},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    activity::Activity,
    company::{Company, CompanyForm, PlanChoiceForm},
    subscription::SubscriptionPlan,
    WithId,
};
use platform::{client::company::CompanyDashboard, database::Database};

use crate::{
    common::{on_error, route_not_found, schema, Body, HateoasResult, Params, VecResponse, METHOD_FILTER_ALL},
    hateoas,
    middleware::{base_url::BaseUrl, session::CurrentActor},
    RouteResult, WebState,
};

use super::admin::ActivitiesQuery;

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/company{}", format_args!($($arg)*))
    };
}

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Company>))
        .route("/", get(get_company::<D>).put(update_company::<D>))
        .route(
            "/subscription",
            get(get_subscription::<D>).put(choose_plan::<D>),
        )
        .route("/dashboard", get(get_dashboard::<D>))
        .route("/activities", get(get_activities::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Company>> {
    client
        .own_company(&actor)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn update_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<CompanyForm>,
) -> HateoasResult<WithId<Company>> {
    client
        .update_company(&actor, form)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

/// `null` while no plan has been chosen.
async fn get_subscription<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<Option<WithId<SubscriptionPlan>>>> {
    client
        .company_subscription(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn choose_plan<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<PlanChoiceForm>,
) -> HateoasResult<WithId<Company>> {
    client
        .choose_plan(&actor, form)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn get_dashboard<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<CompanyDashboard>> {
    client
        .company_dashboard(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn get_activities<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<ActivitiesQuery>,
) -> RouteResult<Json<VecResponse<WithId<Activity>>>> {
    client
        .company_activities(&actor, params.limit())
        .await
        .map(|activities| VecResponse::non_paginated(activities).json())
        .map_err(on_error(&method, &uri))
}

fn company_hateoas(
    company: WithId<Company>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Company>> {
    hateoas::Response::builder(company, base_url)
        .link("self", resource!("/"))
        .link("subscription", resource!("/subscription"))
        .link("dashboard", resource!("/dashboard"))
        .link("buses", super::buses::resource!("/"))
        .link("routes", super::routes::resource!("/"))
        .link("trips", super::trips::resource!("/"))
        .build()
}
