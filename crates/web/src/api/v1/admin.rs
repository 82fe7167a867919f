use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on, patch, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    activity::Activity,
    alert::{AlertForm, SystemAlert},
    company::{Company, CompanyStatus, RejectionForm, SuspensionForm},
    loyalty::LoyaltyReward,
    settings::SystemSettings,
    subscription::SubscriptionPlan,
    user::{Role, User, UserStatusForm},
    WithId,
};
use platform::{client::admin::AdminDashboard, database::Database};
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
        crate::api::v1::resource!("/admin{}", format_args!($($arg)*))
    };
}

pub const DEFAULT_ACTIVITY_LIMIT: i64 = 50;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<Company>))
        .route("/dashboard", get(get_dashboard::<D>))
        .route("/activities", get(get_activities::<D>))
        // companies
        .route("/companies", get(get_companies::<D>))
        .route("/companies/:id", get(get_company::<D>))
        .route("/companies/:id/approve", post(approve_company::<D>))
        .route("/companies/:id/reject", post(reject_company::<D>))
        .route("/companies/:id/suspend", post(suspend_company::<D>))
        .route("/companies/:id/reactivate", post(reactivate_company::<D>))
        // users
        .route("/users", get(get_users::<D>))
        .route("/users/:id/status", patch(set_user_status::<D>))
        // settings
        .route("/settings", get(get_settings::<D>).put(update_settings::<D>))
        // alerts
        .route("/alerts", get(get_alerts::<D>).post(create_alert::<D>))
        .route("/alerts/:id/resolve", post(resolve_alert::<D>))
        // loyalty rewards
        .route("/rewards", get(get_rewards::<D>).post(create_reward::<D>))
        .route("/rewards/:id", put(update_reward::<D>))
        // subscription plans
        .route("/plans", get(get_plans::<D>).post(create_plan::<D>))
        .route("/plans/:id", put(update_plan::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

// - Dashboard -

async fn get_dashboard<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<AdminDashboard>> {
    client
        .admin_dashboard(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivitiesQuery {
    pub limit: Option<i64>,
}

impl ActivitiesQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 500)
    }
}

async fn get_activities<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<ActivitiesQuery>,
) -> RouteResult<Json<VecResponse<WithId<Activity>>>> {
    client
        .activities(&actor, params.limit())
        .await
        .map(|activities| VecResponse::non_paginated(activities).json())
        .map_err(on_error(&method, &uri))
}

// - Companies -

#[derive(Debug, Deserialize)]
struct CompaniesQuery {
    status: Option<CompanyStatus>,
}

async fn get_companies<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<CompaniesQuery>,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<Company>>>> {
    client
        .companies(&actor, params.status)
        .await
        .map(|companies| {
            VecResponse::paginated(companies, &page)
                .map(|company| company_hateoas(company, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn get_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Company>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .company(&actor, &id)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn approve_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Company>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .approve_company(&actor, &id)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn reject_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<RejectionForm>,
) -> HateoasResult<WithId<Company>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .reject_company(&actor, &id, form)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn suspend_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<SuspensionForm>,
) -> HateoasResult<WithId<Company>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .suspend_company(&actor, &id, form)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

async fn reactivate_company<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<Company>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .reactivate_company(&actor, &id)
        .await
        .map(|company| company_hateoas(company, base_url).json())
        .map_err(on_error(&method, &uri))
}

fn company_hateoas(
    company: WithId<Company>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<Company>> {
    let id = company.id.raw();
    let status = company.content.status;
    let builder = hateoas::Response::builder(company, base_url)
        .link("self", resource!("/companies/{}", id));
    let actions: &[(&str, CompanyStatus)] = &[
        ("approve", CompanyStatus::Approved),
        ("reject", CompanyStatus::Rejected),
        ("suspend", CompanyStatus::Suspended),
    ];
    let builder = actions
        .iter()
        .filter(|(_, next)| status.can_become(*next) && status != CompanyStatus::Suspended)
        .fold(builder, |builder, (action, _)| {
            builder.link(*action, resource!("/companies/{}/{}", id, action))
        });
    builder
        .link_option(
            "reactivate",
            (status == CompanyStatus::Suspended)
                .then(|| resource!("/companies/{}/reactivate", id)),
        )
        .build()
}

// - Users -

#[derive(Debug, Deserialize)]
struct UsersQuery {
    role: Option<Role>,
}

async fn get_users<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<UsersQuery>,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<User>>>> {
    client
        .users(&actor, params.role)
        .await
        .map(|users| VecResponse::paginated(users, &page).json())
        .map_err(on_error(&method, &uri))
}

async fn set_user_status<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(form), _): Body<UserStatusForm>,
) -> RouteResult<Json<WithId<User>>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .set_user_status(&actor, &id, form)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

// - Settings -

async fn get_settings<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<SystemSettings>> {
    client
        .settings(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn update_settings<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(form), _): Body<SystemSettings>,
) -> RouteResult<Json<SystemSettings>> {
    client
        .update_settings(&actor, form)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

// - Alerts -

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlertsQuery {
    #[serde(default)]
    include_resolved: bool,
}

async fn get_alerts<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(params), _): Params<AlertsQuery>,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<SystemAlert>>>> {
    client
        .alerts(&actor, params.include_resolved)
        .await
        .map(|alerts| VecResponse::paginated(alerts, &page).json())
        .map_err(on_error(&method, &uri))
}

async fn create_alert<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(form), _): Body<AlertForm>,
) -> RouteResult<(StatusCode, Json<WithId<SystemAlert>>)> {
    client
        .create_alert(&actor, form)
        .await
        .map(|alert| (StatusCode::CREATED, Json(alert)))
        .map_err(on_error(&method, &uri))
}

async fn resolve_alert<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<WithId<SystemAlert>>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .resolve_alert(&actor, &id)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

// - Loyalty rewards -

async fn get_rewards<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<LoyaltyReward>>>> {
    actor
        .require_admin()
        .map_err(on_error(&method, &uri))?;
    client
        .rewards(&actor)
        .await
        .map(|rewards| VecResponse::paginated(rewards, &page).json())
        .map_err(on_error(&method, &uri))
}

async fn create_reward<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<LoyaltyReward>,
) -> CreatedResult<WithId<LoyaltyReward>> {
    client
        .create_reward(&actor, form)
        .await
        .map(|reward| (StatusCode::CREATED, reward_hateoas(reward, base_url).json()))
        .map_err(on_error(&method, &uri))
}

async fn update_reward<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<LoyaltyReward>,
) -> HateoasResult<WithId<LoyaltyReward>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_reward(&actor, &id, form)
        .await
        .map(|reward| reward_hateoas(reward, base_url).json())
        .map_err(on_error(&method, &uri))
}

fn reward_hateoas(
    reward: WithId<LoyaltyReward>,
    base_url: Arc<BaseUrl>,
) -> hateoas::Response<WithId<LoyaltyReward>> {
    let id = reward.id.raw();
    hateoas::Response::builder(reward, base_url)
        .link("self", resource!("/rewards/{}", id))
        .link("redeem", super::loyalty::resource!("/rewards/{}/redeem", id))
        .build()
}

// - Subscription plans -

async fn get_plans<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> RouteResult<Json<VecResponse<WithId<SubscriptionPlan>>>> {
    client
        .all_plans(&actor)
        .await
        .map(|plans| VecResponse::paginated(plans, &page).json())
        .map_err(on_error(&method, &uri))
}

async fn create_plan<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(form), _): Body<SubscriptionPlan>,
) -> RouteResult<(StatusCode, Json<WithId<SubscriptionPlan>>)> {
    client
        .create_plan(&actor, form)
        .await
        .map(|plan| (StatusCode::CREATED, Json(plan)))
        .map_err(on_error(&method, &uri))
}

async fn update_plan<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Json(form), _): Body<SubscriptionPlan>,
) -> RouteResult<Json<WithId<SubscriptionPlan>>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_plan(&actor, &id, form)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}
