use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{Method, StatusCode},
    routing::{get, on, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    user::{EmployeeForm, EmployeeUpdateForm, User},
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
        crate::api::v1::resource!("/employees{}", format_args!($($arg)*))
    };
}

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<User>))
        .route(
            "/:id",
            put(update_employee::<D>).delete(deactivate_employee::<D>),
        )
        .route("/", get(get_employees::<D>).post(create_employee::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_employees<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    WithRejection(Query(page), _): Params<PageQuery>,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<User>>>> {
    client
        .employees(&actor)
        .await
        .map(|employees| {
            VecResponse::paginated(employees, &page)
                .map(|employee| employee_hateoas(employee, base_url.clone()))
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

async fn create_employee<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<EmployeeForm>,
) -> CreatedResult<WithId<User>> {
    client
        .create_employee(&actor, form)
        .await
        .map(|employee| {
            (
                StatusCode::CREATED,
                employee_hateoas(employee, base_url).json(),
            )
        })
        .map_err(on_error(&method, &uri))
}

async fn update_employee<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Json(form), _): Body<EmployeeUpdateForm>,
) -> HateoasResult<WithId<User>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .update_employee(&actor, &id, form)
        .await
        .map(|employee| employee_hateoas(employee, base_url).json())
        .map_err(on_error(&method, &uri))
}

/// Employees are deactivated, never deleted, their sales stay attributed.
async fn deactivate_employee<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
) -> HateoasResult<WithId<User>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .deactivate_employee(&actor, &id)
        .await
        .map(|employee| employee_hateoas(employee, base_url).json())
        .map_err(on_error(&method, &uri))
}

fn employee_hateoas(employee: WithId<User>, base_url: Arc<BaseUrl>) -> hateoas::Response<WithId<User>> {
    let id = employee.id.raw();
    hateoas::Response::builder(employee, base_url)
        .link("self", resource!("/{}", id))
        .build()
}
