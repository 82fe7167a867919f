use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::Method,
    routing::{get, on, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use model::{
    loyalty::{LoyaltyAccount, LoyaltyReward},
    WithId,
};
use platform::database::Database;

use crate::{
    common::{
        on_error, parse_id, route_not_found, schema, HateoasResult, PageQuery, Params,
        VecResponse, METHOD_FILTER_ALL,
    },
    hateoas,
    middleware::{base_url::BaseUrl, session::CurrentActor},
    RouteResult, WebState,
};

macro_rules! resource {
    ($($arg:tt)*) => {
        crate::api::v1::resource!("/loyalty{}", format_args!($($arg)*))
    };
}
pub(crate) use resource;

pub(crate) fn routes<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    Router::new()
        .route("/schema", get(schema::<LoyaltyReward>))
        .route("/", get(get_account::<D>))
        .route("/rewards", get(get_rewards::<D>))
        .route("/rewards/:id/redeem", post(redeem_reward::<D>))
        .with_state(state)
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}

async fn get_account<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<LoyaltyAccount>> {
    client
        .loyalty_account(&actor)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}

async fn get_rewards<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
    Extension(base_url): Extension<Arc<BaseUrl>>,
    WithRejection(Query(page), _): Params<PageQuery>,
) -> HateoasResult<VecResponse<hateoas::Response<WithId<LoyaltyReward>>>> {
    client
        .rewards(&actor)
        .await
        .map(|rewards| {
            VecResponse::paginated(rewards, &page)
                .map(|reward| {
                    let id = reward.id.raw();
                    hateoas::Response::builder(reward, base_url.clone())
                        .link("redeem", resource!("/rewards/{}/redeem", id))
                        .build()
                })
                .hateoas()
                .json()
        })
        .map_err(on_error(&method, &uri))
}

/// Answers with the account after the points were spent.
async fn redeem_reward<D: Database>(
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    State(WebState { client, .. }): State<WebState<D>>,
    CurrentActor(actor): CurrentActor,
) -> RouteResult<Json<LoyaltyAccount>> {
    let id = parse_id(&id, &method, &uri)?;
    client
        .redeem_reward(&actor, &id)
        .await
        .map(Json)
        .map_err(on_error(&method, &uri))
}
