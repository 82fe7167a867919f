pub use crate::common::RouteResult;

use std::sync::Arc;

use axum::{routing::get_service, Router};
use config::WebConfig;
use platform::{database::Database, Client};
use tokio::net::TcpListener;
use tower_cookies::CookieManagerLayer;
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod api;
pub mod common;
pub mod config;
pub mod hateoas;
pub mod middleware;

#[derive(Clone)]
pub struct WebState<D>
where
    D: Database,
{
    pub client: Client<D>,
    pub config: Arc<WebConfig>,
}

impl<D> WebState<D>
where
    D: Database,
{
    pub fn new(client: Client<D>, config: WebConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }
}

/// The complete application: the json api under `/api`, static files
/// everywhere else.
pub fn app<D>(state: WebState<D>) -> Router
where
    D: Database,
{
    let static_dir = state.config.static_dir.clone();
    Router::new()
        .nest_service("/api", api::routes(state))
        .fallback_service(static_content_router(&static_dir))
        .layer(CookieManagerLayer::new())
        .layer(TraceLayer::new_for_http())
}

pub async fn start_web_server<D>(state: WebState<D>) -> std::io::Result<()>
where
    D: Database,
{
    let bind_address = state.config.bind_address.clone();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("listening on {}", bind_address);
    axum::serve(listener, app(state).into_make_service()).await?;

    Ok(())
}

fn static_content_router(static_dir: &str) -> Router {
    let not_found_page = format!("{}/error404.html", static_dir.trim_end_matches('/'));
    Router::new().nest_service(
        "/",
        get_service(ServeDir::new(static_dir).not_found_service(ServeFile::new(not_found_page))),
    )
}
