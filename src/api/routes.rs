use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthService};
use crate::links::LinkService;

use super::handlers::{
    delete_link, health_check, link_stats, redirect_link, search_links, shorten_link, update_link,
    AppState,
};

pub fn create_api_router(service: Arc<LinkService>, auth_service: Arc<AuthService>) -> Router {
    let state = Arc::new(AppState { service });

    let link_routes = Router::new()
        .route("/links/shorten", post(shorten_link))
        .route("/links/search", get(search_links))
        .route(
            "/links/{code}",
            get(redirect_link).put(update_link).delete(delete_link),
        )
        .route("/links/{code}/stats", get(link_stats))
        .route_layer(middleware::from_fn_with_state(auth_service, auth_middleware))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .merge(link_routes)
        .layer(TraceLayer::new_for_http())
}
