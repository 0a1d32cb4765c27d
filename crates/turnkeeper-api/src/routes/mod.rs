//! Route modules and the assembled application router.

pub mod health;
pub mod initiative;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Builds the full application router.
pub fn app(state: AppState) -> Router {
    // TODO: Replace CorsLayer::permissive() with the chat bot's origin once it is deployed.
    Router::new()
        .merge(health::router())
        .merge(initiative::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
