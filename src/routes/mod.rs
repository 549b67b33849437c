pub mod api;
pub mod auth;
pub mod html;
pub mod pages;
pub mod purchases;
pub mod recipes;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The whole application: every feature router behind request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(pages::router())
        .merge(purchases::router())
        .merge(api::router())
        .merge(recipes::router())
        .merge(auth::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
