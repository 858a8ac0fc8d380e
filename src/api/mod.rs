//! HTTP surface of the workflows

pub mod theses;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::AppState;

/// Router with every public route
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/theses/*cms_id", get(theses::record_from_cms_id))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
