pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use crate::http::server::AppState;
use self::handlers::*;

/// Gateway introspection and administration routes.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/gateway/health", get(get_health))
        .route("/gateway/services", get(get_services))
        .route("/gateway/services/{name}/circuit/reset", post(reset_circuit))
}
