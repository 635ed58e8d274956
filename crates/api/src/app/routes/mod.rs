use axum::{Router, routing::get};

pub mod alerts;
pub mod barcodes;
pub mod catalog;
pub mod movements;
pub mod system;

/// Router for all session-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .merge(movements::router())
        .merge(catalog::router())
        .merge(barcodes::router())
        .merge(alerts::router())
}
