use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/low-stock", get(low_stock))
        .route("/low-stock/latest", get(low_stock_latest))
}

/// Current alerts, grouped by supplier.
pub async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    dto::respond(StatusCode::OK, services.low_stock())
}

/// What the background poller last saw; may lag the ledger by the settle delay.
pub async fn low_stock_latest(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    match services.low_stock_latest() {
        Some(groups) => (StatusCode::OK, Json(groups)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}
