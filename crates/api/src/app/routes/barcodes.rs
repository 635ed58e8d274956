use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{get, post},
};

use dentstock_core::SessionContext;

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/barcodes/assign", post(assign_barcode))
        .route("/barcodes/create", post(create_with_barcode))
        .route("/barcodes/:code", get(lookup))
}

pub async fn lookup(
    Extension(services): Extension<Arc<AppServices>>,
    Path(code): Path<String>,
) -> axum::response::Response {
    dto::respond(StatusCode::OK, services.engine().lookup_by_barcode(&code))
}

pub async fn assign_barcode(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::AssignBarcodeRequest>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::OK,
        services
            .engine()
            .assign_barcode(&ctx, body.supply_id, &body.code),
    )
}

pub async fn create_with_barcode(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::SupplyDraftRequest>,
) -> axum::response::Response {
    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::CREATED,
        services.engine().create_with_barcode(&ctx, draft),
    )
}
