use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};

use dentstock_core::StockError;

/// HTTP status for each error kind.
pub fn status_for(err: &StockError) -> StatusCode {
    match err {
        StockError::InsufficientStock { .. }
        | StockError::DuplicateName { .. }
        | StockError::InUse { .. }
        | StockError::PartialAssignmentFailure { .. } => StatusCode::CONFLICT,
        StockError::SameLocation { .. } | StockError::Validation(_) => StatusCode::BAD_REQUEST,
        StockError::NotFoundInInventory { .. } | StockError::NotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        StockError::ItemNotFoundInInventory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StockError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub fn stock_error_to_response(err: StockError) -> axum::response::Response {
    let status = status_for(&err);
    json_error_with_detail(status, err.kind(), err.to_string(), err.detail())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with_detail(status, code, message, Value::Null)
}

fn json_error_with_detail(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    detail: Value,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
            "detail": detail,
        })),
    )
        .into_response()
}
