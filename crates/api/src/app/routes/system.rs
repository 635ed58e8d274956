use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use dentstock_core::SessionContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<SessionContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": ctx.user_id().to_string(),
    }))
}
