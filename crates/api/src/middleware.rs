use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use dentstock_core::{SessionContext, UserId};

/// Header naming the acting user.
pub const USER_HEADER: &str = "x-user-id";

/// Builds the `SessionContext` every domain route receives.
pub async fn session_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let user_id = extract_user(req.headers())?;
    req.extensions_mut().insert(SessionContext::new(user_id));
    Ok(next.run(req).await)
}

fn extract_user(headers: &HeaderMap) -> Result<UserId, StatusCode> {
    let header = headers.get(USER_HEADER).ok_or(StatusCode::UNAUTHORIZED)?;
    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    header.trim().parse().map_err(|_| StatusCode::UNAUTHORIZED)
}
