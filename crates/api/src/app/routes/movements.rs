use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    routing::{delete, get, post, put},
};

use dentstock_core::{LocationId, OperatoryId, SessionContext, SupplyId};

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/check-in", post(check_in))
        .route("/consume", post(consume))
        .route("/transfer", post(transfer))
        .route("/assign", post(assign))
        .route(
            "/operatories/:operatory_id/supplies/:supply_id",
            delete(unassign).put(set_assignment_quantity),
        )
        .route(
            "/locations/:location_id/supplies/:supply_id",
            delete(remove_from_location),
        )
        .route("/thresholds", put(set_threshold))
        .route("/usage-log", get(usage_log))
}

pub async fn check_in(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::CheckInRequest>,
) -> axum::response::Response {
    let (destination, items) = match body.into_items() {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services.engine().check_in(&ctx, destination, items),
    )
}

pub async fn consume(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::ConsumeRequest>,
) -> axum::response::Response {
    let items = match body.items() {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services
            .engine()
            .consume(&ctx, body.operatory_id, &items, body.procedure_id),
    )
}

pub async fn transfer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::TransferRequest>,
) -> axum::response::Response {
    let quantity = match dto::non_negative("quantity", body.quantity) {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services.engine().transfer(
            &ctx,
            body.supply_id,
            body.source_location_id,
            body.destination_location_id,
            quantity,
        ),
    )
}

pub async fn assign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::AssignRequest>,
) -> axum::response::Response {
    let items = match body.items() {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services.engine().assign(&ctx, &items, &body.operatory_ids),
    )
}

pub async fn unassign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((operatory_id, supply_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (operatory_id, supply_id) = match parse_pair::<OperatoryId>(&operatory_id, "operatory", &supply_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let result = services
        .engine()
        .unassign(&ctx, supply_id, operatory_id)
        .map(|returned| serde_json::json!({ "returned_to_unassigned": returned }));
    dto::respond(StatusCode::OK, result)
}

pub async fn set_assignment_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((operatory_id, supply_id)): Path<(String, String)>,
    Json(body): Json<dto::QuantityRequest>,
) -> axum::response::Response {
    let (operatory_id, supply_id) = match parse_pair::<OperatoryId>(&operatory_id, "operatory", &supply_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let quantity = match dto::non_negative("quantity", body.quantity) {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services
            .engine()
            .set_assignment_quantity(&ctx, supply_id, operatory_id, quantity),
    )
}

pub async fn remove_from_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path((location_id, supply_id)): Path<(String, String)>,
) -> axum::response::Response {
    let (location_id, supply_id) = match parse_pair::<LocationId>(&location_id, "location", &supply_id) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let result = services
        .engine()
        .remove_from_location(&ctx, supply_id, location_id)
        .map(|removed| dto::RemovedResponse { removed });
    dto::respond(StatusCode::OK, result)
}

pub async fn set_threshold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::ThresholdRequest>,
) -> axum::response::Response {
    let value = match dto::non_negative("value", body.value) {
        Ok(v) => v,
        Err(res) => return res,
    };
    let result = services
        .engine()
        .set_threshold(&ctx, body.target, value)
        .map(|()| serde_json::json!({ "target": body.target, "value": value }));
    dto::respond(StatusCode::OK, result)
}

/// The caller's own usage entries, optionally for one operatory.
pub async fn usage_log(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Query(query): Query<dto::UsageLogQuery>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::OK,
        services.usage_log(ctx.user_id(), query.operatory_id),
    )
}

fn parse_pair<P>(
    pool_id: &str,
    what: &str,
    supply_id: &str,
) -> Result<(P, SupplyId), axum::response::Response>
where
    P: std::str::FromStr,
{
    Ok((
        dto::parse_id(pool_id, what)?,
        dto::parse_id(supply_id, "supply")?,
    ))
}
