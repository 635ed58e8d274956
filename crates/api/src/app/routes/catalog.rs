use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    routing::{delete, get, post, put},
};

use dentstock_catalog::SupplierDraft;
use dentstock_core::{LocationId, OperatoryId, ProcedureId, SessionContext, SupplyId};

use crate::app::dto;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/supplies", post(create_supply))
        .route("/supplies/:supply_id", get(get_supply).delete(delete_supply))
        .route("/categories", post(create_category))
        .route("/suppliers", post(create_supplier))
        .route("/locations", post(create_location))
        .route("/locations/:location_id", delete(delete_location))
        .route("/operatories", post(create_operatory))
        .route("/operatories/:operatory_id", delete(delete_operatory))
        .route("/operatories/:operatory_id/supplies", get(operatory_assignments))
        .route(
            "/operatories/:operatory_id/suggestions/:procedure_id",
            get(suggestions),
        )
        .route("/procedures", post(create_procedure))
        .route(
            "/procedures/:procedure_id/supplies/:supply_id",
            put(set_procedure_supply),
        )
}

pub async fn create_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Json(body): Json<dto::SupplyDraftRequest>,
) -> axum::response::Response {
    let draft = match body.into_draft() {
        Ok(d) => d,
        Err(res) => return res,
    };
    dto::respond(StatusCode::CREATED, services.engine().create_supply(&ctx, draft))
}

/// Supply metadata with its pool totals.
pub async fn get_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supply_id: SupplyId = match dto::parse_id(&id, "supply") {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(StatusCode::OK, services.engine().supply_view(supply_id))
}

pub async fn delete_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let supply_id: SupplyId = match dto::parse_id(&id, "supply") {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(StatusCode::OK, services.engine().delete_supply(&ctx, supply_id))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::NameRequest>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::CREATED,
        services.engine().catalog().create_category(&body.name),
    )
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<SupplierDraft>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::CREATED,
        services.engine().catalog().create_supplier(body),
    )
}

pub async fn create_location(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::NameRequest>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::CREATED,
        services.engine().catalog().create_location(&body.name),
    )
}

pub async fn delete_location(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let location_id: LocationId = match dto::parse_id(&id, "location") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let result = services
        .engine()
        .delete_location(&ctx, location_id)
        .map(|()| dto::RemovedResponse { removed: true });
    dto::respond(StatusCode::OK, result)
}

pub async fn create_operatory(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::NameRequest>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::CREATED,
        services.engine().catalog().create_operatory(&body.name),
    )
}

pub async fn delete_operatory(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<SessionContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let operatory_id: OperatoryId = match dto::parse_id(&id, "operatory") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let result = services
        .engine()
        .delete_operatory(&ctx, operatory_id)
        .map(|()| dto::RemovedResponse { removed: true });
    dto::respond(StatusCode::OK, result)
}

pub async fn operatory_assignments(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let operatory_id: OperatoryId = match dto::parse_id(&id, "operatory") {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services.engine().operatory_assignments(operatory_id),
    )
}

pub async fn suggestions(
    Extension(services): Extension<Arc<AppServices>>,
    Path((operatory_id, procedure_id)): Path<(String, String)>,
) -> axum::response::Response {
    let operatory_id: OperatoryId = match dto::parse_id(&operatory_id, "operatory") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let procedure_id: ProcedureId = match dto::parse_id(&procedure_id, "procedure") {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services
            .engine()
            .suggested_quantities(operatory_id, procedure_id),
    )
}

pub async fn create_procedure(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::NameRequest>,
) -> axum::response::Response {
    dto::respond(
        StatusCode::CREATED,
        services.engine().catalog().create_procedure(&body.name),
    )
}

pub async fn set_procedure_supply(
    Extension(services): Extension<Arc<AppServices>>,
    Path((procedure_id, supply_id)): Path<(String, String)>,
    Json(body): Json<dto::ProcedureSupplyRequest>,
) -> axum::response::Response {
    let procedure_id: ProcedureId = match dto::parse_id(&procedure_id, "procedure") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let supply_id: SupplyId = match dto::parse_id(&supply_id, "supply") {
        Ok(v) => v,
        Err(res) => return res,
    };
    let default_quantity = match dto::non_negative("default_quantity", body.default_quantity) {
        Ok(v) => v,
        Err(res) => return res,
    };
    dto::respond(
        StatusCode::OK,
        services
            .engine()
            .catalog()
            .set_procedure_supply(procedure_id, supply_id, default_quantity),
    )
}
