use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use dentstock_catalog::{SupplyDraft, Unit};
use dentstock_core::{
    CategoryId, LocationId, OperatoryId, ProcedureId, StockResult, SupplierId, SupplyId,
};
use dentstock_movement::{AssignItem, CheckInDestination, CheckInItem, ConsumeItem, ThresholdTarget};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------
//
// Quantities arrive as signed integers so a negative value is reported as a
// validation error instead of a generic body rejection.

#[derive(Debug, Deserialize)]
pub struct SupplyDraftRequest {
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    pub cost_per_unit: Option<i64>,
    pub barcode: Option<String>,
    pub category_id: Option<CategoryId>,
    pub supplier_id: Option<SupplierId>,
    pub low_stock_threshold: Option<i64>,
}

impl SupplyDraftRequest {
    pub fn into_draft(self) -> Result<SupplyDraft, Response> {
        Ok(SupplyDraft {
            name: self.name,
            unit: self.unit,
            cost_per_unit: self
                .cost_per_unit
                .map(|c| non_negative("cost_per_unit", c))
                .transpose()?,
            barcode: self.barcode,
            category_id: self.category_id,
            supplier_id: self.supplier_id,
            low_stock_threshold: self
                .low_stock_threshold
                .map(|t| non_negative("low_stock_threshold", t))
                .transpose()?,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckInRequest {
    pub destination: CheckInDestination,
    pub items: Vec<CheckInItemRequest>,
}

/// Either `supply_id` of an existing supply, or `is_new` with a `supply` draft.
#[derive(Debug, Deserialize)]
pub struct CheckInItemRequest {
    #[serde(default)]
    pub is_new: bool,
    pub supply_id: Option<SupplyId>,
    pub supply: Option<SupplyDraftRequest>,
    pub quantity: i64,
}

impl CheckInRequest {
    pub fn into_items(self) -> Result<(CheckInDestination, Vec<CheckInItem>), Response> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in self.items {
            let quantity = non_negative("quantity", item.quantity)?;
            let parsed = match (item.is_new, item.supply_id, item.supply) {
                (true, _, Some(draft)) => CheckInItem::new_supply(draft.into_draft()?, quantity),
                (false, Some(supply_id), _) => CheckInItem::existing(supply_id, quantity),
                (true, _, None) => return Err(validation("new items need a supply draft")),
                (false, None, _) => return Err(validation("existing items need a supply_id")),
            };
            items.push(parsed);
        }
        Ok((self.destination, items))
    }
}

#[derive(Debug, Deserialize)]
pub struct QuantityLine {
    pub supply_id: SupplyId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ConsumeRequest {
    pub operatory_id: OperatoryId,
    pub items: Vec<QuantityLine>,
    pub procedure_id: Option<ProcedureId>,
}

impl ConsumeRequest {
    pub fn items(&self) -> Result<Vec<ConsumeItem>, Response> {
        self.items
            .iter()
            .map(|line| -> Result<ConsumeItem, Response> {
                Ok(ConsumeItem::new(line.supply_id, non_negative("quantity", line.quantity)?))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct TransferRequest {
    pub supply_id: SupplyId,
    pub source_location_id: LocationId,
    pub destination_location_id: LocationId,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub items: Vec<QuantityLine>,
    pub operatory_ids: Vec<OperatoryId>,
}

impl AssignRequest {
    pub fn items(&self) -> Result<Vec<AssignItem>, Response> {
        self.items
            .iter()
            .map(|line| -> Result<AssignItem, Response> {
                Ok(AssignItem::new(line.supply_id, non_negative("quantity", line.quantity)?))
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ThresholdRequest {
    pub target: ThresholdTarget,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
pub struct AssignBarcodeRequest {
    pub supply_id: SupplyId,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct ProcedureSupplyRequest {
    pub default_quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct UsageLogQuery {
    pub operatory_id: Option<OperatoryId>,
}

#[derive(Debug, Serialize)]
pub struct RemovedResponse {
    pub removed: bool,
}

// -------------------------
// Helpers
// -------------------------

pub fn non_negative(field: &str, value: i64) -> Result<u64, Response> {
    u64::try_from(value).map_err(|_| validation(format!("{field} must not be negative")))
}

pub fn parse_id<T>(raw: &str, what: &str) -> Result<T, Response>
where
    T: std::str::FromStr,
{
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}

pub fn validation(message: impl Into<String>) -> Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// `status` + JSON body on success, the mapped error otherwise.
pub fn respond<T>(status: StatusCode, result: StockResult<T>) -> Response
where
    T: Serialize,
{
    match result {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => errors::stock_error_to_response(err),
    }
}
