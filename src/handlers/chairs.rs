//! Chair borrowing between tables
//!
//! Adjustments live in the ledger process only and are lost on restart.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::SlotQuery;
use crate::error::AppResult;
use crate::ledger::{ChairMove, ServiceId, TableId};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub day: String,
    pub service_id: ServiceId,
    pub target_table_id: TableId,
    pub sources: Vec<ChairMove>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairAdjustments {
    pub day: String,
    pub service_id: ServiceId,
    pub adjustments: BTreeMap<TableId, i32>,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub cleared: usize,
}

/// GET /api/chairs?day=&serviceId=
pub async fn list_adjustments(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<ChairAdjustments>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let adjustments = state.ledger.read(|s| s.chair_adjustments(&slot)).await;
    Ok(Json(ApiResponse::success(ChairAdjustments {
        day: slot.day,
        service_id: slot.service_id,
        adjustments,
    })))
}

/// POST /api/chairs
pub async fn borrow(
    State(state): State<AppState>,
    Json(req): Json<BorrowRequest>,
) -> AppResult<Json<ApiResponse<ChairAdjustments>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    let adjustments = state
        .ledger
        .borrow_chairs(&slot, req.target_table_id, &req.sources)
        .await?;
    tracing::debug!(
        "Borrowed chairs for table {} from {} tables",
        req.target_table_id,
        req.sources.len()
    );
    Ok(Json(ApiResponse::success(ChairAdjustments {
        day: slot.day,
        service_id: slot.service_id,
        adjustments,
    })))
}

/// DELETE /api/chairs?day=&serviceId=
pub async fn reset(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<ResetResponse>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let cleared = state.ledger.reset_chairs(&slot).await;
    Ok(Json(ApiResponse::success(ResetResponse { cleared })))
}
