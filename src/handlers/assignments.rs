//! Raw assignment rows
//!
//! The list endpoint carries the ledger revision so clients can tell whether
//! two reads saw the same state.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::ledger::{Assignment, GuestId, Seating, ServiceId, TableId};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentView {
    /// One entry per assignment row
    Rows,
    /// Rows grouped by table and slot
    #[default]
    Slots,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub view: AssignmentView,
    pub day: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatHolder {
    pub guest_id: GuestId,
    pub seats: i32,
    pub party_size_override: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSeating {
    pub day: String,
    pub service_id: ServiceId,
    pub table_id: TableId,
    pub occupancy: i32,
    pub guests: Vec<SeatHolder>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum AssignmentListing {
    Rows { rows: Vec<Assignment> },
    Slots { tables: Vec<TableSeating> },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionedAssignments {
    pub revision: u64,
    #[serde(flatten)]
    pub listing: AssignmentListing,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub guest_id: GuestId,
    pub table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
    #[serde(default = "default_seats")]
    pub seats: i32,
    pub party_size_override: Option<i32>,
}

fn default_seats() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnassignQuery {
    pub guest_id: GuestId,
    pub table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
}

#[derive(Debug, Serialize)]
pub struct UnassignResponse {
    pub removed: bool,
}

fn group_by_table(rows: Vec<Assignment>) -> Vec<TableSeating> {
    let mut tables: BTreeMap<(String, ServiceId, TableId), Vec<SeatHolder>> = BTreeMap::new();
    for row in rows {
        tables
            .entry((row.day, row.service_id, row.table_id))
            .or_default()
            .push(SeatHolder {
                guest_id: row.guest_id,
                seats: row.seats,
                party_size_override: row.party_size_override,
            });
    }
    tables
        .into_iter()
        .map(|((day, service_id, table_id), guests)| TableSeating {
            day,
            service_id,
            table_id,
            occupancy: guests.iter().map(|g| g.seats).sum(),
            guests,
        })
        .collect()
}

/// GET /api/assignments?view=rows|slots&day=
pub async fn list_assignments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<ApiResponse<VersionedAssignments>> {
    let (revision, mut rows) = state.ledger.read_versioned(|s| s.assignments()).await;
    if let Some(day) = &query.day {
        rows.retain(|row| &row.day == day);
    }

    let listing = match query.view {
        AssignmentView::Rows => AssignmentListing::Rows { rows },
        AssignmentView::Slots => AssignmentListing::Slots {
            tables: group_by_table(rows),
        },
    };
    Json(ApiResponse::success(VersionedAssignments { revision, listing }))
}

/// POST /api/assignments
///
/// Upserts one row. Other tables the guest holds in the slot are kept and
/// capacity is not checked.
pub async fn assign(
    State(state): State<AppState>,
    Json(req): Json<AssignRequest>,
) -> AppResult<Json<ApiResponse<Assignment>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    let seating = Seating {
        seats: req.seats,
        party_size_override: req.party_size_override,
    };
    let row = state
        .ledger
        .assign(req.guest_id, &slot.table(req.table_id), seating)
        .await?;
    Ok(Json(ApiResponse::success(row)))
}

/// DELETE /api/assignments?guestId=&tableId=&day=&serviceId=
pub async fn unassign(
    State(state): State<AppState>,
    Query(query): Query<UnassignQuery>,
) -> AppResult<Json<ApiResponse<UnassignResponse>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let removed = state
        .ledger
        .unassign(query.guest_id, &slot.table(query.table_id))
        .await?;
    Ok(Json(ApiResponse::success(UnassignResponse { removed })))
}
