//! Group-aware seating operations and derived seating views

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::{Deserialize, Serialize};

use super::SlotQuery;
use crate::error::{AppResult, OptionExt};
use crate::ledger::{
    AssignScope, Fit, GroupAssignmentStatus, GroupId, GroupProgress, GuestId, Placement,
    ServiceId, Slot, SlotSummary, Snapshot, SplitCandidate, TableCluster, TableId, TableStatus,
};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub guest_id: GuestId,
    pub table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
    #[serde(default)]
    pub scope: AssignScope,
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupChoice {
    pub id: GroupId,
    pub label: String,
}

/// A question the client has to answer before seating can go ahead
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    #[serde(rename_all = "camelCase")]
    ChooseLedGroup {
        guest_id: GuestId,
        groups: Vec<GroupChoice>,
    },
    #[serde(rename_all = "camelCase")]
    ChooseMemberOrGroup {
        guest_id: GuestId,
        group_id: GroupId,
        group_label: String,
        lead_guest_id: GuestId,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResponse {
    pub placed: bool,
    pub guest_ids: Vec<GuestId>,
    pub group_id: Option<GroupId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
}

impl PlacementResponse {
    fn from_placement(snapshot: &Snapshot, placement: Placement) -> Self {
        let decision = match placement {
            Placement::Planned {
                guest_ids,
                group_id,
                ..
            } => {
                return Self {
                    placed: true,
                    guest_ids,
                    group_id,
                    decision: None,
                }
            }
            Placement::ChooseLedGroup { guest_id, groups } => Decision::ChooseLedGroup {
                guest_id,
                groups: groups
                    .into_iter()
                    .filter_map(|id| snapshot.group(id))
                    .map(|g| GroupChoice {
                        id: g.id,
                        label: snapshot.group_label(g),
                    })
                    .collect(),
            },
            Placement::ChooseMemberOrGroup {
                guest_id,
                group_id,
                lead_guest_id,
            } => Decision::ChooseMemberOrGroup {
                guest_id,
                group_id,
                group_label: snapshot
                    .group(group_id)
                    .map(|g| snapshot.group_label(g))
                    .unwrap_or_default(),
                lead_guest_id,
            },
        };
        Self {
            placed: false,
            guest_ids: Vec::new(),
            group_id: None,
            decision: Some(decision),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub guest_id: GuestId,
    pub from_table_id: TableId,
    pub to_table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveManyRequest {
    pub guest_ids: Vec<GuestId>,
    pub from_table_id: TableId,
    pub to_table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovedGuests {
    pub table_id: TableId,
    pub moved: Vec<GuestId>,
    pub occupancy: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveGroupRequest {
    pub lead_guest_id: GuestId,
    pub group_id: GroupId,
    pub to_table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub table_id: TableId,
    pub seats: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitRequest {
    pub guest_id: GuestId,
    pub day: String,
    pub service_id: ServiceId,
    pub allocations: Vec<Allocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitByMemberRequest {
    pub group_id: GroupId,
    pub day: String,
    pub service_id: ServiceId,
    /// Guest id to table id; every person in the group must be present
    pub member_tables: BTreeMap<GuestId, Option<TableId>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSlotQuery {
    pub guest_id: GuestId,
    pub day: String,
    pub service_id: ServiceId,
    pub table_id: Option<TableId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FitReport {
    pub guest_id: GuestId,
    pub group_size: usize,
    pub largest_available_capacity: i32,
    pub needs_split: bool,
    pub can_fit_in_single_table: bool,
    /// Present when a table was named
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fit: Option<Fit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStatusResponse {
    pub group_id: GroupId,
    pub label: String,
    pub status: GroupAssignmentStatus,
    pub progress: GroupProgress,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAllocations {
    pub guest_id: GuestId,
    pub allocations: Vec<Allocation>,
}

async fn allocations_of(state: &AppState, guest_id: GuestId, slot: &Slot) -> GuestAllocations {
    let allocations = state
        .ledger
        .read(|s| {
            s.guest_seatings(guest_id, slot)
                .into_iter()
                .map(|(table_id, seating)| Allocation {
                    table_id,
                    seats: seating.seats,
                })
                .collect()
        })
        .await;
    GuestAllocations {
        guest_id,
        allocations,
    }
}

async fn group_status(state: &AppState, group_id: GroupId, slot: &Slot) -> AppResult<GroupStatusResponse> {
    state
        .ledger
        .read(|s| {
            s.group(group_id).map(|g| GroupStatusResponse {
                group_id,
                label: s.group_label(g),
                status: s.group_assignment_status(group_id, slot),
                progress: s.group_progress(group_id, slot),
            })
        })
        .await
        .ok_or_not_found(format!("Group {}", group_id))
}

/// POST /api/seating/assign
///
/// Seats a guest, bringing their group along when that is unambiguous. When it
/// is not, nothing is written and the response carries the question to ask.
pub async fn place(
    State(state): State<AppState>,
    Json(req): Json<PlaceRequest>,
) -> AppResult<Json<ApiResponse<PlacementResponse>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    let placement = state
        .ledger
        .place(req.guest_id, &slot.table(req.table_id), req.scope, req.group_id)
        .await?;
    let response = state
        .ledger
        .read(|s| PlacementResponse::from_placement(s, placement))
        .await;
    Ok(Json(ApiResponse::success(response)))
}

/// POST /api/seating/move
pub async fn move_guest(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> AppResult<Json<ApiResponse<GuestAllocations>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    state
        .ledger
        .move_guest(req.guest_id, req.from_table_id, req.to_table_id, &slot)
        .await?;
    Ok(Json(ApiResponse::success(
        allocations_of(&state, req.guest_id, &slot).await,
    )))
}

/// POST /api/seating/move-many
///
/// Moves every listed guest from one table to another, all or nothing.
pub async fn move_many(
    State(state): State<AppState>,
    Json(req): Json<MoveManyRequest>,
) -> AppResult<Json<ApiResponse<MovedGuests>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    state
        .ledger
        .move_many(&req.guest_ids, req.from_table_id, req.to_table_id, &slot)
        .await?;
    let key = slot.table(req.to_table_id);
    let occupancy = state.ledger.read(|s| s.occupancy(&key)).await;
    Ok(Json(ApiResponse::success(MovedGuests {
        table_id: req.to_table_id,
        moved: req.guest_ids,
        occupancy,
    })))
}

/// POST /api/seating/move-group
pub async fn move_group(
    State(state): State<AppState>,
    Json(req): Json<MoveGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupStatusResponse>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    state
        .ledger
        .move_group(req.lead_guest_id, req.group_id, req.to_table_id, &slot)
        .await?;
    Ok(Json(ApiResponse::success(
        group_status(&state, req.group_id, &slot).await?,
    )))
}

/// POST /api/seating/split
pub async fn split(
    State(state): State<AppState>,
    Json(req): Json<SplitRequest>,
) -> AppResult<Json<ApiResponse<GuestAllocations>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    let allocations: Vec<(TableId, i32)> = req
        .allocations
        .iter()
        .map(|a| (a.table_id, a.seats))
        .collect();
    state.ledger.split(req.guest_id, &slot, &allocations).await?;
    Ok(Json(ApiResponse::success(
        allocations_of(&state, req.guest_id, &slot).await,
    )))
}

/// POST /api/seating/split-by-member
pub async fn split_by_member(
    State(state): State<AppState>,
    Json(req): Json<SplitByMemberRequest>,
) -> AppResult<Json<ApiResponse<GroupStatusResponse>>> {
    let slot = state.slot(&req.day, req.service_id)?;
    state
        .ledger
        .split_by_member(req.group_id, &slot, &req.member_tables)
        .await?;
    Ok(Json(ApiResponse::success(
        group_status(&state, req.group_id, &slot).await?,
    )))
}

/// GET /api/seating/fit?guestId=&day=&serviceId=&tableId=
pub async fn fit(
    State(state): State<AppState>,
    Query(query): Query<GuestSlotQuery>,
) -> AppResult<Json<ApiResponse<FitReport>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let report = state
        .ledger
        .read(|s| {
            s.guest(query.guest_id).map(|_| FitReport {
                guest_id: query.guest_id,
                group_size: s.guest_group_size(query.guest_id),
                largest_available_capacity: s.largest_available_capacity(&slot),
                needs_split: s.needs_split(query.guest_id, &slot),
                can_fit_in_single_table: s.can_fit_in_single_table(query.guest_id, &slot),
                fit: query.table_id.map(|t| s.fit_at(query.guest_id, t, &slot)),
            })
        })
        .await
        .ok_or_not_found(format!("Guest {}", query.guest_id))?;
    Ok(Json(ApiResponse::success(report)))
}

/// GET /api/seating/split-candidates?guestId=&day=&serviceId=
pub async fn split_candidates(
    State(state): State<AppState>,
    Query(query): Query<GuestSlotQuery>,
) -> AppResult<Json<ApiResponse<Vec<SplitCandidate>>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let candidates = state
        .ledger
        .read(|s| s.split_candidates(query.guest_id, &slot))
        .await;
    Ok(Json(ApiResponse::success(candidates)))
}

/// GET /api/seating/tables?day=&serviceId=
pub async fn table_statuses(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<Vec<TableStatus>>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let statuses = state.ledger.read(|s| s.table_statuses(&slot)).await;
    Ok(Json(ApiResponse::success(statuses)))
}

/// GET /api/seating/tables/:id/guests?day=&serviceId=
pub async fn table_guests(
    State(state): State<AppState>,
    Path(table_id): Path<TableId>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<Vec<TableCluster>>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let clusters = state
        .ledger
        .read(|s| s.table(table_id).map(|_| s.table_clusters(table_id, &slot)))
        .await
        .ok_or_not_found(format!("Table {}", table_id))?;
    Ok(Json(ApiResponse::success(clusters)))
}

/// GET /api/seating/groups/:id/status?day=&serviceId=
pub async fn group_assignment_status(
    State(state): State<AppState>,
    Path(group_id): Path<GroupId>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<GroupStatusResponse>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    Ok(Json(ApiResponse::success(
        group_status(&state, group_id, &slot).await?,
    )))
}

/// GET /api/seating/summary?day=&serviceId=
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SlotQuery>,
) -> AppResult<Json<ApiResponse<SlotSummary>>> {
    let slot = state.slot(&query.day, query.service_id)?;
    let summary = state.ledger.read(|s| s.slot_summary(&slot)).await;
    Ok(Json(ApiResponse::success(summary)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::testing::call;
    use crate::ledger::snapshot::fixtures::*;
    use crate::ledger::Slot;
    use crate::routes::create_router;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn test_member_placement_asks_first() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (state, store) = state_with(snapshot);

        let (status, body) = call(
            create_router(state),
            "POST",
            "/api/seating/assign",
            Some(json!({"guestId": 2, "tableId": 1, "day": "mon", "serviceId": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["placed"], false);
        assert_eq!(body["data"]["decision"]["kind"], "choose_member_or_group");
        assert_eq!(body["data"]["decision"]["leadGuestId"], 1);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_lead_placement_cascades() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (state, _) = state_with(snapshot);

        let (_, body) = call(
            create_router(state.clone()),
            "POST",
            "/api/seating/assign",
            Some(json!({"guestId": 1, "tableId": 1, "day": "mon", "serviceId": 1})),
        )
        .await;
        assert_eq!(body["data"]["placed"], true);
        assert_eq!(body["data"]["guestIds"], json!([1, 2, 3]));
        let key = Slot::new("mon", 1).table(1);
        assert!(state.ledger.read(|s| s.occupancy(&key) == 3).await);
    }

    #[tokio::test]
    async fn test_move_group_scenario() {
        let mut snapshot = venue(&[6, 6], 3);
        let slot = Slot::new("tue", 2);
        group(&mut snapshot, 1, 1, &[2, 3]);
        for guest_id in 1..=3 {
            seat(&mut snapshot, guest_id, &slot.table(1), 1);
        }
        let (state, _) = state_with(snapshot);

        let (status, body) = call(
            create_router(state.clone()),
            "POST",
            "/api/seating/move-group",
            Some(json!({"leadGuestId": 1, "groupId": 1, "toTableId": 2, "day": "tue", "serviceId": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"]["isComplete"], true);
        assert_eq!(body["data"]["status"]["tableIds"], json!([2]));
        assert!(state.ledger.read(|s| s.occupancy(&slot.table(1)) == 0).await);
    }

    #[tokio::test]
    async fn test_move_many_moves_selection_only() {
        let mut snapshot = venue(&[6, 6], 3);
        let slot = Slot::new("mon", 2);
        for guest_id in 1..=3 {
            seat(&mut snapshot, guest_id, &slot.table(1), 1);
        }
        let (state, store) = state_with(snapshot);

        let (status, body) = call(
            create_router(state.clone()),
            "POST",
            "/api/seating/move-many",
            Some(json!({"guestIds": [1, 2], "fromTableId": 1, "toTableId": 2, "day": "mon", "serviceId": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["occupancy"], 2);
        assert_eq!(store.commit_count(), 1);
        assert!(state.ledger.read(|s| s.occupancy(&slot.table(1)) == 1).await);

        let (status, _) = call(
            create_router(state),
            "POST",
            "/api/seating/move-many",
            Some(json!({"guestIds": [3, 42], "fromTableId": 1, "toTableId": 2, "day": "mon", "serviceId": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(store.commit_count(), 1);
    }

    #[tokio::test]
    async fn test_split_sum_mismatch_is_rejected() {
        let mut snapshot = venue(&[4, 4], 5);
        group(&mut snapshot, 1, 1, &[2, 3, 4, 5]);
        let (state, store) = state_with(snapshot);

        let (status, _) = call(
            create_router(state),
            "POST",
            "/api/seating/split",
            Some(json!({
                "guestId": 1, "day": "mon", "serviceId": 1,
                "allocations": [{"tableId": 1, "seats": 4}, {"tableId": 2, "seats": 2}]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_fit_report_needs_split() {
        let mut snapshot = venue(&[4], 5);
        group(&mut snapshot, 1, 1, &[2, 3, 4, 5]);
        let (state, _) = state_with(snapshot);

        let (status, body) = call(
            create_router(state),
            "GET",
            "/api/seating/fit?guestId=1&day=mon&serviceId=1&tableId=1",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["needsSplit"], true);
        assert_eq!(body["data"]["canFitInSingleTable"], false);
        assert_eq!(body["data"]["fit"]["status"], "full");
        assert_eq!(body["data"]["fit"]["needed"], 5);
    }

    #[tokio::test]
    async fn test_split_by_member_and_status() {
        let mut snapshot = venue(&[4, 4], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (state, _) = state_with(snapshot);

        let (status, body) = call(
            create_router(state.clone()),
            "POST",
            "/api/seating/split-by-member",
            Some(json!({
                "groupId": 1, "day": "mon", "serviceId": 1,
                "memberTables": {"1": 1, "2": 1, "3": 2}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"]["isSplit"], true);

        let (_, body) = call(
            create_router(state),
            "GET",
            "/api/seating/tables/1/guests?day=mon&serviceId=1",
            None,
        )
        .await;
        assert_eq!(body["data"][0]["groupId"], 1);
        assert_eq!(body["data"][0]["guests"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_table_statuses_and_summary() {
        let mut snapshot = venue(&[2, 4], 3);
        let slot = Slot::new("fri", 3);
        seat(&mut snapshot, 1, &slot.table(1), 3);
        snapshot.insert_block(slot.table(2));
        let (state, _) = state_with(snapshot);

        let (_, body) = call(
            create_router(state.clone()),
            "GET",
            "/api/seating/tables?day=fri&serviceId=3",
            None,
        )
        .await;
        assert_eq!(body["data"][0]["isOverCapacity"], true);
        assert_eq!(body["data"][1]["isBlocked"], true);
        assert_eq!(body["data"][1]["availability"], "free");

        let (_, body) = call(
            create_router(state),
            "GET",
            "/api/seating/summary?day=fri&serviceId=3",
            None,
        )
        .await;
        assert_eq!(body["data"]["headcount"], 1);
        assert_eq!(body["data"]["unassignedGuestIds"], json!([2, 3]));
        assert_eq!(body["data"]["blockedTableIds"], json!([2]));
    }
}
