//! Arrival, departure, table block and member arrival handlers
//!
//! Setters accept an explicit flag; leaving it out toggles the current state.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    response::Json,
};
use sea_orm::{sea_query::OnConflict, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use crate::entity::member_arrival;
use crate::error::AppResult;
use crate::ledger::{GuestId, GuestSlot, ServiceId, TableId, TableSlot};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DayFilter {
    pub day: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalRequest {
    pub guest_id: GuestId,
    pub day: String,
    pub arrived: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalState {
    pub guest_id: GuestId,
    pub day: String,
    pub arrived: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureRequest {
    pub guest_id: GuestId,
    pub day: String,
    pub service_id: ServiceId,
    pub departed: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartureState {
    #[serde(flatten)]
    pub key: GuestSlot,
    pub departed: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRequest {
    pub table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
    pub blocked: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockState {
    #[serde(flatten)]
    pub key: TableSlot,
    pub blocked: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberArrivalRequest {
    pub member_id: GuestId,
    pub day: String,
    pub arrived: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberArrivalState {
    pub member_id: GuestId,
    pub day: String,
    pub arrived: bool,
}

/// GET /api/arrivals?day=
///
/// Arrived guest ids keyed by day.
pub async fn list_arrivals(
    State(state): State<AppState>,
    Query(filter): Query<DayFilter>,
) -> Json<ApiResponse<BTreeMap<String, Vec<GuestId>>>> {
    let mut arrivals = state.ledger.read(|s| s.arrivals_by_day()).await;
    if let Some(day) = filter.day {
        arrivals.retain(|d, _| *d == day);
    }
    Json(ApiResponse::success(arrivals))
}

/// POST /api/arrivals
pub async fn set_arrival(
    State(state): State<AppState>,
    Json(req): Json<ArrivalRequest>,
) -> AppResult<Json<ApiResponse<ArrivalState>>> {
    state.require_day(&req.day)?;
    let arrived = match req.arrived {
        Some(arrived) => state.ledger.set_arrival(req.guest_id, &req.day, arrived).await?,
        None => state.ledger.toggle_arrival(req.guest_id, &req.day).await?,
    };
    Ok(Json(ApiResponse::success(ArrivalState {
        guest_id: req.guest_id,
        day: req.day,
        arrived,
    })))
}

/// GET /api/departures?day=
pub async fn list_departures(
    State(state): State<AppState>,
    Query(filter): Query<DayFilter>,
) -> Json<ApiResponse<Vec<GuestSlot>>> {
    let departures = state
        .ledger
        .read(|s| s.departures(filter.day.as_deref()))
        .await;
    Json(ApiResponse::success(departures))
}

/// POST /api/departures
pub async fn set_departure(
    State(state): State<AppState>,
    Json(req): Json<DepartureRequest>,
) -> AppResult<Json<ApiResponse<DepartureState>>> {
    let key = state.slot(&req.day, req.service_id)?.guest(req.guest_id);
    let departed = match req.departed {
        Some(departed) => state.ledger.set_departure(key.clone(), departed).await?,
        None => state.ledger.toggle_departure(key.clone()).await?,
    };
    Ok(Json(ApiResponse::success(DepartureState { key, departed })))
}

/// DELETE /api/departures?guestId=&day=&serviceId=
pub async fn clear_departure(
    State(state): State<AppState>,
    Query(query): Query<GuestSlot>,
) -> AppResult<Json<ApiResponse<DepartureState>>> {
    let key = state.slot(&query.day, query.service_id)?.guest(query.guest_id);
    state.ledger.set_departure(key.clone(), false).await?;
    Ok(Json(ApiResponse::success(DepartureState {
        key,
        departed: false,
    })))
}

/// GET /api/blocked-tables
pub async fn list_blocked_tables(State(state): State<AppState>) -> Json<ApiResponse<Vec<TableSlot>>> {
    let blocked = state.ledger.read(|s| s.blocked_tables()).await;
    Json(ApiResponse::success(blocked))
}

/// POST /api/blocked-tables
pub async fn set_block(
    State(state): State<AppState>,
    Json(req): Json<BlockRequest>,
) -> AppResult<Json<ApiResponse<BlockState>>> {
    let key = state.slot(&req.day, req.service_id)?.table(req.table_id);
    let blocked = match req.blocked {
        Some(blocked) => state.ledger.set_block(key.clone(), blocked).await?,
        None => state.ledger.toggle_block(key.clone()).await?,
    };
    if blocked {
        tracing::info!(
            "Table {} blocked for {} service {}",
            key.table_id,
            key.day,
            key.service_id
        );
    }
    Ok(Json(ApiResponse::success(BlockState { key, blocked })))
}

/// GET /api/member-arrivals
///
/// Member id to arrival flag, keyed by day.
pub async fn list_member_arrivals(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<BTreeMap<String, BTreeMap<GuestId, bool>>>>> {
    let rows = member_arrival::Entity::find()
        .order_by_asc(member_arrival::Column::Id)
        .all(&state.db)
        .await?;

    let mut by_day: BTreeMap<String, BTreeMap<GuestId, bool>> = BTreeMap::new();
    for row in rows {
        by_day
            .entry(row.day)
            .or_default()
            .insert(row.member_id, row.arrived);
    }
    Ok(Json(ApiResponse::success(by_day)))
}

/// POST /api/member-arrivals
pub async fn set_member_arrival(
    State(state): State<AppState>,
    Json(req): Json<MemberArrivalRequest>,
) -> AppResult<Json<ApiResponse<MemberArrivalState>>> {
    state.require_day(&req.day)?;

    let row = member_arrival::ActiveModel {
        member_id: Set(req.member_id),
        day: Set(req.day.clone()),
        arrived: Set(req.arrived),
        ..Default::default()
    };
    member_arrival::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([member_arrival::Column::MemberId, member_arrival::Column::Day])
                .update_column(member_arrival::Column::Arrived)
                .to_owned(),
        )
        .exec_without_returning(&state.db)
        .await?;

    Ok(Json(ApiResponse::success(MemberArrivalState {
        member_id: req.member_id,
        day: req.day,
        arrived: req.arrived,
    })))
}
