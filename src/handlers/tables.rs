//! Dining table handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use sea_orm::{ActiveModelTrait, Set};
use serde::Deserialize;

use super::IdQuery;
use crate::entity::dining_table::{self, DEFAULT_CAPACITY, DEFAULT_X, DEFAULT_Y};
use crate::error::{AppError, AppResult, OptionExt};
use crate::ledger::{DiningTable, Intent, TableId, UnitOfWork, MAX_SEATS};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTableRequest {
    pub name: String,
    pub capacity: Option<i32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTableRequest {
    pub id: TableId,
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub x: Option<i32>,
    pub y: Option<i32>,
}

/// GET /api/tables
pub async fn list_tables(State(state): State<AppState>) -> Json<ApiResponse<Vec<DiningTable>>> {
    let tables = state.ledger.read(|s| s.tables().cloned().collect()).await;
    Json(ApiResponse::success(tables))
}

/// POST /api/tables
pub async fn create_table(
    State(state): State<AppState>,
    Json(req): Json<CreateTableRequest>,
) -> AppResult<Json<ApiResponse<DiningTable>>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Table name is required".to_string()));
    }
    let capacity = req.capacity.unwrap_or(DEFAULT_CAPACITY);
    if !(1..=MAX_SEATS).contains(&capacity) {
        return Err(AppError::Validation(format!(
            "Capacity must be between 1 and {}",
            MAX_SEATS
        )));
    }

    let row = dining_table::ActiveModel {
        name: Set(name.to_string()),
        capacity: Set(capacity),
        x: Set(req.x.unwrap_or(DEFAULT_X)),
        y: Set(req.y.unwrap_or(DEFAULT_Y)),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let table: DiningTable = row.into();
    state
        .ledger
        .absorb(UnitOfWork::single(Intent::PutTable(table.clone())))
        .await;
    tracing::info!("Created table {} ({})", table.id, table.name);
    Ok(Json(ApiResponse::success(table)))
}

/// PUT /api/tables
///
/// Renames, resizes or repositions a table. Position-only updates are the
/// common case while the floor plan is being dragged around.
pub async fn update_table(
    State(state): State<AppState>,
    Json(req): Json<UpdateTableRequest>,
) -> AppResult<Json<ApiResponse<DiningTable>>> {
    let mut table = state
        .ledger
        .read(|s| s.table(req.id).cloned())
        .await
        .ok_or_not_found(format!("Table {}", req.id))?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Table name cannot be empty".to_string()));
        }
        table.name = name.trim().to_string();
    }
    if let Some(capacity) = req.capacity {
        table.capacity = capacity;
    }
    if let Some(x) = req.x {
        table.x = x;
    }
    if let Some(y) = req.y {
        table.y = y;
    }

    state.ledger.update_table(table.clone()).await?;
    Ok(Json(ApiResponse::success(table)))
}

/// DELETE /api/tables?id=
pub async fn delete_table(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.ledger.remove_table(query.id).await?;
    Ok(Json(ApiResponse::success_msg("Table deleted")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::testing::call;
    use crate::ledger::snapshot::fixtures::*;
    use crate::ledger::{Slot, TableSlot};
    use crate::routes::create_router;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn test_move_table_on_floor_plan() {
        let (state, _) = state_with(venue(&[6, 4], 0));
        let (status, body) = call(
            create_router(state),
            "PUT",
            "/api/tables",
            Some(json!({"id": 2, "x": 420, "y": 80})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["x"], 420);
        assert_eq!(body["data"]["capacity"], 4);
    }

    #[tokio::test]
    async fn test_zero_capacity_rejected() {
        let (state, store) = state_with(venue(&[6], 0));
        let (status, _) = call(
            create_router(state),
            "PUT",
            "/api/tables",
            Some(json!({"id": 1, "capacity": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_capacity_bound_on_create_and_update() {
        let (state, store) = state_with(venue(&[6], 0));
        let (status, _) = call(
            create_router(state.clone()),
            "POST",
            "/api/tables",
            Some(json!({"name": "Terrace", "capacity": 2147483647})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            create_router(state),
            "PUT",
            "/api/tables",
            Some(json!({"id": 1, "capacity": 2147483647})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_drops_blocks_and_assignments() {
        let mut snapshot = venue(&[6, 6], 1);
        let slot = Slot::new("wed", 1);
        seat(&mut snapshot, 1, &slot.table(2), 1);
        snapshot.insert_block(slot.table(2));
        let (state, _) = state_with(snapshot);

        let (status, _) = call(create_router(state.clone()), "DELETE", "/api/tables?id=2", None).await;
        assert_eq!(status, StatusCode::OK);
        let key: TableSlot = slot.table(2);
        assert!(state.ledger.read(|s| !s.is_blocked(&key) && !s.is_assigned(1, &slot)).await);
    }
}
