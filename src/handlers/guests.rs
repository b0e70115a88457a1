//! Guest handlers
//!
//! Creation goes straight to the database and is then absorbed by the ledger;
//! updates and deletes are ledger commands so the cascade stays atomic.

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};

use super::IdQuery;
use crate::entity::guest;
use crate::error::{AppError, AppResult, OptionExt};
use crate::ledger::{Guest, GuestId, Intent, UnitOfWork};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGuestRequest {
    pub name: String,
    pub notes: Option<String>,
    #[serde(default)]
    pub is_manually_added: bool,
    pub market: Option<String>,
    pub guest_type: Option<String>,
}

/// Partial update; absent fields keep their value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGuestRequest {
    pub id: GuestId,
    pub name: Option<String>,
    pub notes: Option<String>,
    pub is_ghost: Option<bool>,
    pub is_manually_added: Option<bool>,
    pub market: Option<String>,
    pub guest_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PurgeResponse {
    pub removed: usize,
}

/// GET /api/guests
pub async fn list_guests(State(state): State<AppState>) -> Json<ApiResponse<Vec<Guest>>> {
    let mut guests: Vec<Guest> = state.ledger.read(|s| s.guests().cloned().collect()).await;
    // Newest first
    guests.reverse();
    Json(ApiResponse::success(guests))
}

/// POST /api/guests
pub async fn create_guest(
    State(state): State<AppState>,
    Json(req): Json<CreateGuestRequest>,
) -> AppResult<Json<ApiResponse<Guest>>> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Guest name is required".to_string()));
    }

    let row = guest::ActiveModel {
        name: Set(name.to_string()),
        notes: Set(req.notes),
        is_ghost: Set(false),
        is_manually_added: Set(req.is_manually_added),
        market: Set(req.market),
        guest_type: Set(req.guest_type),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let guest: Guest = row.into();
    state
        .ledger
        .absorb(UnitOfWork::single(Intent::PutGuest(guest.clone())))
        .await;
    tracing::info!("Created guest {} ({})", guest.id, guest.name);
    Ok(Json(ApiResponse::success(guest)))
}

/// PUT /api/guests
pub async fn update_guest(
    State(state): State<AppState>,
    Json(req): Json<UpdateGuestRequest>,
) -> AppResult<Json<ApiResponse<Guest>>> {
    let mut guest = state
        .ledger
        .read(|s| s.guest(req.id).cloned())
        .await
        .ok_or_not_found(format!("Guest {}", req.id))?;

    if let Some(name) = req.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Guest name cannot be empty".to_string()));
        }
        guest.name = name.trim().to_string();
    }
    if req.notes.is_some() {
        guest.notes = req.notes;
    }
    if let Some(is_ghost) = req.is_ghost {
        guest.is_ghost = is_ghost;
    }
    if let Some(manual) = req.is_manually_added {
        guest.is_manually_added = manual;
    }
    if req.market.is_some() {
        guest.market = req.market;
    }
    if req.guest_type.is_some() {
        guest.guest_type = req.guest_type;
    }

    state.ledger.update_guest(guest.clone()).await?;
    Ok(Json(ApiResponse::success(guest)))
}

/// DELETE /api/guests?id=
pub async fn delete_guest(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.ledger.remove_guest(query.id).await?;
    Ok(Json(ApiResponse::success_msg("Guest deleted")))
}

/// DELETE /api/guests/all
pub async fn delete_all_guests(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<PurgeResponse>>> {
    let removed = state.ledger.purge_guests().await?;
    Ok(Json(ApiResponse::success(PurgeResponse { removed })))
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
    async fn test_list_newest_first() {
        let (state, _) = state_with(venue(&[6], 3));
        let (status, body) = call(create_router(state), "GET", "/api/guests", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["id"], 3);
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let (state, _) = state_with(venue(&[6], 2));
        let app = create_router(state.clone());
        let (status, body) = call(
            app,
            "PUT",
            "/api/guests",
            Some(json!({"id": 1, "isGhost": true, "market": "FR"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["isGhost"], true);
        assert_eq!(body["data"]["market"], "FR");

        let guest = state.ledger.read(|s| s.guest(1).cloned()).await.unwrap();
        assert!(guest.is_ghost);
        assert_eq!(guest.name, "Guest 1");
    }

    #[tokio::test]
    async fn test_update_unknown_guest_is_not_found() {
        let (state, _) = state_with(venue(&[6], 1));
        let (status, _) = call(
            create_router(state),
            "PUT",
            "/api/guests",
            Some(json!({"id": 99, "name": "Nobody"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let mut snapshot = venue(&[6], 3);
        let slot = Slot::new("mon", 1);
        group(&mut snapshot, 1, 1, &[2]);
        seat(&mut snapshot, 1, &slot.table(1), 1);
        let (state, store) = state_with(snapshot);

        let (status, _) = call(create_router(state.clone()), "DELETE", "/api/guests?id=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.commit_count(), 1);
        assert!(state.ledger.read(|s| s.group(1).is_none() && s.occupancy(&slot.table(1)) == 0).await);
    }

    #[tokio::test]
    async fn test_purge_reports_count() {
        let (state, _) = state_with(venue(&[6], 4));
        let (status, body) = call(create_router(state), "DELETE", "/api/guests/all", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["removed"], 4);
    }
}
