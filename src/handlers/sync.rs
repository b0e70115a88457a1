//! Manual reconciliation

use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::error::AppResult;
use crate::ledger::SnapshotDiff;
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub revision: u64,
    pub changes: SnapshotDiff,
}

/// POST /api/refresh
///
/// Reloads the ledger from the database without waiting for the next tick.
pub async fn refresh(State(state): State<AppState>) -> AppResult<Json<ApiResponse<RefreshResponse>>> {
    let changes = state.ledger.refresh().await?;
    let revision = state.ledger.revision().await;
    Ok(Json(ApiResponse::success(RefreshResponse { revision, changes })))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::handlers::testing::call;
    use crate::ledger::snapshot::fixtures::*;
    use crate::ledger::Guest;
    use crate::routes::create_router;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn test_refresh_reports_external_rows() {
        let (state, store) = state_with(venue(&[6], 1));
        store.data.lock().unwrap().insert_guest(Guest::new(2, "Walk-in"));

        let (status, body) = call(create_router(state.clone()), "POST", "/api/refresh", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["changes"]["guestsAdded"], 1);
        assert!(state.ledger.read(|s| s.guest(2).is_some()).await);
    }
}
