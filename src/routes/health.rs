use axum::{extract::State, response::Json};
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::state::AppState;
use super::ApiResponse;

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub revision: u64,
}

#[derive(Serialize)]
pub struct VenueCalendar {
    pub days: Vec<String>,
    pub services: Vec<ServiceConfig>,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    Json(ApiResponse::success(HealthStatus {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        revision: state.ledger.revision().await,
    }))
}

/// Days and services guests can be seated in
pub async fn venue(State(state): State<AppState>) -> Json<ApiResponse<VenueCalendar>> {
    Json(ApiResponse::success(VenueCalendar {
        days: state.config.venue.days.clone(),
        services: state.config.venue.services.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use crate::handlers::testing::call;
    use crate::ledger::Snapshot;
    use crate::routes::create_router;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn test_health_and_venue() {
        let (state, _) = state_with(Snapshot::new());
        let (_, body) = call(create_router(state.clone()), "GET", "/api/health", None).await;
        assert_eq!(body["data"]["status"], "healthy");
        assert_eq!(body["data"]["revision"], 0);

        let (_, body) = call(create_router(state), "GET", "/api/venue", None).await;
        assert_eq!(body["data"]["services"][1]["start"], "12:45");
        assert_eq!(body["data"]["days"][0], "mon");
    }
}
