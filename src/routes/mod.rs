use axum::{
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::handlers;
use crate::state::AppState;

pub mod health;

/// API response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub code: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: true,
            message: "success".to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: false,
            message: message.into(),
            data: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn success_msg(message: impl Into<String>) -> Self {
        Self {
            code: true,
            message: message.into(),
            data: None,
        }
    }
}

/// Create the main router
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/venue", get(health::venue))
        // Catalog
        .route(
            "/guests",
            get(handlers::guests::list_guests)
                .post(handlers::guests::create_guest)
                .put(handlers::guests::update_guest)
                .delete(handlers::guests::delete_guest),
        )
        .route("/guests/all", delete(handlers::guests::delete_all_guests))
        .route(
            "/tables",
            get(handlers::tables::list_tables)
                .post(handlers::tables::create_table)
                .put(handlers::tables::update_table)
                .delete(handlers::tables::delete_table),
        )
        .route(
            "/groups",
            get(handlers::groups::list_groups)
                .post(handlers::groups::create_group)
                .put(handlers::groups::update_group)
                .delete(handlers::groups::delete_group),
        )
        .route(
            "/group-memberships",
            post(handlers::groups::add_member).delete(handlers::groups::remove_member),
        )
        // Raw assignment rows
        .route(
            "/assignments",
            get(handlers::assignments::list_assignments)
                .post(handlers::assignments::assign)
                .delete(handlers::assignments::unassign),
        )
        // Seating operations
        .route("/seating/assign", post(handlers::seating::place))
        .route("/seating/move", post(handlers::seating::move_guest))
        .route("/seating/move-many", post(handlers::seating::move_many))
        .route("/seating/move-group", post(handlers::seating::move_group))
        .route("/seating/split", post(handlers::seating::split))
        .route("/seating/split-by-member", post(handlers::seating::split_by_member))
        .route("/seating/fit", get(handlers::seating::fit))
        .route("/seating/split-candidates", get(handlers::seating::split_candidates))
        .route("/seating/tables", get(handlers::seating::table_statuses))
        .route("/seating/tables/:id/guests", get(handlers::seating::table_guests))
        .route(
            "/seating/groups/:id/status",
            get(handlers::seating::group_assignment_status),
        )
        .route("/seating/summary", get(handlers::seating::summary))
        // Presence
        .route(
            "/arrivals",
            get(handlers::presence::list_arrivals).post(handlers::presence::set_arrival),
        )
        .route(
            "/departures",
            get(handlers::presence::list_departures)
                .post(handlers::presence::set_departure)
                .delete(handlers::presence::clear_departure),
        )
        .route(
            "/blocked-tables",
            get(handlers::presence::list_blocked_tables).post(handlers::presence::set_block),
        )
        .route(
            "/member-arrivals",
            get(handlers::presence::list_member_arrivals)
                .post(handlers::presence::set_member_arrival),
        )
        // Chairs
        .route(
            "/chairs",
            get(handlers::chairs::list_adjustments)
                .post(handlers::chairs::borrow)
                .delete(handlers::chairs::reset),
        )
        // Notifications
        .route(
            "/sms",
            get(handlers::sms::sms_status).post(handlers::sms::send_sms),
        )
        .route("/refresh", post(handlers::sync::refresh))
        .fallback(fallback);

    // Static file service for frontend
    // Serves the client bundle, falls back to index.html for SPA routing
    let static_dir = state.config.static_dir.clone();
    let serve_dir = ServeDir::new(&static_dir)
        .not_found_service(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(serve_dir)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Fallback handler for unknown API routes
pub async fn fallback() -> (StatusCode, Json<ApiResponse<()>>) {
    (StatusCode::NOT_FOUND, Json(ApiResponse::error("Not Found")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::handlers::testing::call;
    use crate::ledger::Snapshot;
    use crate::state::testing::state_with;

    #[tokio::test]
    async fn test_unknown_api_route() {
        let (state, _) = state_with(Snapshot::new());
        let (status, body) = call(create_router(state), "GET", "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], false);
    }

    #[tokio::test]
    async fn test_missing_slot_params_rejected() {
        let (state, _) = state_with(Snapshot::new());
        let (status, _) = call(create_router(state), "GET", "/api/seating/summary?day=mon", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
