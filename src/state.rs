use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::ledger::{Ledger, Slot};
use crate::notify::Notifier;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, used for catalog inserts and member arrivals
    pub db: DatabaseConnection,
    /// In-memory seating ledger backed by the database
    pub ledger: Ledger,
    /// Application configuration
    pub config: Arc<Config>,
    /// SMS delivery
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: DatabaseConnection,
        ledger: Ledger,
        config: Config,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            ledger,
            config: Arc::new(config),
            notifier,
        }
    }

    /// Resolve a (day, service) pair against the configured calendar
    pub fn slot(&self, day: &str, service_id: i32) -> AppResult<Slot> {
        self.config
            .venue
            .slot(day, service_id)
            .map_err(AppError::Validation)
    }

    pub fn require_day(&self, day: &str) -> AppResult<()> {
        if self.config.venue.has_day(day) {
            Ok(())
        } else {
            Err(AppError::Validation(format!("Unknown day: {}", day)))
        }
    }
}
