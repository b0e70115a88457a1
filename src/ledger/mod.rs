//! Seating ledger
//!
//! The in-memory view of guests, tables, groups and seat assignments, the
//! planners that turn seating requests into units of work, and the service
//! that commits those units to the store before applying them locally.

pub mod capacity;
pub mod groups;
pub mod intent;
pub mod key;
pub mod model;
pub mod plan;
pub mod presence;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod sync;

use sea_orm::DbErr;
use thiserror::Error;

pub use capacity::{Availability, ChairMove, Fit, SplitCandidate, TableStatus};
pub use groups::{GroupAssignmentStatus, GroupProgress, TableCluster};
pub use intent::{Intent, UnitOfWork};
pub use key::{GroupId, GuestId, GuestSlot, ServiceId, Slot, TableId, TableSlot};
pub use model::{Assignment, DiningTable, Group, Guest, Membership, Seating, MAX_SEATS};
pub use plan::{AssignScope, Placement};
pub use presence::SlotSummary;
pub use service::Ledger;
pub use snapshot::{Snapshot, SnapshotDiff};
pub use store::{LedgerStore, SeaOrmStore};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbErr),
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
