//! Seatledger - seating management for restaurants and events
//!
//! This crate provides the seating ledger (guests, tables, groups and their
//! per-service table assignments), its PostgreSQL persistence, and the HTTP API
//! the floor-plan client talks to.

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod notify;
pub mod routes;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use ledger::Ledger;
pub use state::AppState;
