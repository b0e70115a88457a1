//! SeaORM entities
//!
//! One module per table. Relations are not declared; the ledger store keeps
//! dependent rows consistent inside its transactions.

pub mod arrival;
pub mod assignment;
pub mod blocked_table;
pub mod departure;
pub mod dining_table;
pub mod group_membership;
pub mod guest;
pub mod member_arrival;
pub mod seating_group;
