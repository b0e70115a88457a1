//! Assignment entity
//!
//! Table: assignments, unique on (guest_id, table_id, day, service_id).
//! A guest split across tables has one row per table carrying its seat count.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::Assignment;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub guest_id: i32,

    pub table_id: i32,

    #[sea_orm(column_type = "String(Some(16))")]
    pub day: String,

    pub service_id: i32,

    #[sea_orm(default_value = 1)]
    pub seats: i32,

    #[sea_orm(nullable)]
    pub party_size_override: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Assignment {
    fn from(model: Model) -> Self {
        Self {
            guest_id: model.guest_id,
            table_id: model.table_id,
            day: model.day,
            service_id: model.service_id,
            seats: model.seats,
            party_size_override: model.party_size_override,
        }
    }
}
