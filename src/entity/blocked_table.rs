//! Blocked table entity
//!
//! Table: blocked_tables, unique on (table_id, day, service_id)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::TableSlot;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blocked_tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub table_id: i32,

    #[sea_orm(column_type = "String(Some(16))")]
    pub day: String,

    pub service_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for TableSlot {
    fn from(model: Model) -> Self {
        Self {
            day: model.day,
            service_id: model.service_id,
            table_id: model.table_id,
        }
    }
}
