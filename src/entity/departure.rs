//! Departure entity
//!
//! Table: departures, unique on (guest_id, day, service_id)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::GuestSlot;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "departures")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub guest_id: i32,

    #[sea_orm(column_type = "String(Some(16))")]
    pub day: String,

    pub service_id: i32,

    pub departed_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for GuestSlot {
    fn from(model: Model) -> Self {
        Self {
            guest_id: model.guest_id,
            day: model.day,
            service_id: model.service_id,
        }
    }
}
