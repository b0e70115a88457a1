//! Dining table entity
//!
//! Table: tables

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::DiningTable;

pub const DEFAULT_CAPACITY: i32 = 6;
pub const DEFAULT_X: i32 = 250;
pub const DEFAULT_Y: i32 = 200;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tables")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(100))")]
    pub name: String,

    #[sea_orm(default_value = 6)]
    pub capacity: i32,

    /// Floor plan position, display only
    #[sea_orm(default_value = 250)]
    pub x: i32,

    #[sea_orm(default_value = 200)]
    pub y: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DiningTable {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            capacity: model.capacity,
            x: model.x,
            y: model.y,
        }
    }
}
