//! Arrival entity
//!
//! Table: arrivals, unique on (guest_id, day). Arrival is per day, not per service.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "arrivals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub guest_id: i32,

    #[sea_orm(column_type = "String(Some(16))")]
    pub day: String,

    #[sea_orm(default_value = false)]
    pub arrived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
