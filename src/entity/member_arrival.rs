//! Member arrival entity
//!
//! Table: member_arrivals, unique on (member_id, day). Kept outside the
//! ledger snapshot; handlers read and write it directly.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "member_arrivals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub member_id: i32,

    #[sea_orm(column_type = "String(Some(16))")]
    pub day: String,

    #[sea_orm(default_value = false)]
    pub arrived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
