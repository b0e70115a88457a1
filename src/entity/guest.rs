//! Guest entity
//!
//! Table: guests

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::Guest;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "guests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(255))")]
    pub name: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,

    /// Takes a seat without counting towards attendance
    #[sea_orm(default_value = false)]
    pub is_ghost: bool,

    #[sea_orm(default_value = false)]
    pub is_manually_added: bool,

    #[sea_orm(column_type = "String(Some(100))", nullable)]
    pub market: Option<String>,

    #[sea_orm(column_type = "String(Some(100))", nullable)]
    pub guest_type: Option<String>,

    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

// Assignments, arrivals and memberships are cleaned up by the ledger store

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Guest {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            notes: model.notes,
            is_ghost: model.is_ghost,
            is_manually_added: model.is_manually_added,
            market: model.market,
            guest_type: model.guest_type,
        }
    }
}
