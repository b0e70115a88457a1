//! Group entity
//!
//! Table: groups. Members live in `group_memberships`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ledger::Group;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "groups")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(Some(255))", nullable)]
    pub name: Option<String>,

    pub lead_guest_id: i32,

    pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Group {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            lead_guest_id: model.lead_guest_id,
            members: Vec::new(),
        }
    }
}
