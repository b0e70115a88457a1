//! Ledger records
//!
//! Plain values held by the snapshot. They mirror the persisted rows but carry
//! no storage concerns.

use serde::{Deserialize, Serialize};

use super::key::{GroupId, GuestId, ServiceId, TableId, TableSlot};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: GuestId,
    pub name: String,
    pub notes: Option<String>,
    /// Occupies a seat but is left out of headcounts
    pub is_ghost: bool,
    pub is_manually_added: bool,
    pub market: Option<String>,
    pub guest_type: Option<String>,
}

impl Guest {
    pub fn new(id: GuestId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            notes: None,
            is_ghost: false,
            is_manually_added: false,
            market: None,
            guest_type: None,
        }
    }

    /// Whether this guest counts towards attendance figures
    pub fn counts_in_headcount(&self) -> bool {
        !self.is_ghost
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: TableId,
    pub name: String,
    pub capacity: i32,
    pub x: i32,
    pub y: i32,
}

impl DiningTable {
    pub fn new(id: TableId, name: impl Into<String>, capacity: i32) -> Self {
        Self {
            id,
            name: name.into(),
            capacity,
            x: 0,
            y: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub id: i32,
    pub guest_id: GuestId,
}

/// A lead guest plus ordered members
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: GroupId,
    pub name: Option<String>,
    pub lead_guest_id: GuestId,
    pub members: Vec<Membership>,
}

impl Group {
    pub fn new(id: GroupId, lead_guest_id: GuestId) -> Self {
        Self {
            id,
            name: None,
            lead_guest_id,
            members: Vec::new(),
        }
    }

    /// Member guest ids, lead excluded
    pub fn member_ids(&self) -> impl Iterator<Item = GuestId> + '_ {
        self.members.iter().map(|m| m.guest_id)
    }

    /// Lead first, then members in order
    pub fn guest_ids(&self) -> Vec<GuestId> {
        std::iter::once(self.lead_guest_id)
            .chain(self.member_ids())
            .collect()
    }

    pub fn has_member(&self, guest_id: GuestId) -> bool {
        self.members.iter().any(|m| m.guest_id == guest_id)
    }

    pub fn includes(&self, guest_id: GuestId) -> bool {
        self.lead_guest_id == guest_id || self.has_member(guest_id)
    }

    /// Seats needed by the whole group; ghosts included
    pub fn size(&self) -> usize {
        1 + self.members.len()
    }
}

/// Upper bound for any seat, chair or capacity count a request may carry
pub const MAX_SEATS: i32 = 500;

/// Seats a guest holds at one table in one slot
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Seating {
    pub seats: i32,
    pub party_size_override: Option<i32>,
}

impl Seating {
    pub fn single() -> Self {
        Self {
            seats: 1,
            party_size_override: None,
        }
    }

    pub fn seats(seats: i32) -> Self {
        Self {
            seats,
            party_size_override: None,
        }
    }
}

/// Flat assignment row as exchanged with clients
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub guest_id: GuestId,
    pub table_id: TableId,
    pub day: String,
    pub service_id: ServiceId,
    pub seats: i32,
    pub party_size_override: Option<i32>,
}

impl Assignment {
    pub fn from_parts(key: &TableSlot, guest_id: GuestId, seating: Seating) -> Self {
        Self {
            guest_id,
            table_id: key.table_id,
            day: key.day.clone(),
            service_id: key.service_id,
            seats: seating.seats,
            party_size_override: seating.party_size_override,
        }
    }

    pub fn key(&self) -> TableSlot {
        TableSlot {
            day: self.day.clone(),
            service_id: self.service_id,
            table_id: self.table_id,
        }
    }
}
