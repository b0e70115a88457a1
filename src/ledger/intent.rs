//! Unit of work
//!
//! Every ledger mutation is expressed as an ordered list of intents. The store
//! commits a unit inside one transaction and the snapshot applies the same list
//! afterwards. Intents are set operations, so applying one twice is harmless.

use super::key::{GroupId, GuestId, GuestSlot, Slot, TableId, TableSlot};
use super::model::{DiningTable, Group, Guest, Seating};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// Upsert on (guest, table, day, service)
    Seat {
        guest_id: GuestId,
        key: TableSlot,
        seating: Seating,
    },
    /// Delete one (guest, table, day, service) row
    Unseat { guest_id: GuestId, key: TableSlot },
    /// Delete every row of a guest in a slot, whatever the table
    UnseatEverywhere { guest_id: GuestId, slot: Slot },
    SetArrival {
        guest_id: GuestId,
        day: String,
        arrived: bool,
    },
    MarkDeparted(GuestSlot),
    ClearDeparture(GuestSlot),
    Block(TableSlot),
    Unblock(TableSlot),
    PutGuest(Guest),
    PutTable(DiningTable),
    /// Name and lead only; memberships are kept
    PutGroup(Group),
    PutMembership {
        id: i32,
        group_id: GroupId,
        guest_id: GuestId,
    },
    RemoveMember { group_id: GroupId, guest_id: GuestId },
    RemoveGuest(GuestId),
    RemoveTable(TableId),
    RemoveGroup(GroupId),
    /// Drop every guest and everything hanging off guests
    PurgeGuests,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitOfWork {
    intents: Vec<Intent>,
}

impl UnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(intent: Intent) -> Self {
        Self {
            intents: vec![intent],
        }
    }

    pub fn push(&mut self, intent: Intent) -> &mut Self {
        self.intents.push(intent);
        self
    }

    /// Replace every seat a guest holds in the slot with one seat at `key`
    pub fn place(&mut self, guest_id: GuestId, key: &TableSlot) -> &mut Self {
        self.push(Intent::UnseatEverywhere {
            guest_id,
            slot: key.slot(),
        });
        self.push(Intent::Seat {
            guest_id,
            key: key.clone(),
            seating: Seating::single(),
        })
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }
}

impl From<Vec<Intent>> for UnitOfWork {
    fn from(intents: Vec<Intent>) -> Self {
        Self { intents }
    }
}

impl IntoIterator for UnitOfWork {
    type Item = Intent;
    type IntoIter = std::vec::IntoIter<Intent>;

    fn into_iter(self) -> Self::IntoIter {
        self.intents.into_iter()
    }
}
