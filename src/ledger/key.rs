//! Composite keys used throughout the ledger

use serde::{Deserialize, Serialize};

pub type GuestId = i32;
pub type TableId = i32;
pub type GroupId = i32;
pub type ServiceId = i32;

/// A (day, service) seating slot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub day: String,
    pub service_id: ServiceId,
}

impl Slot {
    pub fn new(day: impl Into<String>, service_id: ServiceId) -> Self {
        Self {
            day: day.into(),
            service_id,
        }
    }

    /// Key of a table within this slot
    pub fn table(&self, table_id: TableId) -> TableSlot {
        TableSlot {
            day: self.day.clone(),
            service_id: self.service_id,
            table_id,
        }
    }

    /// Key of a guest within this slot
    pub fn guest(&self, guest_id: GuestId) -> GuestSlot {
        GuestSlot {
            guest_id,
            day: self.day.clone(),
            service_id: self.service_id,
        }
    }

    /// The service seated just before this one on the same day
    pub fn previous(&self) -> Option<Slot> {
        (self.service_id > 1).then(|| Slot::new(self.day.clone(), self.service_id - 1))
    }
}

/// A table within a slot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSlot {
    pub day: String,
    pub service_id: ServiceId,
    pub table_id: TableId,
}

impl TableSlot {
    pub fn slot(&self) -> Slot {
        Slot::new(self.day.clone(), self.service_id)
    }

    pub fn in_slot(&self, slot: &Slot) -> bool {
        self.service_id == slot.service_id && self.day == slot.day
    }
}

/// A guest within a slot
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestSlot {
    pub guest_id: GuestId,
    pub day: String,
    pub service_id: ServiceId,
}

impl GuestSlot {
    pub fn slot(&self) -> Slot {
        Slot::new(self.day.clone(), self.service_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_slot() {
        assert_eq!(Slot::new("mon", 2).previous(), Some(Slot::new("mon", 1)));
        assert_eq!(Slot::new("mon", 1).previous(), None);
    }

    #[test]
    fn test_table_slot_membership() {
        let slot = Slot::new("tue", 2);
        let key = slot.table(7);
        assert!(key.in_slot(&slot));
        assert!(!key.in_slot(&Slot::new("tue", 1)));
        assert_eq!(key.slot(), slot);
    }
}
