//! Capacity, fit and table status selectors
//!
//! Effective capacity is the table capacity plus any chairs borrowed for the
//! slot. Occupancy is the sum of seats held at the table, so a guest holding
//! three seats counts three times. Sums saturate; rows written elsewhere are
//! not bounded by request validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::key::{GuestId, Slot, TableId, TableSlot};
use super::model::MAX_SEATS;
use super::snapshot::Snapshot;
use super::{LedgerError, LedgerResult};

/// Whether a guest's party can sit at a given table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Fit {
    Fits { remaining: i32 },
    Blocked,
    Full { remaining: i32, needed: i32 },
    UnknownTable,
}

impl Fit {
    pub fn fits(&self) -> bool {
        matches!(self, Fit::Fits { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCandidate {
    pub table_id: TableId,
    pub name: String,
    /// Free seats with the guest's own seats at this table added back
    pub available: i32,
    pub current_seats: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Free,
    Clearing,
    Occupied,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStatus {
    pub table_id: TableId,
    pub name: String,
    pub capacity: i32,
    pub chair_adjustment: i32,
    pub effective_capacity: i32,
    pub occupancy: i32,
    pub remaining: i32,
    pub guest_ids: Vec<GuestId>,
    pub headcount: usize,
    pub arrived_count: usize,
    pub departed_count: usize,
    pub is_blocked: bool,
    pub is_over_capacity: bool,
    pub availability: Availability,
}

/// Chairs taken from one table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChairMove {
    pub table_id: TableId,
    pub chairs: i32,
}

impl Snapshot {
    pub fn is_blocked(&self, key: &TableSlot) -> bool {
        self.blocked.contains(key)
    }

    pub fn chair_adjustment(&self, key: &TableSlot) -> i32 {
        self.chair_adjustments.get(key).copied().unwrap_or(0)
    }

    /// Non-zero chair adjustments in the slot
    pub fn chair_adjustments(&self, slot: &Slot) -> BTreeMap<TableId, i32> {
        self.chair_adjustments
            .iter()
            .filter(|(key, delta)| key.in_slot(slot) && **delta != 0)
            .map(|(key, delta)| (key.table_id, *delta))
            .collect()
    }

    pub fn effective_capacity(&self, key: &TableSlot) -> Option<i32> {
        self.table(key.table_id)
            .map(|t| t.capacity.saturating_add(self.chair_adjustment(key)))
    }

    pub fn occupancy(&self, key: &TableSlot) -> i32 {
        self.seated_at(key)
            .map_or(0, |seated| {
                seated
                    .values()
                    .fold(0i32, |total, s| total.saturating_add(s.seats))
            })
    }

    pub fn remaining(&self, key: &TableSlot) -> Option<i32> {
        self.effective_capacity(key)
            .map(|cap| cap.saturating_sub(self.occupancy(key)))
    }

    pub fn is_over_capacity(&self, key: &TableSlot) -> bool {
        self.remaining(key).is_some_and(|r| r < 0)
    }

    fn open_tables<'a>(&'a self, slot: &'a Slot) -> impl Iterator<Item = TableSlot> + 'a {
        self.tables()
            .map(|t| slot.table(t.id))
            .filter(|key| !self.is_blocked(key))
    }

    pub fn largest_available_capacity(&self, slot: &Slot) -> i32 {
        self.open_tables(slot)
            .filter_map(|key| self.remaining(&key))
            .max()
            .unwrap_or(0)
            .max(0)
    }

    pub fn needs_split(&self, guest_id: GuestId, slot: &Slot) -> bool {
        let size = self.guest_group_size(guest_id) as i32;
        size > 1 && size > self.largest_available_capacity(slot)
    }

    pub fn can_fit_in_single_table(&self, guest_id: GuestId, slot: &Slot) -> bool {
        if self.is_assigned(guest_id, slot) {
            return true;
        }
        let size = self.guest_group_size(guest_id) as i32;
        self.open_tables(slot)
            .filter_map(|key| self.remaining(&key))
            .any(|remaining| remaining >= size)
    }

    pub fn fit_at(&self, guest_id: GuestId, table_id: TableId, slot: &Slot) -> Fit {
        let key = slot.table(table_id);
        let Some(remaining) = self.remaining(&key) else {
            return Fit::UnknownTable;
        };
        if self.is_blocked(&key) {
            return Fit::Blocked;
        }
        let held = self.seating(guest_id, &key).map_or(0, |s| s.seats);
        let remaining = remaining.saturating_add(held);
        let needed = self.guest_group_size(guest_id) as i32;
        if remaining >= needed {
            Fit::Fits { remaining }
        } else {
            Fit::Full { remaining, needed }
        }
    }

    pub fn split_candidates(&self, guest_id: GuestId, slot: &Slot) -> Vec<SplitCandidate> {
        self.open_tables(slot)
            .filter_map(|key| {
                let current_seats = self.seating(guest_id, &key).map_or(0, |s| s.seats);
                let available = self.remaining(&key)?.saturating_add(current_seats);
                if available <= 0 && current_seats == 0 {
                    return None;
                }
                let name = self.table(key.table_id)?.name.clone();
                Some(SplitCandidate {
                    table_id: key.table_id,
                    name,
                    available,
                    current_seats,
                })
            })
            .collect()
    }

    pub fn table_status(&self, table_id: TableId, slot: &Slot) -> Option<TableStatus> {
        let table = self.table(table_id)?;
        let key = slot.table(table_id);
        let guest_ids: Vec<GuestId> = self
            .seated_at(&key)
            .map(|seated| seated.keys().copied().collect())
            .unwrap_or_default();
        let counted: Vec<GuestId> = guest_ids
            .iter()
            .copied()
            .filter(|id| self.guest(*id).is_some_and(|g| g.counts_in_headcount()))
            .collect();
        let departed_count = guest_ids
            .iter()
            .filter(|id| self.has_departed(**id, slot))
            .count();

        let availability = if guest_ids.is_empty() {
            slot.previous()
                .map_or(Availability::Free, |prev| self.availability(table_id, &prev))
        } else {
            availability_of(guest_ids.len(), departed_count)
        };

        let chair_adjustment = self.chair_adjustment(&key);
        let effective_capacity = table.capacity.saturating_add(chair_adjustment);
        let occupancy = self.occupancy(&key);
        Some(TableStatus {
            table_id,
            name: table.name.clone(),
            capacity: table.capacity,
            chair_adjustment,
            effective_capacity,
            occupancy,
            remaining: effective_capacity.saturating_sub(occupancy),
            headcount: counted.len(),
            arrived_count: counted
                .iter()
                .filter(|id| self.has_arrived(**id, &slot.day))
                .count(),
            departed_count,
            is_blocked: self.is_blocked(&key),
            is_over_capacity: occupancy > effective_capacity,
            availability,
            guest_ids,
        })
    }

    pub fn table_statuses(&self, slot: &Slot) -> Vec<TableStatus> {
        self.tables()
            .filter_map(|t| self.table_status(t.id, slot))
            .collect()
    }

    fn availability(&self, table_id: TableId, slot: &Slot) -> Availability {
        let Some(seated) = self.seated_at(&slot.table(table_id)) else {
            return Availability::Free;
        };
        let departed = seated
            .keys()
            .filter(|id| self.has_departed(**id, slot))
            .count();
        availability_of(seated.len(), departed)
    }

    /// New chair adjustments for moving chairs from `sources` to `target`
    pub fn plan_chair_borrow(
        &self,
        slot: &Slot,
        target: TableId,
        sources: &[ChairMove],
    ) -> LedgerResult<Vec<(TableSlot, i32)>> {
        let target_key = slot.table(target);
        if self.table(target).is_none() {
            return Err(LedgerError::not_found(format!("Table {}", target)));
        }
        if self.is_blocked(&target_key) {
            return Err(LedgerError::validation("Cannot borrow chairs for a blocked table"));
        }

        let mut taken: BTreeMap<TableId, i32> = BTreeMap::new();
        for source in sources {
            if !(0..=MAX_SEATS).contains(&source.chairs) {
                return Err(LedgerError::validation(format!(
                    "Chair counts must be between 0 and {}",
                    MAX_SEATS
                )));
            }
            if source.table_id == target {
                return Err(LedgerError::validation("A table cannot lend chairs to itself"));
            }
            if self.table(source.table_id).is_none() {
                return Err(LedgerError::not_found(format!("Table {}", source.table_id)));
            }
            let lent = taken.entry(source.table_id).or_default();
            *lent = lent.checked_add(source.chairs).ok_or_else(too_many_chairs)?;
        }
        let total = taken
            .values()
            .try_fold(0i32, |total, chairs| total.checked_add(*chairs))
            .ok_or_else(too_many_chairs)?;
        if total <= 0 {
            return Err(LedgerError::validation("Select at least one chair to borrow"));
        }

        let mut updates = Vec::with_capacity(taken.len() + 1);
        for (table_id, chairs) in taken.into_iter().filter(|(_, c)| *c > 0) {
            let key = slot.table(table_id);
            let effective = self.effective_capacity(&key).unwrap_or(0);
            if effective < chairs {
                return Err(LedgerError::validation(format!(
                    "Table {} only has {} chairs to lend",
                    table_id, effective
                )));
            }
            let delta = self
                .chair_adjustment(&key)
                .checked_sub(chairs)
                .ok_or_else(too_many_chairs)?;
            updates.push((key, delta));
        }
        let delta = self
            .chair_adjustment(&target_key)
            .checked_add(total)
            .ok_or_else(too_many_chairs)?;
        updates.push((target_key, delta));
        Ok(updates)
    }

    pub(crate) fn set_chair_adjustments(&mut self, updates: Vec<(TableSlot, i32)>) {
        for (key, delta) in updates {
            if delta == 0 {
                self.chair_adjustments.remove(&key);
            } else {
                self.chair_adjustments.insert(key, delta);
            }
        }
    }

    pub(crate) fn reset_chairs(&mut self, slot: &Slot) -> usize {
        let before = self.chair_adjustments.len();
        self.chair_adjustments.retain(|key, _| !key.in_slot(slot));
        before - self.chair_adjustments.len()
    }
}

fn too_many_chairs() -> LedgerError {
    LedgerError::validation("Too many chairs")
}

fn availability_of(total: usize, departed: usize) -> Availability {
    if total == 0 || departed == total {
        Availability::Free
    } else if departed > 0 {
        Availability::Clearing
    } else {
        Availability::Occupied
    }
}
