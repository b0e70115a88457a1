//! In-memory snapshot of the seating ledger
//!
//! Holds guests, tables, groups, seatings, arrivals, departures, blocks and chair
//! adjustments. Selectors for derived views live next to the concern they serve
//! (`capacity`, `groups`, `presence`); this file owns storage and mutation.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use super::intent::{Intent, UnitOfWork};
use super::key::{GroupId, GuestId, GuestSlot, Slot, TableId, TableSlot};
use super::model::{Assignment, DiningTable, Group, Guest, Membership, Seating};

#[derive(Clone, Debug, Default)]
pub struct Snapshot {
    pub(crate) guests: BTreeMap<GuestId, Guest>,
    pub(crate) tables: BTreeMap<TableId, DiningTable>,
    pub(crate) groups: BTreeMap<GroupId, Group>,
    pub(crate) seatings: BTreeMap<TableSlot, BTreeMap<GuestId, Seating>>,
    pub(crate) arrivals: HashMap<String, BTreeSet<GuestId>>,
    pub(crate) departures: HashSet<GuestSlot>,
    pub(crate) blocked: HashSet<TableSlot>,
    /// Process-local; never persisted
    pub(crate) chair_adjustments: HashMap<TableSlot, i32>,
}

/// What changed between two snapshots
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDiff {
    pub guests_added: usize,
    pub guests_removed: usize,
    pub tables_added: usize,
    pub tables_removed: usize,
    pub groups_changed: usize,
    pub assignments_added: usize,
    pub assignments_removed: usize,
    pub presence_changed: usize,
}

impl SnapshotDiff {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- lookups ----

    pub fn guest(&self, id: GuestId) -> Option<&Guest> {
        self.guests.get(&id)
    }

    pub fn table(&self, id: TableId) -> Option<&DiningTable> {
        self.tables.get(&id)
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn guests(&self) -> impl Iterator<Item = &Guest> {
        self.guests.values()
    }

    pub fn tables(&self) -> impl Iterator<Item = &DiningTable> {
        self.tables.values()
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Seats held at one table in one slot, by guest
    pub fn seated_at(&self, key: &TableSlot) -> Option<&BTreeMap<GuestId, Seating>> {
        self.seatings.get(key)
    }

    pub fn seating(&self, guest_id: GuestId, key: &TableSlot) -> Option<Seating> {
        self.seatings.get(key).and_then(|s| s.get(&guest_id)).copied()
    }

    /// Tables the guest holds seats at in the slot, with the seat counts
    pub fn guest_seatings(&self, guest_id: GuestId, slot: &Slot) -> Vec<(TableId, Seating)> {
        self.seatings
            .iter()
            .filter(|(key, _)| key.in_slot(slot))
            .filter_map(|(key, seated)| seated.get(&guest_id).map(|s| (key.table_id, *s)))
            .collect()
    }

    pub fn assigned_tables(&self, guest_id: GuestId, slot: &Slot) -> Vec<TableId> {
        self.guest_seatings(guest_id, slot)
            .into_iter()
            .map(|(table_id, _)| table_id)
            .collect()
    }

    pub fn is_assigned(&self, guest_id: GuestId, slot: &Slot) -> bool {
        self.seatings
            .iter()
            .any(|(key, seated)| key.in_slot(slot) && seated.contains_key(&guest_id))
    }

    /// Every assignment row, ordered by (day, service, table, guest)
    pub fn assignments(&self) -> Vec<Assignment> {
        self.seatings
            .iter()
            .flat_map(|(key, seated)| {
                seated
                    .iter()
                    .map(move |(guest_id, seating)| Assignment::from_parts(key, *guest_id, *seating))
            })
            .collect()
    }

    // ---- loading ----

    pub fn insert_guest(&mut self, guest: Guest) {
        self.guests.insert(guest.id, guest);
    }

    pub fn insert_table(&mut self, table: DiningTable) {
        self.tables.insert(table.id, table);
    }

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.id, group);
    }

    pub fn insert_assignment(&mut self, row: Assignment) {
        let seating = Seating {
            seats: row.seats.max(1),
            party_size_override: row.party_size_override,
        };
        self.seatings
            .entry(row.key())
            .or_default()
            .insert(row.guest_id, seating);
    }

    pub fn insert_arrival(&mut self, guest_id: GuestId, day: impl Into<String>) {
        self.arrivals.entry(day.into()).or_default().insert(guest_id);
    }

    pub fn insert_departure(&mut self, key: GuestSlot) {
        self.departures.insert(key);
    }

    pub fn insert_block(&mut self, key: TableSlot) {
        self.blocked.insert(key);
    }

    // ---- mutation ----

    pub fn apply(&mut self, work: &UnitOfWork) {
        for intent in work.intents() {
            self.apply_intent(intent);
        }
    }

    fn apply_intent(&mut self, intent: &Intent) {
        match intent {
            Intent::Seat {
                guest_id,
                key,
                seating,
            } => {
                self.seatings
                    .entry(key.clone())
                    .or_default()
                    .insert(*guest_id, *seating);
            }
            Intent::Unseat { guest_id, key } => {
                if let Some(seated) = self.seatings.get_mut(key) {
                    seated.remove(guest_id);
                    if seated.is_empty() {
                        self.seatings.remove(key);
                    }
                }
            }
            Intent::UnseatEverywhere { guest_id, slot } => {
                self.seatings.retain(|key, seated| {
                    if key.in_slot(slot) {
                        seated.remove(guest_id);
                    }
                    !seated.is_empty()
                });
            }
            Intent::SetArrival {
                guest_id,
                day,
                arrived,
            } => {
                if *arrived {
                    self.insert_arrival(*guest_id, day.clone());
                } else if let Some(day_arrivals) = self.arrivals.get_mut(day) {
                    day_arrivals.remove(guest_id);
                }
            }
            Intent::MarkDeparted(key) => {
                self.departures.insert(key.clone());
            }
            Intent::ClearDeparture(key) => {
                self.departures.remove(key);
            }
            Intent::Block(key) => {
                self.blocked.insert(key.clone());
            }
            Intent::Unblock(key) => {
                self.blocked.remove(key);
            }
            Intent::PutGuest(guest) => {
                self.guests.insert(guest.id, guest.clone());
            }
            Intent::PutTable(table) => {
                self.tables.insert(table.id, table.clone());
            }
            Intent::PutGroup(group) => {
                self.groups
                    .entry(group.id)
                    .and_modify(|existing| {
                        existing.name = group.name.clone();
                        existing.lead_guest_id = group.lead_guest_id;
                    })
                    .or_insert_with(|| group.clone());
            }
            Intent::PutMembership {
                id,
                group_id,
                guest_id,
            } => {
                if let Some(group) = self.groups.get_mut(group_id) {
                    if !group.has_member(*guest_id) {
                        group.members.push(Membership {
                            id: *id,
                            guest_id: *guest_id,
                        });
                    }
                }
            }
            Intent::RemoveMember { group_id, guest_id } => {
                if let Some(group) = self.groups.get_mut(group_id) {
                    group.members.retain(|m| m.guest_id != *guest_id);
                }
            }
            Intent::RemoveGuest(guest_id) => self.remove_guest(*guest_id),
            Intent::RemoveTable(table_id) => {
                self.tables.remove(table_id);
                self.seatings.retain(|key, _| key.table_id != *table_id);
                self.blocked.retain(|key| key.table_id != *table_id);
                self.chair_adjustments.retain(|key, _| key.table_id != *table_id);
            }
            Intent::RemoveGroup(group_id) => {
                self.groups.remove(group_id);
            }
            Intent::PurgeGuests => {
                self.guests.clear();
                self.groups.clear();
                self.seatings.clear();
                self.arrivals.clear();
                self.departures.clear();
            }
        }
    }

    fn remove_guest(&mut self, guest_id: GuestId) {
        self.guests.remove(&guest_id);
        self.seatings.retain(|_, seated| {
            seated.remove(&guest_id);
            !seated.is_empty()
        });
        for day_arrivals in self.arrivals.values_mut() {
            day_arrivals.remove(&guest_id);
        }
        self.departures.retain(|key| key.guest_id != guest_id);
        self.groups.retain(|_, group| group.lead_guest_id != guest_id);
        for group in self.groups.values_mut() {
            group.members.retain(|m| m.guest_id != guest_id);
        }
    }

    fn assignment_keys(&self) -> HashSet<(TableSlot, GuestId, i32)> {
        self.seatings
            .iter()
            .flat_map(|(key, seated)| {
                seated
                    .iter()
                    .map(move |(guest_id, seating)| (key.clone(), *guest_id, seating.seats))
            })
            .collect()
    }

    /// Carry process-local state over from an older snapshot
    pub(crate) fn inherit_local(&mut self, older: &Snapshot) {
        self.chair_adjustments = older
            .chair_adjustments
            .iter()
            .filter(|(key, _)| self.tables.contains_key(&key.table_id))
            .map(|(key, delta)| (key.clone(), *delta))
            .collect();
    }

    pub fn diff(&self, newer: &Snapshot) -> SnapshotDiff {
        fn added<K: Ord, V>(old: &BTreeMap<K, V>, new: &BTreeMap<K, V>) -> usize {
            new.keys().filter(|k| !old.contains_key(k)).count()
        }

        let old_rows = self.assignment_keys();
        let new_rows = newer.assignment_keys();

        let old_arrivals: HashSet<(&String, &GuestId)> = self
            .arrivals
            .iter()
            .flat_map(|(day, ids)| ids.iter().map(move |id| (day, id)))
            .collect();
        let new_arrivals: HashSet<(&String, &GuestId)> = newer
            .arrivals
            .iter()
            .flat_map(|(day, ids)| ids.iter().map(move |id| (day, id)))
            .collect();

        SnapshotDiff {
            guests_added: added(&self.guests, &newer.guests),
            guests_removed: added(&newer.guests, &self.guests),
            tables_added: added(&self.tables, &newer.tables),
            tables_removed: added(&newer.tables, &self.tables),
            groups_changed: newer
                .groups
                .iter()
                .filter(|(id, group)| self.groups.get(id) != Some(group))
                .count()
                + added(&newer.groups, &self.groups),
            assignments_added: new_rows.difference(&old_rows).count(),
            assignments_removed: old_rows.difference(&new_rows).count(),
            presence_changed: old_arrivals.symmetric_difference(&new_arrivals).count()
                + self.departures.symmetric_difference(&newer.departures).count()
                + self.blocked.symmetric_difference(&newer.blocked).count(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Snapshot with tables and guests numbered from 1
    pub fn venue(tables: &[i32], guests: usize) -> Snapshot {
        let mut snapshot = Snapshot::new();
        for (i, capacity) in tables.iter().enumerate() {
            let id = i as i32 + 1;
            snapshot.insert_table(DiningTable::new(id, format!("Table {}", id), *capacity));
        }
        for i in 1..=guests {
            let id = i as i32;
            snapshot.insert_guest(Guest::new(id, format!("Guest {}", id)));
        }
        snapshot
    }

    pub fn group(snapshot: &mut Snapshot, id: GroupId, lead: GuestId, members: &[GuestId]) {
        let mut group = Group::new(id, lead);
        for (i, guest_id) in members.iter().enumerate() {
            group.members.push(Membership {
                id: id * 100 + i as i32,
                guest_id: *guest_id,
            });
        }
        snapshot.insert_group(group);
    }

    pub fn seat(snapshot: &mut Snapshot, guest_id: GuestId, key: &TableSlot, seats: i32) {
        snapshot.apply(&UnitOfWork::single(Intent::Seat {
            guest_id,
            key: key.clone(),
            seating: Seating::seats(seats),
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_unseat_everywhere_is_scoped_to_slot() {
        let mut snapshot = venue(&[4, 4], 1);
        let mon = Slot::new("mon", 1);
        let tue = Slot::new("tue", 1);
        seat(&mut snapshot, 1, &mon.table(1), 1);
        seat(&mut snapshot, 1, &mon.table(2), 2);
        seat(&mut snapshot, 1, &tue.table(1), 1);

        snapshot.apply(&UnitOfWork::single(Intent::UnseatEverywhere {
            guest_id: 1,
            slot: mon.clone(),
        }));

        assert!(!snapshot.is_assigned(1, &mon));
        assert_eq!(snapshot.assigned_tables(1, &tue), vec![1]);
        assert!(snapshot.seated_at(&mon.table(1)).is_none());
    }

    #[test]
    fn test_remove_guest_cascades() {
        let mut snapshot = venue(&[6], 4);
        let slot = Slot::new("mon", 1);
        group(&mut snapshot, 1, 1, &[2, 3]);
        group(&mut snapshot, 2, 4, &[1]);
        seat(&mut snapshot, 1, &slot.table(1), 1);
        snapshot.insert_arrival(1, "mon");
        snapshot.insert_departure(slot.guest(1));

        snapshot.apply(&UnitOfWork::single(Intent::RemoveGuest(1)));

        assert!(snapshot.guest(1).is_none());
        assert!(snapshot.group(1).is_none());
        assert!(!snapshot.group(2).unwrap().has_member(1));
        assert!(snapshot.assignments().is_empty());
        assert!(snapshot.arrivals.values().all(|ids| !ids.contains(&1)));
        assert!(snapshot.departures.is_empty());
    }

    #[test]
    fn test_remove_table_drops_blocks_and_chairs() {
        let mut snapshot = venue(&[6, 6], 1);
        let slot = Slot::new("mon", 1);
        seat(&mut snapshot, 1, &slot.table(1), 1);
        snapshot.insert_block(slot.table(1));
        snapshot.chair_adjustments.insert(slot.table(1), 2);
        snapshot.chair_adjustments.insert(slot.table(2), -2);

        snapshot.apply(&UnitOfWork::single(Intent::RemoveTable(1)));

        assert!(snapshot.table(1).is_none());
        assert!(snapshot.assignments().is_empty());
        assert!(snapshot.blocked.is_empty());
        assert_eq!(snapshot.chair_adjustments.len(), 1);
    }

    #[test]
    fn test_put_group_keeps_members() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2]);
        let mut renamed = Group::new(1, 1);
        renamed.name = Some("Family".to_string());

        snapshot.apply(&UnitOfWork::single(Intent::PutGroup(renamed)));

        let group = snapshot.group(1).unwrap();
        assert_eq!(group.name.as_deref(), Some("Family"));
        assert!(group.has_member(2));
    }

    #[test]
    fn test_diff_counts_assignment_changes() {
        let before = venue(&[6], 2);
        let mut after = before.clone();
        let slot = Slot::new("mon", 1);
        seat(&mut after, 1, &slot.table(1), 1);
        after.insert_guest(Guest::new(3, "Late"));

        let diff = before.diff(&after);
        assert_eq!(diff.assignments_added, 1);
        assert_eq!(diff.guests_added, 1);
        assert!(after.diff(&after).is_empty());
    }
}
