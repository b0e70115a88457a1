//! Arrivals, departures, table blocks and slot attendance

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::key::{GuestId, GuestSlot, Slot, TableId, TableSlot};
use super::snapshot::Snapshot;

/// Attendance figures for one slot. Ghosts are left out of the counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSummary {
    pub seated_guest_ids: Vec<GuestId>,
    pub headcount: usize,
    pub arrived_count: usize,
    pub departed_count: usize,
    pub unassigned_guest_ids: Vec<GuestId>,
    pub blocked_table_ids: Vec<TableId>,
}

impl Snapshot {
    pub fn has_arrived(&self, guest_id: GuestId, day: &str) -> bool {
        self.arrivals
            .get(day)
            .is_some_and(|ids| ids.contains(&guest_id))
    }

    pub fn has_departed(&self, guest_id: GuestId, slot: &Slot) -> bool {
        self.departures.contains(&slot.guest(guest_id))
    }

    pub fn arrivals_on(&self, day: &str) -> Vec<GuestId> {
        self.arrivals
            .get(day)
            .map(|ids| ids.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Arrived guests keyed by day
    pub fn arrivals_by_day(&self) -> BTreeMap<String, Vec<GuestId>> {
        self.arrivals
            .iter()
            .filter(|(_, ids)| !ids.is_empty())
            .map(|(day, ids)| (day.clone(), ids.iter().copied().collect()))
            .collect()
    }

    /// Departures, optionally limited to one day
    pub fn departures(&self, day: Option<&str>) -> Vec<GuestSlot> {
        let mut rows: Vec<GuestSlot> = self
            .departures
            .iter()
            .filter(|key| day.map_or(true, |d| key.day == d))
            .cloned()
            .collect();
        rows.sort();
        rows
    }

    pub fn blocked_tables(&self) -> Vec<TableSlot> {
        let mut rows: Vec<TableSlot> = self.blocked.iter().cloned().collect();
        rows.sort();
        rows
    }

    pub fn unassigned_guests(&self, slot: &Slot) -> Vec<GuestId> {
        self.guests()
            .filter(|g| !self.is_assigned(g.id, slot))
            .map(|g| g.id)
            .collect()
    }

    pub fn slot_summary(&self, slot: &Slot) -> SlotSummary {
        let mut seated: Vec<GuestId> = self
            .seatings
            .iter()
            .filter(|(key, _)| key.in_slot(slot))
            .flat_map(|(_, seated)| seated.keys().copied())
            .collect();
        seated.sort_unstable();
        seated.dedup();

        let counted: Vec<GuestId> = seated
            .iter()
            .copied()
            .filter(|id| self.guest(*id).is_some_and(|g| g.counts_in_headcount()))
            .collect();

        SlotSummary {
            headcount: counted.len(),
            arrived_count: counted
                .iter()
                .filter(|id| self.has_arrived(**id, &slot.day))
                .count(),
            departed_count: counted
                .iter()
                .filter(|id| self.has_departed(**id, slot))
                .count(),
            unassigned_guest_ids: self.unassigned_guests(slot),
            blocked_table_ids: self
                .blocked
                .iter()
                .filter(|key| key.in_slot(slot))
                .map(|key| key.table_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            seated_guest_ids: seated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::intent::{Intent, UnitOfWork};
    use super::super::snapshot::fixtures::*;
    use super::*;

    #[test]
    fn test_arrival_is_per_day() {
        let mut snapshot = venue(&[4], 1);
        snapshot.apply(&UnitOfWork::single(Intent::SetArrival {
            guest_id: 1,
            day: "mon".to_string(),
            arrived: true,
        }));
        assert!(snapshot.has_arrived(1, "mon"));
        assert!(!snapshot.has_arrived(1, "tue"));
        assert_eq!(snapshot.arrivals_on("mon"), vec![1]);
        assert_eq!(snapshot.arrivals_by_day()["mon"], vec![1]);

        snapshot.apply(&UnitOfWork::single(Intent::SetArrival {
            guest_id: 1,
            day: "mon".to_string(),
            arrived: false,
        }));
        assert!(snapshot.arrivals_on("mon").is_empty());
        assert!(snapshot.arrivals_by_day().is_empty());
    }

    #[test]
    fn test_departure_is_per_service() {
        let mut snapshot = venue(&[4], 1);
        let first = Slot::new("mon", 1);
        snapshot.apply(&UnitOfWork::single(Intent::MarkDeparted(first.guest(1))));

        assert!(snapshot.has_departed(1, &first));
        assert!(!snapshot.has_departed(1, &Slot::new("mon", 2)));
        assert!(snapshot.departures(Some("tue")).is_empty());
        assert_eq!(snapshot.departures(None).len(), 1);
    }

    #[test]
    fn test_blocked_tables_are_sorted() {
        let mut snapshot = venue(&[4, 4], 0);
        snapshot.insert_block(Slot::new("tue", 1).table(2));
        snapshot.insert_block(Slot::new("mon", 2).table(1));
        let blocked = snapshot.blocked_tables();
        assert_eq!(blocked[0], Slot::new("mon", 2).table(1));
        assert_eq!(blocked.len(), 2);
    }

    #[test]
    fn test_slot_summary_skips_ghosts() {
        let mut snapshot = venue(&[4, 4], 4);
        let slot = Slot::new("mon", 1);
        snapshot.guests.get_mut(&3).unwrap().is_ghost = true;
        seat(&mut snapshot, 1, &slot.table(1), 1);
        seat(&mut snapshot, 1, &slot.table(2), 1);
        seat(&mut snapshot, 2, &slot.table(1), 1);
        seat(&mut snapshot, 3, &slot.table(2), 1);
        snapshot.insert_arrival(1, "mon");
        snapshot.insert_arrival(3, "mon");
        snapshot.insert_departure(slot.guest(2));

        let summary = snapshot.slot_summary(&slot);
        assert_eq!(summary.seated_guest_ids, vec![1, 2, 3]);
        assert_eq!(summary.headcount, 2);
        assert_eq!(summary.arrived_count, 1);
        assert_eq!(summary.departed_count, 1);
        assert_eq!(summary.unassigned_guest_ids, vec![4]);
    }
}
