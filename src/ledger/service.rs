//! Ledger service
//!
//! Owns the snapshot and the store. Commands plan against the snapshot under a
//! read lock, commit through the store with no lock held, then apply the same
//! unit of work under a short write lock. Applied units are journaled so a
//! refresh can replay local work the freshly loaded rows may have missed.
//!
//! Toggles read and write under one mutex so concurrent toggles of a flag
//! never collapse into the same value. An explicit set racing a toggle is last
//! write wins.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::capacity::ChairMove;
use super::intent::{Intent, UnitOfWork};
use super::key::{GroupId, GuestId, GuestSlot, Slot, TableId, TableSlot};
use super::model::{Assignment, DiningTable, Group, Guest, Seating, MAX_SEATS};
use super::plan::{AssignScope, Placement};
use super::snapshot::{Snapshot, SnapshotDiff};
use super::store::LedgerStore;
use super::{LedgerError, LedgerResult};

struct Inner {
    snapshot: Snapshot,
    revision: u64,
    journal: VecDeque<(u64, UnitOfWork)>,
}

#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    inner: Arc<RwLock<Inner>>,
    toggles: Arc<Mutex<()>>,
}

impl Ledger {
    /// Load the store and start serving from it
    pub async fn open(store: Arc<dyn LedgerStore>) -> LedgerResult<Self> {
        let snapshot = store.load().await?;
        info!(
            "Ledger loaded: {} guests, {} tables, {} groups",
            snapshot.guests.len(),
            snapshot.tables.len(),
            snapshot.groups.len()
        );
        Ok(Self::with_snapshot(store, snapshot))
    }

    pub fn with_snapshot(store: Arc<dyn LedgerStore>, snapshot: Snapshot) -> Self {
        Self {
            store,
            inner: Arc::new(RwLock::new(Inner {
                snapshot,
                revision: 0,
                journal: VecDeque::new(),
            })),
            toggles: Arc::new(Mutex::new(())),
        }
    }

    /// Run a query against the current snapshot
    pub async fn read<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> R {
        let inner = self.inner.read().await;
        f(&inner.snapshot)
    }

    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    /// Like `read`, also returning the revision the result was taken at
    pub async fn read_versioned<R>(&self, f: impl FnOnce(&Snapshot) -> R) -> (u64, R) {
        let inner = self.inner.read().await;
        (inner.revision, f(&inner.snapshot))
    }

    /// Commit a unit of work, then apply it locally
    async fn execute(&self, work: UnitOfWork) -> LedgerResult<u64> {
        if let Err(e) = self.store.commit(&work).await {
            warn!("Ledger commit of {} intents failed: {}", work.len(), e);
            return Err(e.into());
        }
        Ok(self.absorb(work).await)
    }

    /// Apply work that is already persisted
    pub async fn absorb(&self, work: UnitOfWork) -> u64 {
        let mut inner = self.inner.write().await;
        inner.snapshot.apply(&work);
        inner.revision += 1;
        let revision = inner.revision;
        inner.journal.push_back((revision, work));
        revision
    }

    // ---- assignments ----

    pub async fn assign(
        &self,
        guest_id: GuestId,
        key: &TableSlot,
        seating: Seating,
    ) -> LedgerResult<Assignment> {
        let work = self.read(|s| s.plan_assign(guest_id, key, seating)).await?;
        self.execute(work).await?;
        Ok(Assignment::from_parts(key, guest_id, seating))
    }

    /// Returns whether a row was removed
    pub async fn unassign(&self, guest_id: GuestId, key: &TableSlot) -> LedgerResult<bool> {
        let (existed, work) = self
            .read(|s| (s.seating(guest_id, key).is_some(), s.plan_unassign(guest_id, key)))
            .await;
        self.execute(work).await?;
        Ok(existed)
    }

    pub async fn move_guest(
        &self,
        guest_id: GuestId,
        from: TableId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<()> {
        let work = self.read(|s| s.plan_move(guest_id, from, to, slot)).await?;
        self.execute(work).await?;
        debug!("Moved guest {} from table {} to {}", guest_id, from, to);
        Ok(())
    }

    pub async fn move_many(
        &self,
        guest_ids: &[GuestId],
        from: TableId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<()> {
        let work = self
            .read(|s| s.plan_move_many(guest_ids, from, to, slot))
            .await?;
        self.execute(work).await?;
        debug!("Moved {} guests from table {} to {}", guest_ids.len(), from, to);
        Ok(())
    }

    pub async fn move_group(
        &self,
        lead_guest_id: GuestId,
        group_id: GroupId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<()> {
        let work = self
            .read(|s| s.plan_move_group(lead_guest_id, group_id, to, slot))
            .await?;
        self.execute(work).await?;
        Ok(())
    }

    pub async fn split(
        &self,
        guest_id: GuestId,
        slot: &Slot,
        allocations: &[(TableId, i32)],
    ) -> LedgerResult<()> {
        let work = self
            .read(|s| s.plan_split(guest_id, slot, allocations))
            .await?;
        self.execute(work).await?;
        Ok(())
    }

    pub async fn split_by_member(
        &self,
        group_id: GroupId,
        slot: &Slot,
        member_tables: &BTreeMap<GuestId, Option<TableId>>,
    ) -> LedgerResult<()> {
        let work = self
            .read(|s| s.plan_split_by_member(group_id, slot, member_tables))
            .await?;
        self.execute(work).await?;
        Ok(())
    }

    /// Group-aware assignment; decisions come back without touching the store
    pub async fn place(
        &self,
        guest_id: GuestId,
        key: &TableSlot,
        scope: AssignScope,
        group_id: Option<GroupId>,
    ) -> LedgerResult<Placement> {
        let placement = self
            .read(|s| s.plan_placement(guest_id, key, scope, group_id))
            .await?;
        if let Placement::Planned { work, .. } = &placement {
            self.execute(work.clone()).await?;
        }
        Ok(placement)
    }

    // ---- presence ----

    pub async fn set_arrival(&self, guest_id: GuestId, day: &str, arrived: bool) -> LedgerResult<bool> {
        self.require_guest(guest_id).await?;
        self.execute(UnitOfWork::single(Intent::SetArrival {
            guest_id,
            day: day.to_string(),
            arrived,
        }))
        .await?;
        Ok(arrived)
    }

    pub async fn toggle_arrival(&self, guest_id: GuestId, day: &str) -> LedgerResult<bool> {
        let _toggle = self.toggles.lock().await;
        let arrived = self.read(|s| !s.has_arrived(guest_id, day)).await;
        self.set_arrival(guest_id, day, arrived).await
    }

    pub async fn set_departure(&self, key: GuestSlot, departed: bool) -> LedgerResult<bool> {
        self.require_guest(key.guest_id).await?;
        let intent = if departed {
            Intent::MarkDeparted(key)
        } else {
            Intent::ClearDeparture(key)
        };
        self.execute(UnitOfWork::single(intent)).await?;
        Ok(departed)
    }

    pub async fn toggle_departure(&self, key: GuestSlot) -> LedgerResult<bool> {
        let _toggle = self.toggles.lock().await;
        let departed = self.read(|s| !s.has_departed(key.guest_id, &key.slot())).await;
        self.set_departure(key, departed).await
    }

    pub async fn set_block(&self, key: TableSlot, blocked: bool) -> LedgerResult<bool> {
        if self.read(|s| s.table(key.table_id).is_none()).await {
            return Err(LedgerError::not_found(format!("Table {}", key.table_id)));
        }
        let intent = if blocked {
            Intent::Block(key)
        } else {
            Intent::Unblock(key)
        };
        self.execute(UnitOfWork::single(intent)).await?;
        Ok(blocked)
    }

    pub async fn toggle_block(&self, key: TableSlot) -> LedgerResult<bool> {
        let _toggle = self.toggles.lock().await;
        let blocked = self.read(|s| !s.is_blocked(&key)).await;
        self.set_block(key, blocked).await
    }

    async fn require_guest(&self, guest_id: GuestId) -> LedgerResult<()> {
        if self.read(|s| s.guest(guest_id).is_none()).await {
            return Err(LedgerError::not_found(format!("Guest {}", guest_id)));
        }
        Ok(())
    }

    // ---- catalog ----

    pub async fn update_guest(&self, guest: Guest) -> LedgerResult<()> {
        self.require_guest(guest.id).await?;
        self.execute(UnitOfWork::single(Intent::PutGuest(guest))).await?;
        Ok(())
    }

    pub async fn update_table(&self, table: DiningTable) -> LedgerResult<()> {
        if !(1..=MAX_SEATS).contains(&table.capacity) {
            return Err(LedgerError::validation(format!(
                "Capacity must be between 1 and {}",
                MAX_SEATS
            )));
        }
        if self.read(|s| s.table(table.id).is_none()).await {
            return Err(LedgerError::not_found(format!("Table {}", table.id)));
        }
        self.execute(UnitOfWork::single(Intent::PutTable(table))).await?;
        Ok(())
    }

    /// Rename a group or hand it to a new lead
    pub async fn update_group(&self, group: Group) -> LedgerResult<()> {
        let current = self
            .read(|s| s.group(group.id).cloned())
            .await
            .ok_or_else(|| LedgerError::not_found(format!("Group {}", group.id)))?;
        if current.has_member(group.lead_guest_id) {
            return Err(LedgerError::validation("The lead cannot also be a member"));
        }
        self.require_guest(group.lead_guest_id).await?;
        self.execute(UnitOfWork::single(Intent::PutGroup(group))).await?;
        Ok(())
    }

    pub async fn remove_guest(&self, guest_id: GuestId) -> LedgerResult<()> {
        self.require_guest(guest_id).await?;
        self.execute(UnitOfWork::single(Intent::RemoveGuest(guest_id)))
            .await?;
        info!("Removed guest {}", guest_id);
        Ok(())
    }

    pub async fn purge_guests(&self) -> LedgerResult<usize> {
        let count = self.read(|s| s.guests.len()).await;
        self.execute(UnitOfWork::single(Intent::PurgeGuests)).await?;
        info!("Purged {} guests", count);
        Ok(count)
    }

    pub async fn remove_table(&self, table_id: TableId) -> LedgerResult<()> {
        if self.read(|s| s.table(table_id).is_none()).await {
            return Err(LedgerError::not_found(format!("Table {}", table_id)));
        }
        self.execute(UnitOfWork::single(Intent::RemoveTable(table_id)))
            .await?;
        Ok(())
    }

    pub async fn remove_group(&self, group_id: GroupId) -> LedgerResult<()> {
        if self.read(|s| s.group(group_id).is_none()).await {
            return Err(LedgerError::not_found(format!("Group {}", group_id)));
        }
        self.execute(UnitOfWork::single(Intent::RemoveGroup(group_id)))
            .await?;
        Ok(())
    }

    pub async fn remove_member(&self, group_id: GroupId, guest_id: GuestId) -> LedgerResult<()> {
        let is_member = self
            .read(|s| s.group(group_id).map(|g| g.has_member(guest_id)))
            .await
            .ok_or_else(|| LedgerError::not_found(format!("Group {}", group_id)))?;
        if !is_member {
            return Err(LedgerError::not_found(format!(
                "Guest {} in group {}",
                guest_id, group_id
            )));
        }
        self.execute(UnitOfWork::single(Intent::RemoveMember { group_id, guest_id }))
            .await?;
        Ok(())
    }

    // ---- chairs ----

    /// Returns the slot's chair adjustments after the move
    pub async fn borrow_chairs(
        &self,
        slot: &Slot,
        target: TableId,
        sources: &[ChairMove],
    ) -> LedgerResult<BTreeMap<TableId, i32>> {
        let mut inner = self.inner.write().await;
        let updates = inner.snapshot.plan_chair_borrow(slot, target, sources)?;
        inner.snapshot.set_chair_adjustments(updates);
        Ok(inner.snapshot.chair_adjustments(slot))
    }

    pub async fn reset_chairs(&self, slot: &Slot) -> usize {
        self.inner.write().await.snapshot.reset_chairs(slot)
    }

    // ---- reconciliation ----

    /// Reload from the store and merge local work the load may have missed
    pub async fn refresh(&self) -> LedgerResult<SnapshotDiff> {
        let since = self.revision().await;
        let fresh = self.store.load().await?;

        let mut inner = self.inner.write().await;
        let merged = rebase(fresh, &inner.snapshot, inner.journal.iter(), since);
        let diff = inner.snapshot.diff(&merged);
        inner.snapshot = merged;
        inner.journal.retain(|(revision, _)| *revision > since);

        if diff.is_empty() {
            debug!("Ledger refresh: no changes");
        } else {
            info!("Ledger refresh: {:?}", diff);
        }
        Ok(diff)
    }
}

/// Replay journaled work newer than `since` on top of freshly loaded rows
fn rebase<'a>(
    mut fresh: Snapshot,
    current: &Snapshot,
    journal: impl Iterator<Item = &'a (u64, UnitOfWork)>,
    since: u64,
) -> Snapshot {
    for (_, work) in journal.filter(|(revision, _)| *revision > since) {
        fresh.apply(work);
    }
    fresh.inherit_local(current);
    fresh
}

#[cfg(test)]
mod tests {
    use super::super::capacity::Fit;
    use super::super::snapshot::fixtures::*;
    use super::super::store::memory::MemoryStore;
    use super::*;

    fn ledger_with(snapshot: Snapshot) -> (Ledger, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with(snapshot.clone()));
        (Ledger::with_snapshot(store.clone(), snapshot), store)
    }

    #[tokio::test]
    async fn test_rejected_split_commits_nothing() {
        let mut snapshot = venue(&[4, 4], 5);
        group(&mut snapshot, 1, 1, &[2, 3, 4, 5]);
        let (ledger, store) = ledger_with(snapshot);
        let slot = Slot::new("mon", 1);

        let result = ledger.split(1, &slot, &[(1, 4), (2, 2)]).await;
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert_eq!(store.commit_count(), 0);
        assert_eq!(ledger.revision().await, 0);
        assert!(ledger.read(|s| s.assignments().is_empty()).await);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_snapshot_unchanged() {
        let mut snapshot = venue(&[6, 6], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let slot = Slot::new("tue", 2);
        for id in 1..=3 {
            seat(&mut snapshot, id, &slot.table(1), 1);
        }
        let (ledger, store) = ledger_with(snapshot);

        store.set_failing(true);
        let result = ledger.move_group(1, 1, 2, &slot).await;
        assert!(matches!(result, Err(LedgerError::Storage(_))));
        assert_eq!(ledger.read(|s| s.occupancy(&slot.table(1))).await, 3);

        store.set_failing(false);
        ledger.move_group(1, 1, 2, &slot).await.unwrap();
        assert_eq!(ledger.read(|s| s.occupancy(&slot.table(1))).await, 0);
        assert_eq!(ledger.read(|s| s.occupancy(&slot.table(2))).await, 3);
        assert_eq!(store.data.lock().unwrap().occupancy(&slot.table(2)), 3);
    }

    #[tokio::test]
    async fn test_capacity_is_not_enforced_by_assign() {
        let (ledger, _store) = ledger_with(venue(&[6], 7));
        let key = Slot::new("mon", 1).table(1);
        for guest_id in 1..=7 {
            ledger.assign(guest_id, &key, Seating::single()).await.unwrap();
        }
        assert_eq!(ledger.read(|s| s.occupancy(&key)).await, 7);
        assert_eq!(ledger.read(|s| s.remaining(&key)).await, Some(-1));
        assert!(ledger.read(|s| s.is_over_capacity(&key)).await);
    }

    #[tokio::test]
    async fn test_assign_to_blocked_table_is_allowed() {
        let (ledger, _store) = ledger_with(venue(&[4], 1));
        let key = Slot::new("mon", 1).table(1);
        assert!(ledger.toggle_block(key.clone()).await.unwrap());
        ledger.assign(1, &key, Seating::single()).await.unwrap();
        assert_eq!(ledger.read(|s| s.occupancy(&key)).await, 1);
        assert_eq!(
            ledger.read(|s| s.fit_at(1, 1, &key.slot())).await,
            Fit::Blocked
        );
    }

    #[tokio::test]
    async fn test_unassign_absent_row_is_noop() {
        let (ledger, _store) = ledger_with(venue(&[4], 1));
        let key = Slot::new("mon", 1).table(1);
        assert!(!ledger.unassign(1, &key).await.unwrap());
        ledger.assign(1, &key, Seating::single()).await.unwrap();
        assert!(ledger.unassign(1, &key).await.unwrap());
    }

    #[tokio::test]
    async fn test_toggle_arrival_twice() {
        let (ledger, store) = ledger_with(venue(&[4], 1));
        assert!(ledger.toggle_arrival(1, "mon").await.unwrap());
        assert!(!ledger.toggle_arrival(1, "mon").await.unwrap());
        assert!(!ledger.read(|s| s.has_arrived(1, "mon")).await);
        assert_eq!(store.commit_count(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_toggles_pair_up() {
        let (ledger, store) = ledger_with(venue(&[4], 1));
        let key = Slot::new("mon", 1).table(1);
        for _ in 0..25 {
            let (a, b) = tokio::join!(
                tokio::spawn({
                    let ledger = ledger.clone();
                    let key = key.clone();
                    async move { ledger.toggle_block(key).await }
                }),
                tokio::spawn({
                    let ledger = ledger.clone();
                    let key = key.clone();
                    async move { ledger.toggle_block(key).await }
                }),
            );
            let (a, b) = (a.unwrap().unwrap(), b.unwrap().unwrap());
            assert_ne!(a, b);
            assert!(!ledger.read(|s| s.is_blocked(&key)).await);
        }
        assert_eq!(store.commit_count(), 50);
    }

    #[tokio::test]
    async fn test_toggle_departure_round_trip() {
        let (ledger, _store) = ledger_with(venue(&[4], 1));
        let key = Slot::new("mon", 1).guest(1);
        assert!(ledger.toggle_departure(key.clone()).await.unwrap());
        assert!(!ledger.toggle_departure(key.clone()).await.unwrap());
        assert!(ledger.set_departure(Slot::new("mon", 1).guest(9), true).await.is_err());
    }

    #[tokio::test]
    async fn test_remove_guest_leaves_no_residue() {
        let mut snapshot = venue(&[4], 3);
        group(&mut snapshot, 1, 1, &[2]);
        group(&mut snapshot, 2, 3, &[1]);
        let (ledger, store) = ledger_with(snapshot);
        let slot = Slot::new("mon", 1);
        ledger.assign(1, &slot.table(1), Seating::single()).await.unwrap();
        ledger.set_arrival(1, "mon", true).await.unwrap();
        ledger.set_departure(slot.guest(1), true).await.unwrap();

        ledger.remove_guest(1).await.unwrap();

        let stored = store.data.lock().unwrap().clone();
        for snapshot in [ledger.read(|s| s.clone()).await, stored] {
            assert!(snapshot.guest(1).is_none());
            assert!(snapshot.group(1).is_none());
            assert!(!snapshot.group(2).unwrap().includes(1));
            assert!(snapshot.assignments().is_empty());
            assert!(!snapshot.has_arrived(1, "mon"));
            assert!(!snapshot.has_departed(1, &slot));
        }
    }

    #[tokio::test]
    async fn test_place_returns_decision_without_commit() {
        let mut snapshot = venue(&[8], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (ledger, store) = ledger_with(snapshot);
        let key = Slot::new("mon", 1).table(1);

        let placement = ledger.place(2, &key, AssignScope::Auto, None).await.unwrap();
        assert!(matches!(placement, Placement::ChooseMemberOrGroup { .. }));
        assert_eq!(store.commit_count(), 0);

        ledger.place(2, &key, AssignScope::Group, None).await.unwrap();
        assert_eq!(store.commit_count(), 1);
        assert_eq!(ledger.read(|s| s.occupancy(&key)).await, 3);
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_rows_and_keeps_chairs() {
        let (ledger, store) = ledger_with(venue(&[6, 6], 1));
        let slot = Slot::new("mon", 1);
        let sources = [ChairMove {
            table_id: 2,
            chairs: 2,
        }];
        ledger.borrow_chairs(&slot, 1, &sources).await.unwrap();

        store.data.lock().unwrap().insert_guest(Guest::new(2, "Walk-in"));
        let diff = ledger.refresh().await.unwrap();

        assert_eq!(diff.guests_added, 1);
        assert!(ledger.read(|s| s.guest(2).is_some()).await);
        assert_eq!(
            ledger.read(|s| s.effective_capacity(&slot.table(1))).await,
            Some(8)
        );
        assert!(ledger.refresh().await.unwrap().is_empty());
    }

    #[test]
    fn test_rebase_replays_work_newer_than_load() {
        let base = venue(&[4], 2);
        let key = Slot::new("mon", 1).table(1);
        let old = UnitOfWork::single(Intent::Seat {
            guest_id: 1,
            key: key.clone(),
            seating: Seating::single(),
        });
        let new = UnitOfWork::single(Intent::Seat {
            guest_id: 2,
            key: key.clone(),
            seating: Seating::single(),
        });
        let journal = vec![(1, old), (2, new)];

        let merged = rebase(base.clone(), &base, journal.iter(), 1);
        assert!(merged.seating(1, &key).is_none());
        assert!(merged.seating(2, &key).is_some());
    }
}
