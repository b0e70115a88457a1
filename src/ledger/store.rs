//! Persistence for the ledger
//!
//! `LedgerStore` loads a full snapshot and commits units of work. The
//! PostgreSQL implementation runs every unit inside one transaction, so a
//! failed intent leaves no partial rows behind.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use tracing::debug;

use super::intent::{Intent, UnitOfWork};
use super::model::{Group, Membership};
use super::snapshot::Snapshot;
use crate::entity::{
    arrival, assignment, blocked_table, departure, dining_table, group_membership, guest,
    member_arrival, seating_group,
};

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read every ledger row into a fresh snapshot
    async fn load(&self) -> Result<Snapshot, DbErr>;

    /// Persist a unit of work atomically
    async fn commit(&self, work: &UnitOfWork) -> Result<(), DbErr>;
}

#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for SeaOrmStore {
    async fn load(&self) -> Result<Snapshot, DbErr> {
        let mut snapshot = Snapshot::new();

        for row in guest::Entity::find()
            .order_by_asc(guest::Column::Id)
            .all(&self.db)
            .await?
        {
            snapshot.insert_guest(row.into());
        }

        for row in dining_table::Entity::find()
            .order_by_asc(dining_table::Column::Id)
            .all(&self.db)
            .await?
        {
            snapshot.insert_table(row.into());
        }

        let memberships = group_membership::Entity::find()
            .order_by_asc(group_membership::Column::Id)
            .all(&self.db)
            .await?;
        for row in seating_group::Entity::find()
            .order_by_asc(seating_group::Column::Id)
            .all(&self.db)
            .await?
        {
            let mut group: Group = row.into();
            group.members = memberships
                .iter()
                .filter(|m| m.group_id == group.id)
                .map(|m| Membership {
                    id: m.id,
                    guest_id: m.guest_id,
                })
                .collect();
            snapshot.insert_group(group);
        }

        for row in assignment::Entity::find().all(&self.db).await? {
            snapshot.insert_assignment(row.into());
        }

        for row in arrival::Entity::find()
            .filter(arrival::Column::Arrived.eq(true))
            .all(&self.db)
            .await?
        {
            snapshot.insert_arrival(row.guest_id, row.day);
        }

        for row in departure::Entity::find().all(&self.db).await? {
            snapshot.insert_departure(row.into());
        }

        for row in blocked_table::Entity::find().all(&self.db).await? {
            snapshot.insert_block(row.into());
        }

        Ok(snapshot)
    }

    async fn commit(&self, work: &UnitOfWork) -> Result<(), DbErr> {
        if work.is_empty() {
            return Ok(());
        }
        let work = work.clone();
        debug!("Committing {} ledger intents", work.len());

        self.db
            .transaction::<_, (), DbErr>(|txn| {
                Box::pin(async move {
                    for intent in work {
                        write_intent(txn, intent).await?;
                    }
                    Ok(())
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(err) => err,
                TransactionError::Transaction(err) => err,
            })
    }
}

async fn write_intent(txn: &DatabaseTransaction, intent: Intent) -> Result<(), DbErr> {
    match intent {
        Intent::Seat {
            guest_id,
            key,
            seating,
        } => {
            let row = assignment::ActiveModel {
                guest_id: Set(guest_id),
                table_id: Set(key.table_id),
                day: Set(key.day),
                service_id: Set(key.service_id),
                seats: Set(seating.seats),
                party_size_override: Set(seating.party_size_override),
                ..Default::default()
            };
            assignment::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        assignment::Column::GuestId,
                        assignment::Column::TableId,
                        assignment::Column::Day,
                        assignment::Column::ServiceId,
                    ])
                    .update_columns([
                        assignment::Column::Seats,
                        assignment::Column::PartySizeOverride,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
        Intent::Unseat { guest_id, key } => {
            assignment::Entity::delete_many()
                .filter(assignment::Column::GuestId.eq(guest_id))
                .filter(assignment::Column::TableId.eq(key.table_id))
                .filter(assignment::Column::Day.eq(key.day))
                .filter(assignment::Column::ServiceId.eq(key.service_id))
                .exec(txn)
                .await?;
        }
        Intent::UnseatEverywhere { guest_id, slot } => {
            assignment::Entity::delete_many()
                .filter(assignment::Column::GuestId.eq(guest_id))
                .filter(assignment::Column::Day.eq(slot.day))
                .filter(assignment::Column::ServiceId.eq(slot.service_id))
                .exec(txn)
                .await?;
        }
        Intent::SetArrival {
            guest_id,
            day,
            arrived,
        } => {
            let row = arrival::ActiveModel {
                guest_id: Set(guest_id),
                day: Set(day),
                arrived: Set(arrived),
                ..Default::default()
            };
            arrival::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([arrival::Column::GuestId, arrival::Column::Day])
                        .update_column(arrival::Column::Arrived)
                        .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
        Intent::MarkDeparted(key) => {
            let row = departure::ActiveModel {
                guest_id: Set(key.guest_id),
                day: Set(key.day),
                service_id: Set(key.service_id),
                departed_at: Set(Utc::now().naive_utc()),
                ..Default::default()
            };
            departure::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        departure::Column::GuestId,
                        departure::Column::Day,
                        departure::Column::ServiceId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
        Intent::ClearDeparture(key) => {
            departure::Entity::delete_many()
                .filter(departure::Column::GuestId.eq(key.guest_id))
                .filter(departure::Column::Day.eq(key.day))
                .filter(departure::Column::ServiceId.eq(key.service_id))
                .exec(txn)
                .await?;
        }
        Intent::Block(key) => {
            let row = blocked_table::ActiveModel {
                table_id: Set(key.table_id),
                day: Set(key.day),
                service_id: Set(key.service_id),
                ..Default::default()
            };
            blocked_table::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        blocked_table::Column::TableId,
                        blocked_table::Column::Day,
                        blocked_table::Column::ServiceId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
        Intent::Unblock(key) => {
            blocked_table::Entity::delete_many()
                .filter(blocked_table::Column::TableId.eq(key.table_id))
                .filter(blocked_table::Column::Day.eq(key.day))
                .filter(blocked_table::Column::ServiceId.eq(key.service_id))
                .exec(txn)
                .await?;
        }
        Intent::PutGuest(g) => {
            guest::ActiveModel {
                id: Set(g.id),
                name: Set(g.name),
                notes: Set(g.notes),
                is_ghost: Set(g.is_ghost),
                is_manually_added: Set(g.is_manually_added),
                market: Set(g.market),
                guest_type: Set(g.guest_type),
                ..Default::default()
            }
            .update(txn)
            .await?;
        }
        Intent::PutTable(t) => {
            dining_table::ActiveModel {
                id: Set(t.id),
                name: Set(t.name),
                capacity: Set(t.capacity),
                x: Set(t.x),
                y: Set(t.y),
            }
            .update(txn)
            .await?;
        }
        Intent::PutGroup(g) => {
            seating_group::ActiveModel {
                id: Set(g.id),
                name: Set(g.name),
                lead_guest_id: Set(g.lead_guest_id),
                ..Default::default()
            }
            .update(txn)
            .await?;
        }
        Intent::PutMembership {
            group_id, guest_id, ..
        } => {
            let row = group_membership::ActiveModel {
                group_id: Set(group_id),
                guest_id: Set(guest_id),
                ..Default::default()
            };
            group_membership::Entity::insert(row)
                .on_conflict(
                    OnConflict::columns([
                        group_membership::Column::GroupId,
                        group_membership::Column::GuestId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(txn)
                .await?;
        }
        Intent::RemoveMember { group_id, guest_id } => {
            group_membership::Entity::delete_many()
                .filter(group_membership::Column::GroupId.eq(group_id))
                .filter(group_membership::Column::GuestId.eq(guest_id))
                .exec(txn)
                .await?;
        }
        Intent::RemoveGuest(guest_id) => remove_guest(txn, guest_id).await?,
        Intent::RemoveTable(table_id) => {
            assignment::Entity::delete_many()
                .filter(assignment::Column::TableId.eq(table_id))
                .exec(txn)
                .await?;
            blocked_table::Entity::delete_many()
                .filter(blocked_table::Column::TableId.eq(table_id))
                .exec(txn)
                .await?;
            dining_table::Entity::delete_by_id(table_id).exec(txn).await?;
        }
        Intent::RemoveGroup(group_id) => {
            group_membership::Entity::delete_many()
                .filter(group_membership::Column::GroupId.eq(group_id))
                .exec(txn)
                .await?;
            seating_group::Entity::delete_by_id(group_id).exec(txn).await?;
        }
        Intent::PurgeGuests => {
            assignment::Entity::delete_many().exec(txn).await?;
            arrival::Entity::delete_many().exec(txn).await?;
            departure::Entity::delete_many().exec(txn).await?;
            member_arrival::Entity::delete_many().exec(txn).await?;
            group_membership::Entity::delete_many().exec(txn).await?;
            seating_group::Entity::delete_many().exec(txn).await?;
            guest::Entity::delete_many().exec(txn).await?;
        }
    }
    Ok(())
}

async fn remove_guest(txn: &DatabaseTransaction, guest_id: i32) -> Result<(), DbErr> {
    assignment::Entity::delete_many()
        .filter(assignment::Column::GuestId.eq(guest_id))
        .exec(txn)
        .await?;
    arrival::Entity::delete_many()
        .filter(arrival::Column::GuestId.eq(guest_id))
        .exec(txn)
        .await?;
    departure::Entity::delete_many()
        .filter(departure::Column::GuestId.eq(guest_id))
        .exec(txn)
        .await?;
    member_arrival::Entity::delete_many()
        .filter(member_arrival::Column::MemberId.eq(guest_id))
        .exec(txn)
        .await?;
    group_membership::Entity::delete_many()
        .filter(group_membership::Column::GuestId.eq(guest_id))
        .exec(txn)
        .await?;

    // Groups led by the guest go too, with their members
    let led: Vec<i32> = seating_group::Entity::find()
        .filter(seating_group::Column::LeadGuestId.eq(guest_id))
        .all(txn)
        .await?
        .into_iter()
        .map(|g| g.id)
        .collect();
    if !led.is_empty() {
        group_membership::Entity::delete_many()
            .filter(group_membership::Column::GroupId.is_in(led.clone()))
            .exec(txn)
            .await?;
        seating_group::Entity::delete_many()
            .filter(seating_group::Column::Id.is_in(led))
            .exec(txn)
            .await?;
    }

    guest::Entity::delete_by_id(guest_id).exec(txn).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-process store backed by a snapshot
    #[derive(Default)]
    pub struct MemoryStore {
        pub data: Mutex<Snapshot>,
        pub fail: AtomicBool,
        pub commits: AtomicUsize,
    }

    impl MemoryStore {
        pub fn with(snapshot: Snapshot) -> Self {
            Self {
                data: Mutex::new(snapshot),
                ..Default::default()
            }
        }

        pub fn set_failing(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        pub fn commit_count(&self) -> usize {
            self.commits.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LedgerStore for MemoryStore {
        async fn load(&self) -> Result<Snapshot, DbErr> {
            let mut snapshot = self.data.lock().unwrap().clone();
            snapshot.chair_adjustments.clear();
            Ok(snapshot)
        }

        async fn commit(&self, work: &UnitOfWork) -> Result<(), DbErr> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(DbErr::Custom("store unavailable".to_string()));
            }
            self.data.lock().unwrap().apply(work);
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}
