//! Seating planners
//!
//! Each planner validates a request against the snapshot and returns the unit
//! of work that carries it out. Planners never mutate; a rejected request
//! leaves nothing behind.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::intent::{Intent, UnitOfWork};
use super::key::{GroupId, GuestId, Slot, TableId, TableSlot};
use super::model::{Group, Seating, MAX_SEATS};
use super::snapshot::Snapshot;
use super::{LedgerError, LedgerResult};

/// How a group-aware assignment treats the guest's groups
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignScope {
    /// Follow the guest's groups, asking when the choice is ambiguous
    #[default]
    Auto,
    /// Seat only this guest
    Member,
    /// Seat the whole group
    Group,
}

/// Outcome of a group-aware assignment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    Planned {
        work: UnitOfWork,
        guest_ids: Vec<GuestId>,
        group_id: Option<GroupId>,
    },
    /// The guest leads several groups and none was selected
    ChooseLedGroup {
        guest_id: GuestId,
        groups: Vec<GroupId>,
    },
    /// The guest is a member; seat them alone or bring the group along
    ChooseMemberOrGroup {
        guest_id: GuestId,
        group_id: GroupId,
        lead_guest_id: GuestId,
    },
}

impl Snapshot {
    fn require_guest(&self, guest_id: GuestId) -> LedgerResult<()> {
        self.guest(guest_id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found(format!("Guest {}", guest_id)))
    }

    fn require_table(&self, table_id: TableId) -> LedgerResult<()> {
        self.table(table_id)
            .map(|_| ())
            .ok_or_else(|| LedgerError::not_found(format!("Table {}", table_id)))
    }

    fn require_group(&self, group_id: GroupId) -> LedgerResult<&Group> {
        self.group(group_id)
            .ok_or_else(|| LedgerError::not_found(format!("Group {}", group_id)))
    }

    /// Upsert one assignment row; other tables in the slot are left alone
    pub fn plan_assign(
        &self,
        guest_id: GuestId,
        key: &TableSlot,
        seating: Seating,
    ) -> LedgerResult<UnitOfWork> {
        self.require_guest(guest_id)?;
        self.require_table(key.table_id)?;
        if !(1..=MAX_SEATS).contains(&seating.seats) {
            return Err(LedgerError::validation(format!(
                "Seats must be between 1 and {}",
                MAX_SEATS
            )));
        }
        if seating
            .party_size_override
            .is_some_and(|n| !(1..=MAX_SEATS).contains(&n))
        {
            return Err(LedgerError::validation(format!(
                "Party size must be between 1 and {}",
                MAX_SEATS
            )));
        }
        Ok(UnitOfWork::single(Intent::Seat {
            guest_id,
            key: key.clone(),
            seating,
        }))
    }

    pub fn plan_unassign(&self, guest_id: GuestId, key: &TableSlot) -> UnitOfWork {
        UnitOfWork::single(Intent::Unseat {
            guest_id,
            key: key.clone(),
        })
    }

    /// Seat at `to` before leaving `from`
    pub fn plan_move(
        &self,
        guest_id: GuestId,
        from: TableId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<UnitOfWork> {
        if from == to {
            return Err(LedgerError::validation("Source and destination tables are the same"));
        }
        self.require_guest(guest_id)?;
        self.require_table(to)?;

        let mut work = UnitOfWork::new();
        work.push(Intent::Seat {
            guest_id,
            key: slot.table(to),
            seating: Seating::single(),
        })
        .push(Intent::Unseat {
            guest_id,
            key: slot.table(from),
        });
        Ok(work)
    }

    /// Move several guests between the same two tables in one unit
    pub fn plan_move_many(
        &self,
        guest_ids: &[GuestId],
        from: TableId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<UnitOfWork> {
        if guest_ids.is_empty() {
            return Err(LedgerError::validation("Select at least one guest to move"));
        }
        let mut work = UnitOfWork::new();
        for guest_id in guest_ids.iter().collect::<BTreeSet<_>>() {
            for intent in self.plan_move(*guest_id, from, to, slot)? {
                work.push(intent);
            }
        }
        Ok(work)
    }

    pub fn plan_move_group(
        &self,
        lead_guest_id: GuestId,
        group_id: GroupId,
        to: TableId,
        slot: &Slot,
    ) -> LedgerResult<UnitOfWork> {
        let group = self.require_group(group_id)?;
        if group.lead_guest_id != lead_guest_id {
            return Err(LedgerError::validation(format!(
                "Guest {} does not lead group {}",
                lead_guest_id, group_id
            )));
        }
        self.require_table(to)?;
        Ok(cascade(group, &slot.table(to)))
    }

    /// Spread a guest's party over several tables
    pub fn plan_split(
        &self,
        guest_id: GuestId,
        slot: &Slot,
        allocations: &[(TableId, i32)],
    ) -> LedgerResult<UnitOfWork> {
        self.require_guest(guest_id)?;
        let size = self.guest_group_size(guest_id) as i32;

        let mut seen = BTreeSet::new();
        for (table_id, seats) in allocations {
            if *seats < 0 {
                return Err(LedgerError::validation("Seat counts cannot be negative"));
            }
            if *seats > size {
                return Err(LedgerError::validation(format!(
                    "Table {} gets {} seats but the group needs only {}",
                    table_id, seats, size
                )));
            }
            if !seen.insert(*table_id) {
                return Err(LedgerError::validation(format!(
                    "Table {} appears more than once",
                    table_id
                )));
            }
            self.require_table(*table_id)?;
        }
        let total: i64 = allocations.iter().map(|(_, seats)| i64::from(*seats)).sum();
        if total != i64::from(size) {
            return Err(LedgerError::validation(format!(
                "Allocated {} seats but the group needs {}",
                total, size
            )));
        }

        let mut work = UnitOfWork::single(Intent::UnseatEverywhere {
            guest_id,
            slot: slot.clone(),
        });
        for (table_id, seats) in allocations.iter().filter(|(_, seats)| *seats > 0) {
            work.push(Intent::Seat {
                guest_id,
                key: slot.table(*table_id),
                seating: Seating::seats(*seats),
            });
        }
        Ok(work)
    }

    /// Seat each group member at a chosen table
    pub fn plan_split_by_member(
        &self,
        group_id: GroupId,
        slot: &Slot,
        member_tables: &BTreeMap<GuestId, Option<TableId>>,
    ) -> LedgerResult<UnitOfWork> {
        let group = self.require_group(group_id)?;
        let people = group.guest_ids();

        let expected: BTreeSet<GuestId> = people.iter().copied().collect();
        let given: BTreeSet<GuestId> = member_tables.keys().copied().collect();
        if expected != given {
            return Err(LedgerError::validation(
                "Every group member needs exactly one table",
            ));
        }

        let mut work = UnitOfWork::new();
        for guest_id in people {
            let table_id = member_tables
                .get(&guest_id)
                .copied()
                .flatten()
                .ok_or_else(|| {
                    LedgerError::validation(format!("Guest {} has no table", guest_id))
                })?;
            self.require_table(table_id)?;
            work.place(guest_id, &slot.table(table_id));
        }
        Ok(work)
    }

    /// Decide how a guest dropped on a table should be seated
    pub fn plan_placement(
        &self,
        guest_id: GuestId,
        key: &TableSlot,
        scope: AssignScope,
        group_id: Option<GroupId>,
    ) -> LedgerResult<Placement> {
        self.require_guest(guest_id)?;
        self.require_table(key.table_id)?;

        if scope != AssignScope::Member {
            let led = self.groups_led_by(guest_id);
            let selected = group_id.and_then(|id| led.iter().find(|g| g.id == id));
            match (selected, group_id) {
                (Some(group), _) => return Ok(planned_cascade(group, key)),
                (None, None) if led.len() > 1 => {
                    return Ok(Placement::ChooseLedGroup {
                        guest_id,
                        groups: led.iter().map(|g| g.id).collect(),
                    })
                }
                (None, None) if led.len() == 1 => return Ok(planned_cascade(led[0], key)),
                _ => {}
            }

            let member_of = self.groups_with_member(guest_id);
            let chosen = match group_id {
                Some(id) => member_of.iter().find(|g| g.id == id).copied(),
                None => member_of.first().copied(),
            };
            match (chosen, group_id) {
                (Some(group), _) if scope == AssignScope::Group => {
                    return Ok(planned_cascade(group, key))
                }
                (Some(group), _) => {
                    return Ok(Placement::ChooseMemberOrGroup {
                        guest_id,
                        group_id: group.id,
                        lead_guest_id: group.lead_guest_id,
                    })
                }
                (None, Some(id)) => {
                    return Err(LedgerError::validation(format!(
                        "Guest {} is not part of group {}",
                        guest_id, id
                    )))
                }
                (None, None) => {}
            }
        }

        let mut work = UnitOfWork::new();
        work.place(guest_id, key);
        Ok(Placement::Planned {
            work,
            guest_ids: vec![guest_id],
            group_id: None,
        })
    }
}

/// Lead and members each moved wholesale to one table
fn cascade(group: &Group, key: &TableSlot) -> UnitOfWork {
    let mut work = UnitOfWork::new();
    for guest_id in group.guest_ids() {
        work.place(guest_id, key);
    }
    work
}

fn planned_cascade(group: &Group, key: &TableSlot) -> Placement {
    Placement::Planned {
        work: cascade(group, key),
        guest_ids: group.guest_ids(),
        group_id: Some(group.id),
    }
}
