//! Group membership queries and per-slot group status

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;

use super::key::{GroupId, GuestId, Slot, TableId};
use super::model::{Group, Guest};
use super::snapshot::Snapshot;

/// Whether a group is seated together in a slot
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAssignmentStatus {
    pub is_complete: bool,
    pub is_split: bool,
    pub assigned_count: usize,
    pub total_count: usize,
    pub table_ids: Vec<TableId>,
    pub missing_members: Vec<GuestId>,
    pub is_active_for_service: bool,
}

/// Who in a group still lacks a seat
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupProgress {
    pub is_incomplete: bool,
    pub assigned_count: usize,
    pub total_count: usize,
    pub unassigned: Vec<GuestId>,
}

/// Guests at a table bucketed by the group seated there
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCluster {
    pub group_id: Option<GroupId>,
    pub group_name: Option<String>,
    pub guests: Vec<GuestId>,
}

impl Snapshot {
    /// Groups the guest leads, in id order
    pub fn groups_led_by(&self, guest_id: GuestId) -> Vec<&Group> {
        self.groups
            .values()
            .filter(|g| g.lead_guest_id == guest_id)
            .collect()
    }

    /// Groups the guest belongs to as a non-lead member
    pub fn groups_with_member(&self, guest_id: GuestId) -> Vec<&Group> {
        self.groups
            .values()
            .filter(|g| g.has_member(guest_id))
            .collect()
    }

    /// First group the guest leads, else the first they belong to
    pub fn primary_group(&self, guest_id: GuestId) -> Option<(&Group, bool)> {
        self.groups_led_by(guest_id)
            .first()
            .map(|g| (*g, true))
            .or_else(|| self.groups_with_member(guest_id).first().map(|g| (*g, false)))
    }

    /// Seats a guest's party needs: 1 when solo, else the first led group's size
    pub fn guest_group_size(&self, guest_id: GuestId) -> usize {
        self.groups_led_by(guest_id)
            .first()
            .map_or(1, |group| group.size())
    }

    /// Display name, falling back to "<lead>'s group"
    pub fn group_label(&self, group: &Group) -> String {
        match &group.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => {
                let lead = self
                    .guest(group.lead_guest_id)
                    .map_or("Unknown", |g: &Guest| g.name.as_str());
                format!("{}'s group", lead)
            }
        }
    }

    pub fn group_assignment_status(&self, group_id: GroupId, slot: &Slot) -> GroupAssignmentStatus {
        let Some(group) = self.group(group_id) else {
            return GroupAssignmentStatus::default();
        };

        let members_assigned = group
            .member_ids()
            .filter(|id| self.is_assigned(*id, slot))
            .count();

        // A lead's other groups must not read as partially seated just because
        // the lead sits somewhere.
        let is_active_for_service = if group.members.is_empty() {
            self.is_assigned(group.lead_guest_id, slot)
        } else {
            members_assigned > 0
        };

        let all_ids = group.guest_ids();
        let mut status = GroupAssignmentStatus {
            total_count: all_ids.len(),
            is_active_for_service,
            ..Default::default()
        };

        if !is_active_for_service {
            return status;
        }

        let mut tables = BTreeSet::new();
        for guest_id in all_ids {
            let seated = self.assigned_tables(guest_id, slot);
            if seated.is_empty() {
                status.missing_members.push(guest_id);
            } else {
                status.assigned_count += 1;
                tables.extend(seated);
            }
        }

        status.is_complete = status.assigned_count == status.total_count && tables.len() == 1;
        status.is_split = tables.len() > 1;
        status.table_ids = tables.into_iter().collect();
        status
    }

    pub fn group_progress(&self, group_id: GroupId, slot: &Slot) -> GroupProgress {
        let Some(group) = self.group(group_id) else {
            return GroupProgress::default();
        };
        let unassigned: Vec<GuestId> = group
            .guest_ids()
            .into_iter()
            .filter(|id| !self.is_assigned(*id, slot))
            .collect();
        let total_count = group.size();
        let assigned_count = total_count - unassigned.len();
        GroupProgress {
            is_incomplete: !unassigned.is_empty() && assigned_count > 0,
            assigned_count,
            total_count,
            unassigned,
        }
    }

    /// Guests at a table grouped by the group active at that table; ungrouped first
    pub fn table_clusters(&self, table_id: TableId, slot: &Slot) -> Vec<TableCluster> {
        let key = slot.table(table_id);
        let at_table: Vec<GuestId> = self
            .seated_at(&key)
            .map(|seated| seated.keys().copied().collect())
            .unwrap_or_default();
        let present: HashSet<GuestId> = at_table.iter().copied().collect();

        let mut clusters = Vec::new();
        let mut clustered = HashSet::new();
        for group in self.groups.values() {
            let active_here = if group.members.is_empty() {
                present.contains(&group.lead_guest_id)
            } else {
                group.member_ids().any(|id| present.contains(&id))
            };
            if !active_here {
                continue;
            }
            let guests: Vec<GuestId> = group
                .guest_ids()
                .into_iter()
                .filter(|id| present.contains(id))
                .collect();
            clustered.extend(guests.iter().copied());
            clusters.push(TableCluster {
                group_id: Some(group.id),
                group_name: Some(self.group_label(group)),
                guests,
            });
        }

        let loose: Vec<GuestId> = at_table
            .into_iter()
            .filter(|id| !clustered.contains(id))
            .collect();
        if !loose.is_empty() {
            clusters.insert(
                0,
                TableCluster {
                    group_id: None,
                    group_name: None,
                    guests: loose,
                },
            );
        }
        clusters
    }
}
