//! Group and membership handlers

use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::Utc;
use sea_orm::{sea_query::OnConflict, ActiveModelTrait, DbErr, EntityTrait, Set};
use serde::{Deserialize, Deserializer, Serialize};

use super::IdQuery;
use crate::entity::{group_membership, seating_group};
use crate::error::{AppError, AppResult, OptionExt};
use crate::ledger::{Group, GroupId, GuestId, Intent, Snapshot, UnitOfWork};
use crate::routes::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    pub id: i32,
    pub group_id: GroupId,
    pub guest_id: GuestId,
    pub guest_name: Option<String>,
    pub is_ghost: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupView {
    pub id: GroupId,
    pub name: Option<String>,
    /// Name, or "<lead>'s group" when unnamed
    pub label: String,
    pub lead_guest_id: GuestId,
    pub lead_guest_name: Option<String>,
    pub lead_is_ghost: bool,
    pub members: Vec<MemberView>,
}

fn member_view(snapshot: &Snapshot, group_id: GroupId, id: i32, guest_id: GuestId) -> MemberView {
    let guest = snapshot.guest(guest_id);
    MemberView {
        id,
        group_id,
        guest_id,
        guest_name: guest.map(|g| g.name.clone()),
        is_ghost: guest.map(|g| g.is_ghost).unwrap_or(false),
    }
}

fn group_view(snapshot: &Snapshot, group: &Group) -> GroupView {
    let lead = snapshot.guest(group.lead_guest_id);
    GroupView {
        id: group.id,
        name: group.name.clone(),
        label: snapshot.group_label(group),
        lead_guest_id: group.lead_guest_id,
        lead_guest_name: lead.map(|g| g.name.clone()),
        lead_is_ghost: lead.map(|g| g.is_ghost).unwrap_or(false),
        members: group
            .members
            .iter()
            .map(|m| member_view(snapshot, group.id, m.id, m.guest_id))
            .collect(),
    }
}

/// Blank names are stored as no name
fn normalize_name(name: Option<String>) -> Option<String> {
    name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())
}

/// Distinguishes an absent field from an explicit null
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub name: Option<String>,
    pub lead_guest_id: GuestId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGroupRequest {
    pub id: GroupId,
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    pub lead_guest_id: Option<GuestId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddMemberRequest {
    pub group_id: GroupId,
    pub guest_id: GuestId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveMemberQuery {
    pub id: Option<i32>,
    pub group_id: Option<GroupId>,
    pub guest_id: Option<GuestId>,
}

/// GET /api/groups
pub async fn list_groups(State(state): State<AppState>) -> Json<ApiResponse<Vec<GroupView>>> {
    let groups = state
        .ledger
        .read(|s| {
            let mut views: Vec<GroupView> = s.groups().map(|g| group_view(s, g)).collect();
            views.reverse();
            views
        })
        .await;
    Json(ApiResponse::success(groups))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<AppState>,
    Json(req): Json<CreateGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupView>>> {
    state
        .ledger
        .read(|s| s.guest(req.lead_guest_id).map(|_| ()))
        .await
        .ok_or_not_found(format!("Guest {}", req.lead_guest_id))?;

    let row = seating_group::ActiveModel {
        name: Set(normalize_name(req.name)),
        lead_guest_id: Set(req.lead_guest_id),
        created_at: Set(Utc::now().naive_utc()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    let group: Group = row.into();
    state
        .ledger
        .absorb(UnitOfWork::single(Intent::PutGroup(group.clone())))
        .await;
    let view = state.ledger.read(|s| group_view(s, &group)).await;
    Ok(Json(ApiResponse::success(view)))
}

/// PUT /api/groups
pub async fn update_group(
    State(state): State<AppState>,
    Json(req): Json<UpdateGroupRequest>,
) -> AppResult<Json<ApiResponse<GroupView>>> {
    let mut group = state
        .ledger
        .read(|s| s.group(req.id).cloned())
        .await
        .ok_or_not_found(format!("Group {}", req.id))?;

    if let Some(name) = req.name {
        group.name = normalize_name(name);
    }
    if let Some(lead) = req.lead_guest_id {
        group.lead_guest_id = lead;
    }

    state.ledger.update_group(group.clone()).await?;
    let view = state
        .ledger
        .read(|s| s.group(group.id).map(|g| group_view(s, g)))
        .await
        .ok_or_not_found(format!("Group {}", group.id))?;
    Ok(Json(ApiResponse::success(view)))
}

/// DELETE /api/groups?id=
pub async fn delete_group(
    State(state): State<AppState>,
    Query(query): Query<IdQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    state.ledger.remove_group(query.id).await?;
    Ok(Json(ApiResponse::success_msg("Group deleted")))
}

fn already_member() -> AppError {
    AppError::Conflict("Guest is already a member of this group".to_string())
}

fn membership_insert_error(err: DbErr) -> AppError {
    match err {
        DbErr::RecordNotInserted => already_member(),
        other => other.into(),
    }
}

/// POST /api/group-memberships
pub async fn add_member(
    State(state): State<AppState>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<Json<ApiResponse<MemberView>>> {
    let (group, guest_exists) = state
        .ledger
        .read(|s| (s.group(req.group_id).cloned(), s.guest(req.guest_id).is_some()))
        .await;
    let group = group.ok_or_not_found(format!("Group {}", req.group_id))?;
    if !guest_exists {
        return Err(AppError::NotFound(format!("Guest {}", req.guest_id)));
    }
    if group.lead_guest_id == req.guest_id {
        return Err(AppError::Validation("Cannot add lead guest as a member".to_string()));
    }
    if group.has_member(req.guest_id) {
        return Err(already_member());
    }

    let row = group_membership::ActiveModel {
        group_id: Set(req.group_id),
        guest_id: Set(req.guest_id),
        ..Default::default()
    };
    // Another writer may have added the pair since the snapshot was read
    let id = group_membership::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                group_membership::Column::GroupId,
                group_membership::Column::GuestId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec(&state.db)
        .await
        .map_err(membership_insert_error)?
        .last_insert_id;

    state
        .ledger
        .absorb(UnitOfWork::single(Intent::PutMembership {
            id,
            group_id: req.group_id,
            guest_id: req.guest_id,
        }))
        .await;
    let view = state
        .ledger
        .read(|s| member_view(s, req.group_id, id, req.guest_id))
        .await;
    Ok(Json(ApiResponse::success(view)))
}

/// DELETE /api/group-memberships?id= or ?groupId=&guestId=
pub async fn remove_member(
    State(state): State<AppState>,
    Query(query): Query<RemoveMemberQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    let (group_id, guest_id) = match (query.id, query.group_id, query.guest_id) {
        (Some(id), _, _) => state
            .ledger
            .read(|s| {
                s.groups().find_map(|g| {
                    g.members
                        .iter()
                        .find(|m| m.id == id)
                        .map(|m| (g.id, m.guest_id))
                })
            })
            .await
            .ok_or_not_found(format!("Membership {}", id))?,
        (None, Some(group_id), Some(guest_id)) => (group_id, guest_id),
        _ => {
            return Err(AppError::BadRequest(
                "Membership ID or Group+Guest IDs required".to_string(),
            ))
        }
    };

    state.ledger.remove_member(group_id, guest_id).await?;
    Ok(Json(ApiResponse::success_msg("Member removed")))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use sea_orm::DbErr;
    use serde_json::json;

    use super::membership_insert_error;
    use crate::handlers::testing::call;
    use crate::ledger::snapshot::fixtures::*;
    use crate::routes::create_router;
    use crate::state::testing::state_with;

    #[test]
    fn test_lost_membership_race_is_a_conflict() {
        let response = membership_insert_error(DbErr::RecordNotInserted).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let response = membership_insert_error(DbErr::Custom("down".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_list_includes_members_and_label() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (state, _) = state_with(snapshot);
        let (status, body) = call(create_router(state), "GET", "/api/groups", None).await;
        assert_eq!(status, StatusCode::OK);
        let first = &body["data"][0];
        assert_eq!(first["label"], "Guest 1's group");
        assert_eq!(first["members"].as_array().unwrap().len(), 2);
        assert_eq!(first["members"][0]["guestName"], "Guest 2");
    }

    #[tokio::test]
    async fn test_rename_and_clear_name() {
        let mut snapshot = venue(&[6], 2);
        group(&mut snapshot, 1, 1, &[2]);
        let (state, _) = state_with(snapshot);

        let (_, body) = call(
            create_router(state.clone()),
            "PUT",
            "/api/groups",
            Some(json!({"id": 1, "name": "Smiths"})),
        )
        .await;
        assert_eq!(body["data"]["label"], "Smiths");

        // A missing name leaves it alone, an explicit null clears it
        let (_, body) = call(
            create_router(state.clone()),
            "PUT",
            "/api/groups",
            Some(json!({"id": 1})),
        )
        .await;
        assert_eq!(body["data"]["name"], "Smiths");
        let (_, body) = call(
            create_router(state),
            "PUT",
            "/api/groups",
            Some(json!({"id": 1, "name": null})),
        )
        .await;
        assert!(body["data"]["name"].is_null());
    }

    #[tokio::test]
    async fn test_member_cannot_become_lead() {
        let mut snapshot = venue(&[6], 2);
        group(&mut snapshot, 1, 1, &[2]);
        let (state, store) = state_with(snapshot);
        let (status, _) = call(
            create_router(state),
            "PUT",
            "/api/groups",
            Some(json!({"id": 1, "leadGuestId": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.commit_count(), 0);
    }

    #[tokio::test]
    async fn test_add_member_rules() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2]);
        let (state, _) = state_with(snapshot);

        let (status, _) = call(
            create_router(state.clone()),
            "POST",
            "/api/group-memberships",
            Some(json!({"groupId": 1, "guestId": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            create_router(state),
            "POST",
            "/api/group-memberships",
            Some(json!({"groupId": 1, "guestId": 2})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_remove_member_by_id_or_pair() {
        let mut snapshot = venue(&[6], 3);
        group(&mut snapshot, 1, 1, &[2, 3]);
        let (state, _) = state_with(snapshot);

        // Fixture membership ids are group * 100 + position
        let (status, _) = call(
            create_router(state.clone()),
            "DELETE",
            "/api/group-memberships?id=100",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(
            create_router(state.clone()),
            "DELETE",
            "/api/group-memberships?groupId=1&guestId=3",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(state.ledger.read(|s| s.group(1).unwrap().members.is_empty()).await);

        let (status, _) = call(create_router(state), "DELETE", "/api/group-memberships", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
