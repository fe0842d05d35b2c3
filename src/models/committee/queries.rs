use chrono::Utc;

use crate::auth::gate::{self, CommitteeAction};
use crate::auth::identity::{Identity, IdentityContext};
use crate::errors::AppError;
use crate::models::paths::{self, REPLIES, VOTES};
use crate::store::{
    self, decode, encode, get_as, is_valid_segment, new_doc_id, DocumentStore, TxWrite,
};
use super::types::*;

/// Create a committee owned by the caller, who also becomes the first
/// roster entry.
pub async fn create(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    new: NewCommittee,
) -> Result<Committee, AppError> {
    let owner = identity.require()?;
    let name = new.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("committee name is required".to_string()));
    }

    let committee = Committee {
        id: new_doc_id(),
        name: name.to_string(),
        description: new.description.trim().to_string(),
        owner_id: owner.id.clone(),
        created_at: Utc::now(),
        settings: new.settings,
        members: vec![Member {
            user_id: owner.id.clone(),
            display_name: owner.display_name.clone(),
            role: MemberRole::Owner,
        }],
    };

    store
        .set(&paths::committee(&committee.id)?, encode(&committee)?, false)
        .await?;
    log::info!("Committee {} created by {}", committee.id, owner.id);
    Ok(committee)
}

pub async fn find_by_id(
    store: &dyn DocumentStore,
    committee_id: &str,
) -> Result<Option<Committee>, AppError> {
    Ok(get_as(store, &paths::committee(committee_id)?).await?)
}

/// Like [`find_by_id`], but a missing committee is an error.
pub async fn require_committee(
    store: &dyn DocumentStore,
    committee_id: &str,
) -> Result<Committee, AppError> {
    find_by_id(store, committee_id).await?.ok_or(AppError::NotFound)
}

/// All committees, ordered by name.
pub async fn list_all(store: &dyn DocumentStore) -> Result<Vec<Committee>, AppError> {
    let mut committees: Vec<Committee> = store::list_as(store, &paths::committees()?).await?;
    committees.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    Ok(committees)
}

/// Committees whose roster includes `user_id`, ordered by name.
pub async fn list_for_member(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<Committee>, AppError> {
    let committees = list_all(store).await?;
    Ok(committees
        .into_iter()
        .filter(|c| c.is_member(user_id))
        .collect())
}

/// Resolve the caller and check they are on the committee roster.
pub fn require_membership<'a>(
    committee: &Committee,
    identity: &'a IdentityContext,
) -> Result<&'a Identity, AppError> {
    let caller = identity.require()?;
    if committee.is_member(&caller.id) {
        Ok(caller)
    } else {
        Err(AppError::Unauthorized(
            "not a member of this committee".to_string(),
        ))
    }
}

fn committee_from_snapshot(docs: &[Option<serde_json::Value>]) -> Result<Committee, AppError> {
    match docs.first() {
        Some(Some(doc)) => Ok(decode(doc)?),
        _ => Err(AppError::NotFound),
    }
}

/// Read-modify-write of a committee document. `change` sees the current
/// committee inside the transaction and may reject it.
async fn modify<F>(
    store: &dyn DocumentStore,
    committee_id: &str,
    mut change: F,
) -> Result<Committee, AppError>
where
    F: FnMut(&mut Committee) -> Result<(), AppError> + Send,
{
    let path = paths::committee(committee_id)?;
    store::run_transaction(store, std::slice::from_ref(&path), |docs| {
        let mut committee = committee_from_snapshot(docs)?;
        change(&mut committee)?;
        let write = TxWrite::Set {
            path: path.clone(),
            data: encode(&committee)?,
            merge: false,
        };
        Ok((committee, vec![write]))
    })
    .await
}

pub async fn update_settings(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: &str,
    settings: CommitteeSettings,
) -> Result<Committee, AppError> {
    modify(store, committee_id, |committee| {
        gate::require_can_manage(identity, committee, CommitteeAction::UpdateSettings)?;
        committee.settings = settings.clone();
        Ok(())
    })
    .await
}

pub async fn add_member(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: &str,
    new: NewMember,
) -> Result<Committee, AppError> {
    let user_id = new.user_id.trim().to_string();
    if !is_valid_segment(&user_id) {
        return Err(AppError::BadRequest("user_id must be a non-empty id without '/'".to_string()));
    }
    let role = new.role.unwrap_or(MemberRole::Member);
    if role == MemberRole::Owner {
        return Err(AppError::BadRequest("the owner role cannot be granted".to_string()));
    }
    let display_name = new
        .display_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user_id.clone());

    modify(store, committee_id, |committee| {
        gate::require_can_manage(identity, committee, CommitteeAction::ManageMembers)?;
        if committee.is_member(&user_id) {
            return Err(AppError::Conflict(format!("{user_id} is already a member")));
        }
        committee.members.push(Member {
            user_id: user_id.clone(),
            display_name: display_name.clone(),
            role,
        });
        Ok(())
    })
    .await
}

pub async fn set_member_role(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: &str,
    user_id: &str,
    role: MemberRole,
) -> Result<Committee, AppError> {
    if role == MemberRole::Owner {
        return Err(AppError::BadRequest("the owner role cannot be granted".to_string()));
    }
    modify(store, committee_id, |committee| {
        gate::require_can_manage(identity, committee, CommitteeAction::ManageMembers)?;
        if committee.is_owner(user_id) {
            return Err(AppError::Conflict("the committee owner's role cannot change".to_string()));
        }
        let member = committee
            .members
            .iter_mut()
            .find(|m| m.user_id == user_id)
            .ok_or(AppError::NotFound)?;
        member.role = role;
        Ok(())
    })
    .await
}

pub async fn remove_member(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: &str,
    user_id: &str,
) -> Result<Committee, AppError> {
    modify(store, committee_id, |committee| {
        gate::require_can_manage(identity, committee, CommitteeAction::ManageMembers)?;
        if committee.is_owner(user_id) {
            return Err(AppError::Conflict("the committee owner cannot be removed".to_string()));
        }
        let before = committee.members.len();
        committee.members.retain(|m| m.user_id != user_id);
        if committee.members.len() == before {
            return Err(AppError::NotFound);
        }
        Ok(())
    })
    .await
}

/// Delete a committee with every motion, vote and reply under it. Owner
/// only. Returns the number of documents removed.
pub async fn delete(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: &str,
) -> Result<usize, AppError> {
    let path = paths::committee(committee_id)?;
    // Motion, vote and reply writes read the committee in their own
    // transaction, so nothing new lands under it once this commits.
    store::run_transaction(store, std::slice::from_ref(&path), |docs| -> Result<_, AppError> {
        let committee = committee_from_snapshot(docs)?;
        gate::require_can_manage(identity, &committee, CommitteeAction::Delete)?;
        Ok(((), vec![TxWrite::Delete { path: path.clone() }]))
    })
    .await?;

    let mut removed = 1;
    for (motion_path, _) in store.list(&paths::motions(committee_id)?).await? {
        for child in [VOTES, REPLIES] {
            for (path, _) in store.list(&motion_path.collection(child)?).await? {
                store.delete(&path).await?;
                removed += 1;
            }
        }
        store.delete(&motion_path).await?;
        removed += 1;
    }

    log::info!("Committee {committee_id} deleted ({removed} documents)");
    Ok(removed)
}
