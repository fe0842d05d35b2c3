use chrono::Utc;
use serde_json::{Map, Value};

use crate::auth::gate::{self, MotionAction};
use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee::{self, Committee};
use crate::models::paths;
use crate::models::vote::Tally;
use crate::store::{self, decode, encode, get_as, new_doc_id, DocumentStore, TxWrite};
use super::types::*;

/// Propose a motion in `committee`. The caller must be on the roster, and
/// the committee must still exist when the motion is written.
pub async fn create(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee: &Committee,
    new: NewMotion,
) -> Result<Motion, AppError> {
    let creator = committee::require_membership(committee, identity)?;
    let title = new.title.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("motion title is required".to_string()));
    }

    let motion = Motion {
        id: new_doc_id(),
        committee_id: committee.id.clone(),
        title: title.to_string(),
        description: new.description.trim().to_string(),
        motion_type: new.motion_type,
        creator_id: creator.id.clone(),
        creator_name: creator.display_name.clone(),
        created_at: Utc::now(),
        status: MotionStatus::Active,
        threshold: new.threshold.unwrap_or(committee.settings.default_threshold),
        tally: Tally::default(),
        requires_discussion: new.requires_discussion,
        requires_second: new.requires_second.unwrap_or(committee.settings.require_second),
        seconded_by: None,
        status_changed_at: None,
    };

    let motion_ref = MotionRef::from(&motion);
    let motion_path = motion_ref.doc_path()?;
    let data = encode(&motion)?;
    store::run_transaction(store, &[motion_ref.committee_path()?], |docs| {
        if !matches!(docs.first(), Some(Some(_))) {
            return Err(AppError::NotFound);
        }
        let write = TxWrite::Set {
            path: motion_path.clone(),
            data: data.clone(),
            merge: false,
        };
        Ok(((), vec![write]))
    })
    .await?;
    log::info!(
        "Motion {} proposed in committee {} by {}",
        motion.id,
        committee.id,
        creator.id
    );
    Ok(motion)
}

pub async fn find_by_id(
    store: &dyn DocumentStore,
    motion_ref: &MotionRef,
) -> Result<Option<Motion>, AppError> {
    Ok(get_as(store, &motion_ref.doc_path()?).await?)
}

pub async fn require_motion(
    store: &dyn DocumentStore,
    motion_ref: &MotionRef,
) -> Result<Motion, AppError> {
    find_by_id(store, motion_ref).await?.ok_or(AppError::NotFound)
}

/// Motions of a committee, newest first. Without a status filter, deleted
/// motions are left out.
pub async fn list_for_committee(
    store: &dyn DocumentStore,
    committee_id: &str,
    status: Option<MotionStatus>,
) -> Result<Vec<Motion>, AppError> {
    let mut motions: Vec<Motion> = store::list_as(store, &paths::motions(committee_id)?).await?;
    motions.retain(|m| match status {
        Some(wanted) => m.status == wanted,
        None => m.status != MotionStatus::Deleted,
    });
    motions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(motions)
}

fn motion_from_snapshot(docs: &[Option<Value>]) -> Result<Motion, AppError> {
    match docs.first() {
        Some(Some(doc)) => Ok(decode(doc)?),
        _ => Err(AppError::NotFound),
    }
}

/// Second an active motion. The creator cannot second their own motion;
/// seconding an already-seconded motion leaves it unchanged.
pub async fn second(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee: &Committee,
    motion_ref: &MotionRef,
) -> Result<Motion, AppError> {
    let seconder = committee::require_membership(committee, identity)?;
    let path = motion_ref.doc_path()?;

    store::run_transaction(store, std::slice::from_ref(&path), |docs| {
        let mut motion = motion_from_snapshot(docs)?;
        if motion.creator_id == seconder.id {
            return Err(AppError::Unauthorized(
                "a motion cannot be seconded by its creator".to_string(),
            ));
        }
        if motion.status != MotionStatus::Active {
            return Err(AppError::Conflict(format!(
                "only active motions can be seconded (motion is {})",
                motion.status
            )));
        }
        if motion.seconded_by.is_some() {
            return Ok((motion, Vec::new()));
        }

        motion.seconded_by = Some(seconder.clone());
        let mut fields = Map::new();
        fields.insert("seconded_by".to_string(), encode(seconder)?);
        Ok((motion, vec![TxWrite::Update { path: path.clone(), fields }]))
    })
    .await
}

/// Apply a status-changing action (close, approve, deny, delete). The gate
/// and the transition table are checked against the motion as read inside
/// the transaction, so two racing actions cannot both succeed from the same
/// starting status.
pub async fn transition(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee: &Committee,
    motion_ref: &MotionRef,
    action: MotionAction,
) -> Result<Motion, AppError> {
    let actor = identity.require()?;
    let path = motion_ref.doc_path()?;
    let now = Utc::now();

    let motion = store::run_transaction(store, std::slice::from_ref(&path), |docs| -> Result<_, AppError> {
        let mut motion = motion_from_snapshot(docs)?;
        gate::require_can_mutate(identity, committee, &motion, action)?;
        let next = action.target_status();
        gate::check_transition(motion.status, next)?;

        motion.status = next;
        motion.status_changed_at = Some(now);
        let mut fields = Map::new();
        fields.insert("status".to_string(), encode(&next)?);
        fields.insert("status_changed_at".to_string(), encode(&now)?);
        Ok((motion, vec![TxWrite::Update { path: path.clone(), fields }]))
    })
    .await?;

    log::info!(
        "Motion {} {} by {} (now {})",
        motion.id,
        action,
        actor.id,
        motion.status
    );
    Ok(motion)
}
