//! Authorization gate for motion and committee mutations, and the motion
//! status transition table.
//!
//! ```text
//! active ──close──> closed ──approve──> completed
//!   │                 │ └────deny────> denied
//!   └──delete──> deleted <──delete──┘
//! ```
//!
//! `completed`, `denied` and `deleted` are terminal.

use std::fmt;

use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee::{Committee, MemberRole};
use crate::models::motion::{Motion, MotionStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAction {
    Delete,
    Close,
    Approve,
    Deny,
}

impl MotionAction {
    /// Parse the action segment of `POST .../motions/{id}/{action}`.
    /// Delete has its own `DELETE` route and is not accepted here.
    pub fn from_route(segment: &str) -> Option<Self> {
        match segment {
            "close" => Some(MotionAction::Close),
            "approve" => Some(MotionAction::Approve),
            "deny" => Some(MotionAction::Deny),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MotionAction::Delete => "delete",
            MotionAction::Close => "close",
            MotionAction::Approve => "approve",
            MotionAction::Deny => "deny",
        }
    }

    /// Status the motion ends up in when the action succeeds.
    pub fn target_status(self) -> MotionStatus {
        match self {
            MotionAction::Delete => MotionStatus::Deleted,
            MotionAction::Close => MotionStatus::Closed,
            MotionAction::Approve => MotionStatus::Completed,
            MotionAction::Deny => MotionStatus::Denied,
        }
    }
}

impl fmt::Display for MotionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitteeAction {
    UpdateSettings,
    ManageMembers,
    Delete,
}

/// Owner or chair.
fn presides(actor_id: &str, committee: &Committee) -> bool {
    matches!(
        committee.role_of(actor_id),
        Some(MemberRole::Owner | MemberRole::Chair)
    )
}

pub fn can_mutate(actor_id: &str, committee: &Committee, motion: &Motion, action: MotionAction) -> bool {
    match action {
        MotionAction::Delete => presides(actor_id, committee) || motion.creator_id == actor_id,
        MotionAction::Close | MotionAction::Approve | MotionAction::Deny => {
            presides(actor_id, committee)
        }
    }
}

pub fn require_can_mutate(
    identity: &IdentityContext,
    committee: &Committee,
    motion: &Motion,
    action: MotionAction,
) -> Result<(), AppError> {
    let actor = identity.require()?;
    if can_mutate(&actor.id, committee, motion, action) {
        Ok(())
    } else if action == MotionAction::Delete {
        Err(AppError::Unauthorized(
            "only the motion's creator, the committee owner or a chair may delete it".to_string(),
        ))
    } else {
        Err(AppError::Unauthorized(format!(
            "only the committee owner or a chair may {action} a motion"
        )))
    }
}

pub fn can_manage(actor_id: &str, committee: &Committee, action: CommitteeAction) -> bool {
    match action {
        CommitteeAction::UpdateSettings | CommitteeAction::ManageMembers => {
            presides(actor_id, committee)
        }
        CommitteeAction::Delete => committee.is_owner(actor_id),
    }
}

pub fn require_can_manage(
    identity: &IdentityContext,
    committee: &Committee,
    action: CommitteeAction,
) -> Result<(), AppError> {
    let actor = identity.require()?;
    if can_manage(&actor.id, committee, action) {
        return Ok(());
    }
    let reason = match action {
        CommitteeAction::Delete => "only the committee owner may delete the committee",
        CommitteeAction::UpdateSettings => "only the committee owner or a chair may change settings",
        CommitteeAction::ManageMembers => "only the committee owner or a chair may manage members",
    };
    Err(AppError::Unauthorized(reason.to_string()))
}

pub fn is_legal_transition(from: MotionStatus, to: MotionStatus) -> bool {
    use MotionStatus::*;
    matches!(
        (from, to),
        (Active, Closed) | (Closed, Completed) | (Closed, Denied) | (Active, Deleted) | (Closed, Deleted)
    )
}

pub fn check_transition(from: MotionStatus, to: MotionStatus) -> Result<(), AppError> {
    if is_legal_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}
