use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::auth::identity::Identity;
use crate::models::paths::{self, REPLIES, VOTES};
use crate::models::threshold::VoteThreshold;
use crate::models::vote::Tally;
use crate::store::{CollectionPath, DocPath, StoreResult};

/// Robert's Rules motion classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionType {
    #[default]
    Main,
    Subsidiary,
    Privileged,
    Incidental,
    Procedural,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionStatus {
    #[default]
    Active,
    Closed,
    #[serde(alias = "approved")]
    Completed,
    Denied,
    Deleted,
}

impl MotionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MotionStatus::Active => "active",
            MotionStatus::Closed => "closed",
            MotionStatus::Completed => "completed",
            MotionStatus::Denied => "denied",
            MotionStatus::Deleted => "deleted",
        }
    }

    /// Accepts the stored names plus `approved` for `completed`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "active" => Some(MotionStatus::Active),
            "closed" => Some(MotionStatus::Closed),
            "completed" | "approved" => Some(MotionStatus::Completed),
            "denied" => Some(MotionStatus::Denied),
            "deleted" => Some(MotionStatus::Deleted),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MotionStatus::Completed | MotionStatus::Denied | MotionStatus::Deleted
        )
    }
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Motion {
    pub id: String,
    pub committee_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub motion_type: MotionType,
    pub creator_id: String,
    #[serde(default)]
    pub creator_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub status: MotionStatus,
    #[serde(default)]
    pub threshold: VoteThreshold,
    #[serde(default)]
    pub tally: Tally,
    #[serde(default)]
    pub requires_discussion: bool,
    #[serde(default = "default_true")]
    pub requires_second: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seconded_by: Option<Identity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_changed_at: Option<DateTime<Utc>>,
}

/// Request body for proposing a motion. Unset threshold and second
/// requirement fall back to the committee settings.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMotion {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub motion_type: MotionType,
    #[serde(default)]
    pub threshold: Option<VoteThreshold>,
    #[serde(default)]
    pub requires_discussion: bool,
    #[serde(default)]
    pub requires_second: Option<bool>,
}

/// Address of one motion within its committee.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MotionRef {
    pub committee_id: String,
    pub motion_id: String,
}

impl MotionRef {
    pub fn new(committee_id: impl Into<String>, motion_id: impl Into<String>) -> Self {
        MotionRef {
            committee_id: committee_id.into(),
            motion_id: motion_id.into(),
        }
    }

    pub fn committee_path(&self) -> StoreResult<DocPath> {
        paths::committee(&self.committee_id)
    }

    pub fn doc_path(&self) -> StoreResult<DocPath> {
        paths::motions(&self.committee_id)?.doc(&self.motion_id)
    }

    pub fn votes(&self) -> StoreResult<CollectionPath> {
        self.doc_path()?.collection(VOTES)
    }

    pub fn vote_path(&self, voter_id: &str) -> StoreResult<DocPath> {
        self.votes()?.doc(voter_id)
    }

    pub fn replies(&self) -> StoreResult<CollectionPath> {
        self.doc_path()?.collection(REPLIES)
    }
}

impl From<&Motion> for MotionRef {
    fn from(motion: &Motion) -> Self {
        MotionRef::new(motion.committee_id.clone(), motion.id.clone())
    }
}
