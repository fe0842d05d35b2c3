use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::threshold::VoteThreshold;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Chair,
    Member,
}

/// Roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
    #[serde(default)]
    pub display_name: String,
    pub role: MemberRole,
}

fn default_true() -> bool {
    true
}

/// Committee-wide defaults. Fields missing from a stored document take the
/// defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitteeSettings {
    #[serde(default)]
    pub default_threshold: VoteThreshold,
    #[serde(default)]
    pub allow_anonymous_voting: bool,
    #[serde(default = "default_true")]
    pub require_second: bool,
}

impl Default for CommitteeSettings {
    fn default() -> Self {
        CommitteeSettings {
            default_threshold: VoteThreshold::SimpleMajority,
            allow_anonymous_voting: false,
            require_second: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub settings: CommitteeSettings,
    #[serde(default)]
    pub members: Vec<Member>,
}

impl Committee {
    pub fn member(&self, user_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id == user_id)
    }

    /// The owner always holds [`MemberRole::Owner`], whether or not the
    /// roster lists them.
    pub fn role_of(&self, user_id: &str) -> Option<MemberRole> {
        if self.is_owner(user_id) {
            return Some(MemberRole::Owner);
        }
        self.member(user_id).map(|m| m.role)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.role_of(user_id).is_some()
    }
}

/// Request body for creating a committee.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCommittee {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub settings: CommitteeSettings,
}

/// Request body for adding a roster entry.
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub role: Option<MemberRole>,
}

/// Request body for changing a member's role.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleChange {
    pub role: MemberRole,
}
