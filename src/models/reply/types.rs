use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a reply stands on the motion under discussion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stance {
    Pro,
    Con,
    #[default]
    Neutral,
}

/// Discussion entry on a motion. Replies are never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: String,
    pub body: String,
    #[serde(default)]
    pub stance: Stance,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReply {
    pub body: String,
    #[serde(default)]
    pub stance: Stance,
}
