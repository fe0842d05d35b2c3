use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Yes,
    No,
    Abstain,
}

/// Aggregate counts stored on the motion document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    #[serde(default)]
    pub yes: u64,
    #[serde(default)]
    pub no: u64,
    #[serde(default)]
    pub abstain: u64,
}

impl Tally {
    pub fn new(yes: u64, no: u64, abstain: u64) -> Self {
        Tally { yes, no, abstain }
    }

    pub fn total(&self) -> u64 {
        self.yes + self.no + self.abstain
    }

    pub fn count(&self, choice: VoteChoice) -> u64 {
        match choice {
            VoteChoice::Yes => self.yes,
            VoteChoice::No => self.no,
            VoteChoice::Abstain => self.abstain,
        }
    }

    fn bucket(&mut self, choice: VoteChoice) -> &mut u64 {
        match choice {
            VoteChoice::Yes => &mut self.yes,
            VoteChoice::No => &mut self.no,
            VoteChoice::Abstain => &mut self.abstain,
        }
    }

    /// Tally after a voter moves from `previous` (if any) to `next`. The
    /// previous bucket never goes below zero.
    pub fn record(self, previous: Option<VoteChoice>, next: VoteChoice) -> Tally {
        let mut tally = self;
        if let Some(prev) = previous {
            let bucket = tally.bucket(prev);
            *bucket = bucket.saturating_sub(1);
        }
        *tally.bucket(next) += 1;
        tally
    }
}

/// One voter's ballot, stored at `.../votes/{voter_id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: String,
    #[serde(default)]
    pub voter_name: String,
    pub choice: VoteChoice,
    #[serde(default)]
    pub anonymous: bool,
    pub updated_at: DateTime<Utc>,
}

/// Request body for casting a vote.
#[derive(Debug, Clone, Deserialize)]
pub struct CastVote {
    pub choice: VoteChoice,
    #[serde(default)]
    pub anonymous: bool,
}

/// A vote as shown to other members. Anonymous ballots hide the voter.
#[derive(Debug, Clone, Serialize)]
pub struct VoteView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voter_name: Option<String>,
    pub choice: VoteChoice,
    pub anonymous: bool,
    pub updated_at: DateTime<Utc>,
}

impl From<Vote> for VoteView {
    fn from(vote: Vote) -> Self {
        let (voter_id, voter_name) = if vote.anonymous {
            (None, None)
        } else {
            (Some(vote.voter_id), Some(vote.voter_name))
        };
        VoteView {
            voter_id,
            voter_name,
            choice: vote.choice,
            anonymous: vote.anonymous,
            updated_at: vote.updated_at,
        }
    }
}
