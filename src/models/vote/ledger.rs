//! Per-motion vote ledger.
//!
//! Every tally change happens inside one store transaction that reads the
//! motion, the voter's ballot and the owning committee, then writes the
//! ballot and the tally back. Contention is retried by the store adapter;
//! nothing here loops.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::identity::{Identity, IdentityContext};
use crate::errors::AppError;
use crate::models::motion::{MotionRef, MotionStatus};
use crate::store::{self, decode, encode, get_as, DocPath, DocumentStore, TxWrite};
use super::types::*;

/// The parts of the motion document the ledger needs.
#[derive(Deserialize)]
struct MotionSnapshot {
    #[serde(default)]
    tally: Tally,
    #[serde(default)]
    status: MotionStatus,
}

/// A resolved ballot waiting to be applied to a snapshot.
struct Ballot<'a> {
    voter: &'a Identity,
    choice: VoteChoice,
    anonymous: bool,
    cast_at: DateTime<Utc>,
    require_active: bool,
}

/// Compute the writes for one ballot from the `[motion, vote, committee]`
/// snapshot.
fn plan_vote(
    docs: &[Option<Value>],
    motion_path: &DocPath,
    vote_path: &DocPath,
    ballot: &Ballot<'_>,
) -> Result<(Tally, Vec<TxWrite>), AppError> {
    let current: MotionSnapshot = match (docs.first(), docs.get(2)) {
        (Some(Some(doc)), Some(Some(_))) => decode(doc)?,
        _ => return Err(AppError::NotFound),
    };
    if ballot.require_active && current.status != MotionStatus::Active {
        return Err(AppError::Conflict(format!(
            "voting is closed (motion is {})",
            current.status
        )));
    }
    let previous: Option<Vote> = match docs.get(1) {
        Some(Some(doc)) => Some(decode(doc)?),
        _ => None,
    };
    let previous_choice = previous.map(|v| v.choice);

    if previous_choice == Some(ballot.choice) {
        return Ok((current.tally, Vec::new()));
    }

    let tally = current.tally.record(previous_choice, ballot.choice);
    let vote = Vote {
        voter_id: ballot.voter.id.clone(),
        voter_name: ballot.voter.display_name.clone(),
        choice: ballot.choice,
        anonymous: ballot.anonymous,
        updated_at: ballot.cast_at,
    };
    let mut fields = Map::new();
    fields.insert("tally".to_string(), encode(&tally)?);

    let writes = vec![
        TxWrite::Set {
            path: vote_path.clone(),
            data: encode(&vote)?,
            merge: false,
        },
        TxWrite::Update {
            path: motion_path.clone(),
            fields,
        },
    ];
    Ok((tally, writes))
}

/// Record `choice` for the caller on a motion and return the resulting
/// tally. Re-casting the same choice is a no-op. The motion status is not
/// consulted; see [`cast_vote_on_active`].
pub async fn cast_vote(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    motion_ref: &MotionRef,
    choice: VoteChoice,
    anonymous: bool,
) -> Result<Tally, AppError> {
    record(store, identity, motion_ref, choice, anonymous, false).await
}

/// Like [`cast_vote`], but fails with `Conflict` unless the motion is
/// active in the same snapshot the ballot is written against.
pub async fn cast_vote_on_active(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    motion_ref: &MotionRef,
    choice: VoteChoice,
    anonymous: bool,
) -> Result<Tally, AppError> {
    record(store, identity, motion_ref, choice, anonymous, true).await
}

async fn record(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    motion_ref: &MotionRef,
    choice: VoteChoice,
    anonymous: bool,
    require_active: bool,
) -> Result<Tally, AppError> {
    let voter = identity.require()?;
    let motion_path = motion_ref.doc_path()?;
    let vote_path = motion_ref.vote_path(&voter.id)?;
    let ballot = Ballot {
        voter,
        choice,
        anonymous,
        cast_at: Utc::now(),
        require_active,
    };

    let reads = [motion_path.clone(), vote_path.clone(), motion_ref.committee_path()?];
    let tally = store::run_transaction(store, &reads, |docs| {
        plan_vote(docs, &motion_path, &vote_path, &ballot)
    })
    .await?;

    log::debug!(
        "Vote on motion {} by {}: {:?} (tally {}/{}/{})",
        motion_ref.motion_id,
        voter.id,
        choice,
        tally.yes,
        tally.no,
        tally.abstain
    );
    Ok(tally)
}

pub async fn find_vote(
    store: &dyn DocumentStore,
    motion_ref: &MotionRef,
    voter_id: &str,
) -> Result<Option<Vote>, AppError> {
    Ok(get_as(store, &motion_ref.vote_path(voter_id)?).await?)
}

/// All ballots on a motion, oldest change first, with anonymous voters
/// redacted.
pub async fn list_votes(
    store: &dyn DocumentStore,
    motion_ref: &MotionRef,
) -> Result<Vec<VoteView>, AppError> {
    let mut votes: Vec<Vote> = store::list_as(store, &motion_ref.votes()?).await?;
    votes.sort_by(|a, b| a.updated_at.cmp(&b.updated_at));
    Ok(votes.into_iter().map(VoteView::from).collect())
}
