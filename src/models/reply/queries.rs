use chrono::Utc;

use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee::{self, Committee};
use crate::models::motion::{Motion, MotionRef, MotionStatus};
use crate::store::{self, decode, encode, new_doc_id, DocumentStore, TxWrite};
use super::types::*;

/// Append a reply to a motion's discussion. Only committee members may
/// reply, and deleted motions take no further discussion. The committee and
/// motion are re-read in the same transaction as the write.
pub async fn add_reply(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee: &Committee,
    motion_ref: &MotionRef,
    new: NewReply,
) -> Result<Reply, AppError> {
    let author = committee::require_membership(committee, identity)?;
    let body = new.body.trim();
    if body.is_empty() {
        return Err(AppError::BadRequest("reply body is required".to_string()));
    }

    let reply = Reply {
        id: new_doc_id(),
        author_id: author.id.clone(),
        author_name: author.display_name.clone(),
        body: body.to_string(),
        stance: new.stance,
        created_at: Utc::now(),
    };
    let path = motion_ref.replies()?.doc(&reply.id)?;
    let data = encode(&reply)?;

    let reads = [motion_ref.committee_path()?, motion_ref.doc_path()?];
    store::run_transaction(store, &reads, |docs| {
        let motion: Motion = match (docs.first(), docs.get(1)) {
            (Some(Some(_)), Some(Some(doc))) => decode(doc)?,
            _ => return Err(AppError::NotFound),
        };
        if motion.status == MotionStatus::Deleted {
            return Err(AppError::Conflict("motion has been deleted".to_string()));
        }
        let write = TxWrite::Set {
            path: path.clone(),
            data: data.clone(),
            merge: false,
        };
        Ok(((), vec![write]))
    })
    .await?;

    log::info!("Reply {} on motion {} by {}", reply.id, motion_ref.motion_id, author.id);
    Ok(reply)
}

/// Replies on a motion, oldest first.
pub async fn list_replies(
    store: &dyn DocumentStore,
    motion_ref: &MotionRef,
) -> Result<Vec<Reply>, AppError> {
    let mut replies: Vec<Reply> = store::list_as(store, &motion_ref.replies()?).await?;
    replies.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(replies)
}
