//! Document layout.
//!
//! ```text
//! committees/{committee_id}
//! committees/{committee_id}/motions/{motion_id}
//! committees/{committee_id}/motions/{motion_id}/votes/{voter_id}
//! committees/{committee_id}/motions/{motion_id}/replies/{reply_id}
//! audit/{entry_id}
//! ```

use crate::store::{CollectionPath, DocPath, StoreResult};

pub const COMMITTEES: &str = "committees";
pub const MOTIONS: &str = "motions";
pub const VOTES: &str = "votes";
pub const REPLIES: &str = "replies";
pub const AUDIT: &str = "audit";

pub fn committees() -> StoreResult<CollectionPath> {
    CollectionPath::root(COMMITTEES)
}

pub fn committee(committee_id: &str) -> StoreResult<DocPath> {
    committees()?.doc(committee_id)
}

pub fn motions(committee_id: &str) -> StoreResult<CollectionPath> {
    committee(committee_id)?.collection(MOTIONS)
}

pub fn audit() -> StoreResult<CollectionPath> {
    CollectionPath::root(AUDIT)
}
