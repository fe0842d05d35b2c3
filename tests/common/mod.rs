//! Shared test infrastructure for model and API tests.
//!
//! - `setup_store()` - empty in-memory document store
//! - `seed_committee()` - committee with an owner, a chair and a member
//! - `seed_motion()` - active motion proposed by the plain member

#![allow(dead_code)]

use std::sync::Arc;

use motionhall::auth::identity::IdentityContext;
use motionhall::models::committee::{self, Committee, MemberRole, NewCommittee, NewMember};
use motionhall::models::motion::{self, Motion, MotionRef, NewMotion};
use motionhall::models::threshold::VoteThreshold;
use motionhall::store::MemoryStore;

// ============================================================================
// TEST IDENTITIES
// ============================================================================

pub const OWNER: &str = "olivia";
pub const CHAIR: &str = "charles";
pub const MEMBER: &str = "maria";
pub const OTHER_MEMBER: &str = "mateo";
pub const OUTSIDER: &str = "oscar";

pub fn as_user(id: &str) -> IdentityContext {
    IdentityContext::authenticated(id, id.to_uppercase())
}

pub fn owner() -> IdentityContext {
    as_user(OWNER)
}

pub fn chair() -> IdentityContext {
    as_user(CHAIR)
}

pub fn member() -> IdentityContext {
    as_user(MEMBER)
}

pub fn other_member() -> IdentityContext {
    as_user(OTHER_MEMBER)
}

pub fn outsider() -> IdentityContext {
    as_user(OUTSIDER)
}

pub fn anonymous() -> IdentityContext {
    IdentityContext::unresolved()
}

// ============================================================================
// STORE SETUP
// ============================================================================

pub fn setup_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Committee owned by [`OWNER`] with [`CHAIR`] as chair and two plain
/// members.
pub async fn seed_committee(store: &MemoryStore) -> Committee {
    let owner = owner();
    let created = committee::create(
        store,
        &owner,
        NewCommittee {
            name: "Budget Committee".to_string(),
            description: "Annual budget review".to_string(),
            settings: Default::default(),
        },
    )
    .await
    .expect("create committee");

    for (user_id, role) in [
        (CHAIR, MemberRole::Chair),
        (MEMBER, MemberRole::Member),
        (OTHER_MEMBER, MemberRole::Member),
    ] {
        committee::add_member(
            store,
            &owner,
            &created.id,
            NewMember {
                user_id: user_id.to_string(),
                display_name: Some(user_id.to_uppercase()),
                role: Some(role),
            },
        )
        .await
        .expect("add member");
    }

    committee::require_committee(store, &created.id)
        .await
        .expect("reload committee")
}

pub fn new_motion(title: &str) -> NewMotion {
    NewMotion {
        title: title.to_string(),
        description: String::new(),
        motion_type: Default::default(),
        threshold: None,
        requires_discussion: false,
        requires_second: None,
    }
}

/// Active motion proposed by [`MEMBER`].
pub async fn seed_motion(store: &MemoryStore, committee: &Committee) -> Motion {
    motion::create(store, &member(), committee, new_motion("Approve the budget"))
        .await
        .expect("create motion")
}

pub async fn seed_motion_with_threshold(
    store: &MemoryStore,
    committee: &Committee,
    threshold: VoteThreshold,
) -> Motion {
    let mut new = new_motion("Amend the bylaws");
    new.threshold = Some(threshold);
    motion::create(store, &member(), committee, new)
        .await
        .expect("create motion")
}

pub async fn reload(store: &MemoryStore, motion: &Motion) -> Motion {
    motion::require_motion(store, &MotionRef::from(motion))
        .await
        .expect("reload motion")
}
