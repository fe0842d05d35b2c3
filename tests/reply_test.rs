//! Discussion tests: replies are member-only, ordered oldest first and
//! closed off once a motion is deleted.

mod common;

use motionhall::auth::gate::MotionAction;
use motionhall::errors::AppError;
use motionhall::models::motion::{self, MotionRef};
use motionhall::models::reply::{self, NewReply, Stance};
use common::*;

fn reply_body(body: &str, stance: Stance) -> NewReply {
    NewReply {
        body: body.to_string(),
        stance,
    }
}

#[tokio::test]
async fn test_replies_are_listed_oldest_first() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);

    let first = reply::add_reply(store.as_ref(), &chair(), &committee, &motion_ref, reply_body("In favour", Stance::Pro))
        .await
        .expect("reply");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = reply::add_reply(store.as_ref(), &other_member(), &committee, &motion_ref, reply_body(" Against ", Stance::Con))
        .await
        .expect("reply");

    assert_eq!(second.body, "Against");
    assert_eq!(second.author_id, OTHER_MEMBER);

    let listed = reply::list_replies(store.as_ref(), &motion_ref)
        .await
        .expect("list");
    let ids: Vec<&str> = listed.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![first.id.as_str(), second.id.as_str()]);
}

#[tokio::test]
async fn test_reply_rejections() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);

    let result = reply::add_reply(store.as_ref(), &outsider(), &committee, &motion_ref, reply_body("Hi", Stance::Neutral)).await;
    assert!(matches!(result, Err(AppError::Unauthorized(_))));

    let result = reply::add_reply(store.as_ref(), &anonymous(), &committee, &motion_ref, reply_body("Hi", Stance::Neutral)).await;
    assert!(matches!(result, Err(AppError::Unauthenticated)));

    let result = reply::add_reply(store.as_ref(), &member(), &committee, &motion_ref, reply_body("   ", Stance::Pro)).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let missing = MotionRef::new(committee.id.clone(), "missing");
    let result = reply::add_reply(store.as_ref(), &member(), &committee, &missing, reply_body("Hi", Stance::Pro)).await;
    assert!(matches!(result, Err(AppError::NotFound)));

    assert!(reply::list_replies(store.as_ref(), &motion_ref)
        .await
        .expect("list")
        .is_empty());
}

#[tokio::test]
async fn test_no_replies_on_deleted_motion() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);

    motion::transition(store.as_ref(), &member(), &committee, &motion_ref, MotionAction::Delete)
        .await
        .expect("delete");

    let result = reply::add_reply(store.as_ref(), &chair(), &committee, &motion_ref, reply_body("Too late", Stance::Con)).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_replies_allowed_on_closed_motion() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);

    motion::transition(store.as_ref(), &chair(), &committee, &motion_ref, MotionAction::Close)
        .await
        .expect("close");
    let added = reply::add_reply(store.as_ref(), &owner(), &committee, &motion_ref, reply_body("For the record", Stance::Neutral))
        .await
        .expect("reply");
    assert_eq!(added.stance, Stance::Neutral);
}
