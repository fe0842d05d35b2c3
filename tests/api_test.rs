//! HTTP API tests.
//!
//! Drives the actix app in-process against the in-memory store and checks
//! status codes for each error class, the JSON content-type guard and the
//! full motion lifecycle.

mod common;

use std::sync::Arc;

use actix_web::{test, web, App};
use serde_json::{json, Value};

use motionhall::handlers;
use motionhall::models::committee;
use motionhall::models::motion::MotionRef;
use motionhall::models::vote::{self, VoteChoice};
use motionhall::store::{DocumentStore, MemoryStore};
use common::*;

const JSON: (&str, &str) = ("content-type", "application/json");

fn app_data(store: &Arc<MemoryStore>) -> web::Data<dyn DocumentStore> {
    let shared: Arc<dyn DocumentStore> = store.clone();
    web::Data::from(shared)
}

macro_rules! init_app {
    ($store:expr) => {
        test::init_service(
            App::new()
                .app_data(app_data(&$store))
                .configure(handlers::configure),
        )
        .await
    };
}

fn motion_uri(motion_ref: &MotionRef, suffix: &str) -> String {
    format!(
        "/api/v1/committees/{}/motions/{}{}",
        motion_ref.committee_id, motion_ref.motion_id, suffix
    )
}

// ============================================================================
// BASICS
// ============================================================================

#[actix_web::test]
async fn test_health() {
    let store = setup_store();
    let app = init_app!(store);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_requests_without_identity_are_401() {
    let store = setup_store();
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/committees")
        .set_json(json!({ "name": "Finance" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Not authenticated");
}

#[actix_web::test]
async fn test_mutations_require_json_content_type() {
    let store = setup_store();
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/committees")
        .insert_header(("x-user-id", OWNER))
        .insert_header(("content-type", "application/x-www-form-urlencoded"))
        .set_payload("name=Finance")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    assert!(store.is_empty());
}

#[actix_web::test]
async fn test_malformed_json_is_400() {
    let store = setup_store();
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/committees")
        .insert_header(("x-user-id", OWNER))
        .insert_header(JSON)
        .set_payload("{ not json")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
async fn test_create_and_list_committees() {
    let store = setup_store();
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri("/api/v1/committees")
        .insert_header(("x-user-id", OWNER))
        .insert_header(("x-user-name", "Olivia"))
        .set_json(json!({ "name": "Finance", "settings": { "default_threshold": "Two-Thirds" } }))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(created["owner_id"], OWNER);
    assert_eq!(created["settings"]["default_threshold"], "Two-Thirds");
    assert_eq!(created["members"][0]["display_name"], "Olivia");

    let req = test::TestRequest::get()
        .uri("/api/v1/committees")
        .insert_header(("x-user-id", OWNER))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["total"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/committees")
        .insert_header(("x-user-id", OUTSIDER))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["total"], 0);

    // Creating a committee leaves an audit entry behind.
    let committee_id = created["id"].as_str().expect("id");
    let entries = motionhall::audit::find_for_target(store.as_ref(), "committee", committee_id)
        .await
        .expect("audit");
    assert_eq!(entries.len(), 1);
}

// ============================================================================
// ERROR CLASSES
// ============================================================================

#[actix_web::test]
async fn test_outsider_gets_403_and_missing_records_404() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);
    let app = init_app!(store);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/committees/{}", committee.id))
        .insert_header(("x-user-id", OUTSIDER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/votes"))
        .insert_header(("x-user-id", OUTSIDER))
        .set_json(json!({ "choice": "yes" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri("/api/v1/committees/nosuchcommittee")
        .insert_header(("x-user-id", OWNER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let missing = MotionRef::new(committee.id.clone(), "nosuchmotion");
    let req = test::TestRequest::get()
        .uri(&motion_uri(&missing, ""))
        .insert_header(("x-user-id", OWNER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/adjourn"))
        .insert_header(("x-user-id", OWNER))
        .insert_header(JSON)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_own_ballot_is_members_only() {
    let store = setup_store();
    let seeded = seed_committee(&store).await;
    let created = seed_motion(&store, &seeded).await;
    let motion_ref = MotionRef::from(&created);

    vote::cast_vote(store.as_ref(), &member(), &motion_ref, VoteChoice::Yes, false)
        .await
        .expect("vote");
    committee::remove_member(store.as_ref(), &owner(), &seeded.id, MEMBER)
        .await
        .expect("remove member");
    let app = init_app!(store);

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, "/votes/me"))
        .insert_header(("x-user-id", MEMBER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, "/votes/me"))
        .insert_header(("x-user-id", OUTSIDER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let gone = MotionRef::new("nosuchcommittee", motion_ref.motion_id.clone());
    let req = test::TestRequest::get()
        .uri(&motion_uri(&gone, "/votes/me"))
        .insert_header(("x-user-id", MEMBER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}

#[actix_web::test]
async fn test_empty_title_is_400_and_bad_status_filter_is_400() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/committees/{}/motions", committee.id))
        .insert_header(("x-user-id", MEMBER))
        .set_json(json!({ "title": "   " }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/committees/{}/motions?status=pending", committee.id))
        .insert_header(("x-user-id", MEMBER))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);
}

// ============================================================================
// MOTION LIFECYCLE
// ============================================================================

#[actix_web::test]
async fn test_motion_lifecycle_over_http() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/committees/{}/motions", committee.id))
        .insert_header(("x-user-id", MEMBER))
        .set_json(json!({ "title": "Buy a new printer", "type": "Main" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "active");
    assert_eq!(created["evaluation"]["passing"], false);
    let motion_ref = MotionRef::new(
        committee.id.clone(),
        created["id"].as_str().expect("motion id"),
    );

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/second"))
        .insert_header(("x-user-id", CHAIR))
        .insert_header(JSON)
        .to_request();
    let seconded: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(seconded["seconded_by"]["id"], CHAIR);

    for (voter, choice) in [(OWNER, "yes"), (CHAIR, "yes"), (MEMBER, "no")] {
        let req = test::TestRequest::post()
            .uri(&motion_uri(&motion_ref, "/votes"))
            .insert_header(("x-user-id", voter))
            .set_json(json!({ "choice": choice }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
    }

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, "/votes/me"))
        .insert_header(("x-user-id", MEMBER))
        .to_request();
    let mine: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(mine["choice"], "no");

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, ""))
        .insert_header(("x-user-id", OTHER_MEMBER))
        .to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["tally"], json!({ "yes": 2, "no": 1, "abstain": 0 }));
    assert_eq!(detail["evaluation"], json!({ "required": 2, "passing": true, "total": 3 }));

    // A plain member cannot close.
    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/close"))
        .insert_header(("x-user-id", MEMBER))
        .insert_header(JSON)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    // Approval needs the motion closed first.
    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/approve"))
        .insert_header(("x-user-id", CHAIR))
        .insert_header(JSON)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/close"))
        .insert_header(("x-user-id", CHAIR))
        .insert_header(JSON)
        .to_request();
    let closed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(closed["status"], "closed");

    // Voting is over once closed.
    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/votes"))
        .insert_header(("x-user-id", OTHER_MEMBER))
        .set_json(json!({ "choice": "yes" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/approve"))
        .insert_header(("x-user-id", OWNER))
        .insert_header(JSON)
        .to_request();
    let approved: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(approved["status"], "completed");

    let req = test::TestRequest::delete()
        .uri(&motion_uri(&motion_ref, ""))
        .insert_header(("x-user-id", OWNER))
        .insert_header(JSON)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 409);

    let entries = motionhall::audit::find_for_target(store.as_ref(), "motion", &motion_ref.motion_id)
        .await
        .expect("audit");
    let actions: Vec<&str> = entries.iter().map(|e| e.action.as_str()).collect();
    assert!(actions.contains(&"motion.created"));
    assert!(actions.contains(&"motion.seconded"));
    assert!(actions.contains(&"motion.close"));
    assert!(actions.contains(&"motion.approve"));
}

#[actix_web::test]
async fn test_anonymous_ballot_downgraded_when_not_allowed() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/votes"))
        .insert_header(("x-user-id", CHAIR))
        .set_json(json!({ "choice": "abstain", "anonymous": true }))
        .to_request();
    let cast: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(cast["tally"]["abstain"], 1);

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, "/votes"))
        .insert_header(("x-user-id", OWNER))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["items"][0]["voter_id"], CHAIR);
    assert_eq!(listed["items"][0]["anonymous"], false);
}

#[actix_web::test]
async fn test_replies_over_http() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    let created = seed_motion(&store, &committee).await;
    let motion_ref = MotionRef::from(&created);
    let app = init_app!(store);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/replies"))
        .insert_header(("x-user-id", OTHER_MEMBER))
        .set_json(json!({ "body": "Seems expensive", "stance": "con" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let req = test::TestRequest::post()
        .uri(&motion_uri(&motion_ref, "/replies"))
        .insert_header(("x-user-id", OTHER_MEMBER))
        .set_json(json!({ "body": "" }))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 400);

    let req = test::TestRequest::get()
        .uri(&motion_uri(&motion_ref, "/replies"))
        .insert_header(("x-user-id", MEMBER))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listed["total"], 1);
    assert_eq!(listed["items"][0]["stance"], "con");
}

#[actix_web::test]
async fn test_committee_delete_over_http() {
    let store = setup_store();
    let committee = seed_committee(&store).await;
    seed_motion(&store, &committee).await;
    let app = init_app!(store);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/committees/{}", committee.id))
        .insert_header(("x-user-id", CHAIR))
        .insert_header(JSON)
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 403);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/committees/{}", committee.id))
        .insert_header(("x-user-id", OWNER))
        .insert_header(JSON)
        .to_request();
    let deleted: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(deleted["removed"], 2);
}
