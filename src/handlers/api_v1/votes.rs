use actix_web::{web, HttpResponse};

use crate::audit;
use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee;
use crate::models::motion::{self, MotionRef};
use crate::models::vote::{self, CastVote};
use crate::responses::{ListResponse, TallyResponse};
use crate::store::DocumentStore;

/// POST /api/v1/committees/{cid}/motions/{mid}/votes
///
/// Members only, on active motions. An anonymous ballot is recorded as a
/// named one when the committee does not allow anonymous voting.
pub async fn cast(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
    body: web::Json<CastVote>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    let voter = committee::require_membership(&found, &identity)?;

    let motion_ref = MotionRef::new(committee_id, motion_id);
    let ballot = body.into_inner();
    let anonymous = ballot.anonymous && found.settings.allow_anonymous_voting;
    let tally =
        vote::cast_vote_on_active(store.get_ref(), &identity, &motion_ref, ballot.choice, anonymous)
            .await?;

    // Anonymous ballots leave no choice in the audit trail.
    let details = if anonymous {
        serde_json::json!({ "committee_id": found.id, "anonymous": true })
    } else {
        serde_json::json!({ "committee_id": found.id, "choice": ballot.choice })
    };
    let _ = audit::log(store.get_ref(), &voter.id, "motion.vote_cast", "motion", &motion_ref.motion_id, details).await;

    Ok(HttpResponse::Ok().json(TallyResponse {
        motion_id: motion_ref.motion_id,
        tally,
    }))
}

/// GET /api/v1/committees/{cid}/motions/{mid}/votes
pub async fn list(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    committee::require_membership(&found, &identity)?;

    let motion_ref = MotionRef::new(committee_id, motion_id);
    motion::require_motion(store.get_ref(), &motion_ref).await?;
    let votes = vote::list_votes(store.get_ref(), &motion_ref).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(votes)))
}

/// GET /api/v1/committees/{cid}/motions/{mid}/votes/me
pub async fn mine(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    let caller = committee::require_membership(&found, &identity)?;

    let motion_ref = MotionRef::new(committee_id, motion_id);
    let ballot = vote::find_vote(store.get_ref(), &motion_ref, &caller.id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(HttpResponse::Ok().json(ballot))
}
