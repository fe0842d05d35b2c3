use actix_web::{web, HttpResponse};

use crate::audit;
use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee;
use crate::models::motion::{self, MotionRef};
use crate::models::reply::{self, NewReply};
use crate::responses::ListResponse;
use crate::store::DocumentStore;

/// GET /api/v1/committees/{cid}/motions/{mid}/replies - oldest first
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
    let replies = reply::list_replies(store.get_ref(), &motion_ref).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(replies)))
}

/// POST /api/v1/committees/{cid}/motions/{mid}/replies
pub async fn create(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
    body: web::Json<NewReply>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    let motion_ref = MotionRef::new(committee_id, motion_id);
    let created =
        reply::add_reply(store.get_ref(), &identity, &found, &motion_ref, body.into_inner()).await?;

    let details = serde_json::json!({
        "committee_id": found.id,
        "reply_id": created.id,
        "stance": created.stance,
    });
    let _ = audit::log(store.get_ref(), &caller.id, "motion.reply_added", "motion", &motion_ref.motion_id, details).await;

    Ok(HttpResponse::Created().json(created))
}
