use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::audit;
use crate::auth::gate::MotionAction;
use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee;
use crate::models::motion::{self, MotionRef, MotionStatus, NewMotion};
use crate::responses::{ListResponse, MotionResponse};
use crate::store::DocumentStore;

#[derive(Debug, Deserialize)]
pub struct MotionListQuery {
    pub status: Option<String>,
}

/// GET /api/v1/committees/{cid}/motions - optional `?status=` filter
pub async fn list(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
    query: web::Query<MotionListQuery>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let committee_id = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    committee::require_membership(&found, &identity)?;

    let status = match query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Some(
            MotionStatus::parse(raw)
                .ok_or_else(|| AppError::BadRequest(format!("unknown motion status '{raw}'")))?,
        ),
        None => None,
    };

    let motions = motion::list_for_committee(store.get_ref(), &committee_id, status).await?;
    let items: Vec<MotionResponse> = motions.into_iter().map(MotionResponse::from).collect();
    Ok(HttpResponse::Ok().json(ListResponse::from(items)))
}

/// POST /api/v1/committees/{cid}/motions
pub async fn create(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
    body: web::Json<NewMotion>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let found = committee::require_committee(store.get_ref(), &path.into_inner()).await?;
    let created = motion::create(store.get_ref(), &identity, &found, body.into_inner()).await?;

    let details = serde_json::json!({
        "committee_id": found.id,
        "title": created.title,
        "threshold": created.threshold,
    });
    let _ = audit::log(store.get_ref(), &caller.id, "motion.created", "motion", &created.id, details).await;

    Ok(HttpResponse::Created().json(MotionResponse::from(created)))
}

/// GET /api/v1/committees/{cid}/motions/{mid} - motion with its evaluation
pub async fn read(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    committee::require_membership(&found, &identity)?;

    let motion_ref = MotionRef::new(committee_id, motion_id);
    let current = motion::require_motion(store.get_ref(), &motion_ref).await?;
    Ok(HttpResponse::Ok().json(MotionResponse::from(current)))
}

/// POST /api/v1/committees/{cid}/motions/{mid}/second
pub async fn second(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let (committee_id, motion_id) = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    let motion_ref = MotionRef::new(committee_id, motion_id);
    let seconded = motion::second(store.get_ref(), &identity, &found, &motion_ref).await?;

    let details = serde_json::json!({ "committee_id": found.id });
    let _ = audit::log(store.get_ref(), &caller.id, "motion.seconded", "motion", &seconded.id, details).await;

    Ok(HttpResponse::Ok().json(MotionResponse::from(seconded)))
}

async fn apply_action(
    store: &dyn DocumentStore,
    identity: &IdentityContext,
    committee_id: String,
    motion_id: String,
    action: MotionAction,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let found = committee::require_committee(store, &committee_id).await?;
    let motion_ref = MotionRef::new(committee_id, motion_id);
    let updated = motion::transition(store, identity, &found, &motion_ref, action).await?;

    let details = serde_json::json!({
        "committee_id": found.id,
        "status": updated.status,
    });
    let audit_action = format!("motion.{}", action.as_str());
    let _ = audit::log(store, &caller.id, &audit_action, "motion", &updated.id, details).await;

    Ok(HttpResponse::Ok().json(MotionResponse::from(updated)))
}

/// POST /api/v1/committees/{cid}/motions/{mid}/{action} - close, approve or deny
pub async fn act(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, AppError> {
    let (committee_id, motion_id, segment) = path.into_inner();
    let action = MotionAction::from_route(&segment).ok_or(AppError::NotFound)?;
    apply_action(store.get_ref(), &identity, committee_id, motion_id, action).await
}

/// DELETE /api/v1/committees/{cid}/motions/{mid} - marks the motion deleted
pub async fn delete(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (committee_id, motion_id) = path.into_inner();
    apply_action(store.get_ref(), &identity, committee_id, motion_id, MotionAction::Delete).await
}
