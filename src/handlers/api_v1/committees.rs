use actix_web::{web, HttpResponse};

use crate::audit;
use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee::{self, CommitteeSettings, NewCommittee, NewMember, RoleChange};
use crate::responses::{DeletedResponse, ListResponse};
use crate::store::DocumentStore;

/// GET /api/v1/committees - committees the caller belongs to
pub async fn list(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let committees = committee::list_for_member(store.get_ref(), &caller.id).await?;
    Ok(HttpResponse::Ok().json(ListResponse::from(committees)))
}

/// POST /api/v1/committees
pub async fn create(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    body: web::Json<NewCommittee>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let created = committee::create(store.get_ref(), &identity, body.into_inner()).await?;

    let details = serde_json::json!({
        "name": created.name,
        "summary": "Committee created via API"
    });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.created", "committee", &created.id, details).await;

    Ok(HttpResponse::Created().json(created))
}

/// GET /api/v1/committees/{cid} - members only
pub async fn read(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    identity.require()?;
    let found = committee::require_committee(store.get_ref(), &path.into_inner()).await?;
    committee::require_membership(&found, &identity)?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /api/v1/committees/{cid}/settings
pub async fn update_settings(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
    body: web::Json<CommitteeSettings>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let committee_id = path.into_inner();
    let settings = body.into_inner();
    let updated =
        committee::update_settings(store.get_ref(), &identity, &committee_id, settings.clone()).await?;

    let details = serde_json::json!({ "settings": settings });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.settings_updated", "committee", &committee_id, details).await;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/v1/committees/{cid} - owner only, removes everything beneath
pub async fn delete(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let committee_id = path.into_inner();
    let removed = committee::delete(store.get_ref(), &identity, &committee_id).await?;

    let details = serde_json::json!({ "documents_removed": removed });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.deleted", "committee", &committee_id, details).await;

    Ok(HttpResponse::Ok().json(DeletedResponse {
        id: committee_id,
        removed,
    }))
}

/// POST /api/v1/committees/{cid}/members
pub async fn add_member(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<String>,
    body: web::Json<NewMember>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let committee_id = path.into_inner();
    let new = body.into_inner();
    let member_id = new.user_id.trim().to_string();
    let updated = committee::add_member(store.get_ref(), &identity, &committee_id, new).await?;

    let details = serde_json::json!({
        "user_id": member_id,
        "role": updated.role_of(&member_id),
    });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.member_added", "committee", &committee_id, details).await;

    Ok(HttpResponse::Created().json(updated))
}

/// PUT /api/v1/committees/{cid}/members/{uid}
pub async fn set_member_role(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
    body: web::Json<RoleChange>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let (committee_id, user_id) = path.into_inner();
    let role = body.into_inner().role;
    let updated =
        committee::set_member_role(store.get_ref(), &identity, &committee_id, &user_id, role).await?;

    let details = serde_json::json!({ "user_id": user_id, "role": role });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.member_role_changed", "committee", &committee_id, details).await;

    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /api/v1/committees/{cid}/members/{uid}
pub async fn remove_member(
    store: web::Data<dyn DocumentStore>,
    identity: IdentityContext,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let caller = identity.require()?;
    let (committee_id, user_id) = path.into_inner();
    let updated =
        committee::remove_member(store.get_ref(), &identity, &committee_id, &user_id).await?;

    let details = serde_json::json!({ "user_id": user_id });
    let _ = audit::log(store.get_ref(), &caller.id, "committee.member_removed", "committee", &committee_id, details).await;

    Ok(HttpResponse::Ok().json(updated))
}
