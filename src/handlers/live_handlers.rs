use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::Message;

use crate::auth::identity::IdentityContext;
use crate::errors::AppError;
use crate::models::committee;
use crate::models::motion::{self, MotionRef};
use crate::models::paths;
use crate::responses::MotionResponse;
use crate::store::{ChangeEvent, ChangeKind, DocumentStore};

/// Motion id for a change anywhere under `committees/{cid}/motions/{mid}`.
fn motion_id_of<'a>(motions_prefix: &str, path: &'a str) -> Option<&'a str> {
    path.strip_prefix(motions_prefix)?
        .strip_prefix('/')?
        .split('/')
        .next()
        .filter(|id| !id.is_empty())
}

/// Build the frame pushed to the client. Changes to a motion, its votes or
/// its replies are reported against the motion path only, since a ballot's
/// document id is the voter id. Set events carry the motion as it now stands.
async fn change_frame(
    store: &dyn DocumentStore,
    committee_id: &str,
    motions_prefix: &str,
    event: ChangeEvent,
) -> serde_json::Value {
    let motion_id = motion_id_of(motions_prefix, &event.path);
    let (path, kind) = match motion_id {
        Some(id) => {
            let motion_path = format!("{motions_prefix}/{id}");
            // A removed ballot or reply still leaves the motion in place.
            let kind = if event.path == motion_path {
                event.kind
            } else {
                ChangeKind::Set
            };
            (motion_path, kind)
        }
        None => (event.path.clone(), event.kind),
    };

    let motion = match (kind, motion_id) {
        (ChangeKind::Set, Some(motion_id)) => {
            let motion_ref = MotionRef::new(committee_id, motion_id);
            match motion::find_by_id(store, &motion_ref).await {
                Ok(found) => found.map(MotionResponse::from),
                Err(e) => {
                    log::warn!("Live feed could not load motion {motion_id}: {e}");
                    None
                }
            }
        }
        _ => None,
    };
    serde_json::json!({
        "type": "change",
        "path": path,
        "kind": kind,
        "motion_id": motion_id,
        "motion": motion,
    })
}

/// GET /ws/committees/{cid}/motions - WebSocket feed of motion changes.
pub async fn motion_feed(
    req: HttpRequest,
    body: web::Payload,
    identity: IdentityContext,
    store: web::Data<dyn DocumentStore>,
    path: web::Path<String>,
) -> Result<HttpResponse, actix_web::Error> {
    identity.require()?;
    let committee_id = path.into_inner();
    let found = committee::require_committee(store.get_ref(), &committee_id).await?;
    committee::require_membership(&found, &identity)?;

    let collection = paths::motions(&committee_id).map_err(AppError::from)?;
    let mut subscription = store.subscribe(&collection);
    let motions_prefix = collection.to_string();

    let (response, mut ws_session, mut msg_stream) = actix_ws::handle(&req, body)?;
    log::debug!("Live feed opened for committee {committee_id}");

    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                change = subscription.next() => {
                    let Some(event) = change else { break };
                    let frame =
                        change_frame(store.get_ref(), &committee_id, &motions_prefix, event).await;
                    if ws_session.text(frame.to_string()).await.is_err() {
                        break;
                    }
                }
                Some(Ok(msg)) = msg_stream.recv() => {
                    match msg {
                        Message::Ping(bytes) => {
                            if ws_session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Message::Close(_) => break,
                        // Mutations go through the HTTP API, not the socket.
                        Message::Text(_) => {}
                        _ => {}
                    }
                }
                else => break,
            }
        }

        let _ = ws_session.close(None).await;
        log::debug!("Live feed closed for committee {committee_id}");
    });

    Ok(response)
}
