//! Append-only audit trail stored under `audit/{id}`.
//!
//! Callers treat audit writes as best-effort: a failed write is logged here
//! and never fails the action being recorded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::paths;
use crate::store::{self, encode, new_doc_id, DocumentStore, StoreResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    #[serde(default)]
    pub details: Value,
    pub recorded_at: DateTime<Utc>,
}

pub async fn log(
    store: &dyn DocumentStore,
    actor_id: &str,
    action: &str,
    target_type: &str,
    target_id: &str,
    details: Value,
) -> StoreResult<()> {
    let entry = AuditEntry {
        id: new_doc_id(),
        actor_id: actor_id.to_string(),
        action: action.to_string(),
        target_type: target_type.to_string(),
        target_id: target_id.to_string(),
        details,
        recorded_at: Utc::now(),
    };

    let path = paths::audit()?.doc(&entry.id)?;
    if let Err(err) = store.set(&path, encode(&entry)?, false).await {
        log::warn!("Audit write failed for {action} on {target_type} {target_id}: {err}");
        return Err(err);
    }
    log::info!("AUDIT {actor_id} {action} {target_type}/{target_id}");
    Ok(())
}

/// Entries recorded against one target, oldest first.
pub async fn find_for_target(
    store: &dyn DocumentStore,
    target_type: &str,
    target_id: &str,
) -> StoreResult<Vec<AuditEntry>> {
    let mut entries: Vec<AuditEntry> = store::list_as(store, &paths::audit()?).await?;
    entries.retain(|e| e.target_type == target_type && e.target_id == target_id);
    entries.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
    Ok(entries)
}
