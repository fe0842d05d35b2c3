//! In-process document store.
//!
//! Backs tests and single-node development. A single mutex over the whole
//! document map makes every transaction trivially serializable; conflicts
//! only happen when a test injects them with [`MemoryStore::inject_conflicts`],
//! which exercises the same retry path a networked backend takes.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;

use super::{
    change_feed, merge_fields, ChangeEvent, CollectionPath, DocPath, DocumentStore, StoreError,
    StoreResult, Subscription, TxBody, TxDecision, TxWrite, DEFAULT_TX_ATTEMPTS,
};

type Documents = BTreeMap<String, Value>;

pub struct MemoryStore {
    docs: Mutex<Documents>,
    changes: broadcast::Sender<ChangeEvent>,
    max_attempts: u32,
    injected_conflicts: AtomicU32,
    transaction_attempts: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_max_attempts(DEFAULT_TX_ATTEMPTS)
    }

    pub fn with_max_attempts(max_attempts: u32) -> Self {
        MemoryStore {
            docs: Mutex::new(BTreeMap::new()),
            changes: change_feed(),
            max_attempts: max_attempts.max(1),
            injected_conflicts: AtomicU32::new(0),
            transaction_attempts: AtomicU32::new(0),
        }
    }

    /// Make the next `count` transaction attempts fail at commit time as if
    /// another writer had touched the snapshot.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Total transaction attempts made so far, retries included.
    pub fn transaction_attempts(&self) -> u32 {
        self.transaction_attempts.load(Ordering::SeqCst)
    }

    /// Number of documents currently stored.
    pub fn len(&self) -> usize {
        self.lock().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Documents>> {
        self.docs
            .lock()
            .map_err(|_| StoreError::Backend("memory store lock poisoned".to_string()))
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn publish(&self, events: Vec<ChangeEvent>) {
        for event in events {
            // No receivers is fine.
            let _ = self.changes.send(event);
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject a write batch that would `update` a missing document, before any
/// of it is applied.
fn validate_writes(docs: &Documents, writes: &[TxWrite]) -> StoreResult<()> {
    let mut exists: HashMap<&str, bool> = HashMap::new();
    for write in writes {
        match write {
            TxWrite::Set { path, .. } => {
                exists.insert(path.as_str(), true);
            }
            TxWrite::Delete { path } => {
                exists.insert(path.as_str(), false);
            }
            TxWrite::Update { path, .. } => {
                let present = exists
                    .get(path.as_str())
                    .copied()
                    .unwrap_or_else(|| docs.contains_key(path.as_str()));
                if !present {
                    return Err(StoreError::NotFound(path.to_string()));
                }
            }
        }
    }
    Ok(())
}

fn apply_write(docs: &mut Documents, write: TxWrite) {
    match write {
        TxWrite::Set { path, data, merge } => {
            let key = path.as_str();
            if merge && data.is_object() && docs.contains_key(key) {
                if let (Some(existing), Value::Object(fields)) = (docs.get_mut(key), data) {
                    merge_fields(existing, fields);
                }
            } else {
                docs.insert(key.to_string(), data);
            }
        }
        TxWrite::Update { path, fields } => {
            if let Some(existing) = docs.get_mut(path.as_str()) {
                merge_fields(existing, fields);
            }
        }
        TxWrite::Delete { path } => {
            docs.remove(path.as_str());
        }
    }
}

impl MemoryStore {
    fn commit(&self, writes: Vec<TxWrite>) -> StoreResult<()> {
        let events = {
            let mut docs = self.lock()?;
            validate_writes(&docs, &writes)?;
            let events: Vec<ChangeEvent> = writes.iter().map(TxWrite::change_event).collect();
            for write in writes {
                apply_write(&mut docs, write);
            }
            events
        };
        self.publish(events);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Value>> {
        Ok(self.lock()?.get(path.as_str()).cloned())
    }

    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> StoreResult<()> {
        self.commit(vec![TxWrite::Set {
            path: path.clone(),
            data,
            merge,
        }])
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> StoreResult<()> {
        self.commit(vec![TxWrite::Update {
            path: path.clone(),
            fields,
        }])
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.commit(vec![TxWrite::Delete { path: path.clone() }])
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<(DocPath, Value)>> {
        let docs = self.lock()?;
        let items = docs
            .iter()
            .filter(|(path, _)| {
                path.strip_prefix(collection.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .is_some_and(|id| !id.contains('/'))
            })
            .map(|(path, data)| (DocPath::from_stored(path.clone()), data.clone()))
            .collect();
        Ok(items)
    }

    async fn transaction(&self, reads: &[DocPath], body: &mut TxBody<'_>) -> StoreResult<bool> {
        for attempt in 1..=self.max_attempts {
            self.transaction_attempts.fetch_add(1, Ordering::SeqCst);

            let events = {
                let mut docs = self.lock()?;
                let snapshot: Vec<Option<Value>> = reads
                    .iter()
                    .map(|path| docs.get(path.as_str()).cloned())
                    .collect();

                let decision = body(&snapshot);

                if self.take_injected_conflict() {
                    log::debug!("Memory store: conflict on attempt {attempt}, retrying");
                    continue;
                }

                match decision {
                    TxDecision::Abort => return Ok(false),
                    TxDecision::Commit(writes) => {
                        validate_writes(&docs, &writes)?;
                        let events: Vec<ChangeEvent> =
                            writes.iter().map(TxWrite::change_event).collect();
                        for write in writes {
                            apply_write(&mut docs, write);
                        }
                        events
                    }
                }
            };

            self.publish(events);
            return Ok(true);
        }

        log::warn!(
            "Memory store: transaction gave up after {} attempts",
            self.max_attempts
        );
        Err(StoreError::Conflict)
    }

    fn subscribe(&self, collection: &CollectionPath) -> Subscription {
        Subscription::new(collection.clone(), self.changes.subscribe())
    }
}
