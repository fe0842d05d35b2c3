//! Narrow interface onto the backing document store.
//!
//! Everything the governance core needs from persistence goes through
//! [`DocumentStore`]: point reads and writes, collection listing, change
//! subscriptions and a single atomic read-modify-write primitive.
//!
//! ## Transactions
//!
//! [`DocumentStore::transaction`] reads a consistent snapshot of the listed
//! documents, hands it to a synchronous body, and applies the writes the body
//! returns as one atomic unit. Adapters detect write conflicts and re-run the
//! body on a fresh snapshot until their attempt budget is spent, so a body
//! must be free of side effects other than its returned [`TxDecision`].
//! Callers never retry on their own.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tokio::sync::broadcast;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Attempt budget for a transaction when none is configured.
pub const DEFAULT_TX_ATTEMPTS: u32 = 5;

const CHANGE_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Write conflict that outlasted the adapter's retry budget.
    Conflict,
    /// Backend unreachable or pool exhausted.
    Unavailable(String),
    /// `update` targeted a document that does not exist.
    NotFound(String),
    /// A path segment was empty or contained `/`.
    InvalidPath(String),
    /// Stored data did not match the expected shape.
    Decode(String),
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict => write!(f, "Transaction conflict: retry budget exhausted"),
            StoreError::Unavailable(e) => write!(f, "Store unavailable: {e}"),
            StoreError::NotFound(path) => write!(f, "Document not found: {path}"),
            StoreError::InvalidPath(segment) => write!(f, "Invalid path segment: {segment:?}"),
            StoreError::Decode(e) => write!(f, "Decode error: {e}"),
            StoreError::Backend(e) => write!(f, "Store error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// True when `segment` can be used as a single path component.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains('/')
}

fn check_segment(segment: &str) -> StoreResult<()> {
    if is_valid_segment(segment) {
        Ok(())
    } else {
        Err(StoreError::InvalidPath(segment.to_string()))
    }
}

/// Path to a collection: an odd number of segments (`committees`,
/// `committees/{id}/motions`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn root(name: &str) -> StoreResult<Self> {
        check_segment(name)?;
        Ok(CollectionPath(name.to_string()))
    }

    pub fn doc(&self, id: &str) -> StoreResult<DocPath> {
        check_segment(id)?;
        Ok(DocPath(format!("{}/{}", self.0, id)))
    }

    /// True when `path` lies anywhere beneath this collection.
    pub fn contains(&self, path: &str) -> bool {
        path.strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path to a single document: an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Rebuild a path read back from the backend, which only ever holds
    /// paths produced by [`CollectionPath::doc`].
    pub(crate) fn from_stored(path: String) -> Self {
        DocPath(path)
    }

    /// Sub-collection nested under this document.
    pub fn collection(&self, name: &str) -> StoreResult<CollectionPath> {
        check_segment(name)?;
        Ok(CollectionPath(format!("{}/{}", self.0, name)))
    }

    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Generate a random 20-character hex document id.
pub fn new_doc_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 10] = rng.random();
    hex::encode(bytes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Set,
    Deleted,
}

/// A committed change to one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub path: String,
    pub kind: ChangeKind,
}

pub(crate) fn change_feed() -> broadcast::Sender<ChangeEvent> {
    broadcast::channel(CHANGE_FEED_CAPACITY).0
}

/// Change notifications for every document beneath one collection.
pub struct Subscription {
    collection: CollectionPath,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub(crate) fn new(collection: CollectionPath, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Subscription { collection, rx }
    }

    /// Wait for the next matching change. Returns `None` once the store
    /// shuts its feed down.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if self.collection.contains(&event.path) => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Subscription on {} lagged, {} change(s) dropped",
                        self.collection,
                        skipped
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// One write inside a transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxWrite {
    /// Create or replace the document. With `merge`, top-level fields are
    /// merged into an existing document instead.
    Set { path: DocPath, data: Value, merge: bool },
    /// Merge top-level fields into an existing document; fails with
    /// [`StoreError::NotFound`] when the document is absent.
    Update { path: DocPath, fields: Map<String, Value> },
    Delete { path: DocPath },
}

impl TxWrite {
    pub fn path(&self) -> &DocPath {
        match self {
            TxWrite::Set { path, .. } | TxWrite::Update { path, .. } | TxWrite::Delete { path } => path,
        }
    }

    pub(crate) fn change_event(&self) -> ChangeEvent {
        let kind = match self {
            TxWrite::Delete { .. } => ChangeKind::Deleted,
            _ => ChangeKind::Set,
        };
        ChangeEvent {
            path: self.path().to_string(),
            kind,
        }
    }
}

/// What a transaction body decided after looking at its snapshot.
#[derive(Debug)]
pub enum TxDecision {
    Commit(Vec<TxWrite>),
    Abort,
}

/// Transaction body: receives the snapshot (one slot per requested path, in
/// order; `None` for absent documents). May run more than once.
pub type TxBody<'a> = dyn FnMut(&[Option<Value>]) -> TxDecision + Send + 'a;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Value>>;

    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> StoreResult<()>;

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> StoreResult<()>;

    async fn delete(&self, path: &DocPath) -> StoreResult<()>;

    /// Direct children of `collection`, ordered by path.
    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<(DocPath, Value)>>;

    /// Atomic read-modify-write. Returns `Ok(true)` when the body's writes
    /// committed, `Ok(false)` when the body aborted, and
    /// `Err(StoreError::Conflict)` when conflicts outlasted the retry budget.
    async fn transaction(&self, reads: &[DocPath], body: &mut TxBody<'_>) -> StoreResult<bool>;

    fn subscribe(&self, collection: &CollectionPath) -> Subscription;
}

pub fn decode<T: DeserializeOwned>(value: &Value) -> StoreResult<T> {
    Ok(T::deserialize(value)?)
}

pub fn encode<T: Serialize>(record: &T) -> StoreResult<Value> {
    Ok(serde_json::to_value(record)?)
}

pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &DocPath,
) -> StoreResult<Option<T>> {
    store.get(path).await?.as_ref().map(decode::<T>).transpose()
}

pub async fn list_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    collection: &CollectionPath,
) -> StoreResult<Vec<T>> {
    store
        .list(collection)
        .await?
        .iter()
        .map(|(_, value)| decode(value))
        .collect()
}

/// Run a transaction whose body either produces a result plus the writes to
/// commit, or a domain error that aborts it. The error of the final attempt
/// is the one returned.
pub async fn run_transaction<T, E, F>(
    store: &dyn DocumentStore,
    reads: &[DocPath],
    mut plan: F,
) -> Result<T, E>
where
    T: Send,
    E: From<StoreError> + Send,
    F: FnMut(&[Option<Value>]) -> Result<(T, Vec<TxWrite>), E> + Send,
{
    let mut outcome: Option<Result<T, E>> = None;
    store
        .transaction(reads, &mut |docs| match plan(docs) {
            Ok((value, writes)) => {
                outcome = Some(Ok(value));
                TxDecision::Commit(writes)
            }
            Err(err) => {
                outcome = Some(Err(err));
                TxDecision::Abort
            }
        })
        .await?;

    match outcome {
        Some(result) => result,
        None => Err(StoreError::Backend("transaction body never ran".to_string()).into()),
    }
}

/// Merge top-level `fields` into `target`, replacing it when it is not an
/// object.
pub(crate) fn merge_fields(target: &mut Value, fields: Map<String, Value>) {
    match target {
        Value::Object(existing) => existing.extend(fields),
        other => *other = Value::Object(fields),
    }
}
