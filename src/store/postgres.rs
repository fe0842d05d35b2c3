//! PostgreSQL adapter for [`DocumentStore`].
//!
//! Documents live in one `documents` table keyed by path (see
//! `src/schema.sql`). Transactions run at `SERIALIZABLE` isolation and lock
//! the rows they read; PostgreSQL reports conflicting interleavings as
//! serialization failures (`40001`) or deadlocks (`40P01`), which this
//! adapter retries up to its attempt budget. Every write also issues a
//! `pg_notify` inside the same transaction, so change notifications are
//! delivered exactly when the write commits.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgListener;
use sqlx::{PgConnection, PgPool};
use tokio::sync::broadcast;

use super::{
    change_feed, ChangeEvent, CollectionPath, DocPath, DocumentStore, StoreError, StoreResult,
    Subscription, TxBody, TxDecision, TxWrite,
};

const CHANGE_CHANNEL: &str = "document_changes";

pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<ChangeEvent>,
    max_attempts: u32,
}

impl PgStore {
    /// Wrap a migrated pool and start relaying `LISTEN` notifications into
    /// the local change feed.
    pub async fn from_pool(pool: PgPool, max_attempts: u32) -> StoreResult<Self> {
        let changes = change_feed();

        let mut listener = PgListener::connect_with(&pool).await.map_err(map_sqlx)?;
        listener.listen(CHANGE_CHANNEL).await.map_err(map_sqlx)?;
        tokio::spawn(relay_notifications(listener, changes.clone()));

        Ok(PgStore {
            pool,
            changes,
            max_attempts: max_attempts.max(1),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn write_one(&self, write: TxWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        apply_write(&mut *tx, &write).await?;
        tx.commit().await.map_err(map_sqlx)
    }

    async fn attempt(&self, reads: &[DocPath], body: &mut TxBody<'_>) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx)?;

        let mut snapshot = Vec::with_capacity(reads.len());
        for path in reads {
            let data: Option<Value> =
                sqlx::query_scalar("SELECT data FROM documents WHERE path = $1 FOR UPDATE")
                    .bind(path.as_str())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(map_sqlx)?;
            snapshot.push(data);
        }

        match body(&snapshot) {
            TxDecision::Abort => {
                tx.rollback().await.map_err(map_sqlx)?;
                Ok(false)
            }
            TxDecision::Commit(writes) => {
                for write in &writes {
                    apply_write(&mut *tx, write).await?;
                }
                tx.commit().await.map_err(map_sqlx)?;
                Ok(true)
            }
        }
    }
}

async fn relay_notifications(mut listener: PgListener, feed: broadcast::Sender<ChangeEvent>) {
    loop {
        match listener.recv().await {
            Ok(notification) => match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                Ok(event) => {
                    let _ = feed.send(event);
                }
                Err(e) => log::warn!("Ignoring malformed change notification: {e}"),
            },
            Err(e) => {
                log::error!("Change listener stopped: {e}");
                break;
            }
        }
    }
}

/// Translate a sqlx error into the store taxonomy. Serialization failures
/// and deadlocks are the retryable conflicts.
fn map_sqlx(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("40001" | "40P01")) => {
            StoreError::Conflict
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

async fn apply_write(conn: &mut PgConnection, write: &TxWrite) -> StoreResult<()> {
    match write {
        TxWrite::Set { path, data, merge } => {
            let sql = if *merge {
                "INSERT INTO documents (path, collection, data) VALUES ($1, $2, $3) \
                 ON CONFLICT (path) DO UPDATE \
                 SET data = documents.data || EXCLUDED.data, updated_at = NOW()"
            } else {
                "INSERT INTO documents (path, collection, data) VALUES ($1, $2, $3) \
                 ON CONFLICT (path) DO UPDATE \
                 SET data = EXCLUDED.data, updated_at = NOW()"
            };
            sqlx::query(sql)
                .bind(path.as_str())
                .bind(path.parent().as_str())
                .bind(data)
                .execute(&mut *conn)
                .await
                .map_err(map_sqlx)?;
        }
        TxWrite::Update { path, fields } => {
            let result = sqlx::query(
                "UPDATE documents SET data = data || $2, updated_at = NOW() WHERE path = $1",
            )
            .bind(path.as_str())
            .bind(Value::Object(fields.clone()))
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound(path.to_string()));
            }
        }
        TxWrite::Delete { path } => {
            sqlx::query("DELETE FROM documents WHERE path = $1")
                .bind(path.as_str())
                .execute(&mut *conn)
                .await
                .map_err(map_sqlx)?;
        }
    }

    let payload = serde_json::to_string(&write.change_event())?;
    sqlx::query("SELECT pg_notify($1, $2)")
        .bind(CHANGE_CHANNEL)
        .bind(payload)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx)?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &DocPath) -> StoreResult<Option<Value>> {
        sqlx::query_scalar("SELECT data FROM documents WHERE path = $1")
            .bind(path.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)
    }

    async fn set(&self, path: &DocPath, data: Value, merge: bool) -> StoreResult<()> {
        self.write_one(TxWrite::Set {
            path: path.clone(),
            data,
            merge,
        })
        .await
    }

    async fn update(&self, path: &DocPath, fields: Map<String, Value>) -> StoreResult<()> {
        self.write_one(TxWrite::Update {
            path: path.clone(),
            fields,
        })
        .await
    }

    async fn delete(&self, path: &DocPath) -> StoreResult<()> {
        self.write_one(TxWrite::Delete { path: path.clone() }).await
    }

    async fn list(&self, collection: &CollectionPath) -> StoreResult<Vec<(DocPath, Value)>> {
        let rows: Vec<(String, Value)> = sqlx::query_as(
            "SELECT path, data FROM documents WHERE collection = $1 ORDER BY path",
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(path, data)| (DocPath::from_stored(path), data))
            .collect())
    }

    async fn transaction(&self, reads: &[DocPath], body: &mut TxBody<'_>) -> StoreResult<bool> {
        for attempt in 1..=self.max_attempts {
            match self.attempt(reads, body).await {
                Err(StoreError::Conflict) if attempt < self.max_attempts => {
                    log::debug!("Serialization conflict on attempt {attempt}, retrying");
                }
                Err(StoreError::Conflict) => {
                    log::warn!("Transaction gave up after {} attempts", self.max_attempts);
                    return Err(StoreError::Conflict);
                }
                other => return other,
            }
        }
        Err(StoreError::Conflict)
    }

    fn subscribe(&self, collection: &CollectionPath) -> Subscription {
        Subscription::new(collection.clone(), self.changes.subscribe())
    }
}
