//! libSQL document store — async `MessageStore` implementation.
//!
//! Each enriched record is stored as one self-contained JSON document,
//! with the fields the inspection queries filter on promoted into
//! indexed columns. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::MessageRecord;
use crate::store::MessageStore;
use crate::store::migrations;

/// libSQL-backed message store.
///
/// Holds a single connection reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn open_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Connection(format!("Failed to open database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Message store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn open_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Connection(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;

        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Inspection helpers ──────────────────────────────────────────

    /// Load a stored record by its document id.
    pub async fn get(&self, doc_id: &str) -> Result<Option<MessageRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT document FROM messages WHERE id = ?1",
                params![doc_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let document: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get row parse: {e}")))?;
                let record = serde_json::from_str(&document)
                    .map_err(|e| DatabaseError::Serialization(format!("get: {e}")))?;
                Ok(Some(record))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get: {e}"))),
        }
    }

    /// Most recently ingested records, newest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<MessageRecord>, DatabaseError> {
        self.query_documents(
            "SELECT document FROM messages ORDER BY ingested_at DESC LIMIT ?1",
            params![limit as i64],
        )
        .await
    }

    /// Records flagged suspicious, newest first.
    pub async fn suspicious(&self, limit: usize) -> Result<Vec<MessageRecord>, DatabaseError> {
        self.query_documents(
            "SELECT document FROM messages WHERE is_suspicious = 1
             ORDER BY ingested_at DESC LIMIT ?1",
            params![limit as i64],
        )
        .await
    }

    async fn query_documents(
        &self,
        sql: &str,
        params: impl libsql::params::IntoParams,
    ) -> Result<Vec<MessageRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(sql, params)
            .await
            .map_err(|e| DatabaseError::Query(format!("query_documents: {e}")))?;

        let mut records = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            let document: String = match row.get(0) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Skipping message row: {e}");
                    continue;
                }
            };
            match serde_json::from_str(&document) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping undecodable document: {e}");
                }
            }
        }
        Ok(records)
    }
}

/// Convert `Option<i64>` to a libsql value.
fn opt_int(v: Option<i64>) -> libsql::Value {
    match v {
        Some(v) => libsql::Value::Integer(v),
        None => libsql::Value::Null,
    }
}

#[async_trait]
impl MessageStore for LibSqlStore {
    async fn insert(&self, record: &MessageRecord) -> Result<String, DatabaseError> {
        let document = serde_json::to_string(record)
            .map_err(|e| DatabaseError::Serialization(format!("insert: {e}")))?;

        let (is_suspicious, risk_score) = match &record.analysis {
            Some(a) => (a.is_suspicious as i64, a.risk_score as i64),
            None => (0, 0),
        };

        let id = Uuid::new_v4().to_string();
        self.conn()
            .execute(
                "INSERT INTO messages
                    (id, message_id, chat_id, sender_id, ingested_at,
                     is_suspicious, risk_score, document)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id.clone(),
                    record.message_id,
                    record.chat_id,
                    opt_int(record.sender_id),
                    record.ingested_at.to_rfc3339(),
                    is_suspicious,
                    risk_score,
                    document,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert: {e}")))?;

        debug!(doc_id = %id, message_id = record.message_id, "Message document inserted");
        Ok(id)
    }

    async fn count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM messages", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("count: {e}")))?;

        match row {
            Some(row) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count parse: {e}")))?;
                Ok(count.max(0) as u64)
            }
            None => Ok(0),
        }
    }
}
