//! libSQL session store. Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::SessionStore;
use crate::workflow::state::ConversationState;

/// Sessions persisted as JSON documents, one row per session.
///
/// Holds a single connection reused for all operations.
pub struct LibSqlSessionStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlSessionStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Session database opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[async_trait]
impl SessionStore for LibSqlSessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT state FROM sessions WHERE id = ?1", params![session_id])
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("load_session row: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let json: String = row
            .get(0)
            .map_err(|e| DatabaseError::Query(format!("load_session column: {e}")))?;
        let state = serde_json::from_str(&json)
            .map_err(|e| DatabaseError::Serialization(format!("session {session_id}: {e}")))?;
        Ok(Some(state))
    }

    async fn save(&self, state: &ConversationState) -> Result<(), DatabaseError> {
        let json = serde_json::to_string(state)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        self.conn()
            .execute(
                "INSERT INTO sessions (id, state, current_step, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    state = excluded.state,
                    current_step = excluded.current_step,
                    updated_at = excluded.updated_at",
                params![
                    state.session_id(),
                    json,
                    state.current_step.as_str(),
                    now
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("save_session: {e}")))?;

        debug!(session_id = %state.session_id(), step = %state.current_step, "Session saved");
        Ok(())
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM sessions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("count_sessions: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let count: i64 = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("count_sessions column: {e}")))?;
                Ok(count.max(0) as usize)
            }
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("count_sessions row: {e}"))),
        }
    }
}
