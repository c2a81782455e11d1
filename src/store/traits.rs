//! `SessionStore`: where the transport keeps conversation state between
//! turns.

use async_trait::async_trait;
use tracing::warn;

use crate::error::DatabaseError;
use crate::workflow::state::ConversationState;

/// Backend-agnostic session persistence.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the latest state of a session, if it exists.
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DatabaseError>;

    /// Insert or overwrite the state stored under its own session id.
    async fn save(&self, state: &ConversationState) -> Result<(), DatabaseError>;

    /// Number of stored sessions.
    async fn count(&self) -> Result<usize, DatabaseError>;
}

/// Number of stored sessions for startup reporting. A failing store is
/// logged and reported as `None` rather than as zero sessions.
pub async fn stored_sessions(store: &dyn SessionStore) -> Option<usize> {
    match store.count().await {
        Ok(count) => Some(count),
        Err(e) => {
            warn!(error = %e, "Failed to count stored sessions");
            None
        }
    }
}
