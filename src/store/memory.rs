use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;
use crate::workflow::state::ConversationState;

use super::traits::SessionStore;

/// Process-local session store. State is lost on restart.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationState>, DatabaseError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn save(&self, state: &ConversationState) -> Result<(), DatabaseError> {
        self.sessions
            .write()
            .await
            .insert(state.session_id().to_string(), state.clone());
        Ok(())
    }

    async fn count(&self) -> Result<usize, DatabaseError> {
        Ok(self.sessions.read().await.len())
    }
}
