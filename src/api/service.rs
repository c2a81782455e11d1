//! Turn service: loads a session, applies the user's input, runs the turn,
//! and saves the result, all under the session's lock.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::store::{SessionLocks, SessionStore};
use crate::workflow::actions;
use crate::workflow::orchestrator::Orchestrator;
use crate::workflow::state::{ConversationState, Message, Step};

use super::wire::RunRequest;

pub struct TurnService {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    orchestrator: Orchestrator,
}

impl TurnService {
    pub fn new(store: Arc<dyn SessionStore>, orchestrator: Orchestrator) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
            orchestrator,
        }
    }

    /// Run one turn for `thread_id`, or for a new session when it is `None`.
    pub async fn run(
        &self,
        thread_id: Option<String>,
        request: RunRequest,
    ) -> Result<ConversationState, ApiError> {
        let RunRequest {
            assistant_id,
            input,
            message,
            action_id,
        } = request;

        let session_id = session_key(thread_id.as_deref(), input.as_ref())?;
        let _guard = self.locks.acquire(&session_id).await;

        let mut state = match input {
            Some(mut snapshot) => {
                snapshot.ensure_session_id(session_id.as_str());
                snapshot
            }
            None => self
                .store
                .load(&session_id)
                .await?
                .unwrap_or_else(|| ConversationState::with_session_id(session_id.as_str())),
        };

        info!(
            session_id = %state.session_id(),
            assistant_id = assistant_id.as_deref().unwrap_or(""),
            step = %state.current_step,
            "Run requested"
        );

        if let Some(text) = message.as_deref() {
            apply_message(&mut state, text);
        }
        if let Some(id) = action_id.as_deref() {
            apply_action(&mut state, id);
        }

        let state = self.orchestrator.run_turn(state).await;
        self.store.save(&state).await?;
        Ok(state)
    }

    /// The stored state of a session.
    pub async fn get_state(&self, thread_id: &str) -> Result<ConversationState, ApiError> {
        self.store
            .load(thread_id)
            .await?
            .ok_or_else(|| ApiError::SessionNotFound(thread_id.to_string()))
    }
}

/// The one id a turn is locked, run, and saved under.
///
/// A path thread id wins. A snapshot may repeat it but must not name a
/// different session. Without a thread id the snapshot's own id is used,
/// and a new session is started when there is none.
fn session_key(thread_id: Option<&str>, input: Option<&ConversationState>) -> Result<String, ApiError> {
    let carried = input.map(|s| s.session_id()).filter(|id| !id.is_empty());
    match thread_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(thread) => match carried {
            Some(other) if other != thread => Err(ApiError::BadRequest(format!(
                "input.session_id {other:?} does not match thread {thread:?}"
            ))),
            _ => Ok(thread.to_string()),
        },
        None => Ok(carried.map_or_else(|| Uuid::new_v4().to_string(), str::to_string)),
    }
}

/// Log free text from the user. At the greeting step it also names the
/// business, unless a name is already set.
pub fn apply_message(state: &mut ConversationState, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    state.push_message(Message::user(text));
    if state.current_step == Step::Greeting && state.set_subject_name(text) {
        debug!(session_id = %state.session_id(), subject = text, "Business name set");
    }
}

/// Log the user's menu choice and, if it confirms the current suspend
/// point, move the session to the matching marker step.
pub fn apply_action(state: &mut ConversationState, action_id: &str) {
    let label = state
        .pending_actions
        .iter()
        .find(|a| a.id == action_id)
        .map_or_else(|| action_id.to_string(), |a| a.label.clone());
    state.push_message(Message::user(label).with_metadata("action_id", action_id));

    let Some(marker) = actions::resolve_choice(action_id) else {
        return;
    };
    if actions::choice_origin(&marker).as_ref() == Some(&state.current_step) {
        debug!(session_id = %state.session_id(), from = %state.current_step, to = %marker, "Choice accepted");
        state.current_step = marker;
    } else {
        debug!(
            session_id = %state.session_id(),
            step = %state.current_step,
            action_id = action_id,
            "Choice does not apply at this step, ignoring"
        );
    }
}
