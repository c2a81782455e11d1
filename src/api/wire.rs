//! Request and response bodies of the run API.

use serde::{Deserialize, Serialize};

use crate::workflow::state::{Action, ConversationState, DataBag, DiscoveredAccount, MessageLog, Step};

/// Body of `POST /runs` and `POST /threads/{thread_id}/runs`.
///
/// Every field is optional. `input` is a full or partial state snapshot;
/// when present it replaces whatever is stored for the session.
#[derive(Debug, Default, Deserialize)]
pub struct RunRequest {
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub input: Option<ConversationState>,
    /// Free text typed by the user.
    #[serde(default)]
    pub message: Option<String>,
    /// Id of the menu action the user picked.
    #[serde(default)]
    pub action_id: Option<String>,
}

/// The outbound turn. Posting it back unchanged as `input` continues the
/// same session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutput {
    pub session_id: String,
    pub subject_name: String,
    pub message_log: MessageLog,
    pub current_step: Step,
    pub data_bag: DataBag,
    pub discovered_resources: Vec<DiscoveredAccount>,
    pub pending_actions: Vec<Action>,
}

impl From<&ConversationState> for TurnOutput {
    fn from(state: &ConversationState) -> Self {
        Self {
            session_id: state.session_id().to_string(),
            subject_name: state.subject_name().to_string(),
            message_log: state.messages().clone(),
            current_step: state.current_step.clone(),
            data_bag: state.data_bag.clone(),
            discovered_resources: state.discovered_resources.clone(),
            pending_actions: state.pending_actions.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResponse {
    pub status: String,
    pub session_id: String,
    pub output: TurnOutput,
}

impl RunResponse {
    pub fn completed(state: &ConversationState) -> Self {
        Self {
            status: "completed".to_string(),
            session_id: state.session_id().to_string(),
            output: TurnOutput::from(state),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub assistant_id: String,
}
