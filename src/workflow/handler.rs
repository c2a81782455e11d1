//! Step handler capability and the handler registry.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::state::{ConversationState, Step};

/// One handler per named step.
///
/// Implementors provide `execute`; callers go through `handle`, which
/// enforces the idempotency contract: once the step's completion flag is
/// set, the state comes back untouched. `execute` must never fail. Any
/// external call it makes is bounded by a timeout and falls back to
/// deterministic content.
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// The step this handler owns.
    fn step(&self) -> Step;

    /// Run the step's side effects. Only called while the flag is unset.
    ///
    /// Appends messages, writes artifacts, sets `current_step` and replaces
    /// the action menu. Must not touch existing log entries.
    async fn execute(&self, state: ConversationState) -> ConversationState;

    /// Run the step unless it already ran. Not meant to be overridden.
    async fn handle(&self, state: ConversationState) -> ConversationState {
        let step = self.step();
        if state.is_completed(&step) {
            debug!(session_id = %state.session_id(), step = %step, "Step already completed, skipping");
            return state;
        }

        debug!(session_id = %state.session_id(), step = %step, "Executing step");
        let mut next = self.execute(state).await;
        next.mark_completed(&step);
        next
    }
}

/// Stateless registry of step handlers, shared across all sessions.
#[derive(Clone, Default)]
pub struct HandlerSet {
    handlers: HashMap<Step, Arc<dyn StepHandler>>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its own step, replacing any previous one.
    pub fn with(mut self, handler: Arc<dyn StepHandler>) -> Self {
        self.handlers.insert(handler.step(), handler);
        self
    }

    pub fn get(&self, step: &Step) -> Option<&Arc<dyn StepHandler>> {
        self.handlers.get(step)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
