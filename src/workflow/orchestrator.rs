//! Driver loop: runs handlers and consults the router until the turn
//! suspends.

use tracing::{debug, info, warn};

use super::handler::HandlerSet;
use super::router::{Route, route};
use super::state::{ConversationState, Step};

/// Runs one turn of a conversation. Shared across sessions.
#[derive(Clone)]
pub struct Orchestrator {
    handlers: HandlerSet,
}

impl Orchestrator {
    pub fn new(handlers: HandlerSet) -> Self {
        if handlers.is_empty() {
            warn!("No step handlers registered, every turn will stall");
        } else {
            debug!(handlers = handlers.len(), "Orchestrator ready");
        }
        Self { handlers }
    }

    /// Advance the conversation until the router suspends.
    ///
    /// Infallible: collaborator failures are absorbed by the handlers, and a
    /// state carrying an unknown step comes back exactly as it went in.
    pub async fn run_turn(&self, inbound: ConversationState) -> ConversationState {
        if !inbound.current_step.is_known() {
            warn!(
                session_id = %inbound.session_id(),
                step = %inbound.current_step,
                "Unknown step, returning state unchanged"
            );
            return inbound;
        }

        let mut state = inbound;
        state.normalize();
        info!(
            session_id = %state.session_id(),
            step = %state.current_step,
            messages = state.messages().len(),
            "Turn started"
        );

        // Every loop in the transition table passes through a suspend, so a
        // complete handler set never reaches this bound.
        let max_rounds = Step::ALL.len() * 2;
        for _ in 0..max_rounds {
            if let Some(handler) = self.handlers.get(&state.current_step) {
                state = handler.handle(state).await;
            }

            match route(&state) {
                Route::Suspend => {
                    info!(
                        session_id = %state.session_id(),
                        step = %state.current_step,
                        actions = state.pending_actions.len(),
                        "Turn suspended"
                    );
                    return state;
                }
                Route::Next(next) => {
                    debug!(
                        session_id = %state.session_id(),
                        from = %state.current_step,
                        to = %next,
                        "Advancing"
                    );
                    state.current_step = next;
                }
            }
        }

        warn!(
            session_id = %state.session_id(),
            step = %state.current_step,
            "Turn hit the round limit without suspending"
        );
        state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::discovery::{self, AccountLookup};
    use crate::error::LookupError;
    use crate::workflow::actions;
    use crate::workflow::steps::Collaborators;
    use crate::workflow::state::DiscoveredAccount;

    struct FailingLookup;

    #[async_trait]
    impl AccountLookup for FailingLookup {
        fn name(&self) -> &str {
            "failing"
        }

        async fn lookup(&self, _subject: &str) -> Result<Vec<DiscoveredAccount>, LookupError> {
            Err(LookupError::HttpStatus { status: 502 })
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(HandlerSet::standard(&Collaborators::default()))
    }

    fn inbound(subject: &str, step: Step) -> ConversationState {
        ConversationState::with_session_id("session-1")
            .with_subject(subject)
            .with_step(step)
    }

    /// Simulate the transport accepting a confirming action.
    fn choose(mut state: ConversationState, action_id: &str) -> ConversationState {
        if let Some(marker) = actions::resolve_choice(action_id) {
            if actions::choice_origin(&marker).as_ref() == Some(&state.current_step) {
                state.current_step = marker;
            }
        }
        state
    }

    fn assert_log_extends(before: &ConversationState, after: &ConversationState) {
        let old = before.messages().as_slice();
        let new = after.messages().as_slice();
        assert!(new.len() >= old.len());
        assert_eq!(&new[..old.len()], old);
    }

    #[tokio::test]
    async fn greeting_without_name_suspends_with_menu() {
        let out = orchestrator().run_turn(inbound("", Step::Greeting)).await;

        assert_eq!(out.current_step, Step::Greeting);
        assert_eq!(out.messages().len(), 1);
        assert!(!out.pending_actions.is_empty());
    }

    #[tokio::test]
    async fn named_greeting_runs_through_discovery() {
        let out = orchestrator().run_turn(inbound("Mike's Pizza", Step::Greeting)).await;

        assert_eq!(out.current_step, Step::SocialDiscovery);
        assert_eq!(out.data_bag["social_discovery_completed"], true);
        assert!(!out.discovered_resources.is_empty());
        assert_eq!(out.pending_actions, actions::discovery_menu());
    }

    #[tokio::test]
    async fn resubmitted_state_is_unchanged() {
        let orchestrator = orchestrator();
        let first = orchestrator.run_turn(inbound("Mike's Pizza", Step::Greeting)).await;

        let second = orchestrator.run_turn(first.clone()).await;

        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn failing_lookup_still_advances() {
        let collaborators = Collaborators::default()
            .with_lookup(Arc::new(FailingLookup))
            .with_timeout(Duration::from_secs(1));
        let orchestrator = Orchestrator::new(HandlerSet::standard(&collaborators));

        let out = orchestrator.run_turn(inbound("Mike's Pizza", Step::Greeting)).await;

        assert_eq!(out.discovered_resources, discovery::fallback_accounts("Mike's Pizza"));
        assert_eq!(out.current_step, Step::SocialDiscovery);
        assert!(out.messages().last().unwrap().content.contains("Mike's Pizza Official"));
    }

    #[tokio::test]
    async fn unknown_step_is_returned_untouched() {
        let state = inbound("", Step::parse("not_a_real_step"));

        let out = orchestrator().run_turn(state.clone()).await;

        assert_eq!(out, state);
    }

    #[tokio::test]
    async fn missing_subject_forces_greeting() {
        let out = orchestrator().run_turn(inbound("", Step::ContentCreation)).await;
        assert_eq!(out.current_step, Step::Greeting);
        assert!(out.data_bag.get("content_creation_completed").is_none());
    }

    #[tokio::test]
    async fn empty_session_id_is_assigned() {
        let out = orchestrator().run_turn(ConversationState::default()).await;
        assert!(!out.session_id().is_empty());
    }

    #[tokio::test]
    async fn full_conversation_is_append_only_and_progresses() {
        let orchestrator = orchestrator();
        let choices = [actions::ANALYZE_ACCOUNTS, actions::APPROVE_STRATEGY, actions::APPROVE_ALL];
        let expected = [Step::ContentAnalysis, Step::ContentCreation, Step::Terminal];

        let mut state = orchestrator.run_turn(inbound("Mike's Pizza", Step::Greeting)).await;
        for (choice, expected) in choices.iter().zip(expected) {
            let before = state.clone();
            let next = orchestrator.run_turn(choose(state, choice)).await;

            assert_log_extends(&before, &next);
            assert_eq!(next.current_step, expected);
            assert!(next.current_step.ordinal() > before.current_step.ordinal());
            state = next;
        }

        assert!(state.pending_actions.is_empty());
        assert!(state.artifact(&Step::Completion, "schedule").is_some());

        let again = orchestrator.run_turn(state.clone()).await;
        assert_eq!(again, state);
    }

    #[tokio::test]
    async fn non_confirming_choice_keeps_session_suspended() {
        let orchestrator = orchestrator();
        let first = orchestrator.run_turn(inbound("Mike's Pizza", Step::Greeting)).await;

        let out = orchestrator.run_turn(choose(first.clone(), actions::ADD_MORE_ACCOUNTS)).await;

        assert_eq!(out, first);
    }

    #[tokio::test]
    async fn every_reachable_state_progresses_or_suspends() {
        let orchestrator = orchestrator();
        let mut reachable = vec![
            inbound("", Step::Greeting),
            inbound("Acme", Step::Greeting),
        ];
        for step in Step::ALL {
            reachable.push(inbound("Acme", step));
        }
        let first = orchestrator.run_turn(inbound("Acme", Step::Greeting)).await;
        reachable.push(first.clone());
        reachable.push(choose(first, actions::ANALYZE_ACCOUNTS));

        for state in reachable {
            let before = state.current_step.clone();
            let out = orchestrator.run_turn(state).await;
            let progressed = out.current_step.ordinal() > before.ordinal();
            assert!(
                progressed || !out.pending_actions.is_empty() || out.current_step.is_terminal(),
                "stalled at {before}"
            );
        }
    }

    #[tokio::test]
    async fn handlers_skip_on_reentry_with_flags_set() {
        let handlers = HandlerSet::standard(&Collaborators::default());
        for step in [Step::Greeting, Step::SocialDiscovery, Step::ContentAnalysis, Step::ContentCreation, Step::Completion] {
            let handler = handlers.get(&step).unwrap();
            let once = handler.handle(inbound("Acme", step.clone())).await;
            let twice = handler.handle(once.clone()).await;
            let thrice = handler.handle(twice.clone()).await;
            assert_eq!(twice, once, "{step}");
            assert_eq!(thrice, once, "{step}");
        }
    }

    #[tokio::test]
    async fn missing_handler_hits_round_limit() {
        let orchestrator = Orchestrator::new(HandlerSet::new());
        let out = orchestrator.run_turn(inbound("Acme", Step::SocialDiscovery)).await;
        assert_eq!(out.current_step, Step::SocialDiscovery);
        assert!(out.messages().is_empty());
    }
}
