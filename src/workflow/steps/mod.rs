//! The concrete step handlers and their injected collaborators.

pub mod analysis;
pub mod completion;
pub mod creation;
pub mod discovery;
pub mod greeting;

pub use analysis::{ContentAnalysisHandler, Theme};
pub use completion::{CompletionHandler, ScheduledPost};
pub use creation::{ContentCreationHandler, DraftPost};
pub use discovery::SocialDiscoveryHandler;
pub use greeting::GreetingHandler;

use std::sync::Arc;
use std::time::Duration;

use crate::discovery::AccountLookup;
use crate::llm::LlmProvider;

use super::handler::HandlerSet;

/// Default bound on any external call a handler makes.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// External capabilities handed to the handlers at construction time.
///
/// Either provider may be absent, in which case the handler that would use
/// it goes straight to its deterministic fallback.
#[derive(Clone)]
pub struct Collaborators {
    pub llm: Option<Arc<dyn LlmProvider>>,
    pub lookup: Option<Arc<dyn AccountLookup>>,
    pub timeout: Duration,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            llm: None,
            lookup: None,
            timeout: DEFAULT_STEP_TIMEOUT,
        }
    }
}

impl Collaborators {
    pub fn with_llm(mut self, llm: Arc<dyn LlmProvider>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_lookup(mut self, lookup: Arc<dyn AccountLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl HandlerSet {
    /// The full Neta workflow: one handler for each executable step.
    pub fn standard(collaborators: &Collaborators) -> Self {
        Self::new()
            .with(Arc::new(GreetingHandler))
            .with(Arc::new(SocialDiscoveryHandler::new(
                collaborators.lookup.clone(),
                collaborators.timeout,
            )))
            .with(Arc::new(ContentAnalysisHandler::new(
                collaborators.llm.clone(),
                collaborators.timeout,
            )))
            .with(Arc::new(ContentCreationHandler))
            .with(Arc::new(CompletionHandler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::state::Step;

    #[test]
    fn standard_set_covers_executable_steps_only() {
        let set = HandlerSet::standard(&Collaborators::default());
        assert_eq!(set.len(), 5);
        for step in Step::ALL {
            let expected = !step.is_marker() && !step.is_terminal();
            assert_eq!(set.get(&step).is_some(), expected, "{step}");
        }
    }

    #[test]
    fn collaborators_builder() {
        let collaborators = Collaborators::default().with_timeout(Duration::from_millis(5));
        assert_eq!(collaborators.timeout, Duration::from_millis(5));
        assert!(collaborators.llm.is_none());
        assert!(collaborators.lookup.is_none());
    }
}
