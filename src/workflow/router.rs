//! Router: the workflow's transition table.
//!
//! `route` is pure: it reads the state and returns a decision, nothing else.
//! Self-loops are guarded by the step's completion flag, which the handler
//! guard always sets, so every loop passes through a `Suspend`.

use super::state::{ConversationState, Step};

/// What the driver loop should do after a step has run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Run this step next, within the same turn.
    Next(Step),
    /// Return control to the transport.
    Suspend,
}

/// Decide the next step, or suspend.
pub fn route(state: &ConversationState) -> Route {
    use Step::*;

    let step = &state.current_step;
    let done = state.is_completed(step);

    match step {
        Greeting if state.has_subject() => Route::Next(SocialDiscovery),
        Greeting => Route::Suspend,

        SocialDiscovery if !done => Route::Next(SocialDiscovery),
        SocialDiscovery => Route::Suspend,

        ConfirmAccounts => Route::Next(ContentAnalysis),

        ContentAnalysis if !done => Route::Next(ContentAnalysis),
        ContentAnalysis => Route::Suspend,

        StrategyApproval => Route::Next(ContentCreation),

        ContentCreation if !done => Route::Next(ContentCreation),
        ContentCreation => Route::Suspend,

        ContentApproval => Route::Next(Completion),

        Completion | Terminal => Route::Suspend,

        // Never advance on a tag we do not recognise.
        Unknown(_) => Route::Suspend,
    }
}
