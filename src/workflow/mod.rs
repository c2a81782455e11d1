//! The resumable conversation workflow.
//!
//! A turn takes a `ConversationState`, runs the current step's handler,
//! asks the router what comes next, and repeats until the router suspends.
//! Completion flags in the data bag make every step run exactly once per
//! session, so a state can be resubmitted any number of times.

pub mod actions;
pub mod handler;
pub mod orchestrator;
pub mod router;
pub mod state;
pub mod steps;

pub use handler::{HandlerSet, StepHandler};
pub use orchestrator::Orchestrator;
pub use router::{Route, route};
pub use state::{Action, ConversationState, DataBag, DiscoveredAccount, Message, MessageLog, Role, Step};
pub use steps::Collaborators;
