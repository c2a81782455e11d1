//! HTTP transport for the workflow.
//!
//! Owns what the workflow core leaves to its caller: session persistence,
//! per-session serialization of turns, and turning user input into state.

pub mod routes;
pub mod service;
pub mod wire;

pub use routes::{AppState, api_routes};
pub use service::TurnService;
pub use wire::{HealthResponse, RunRequest, RunResponse, TurnOutput};
