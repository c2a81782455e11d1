//! Neta Assist: a resumable, step-driven social media onboarding assistant.

pub mod api;
pub mod config;
pub mod discovery;
pub mod error;
pub mod llm;
pub mod store;
pub mod workflow;
