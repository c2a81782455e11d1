//! Error types for Neta Assist.
//!
//! The workflow core never surfaces an error: handlers convert collaborator
//! failures into fallback content. These types cover configuration, the
//! collaborators themselves, session persistence, and the HTTP transport.

use std::time::Duration;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("API error: {0}")]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Session persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Text-generation provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} returned HTTP {status}: {body}")]
    HttpStatus {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Account-lookup provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Lookup request failed: {0}")]
    RequestFailed(String),

    #[error("Lookup returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Invalid lookup response: {0}")]
    InvalidResponse(String),

    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Lookup found no accounts for {subject}")]
    NoResults { subject: String },
}

/// HTTP transport errors.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Session {0} not found")]
    SessionNotFound(String),

    #[error("Session store failure: {0}")]
    Store(#[from] DatabaseError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
