//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

/// Server and collaborator configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen address.
    pub bind_addr: String,
    /// HTTP listen port.
    pub port: u16,
    /// Assistant id reported by `/health` and accepted in run requests.
    pub assistant_id: String,
    /// libSQL file for sessions. `None` keeps sessions in memory.
    pub db_path: Option<PathBuf>,
    /// Bound on every external call a step handler makes.
    pub step_timeout: Duration,
    /// Text-generation provider. `None` (no API key for the chosen
    /// backend) uses fallback analysis.
    pub llm: Option<LlmConfig>,
    /// Account search endpoint. `None` uses fallback accounts.
    pub search_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 2024,
            assistant_id: "neta-social-assistant".to_string(),
            db_path: None,
            step_timeout: Duration::from_secs(30),
            llm: None,
            search_url: None,
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Read configuration through `var`, which returns the value of a key
    /// if it is set.
    pub fn from_source(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let backend: LlmBackend = parse(&var, "NETA_LLM_BACKEND", LlmBackend::OpenAi)?;
        let llm = match text(backend.api_key_var()) {
            Some(key) => Some(LlmConfig {
                backend,
                api_key: SecretString::from(key),
                model: text("NETA_MODEL").unwrap_or_else(|| backend.default_model().to_string()),
                temperature: parse(&var, "NETA_TEMPERATURE", 0.7)?,
                max_tokens: parse(&var, "NETA_MAX_TOKENS", 1000)?,
            }),
            None => None,
        };

        Ok(Self {
            bind_addr: text("NETA_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: parse(&var, "NETA_PORT", defaults.port)?,
            assistant_id: text("NETA_ASSISTANT_ID").unwrap_or(defaults.assistant_id),
            db_path: text("NETA_DB_PATH").map(PathBuf::from),
            step_timeout: Duration::from_secs(parse(&var, "NETA_STEP_TIMEOUT_SECS", 30u64)?),
            llm,
            search_url: text("NETA_SEARCH_URL"),
        })
    }
}

fn parse<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("{raw:?}: {e}"),
        }),
        None => Ok(default),
    }
}
