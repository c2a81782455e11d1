//! Adapter from rig-core completion models to `LlmProvider`.

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::message::{AssistantContent, Message as RigMessage};
use tracing::debug;

use crate::error::LlmError;

use super::provider::{ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, Role};

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_MAX_TOKENS: u64 = 1000;

/// Wraps any rig `CompletionModel` behind the `LlmProvider` trait.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
    temperature: f64,
    max_tokens: u64,
}

impl<M: CompletionModel> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_sampling(mut self, temperature: f32, max_tokens: u32) -> Self {
        self.temperature = f64::from(temperature);
        self.max_tokens = u64::from(max_tokens);
        self
    }
}

/// A prompt split the way rig wants it.
#[derive(Debug, PartialEq)]
struct Prompt {
    preamble: Option<String>,
    history: Vec<String>,
    prompt: String,
}

/// System messages are joined into the preamble. The last user message is
/// the prompt and earlier ones become history.
fn split_prompt(messages: Vec<ChatMessage>, provider: &str) -> Result<Prompt, LlmError> {
    let mut system = Vec::new();
    let mut users = Vec::new();
    for message in messages {
        match message.role {
            Role::System => system.push(message.content),
            Role::User => users.push(message.content),
        }
    }

    let prompt = users.pop().ok_or_else(|| LlmError::RequestFailed {
        provider: provider.to_string(),
        reason: "completion request has no user message".to_string(),
    })?;

    Ok(Prompt {
        preamble: (!system.is_empty()).then(|| system.join("\n\n")),
        history: users,
        prompt,
    })
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let Prompt {
            preamble,
            history,
            prompt,
        } = split_prompt(request.messages, &self.model_name)?;

        let mut builder = self
            .model
            .completion_request(RigMessage::user(prompt))
            .temperature(self.temperature)
            .max_tokens(self.max_tokens);
        if let Some(preamble) = preamble {
            builder = builder.preamble(preamble);
        }
        if !history.is_empty() {
            builder = builder.messages(history.into_iter().map(RigMessage::user).collect());
        }

        let response = builder.send().await.map_err(|e| LlmError::RequestFailed {
            provider: self.model_name.clone(),
            reason: e.to_string(),
        })?;

        let content: String = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();
        if content.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.model_name.clone(),
                reason: "no text in completion".to_string(),
            });
        }

        debug!(
            model = %self.model_name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Completion received"
        );
        Ok(CompletionResponse {
            content,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        })
    }
}
