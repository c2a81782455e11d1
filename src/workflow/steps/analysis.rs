//! Content analysis: works out the business's tone and recommends content
//! themes, with the text-generation provider when one is configured.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::llm::{self, ChatMessage, CompletionRequest, LlmProvider};
use crate::workflow::actions;
use crate::workflow::handler::StepHandler;
use crate::workflow::state::{ConversationState, DiscoveredAccount, Message, Step};

const FALLBACK_TONE: &str = "casual, friendly";

const SYSTEM_PROMPT: &str = "You are Neta, an AI marketing freelancer for small businesses. \
You study a business's social media presence and recommend what to post next. \
Reply with JSON only, shaped as \
{\"tone\": string, \"themes\": [{\"id\": snake_case string, \"label\": string, \"reason\": string}]} \
with exactly three themes.";

static JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("valid fence regex"));

/// A recommended content theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub reason: String,
}

impl Theme {
    fn new(id: &str, label: &str, reason: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Themes recommended when no generated analysis is available.
pub fn default_themes() -> Vec<Theme> {
    vec![
        Theme::new(
            "product_photography",
            "Product photography",
            "your photo posts get 2x more likes!",
        ),
        Theme::new(
            "behind_the_scenes",
            "Behind-the-scenes content",
            "trending in your area",
        ),
        Theme::new(
            "customer_spotlights",
            "Customer spotlights",
            "great engagement potential",
        ),
    ]
}

#[derive(Debug, Deserialize)]
struct Analysis {
    tone: String,
    themes: Vec<Theme>,
}

/// Parse the model's reply, tolerating a fenced code block around the JSON.
fn parse_analysis(reply: &str) -> Option<Analysis> {
    let body = JSON_FENCE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map_or(reply, |m| m.as_str());

    let analysis: Analysis = serde_json::from_str(body.trim()).ok()?;
    if analysis.tone.trim().is_empty() || analysis.themes.is_empty() {
        return None;
    }
    Some(analysis)
}

fn analysis_prompt(subject: &str, accounts: &[DiscoveredAccount]) -> String {
    let listed: Vec<String> = accounts
        .iter()
        .map(|a| format!("- {} {}", a.platform, a.name))
        .collect();
    format!(
        "Business: {subject}\nSocial accounts:\n{}\n\n\
         Describe the tone of this business's posts and recommend three content themes.",
        listed.join("\n")
    )
}

fn summarize(tone: &str, themes: &[Theme]) -> String {
    let bullets: Vec<String> = themes
        .iter()
        .map(|t| {
            if t.reason.is_empty() {
                format!("✅ {}", t.label)
            } else {
                format!("✅ {} ({})", t.label, t.reason)
            }
        })
        .collect();

    format!(
        "Great! I've analyzed your existing posts. I can see you have a {tone} tone that your \
         customers love.\n\nBased on your social pages, I'd recommend focusing on:\n{}\n\n\
         Should I create a content strategy around these themes?",
        bullets.join("\n")
    )
}

/// Recommends a content strategy and waits for the user to approve it.
pub struct ContentAnalysisHandler {
    llm: Option<Arc<dyn LlmProvider>>,
    timeout: Duration,
}

impl ContentAnalysisHandler {
    pub fn new(llm: Option<Arc<dyn LlmProvider>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    async fn generate(&self, llm: &dyn LlmProvider, state: &ConversationState) -> Option<Analysis> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(analysis_prompt(
                state.subject_name(),
                &state.discovered_resources,
            )),
        ]);

        match llm::complete_with_timeout(llm, request, self.timeout).await {
            Ok(response) => {
                let parsed = parse_analysis(&response.content);
                if parsed.is_none() {
                    warn!(
                        session_id = %state.session_id(),
                        model = llm.model_name(),
                        "Unusable analysis reply, using fallback themes"
                    );
                }
                parsed
            }
            Err(e) => {
                warn!(
                    session_id = %state.session_id(),
                    model = llm.model_name(),
                    error = %e,
                    "Content analysis failed, using fallback themes"
                );
                None
            }
        }
    }
}

#[async_trait]
impl StepHandler for ContentAnalysisHandler {
    fn step(&self) -> Step {
        Step::ContentAnalysis
    }

    async fn execute(&self, mut state: ConversationState) -> ConversationState {
        let generated = match &self.llm {
            Some(llm) => self.generate(llm.as_ref(), &state).await,
            None => None,
        };

        let step = Step::ContentAnalysis;
        let (tone, themes, source) = match generated {
            Some(analysis) => {
                info!(session_id = %state.session_id(), themes = analysis.themes.len(), "Generated content analysis");
                (analysis.tone, analysis.themes, "llm")
            }
            None => (FALLBACK_TONE.to_string(), default_themes(), "fallback"),
        };

        state.push_message(Message::assistant(summarize(&tone, &themes)).with_metadata("source", source));
        state.set_artifact(&step, "themes", json!(themes));
        state.set_artifact(&step, "tone", json!(tone));
        state.set_artifact(&step, "source", json!(source));
        state.current_step = step;
        state.replace_actions(actions::analysis_menu());
        state
    }
}
