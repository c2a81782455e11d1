use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{info, warn};

use crate::discovery::{self, AccountLookup};
use crate::workflow::actions;
use crate::workflow::handler::StepHandler;
use crate::workflow::state::{ConversationState, DiscoveredAccount, Message, Step};

const SOURCE_LOOKUP: &str = "lookup";
const SOURCE_FALLBACK: &str = "fallback";

/// Finds the business's social accounts and asks the user to confirm them.
pub struct SocialDiscoveryHandler {
    lookup: Option<Arc<dyn AccountLookup>>,
    timeout: Duration,
}

impl SocialDiscoveryHandler {
    pub fn new(lookup: Option<Arc<dyn AccountLookup>>, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    async fn find_accounts(&self, state: &ConversationState) -> (Vec<DiscoveredAccount>, &'static str) {
        let subject = state.subject_name();
        let Some(lookup) = &self.lookup else {
            return (discovery::fallback_accounts(subject), SOURCE_FALLBACK);
        };

        match discovery::lookup_with_timeout(lookup.as_ref(), subject, self.timeout).await {
            Ok(accounts) => {
                info!(
                    session_id = %state.session_id(),
                    provider = lookup.name(),
                    count = accounts.len(),
                    "Discovered social accounts"
                );
                (accounts, SOURCE_LOOKUP)
            }
            Err(e) => {
                warn!(
                    session_id = %state.session_id(),
                    provider = lookup.name(),
                    error = %e,
                    "Account lookup failed, using fallback accounts"
                );
                (discovery::fallback_accounts(subject), SOURCE_FALLBACK)
            }
        }
    }
}

fn platform_icon(platform: &str) -> &'static str {
    match platform.to_ascii_lowercase().as_str() {
        "facebook" => "🔵",
        "instagram" => "📸",
        _ => "🌐",
    }
}

fn describe(accounts: &[DiscoveredAccount]) -> String {
    let lines: Vec<String> = accounts
        .iter()
        .map(|a| {
            let icon = platform_icon(&a.platform);
            match a.followers {
                Some(n) => format!("{icon} {}: {} ({n} followers)", a.platform, a.name),
                None => format!("{icon} {}: {}", a.platform, a.name),
            }
        })
        .collect();

    format!(
        "Perfect! Let me search for your social media pages...\n\nI found:\n{}\n\n\
         Should I analyze these pages to understand your current content style?",
        lines.join("\n")
    )
}

#[async_trait]
impl StepHandler for SocialDiscoveryHandler {
    fn step(&self) -> Step {
        Step::SocialDiscovery
    }

    async fn execute(&self, mut state: ConversationState) -> ConversationState {
        let (accounts, source) = self.find_accounts(&state).await;

        state.push_message(Message::assistant(describe(&accounts)).with_metadata("source", source));
        state.set_artifact(&Step::SocialDiscovery, "source", json!(source));
        state.discovered_resources = accounts;
        state.current_step = Step::SocialDiscovery;
        state.replace_actions(actions::discovery_menu());
        state
    }
}
