use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::workflow::actions;
use crate::workflow::handler::StepHandler;
use crate::workflow::state::{ConversationState, Message, Step};

use super::analysis::{Theme, default_themes};

/// Posts drafted per turn.
const DRAFT_COUNT: usize = 2;

const BEST_TIMES: [&str; DRAFT_COUNT] = ["2:00 PM", "10:00 AM"];

const PROGRESS: &str = "Perfect! I'll create content that matches your existing style. \
Let me show you what I'm doing:\n\n\
🔍 Analyzing your best-performing posts from last month...\n\
📊 Researching trending hashtags in your area...\n\
🎨 Creating images that match your visual style...\n\
✍️ Writing captions in your friendly tone...\n\n\
This will take about 2 minutes. I'll show you everything before posting anything.";

/// A generated post awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPost {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub theme: String,
    pub caption: String,
    pub image_description: String,
    pub hashtags: Vec<String>,
    pub best_time: String,
}

fn hashtag(label: &str) -> String {
    let words: String = label
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    format!("#{words}")
}

fn draft(index: usize, theme: &Theme, subject: &str) -> DraftPost {
    let (post_type, body, image, hashtags): (&str, String, &str, Vec<String>) = match theme.id.as_str() {
        "product_photography" => (
            "image_post",
            format!("Fresh from {subject}! 📸 What's your favorite pick?"),
            "Close-up of today's best seller in natural light",
            vec!["#FreshPicks".into(), "#ShopLocal".into(), "#MadeWithLove".into()],
        ),
        "behind_the_scenes" => (
            "behind_scenes",
            format!("Behind the scenes at {subject} - our team putting love into everything we make! 👩‍🍳"),
            "Team preparing today's batch",
            vec!["#BehindTheScenes".into(), "#HandCrafted".into(), "#SmallBusiness".into()],
        ),
        "customer_spotlights" => (
            "customer_spotlight",
            format!("Shout-out to the amazing people who make {subject} what it is! 💬 Tag a friend who'd love this."),
            "Smiling customer with their order",
            vec!["#CustomerLove".into(), "#Community".into(), "#ShopLocal".into()],
        ),
        _ => (
            "image_post",
            format!("{} at {subject}! ✨", theme.label),
            "Photo matching the theme",
            vec![hashtag(&theme.label), "#ShopLocal".into()],
        ),
    };

    DraftPost {
        id: format!("post_{}", index + 1),
        post_type: post_type.to_string(),
        theme: theme.id.clone(),
        caption: format!("{body} {}", hashtags.join(" ")),
        image_description: image.to_string(),
        hashtags,
        best_time: BEST_TIMES[index % BEST_TIMES.len()].to_string(),
    }
}

/// Themes recorded by the analysis step, or the default themes when none
/// were recorded.
fn recorded_themes(state: &ConversationState) -> Vec<Theme> {
    state
        .artifact(&Step::ContentAnalysis, "themes")
        .and_then(|v| serde_json::from_value::<Vec<Theme>>(v.clone()).ok())
        .filter(|themes| !themes.is_empty())
        .unwrap_or_else(default_themes)
}

/// One draft per recorded theme, up to `DRAFT_COUNT`.
pub fn draft_posts(state: &ConversationState) -> Vec<DraftPost> {
    recorded_themes(state)
        .iter()
        .take(DRAFT_COUNT)
        .enumerate()
        .map(|(i, theme)| draft(i, theme, state.subject_name()))
        .collect()
}

fn present(themes: &[Theme]) -> String {
    let icons = ["📱", "📸"];
    let lines: Vec<String> = themes
        .iter()
        .enumerate()
        .map(|(i, theme)| format!("{} Post {}: {}", icons[i % icons.len()], i + 1, theme.label))
        .collect();

    format!(
        "Here are {} posts I've created based on your social presence. Each one follows the \
         style of your most successful content:\n\n{}\n\n\
         Would you like to review and approve these posts?",
        themes.len(),
        lines.join("\n")
    )
}

/// Drafts posts from the approved strategy and waits for approval.
pub struct ContentCreationHandler;

#[async_trait]
impl StepHandler for ContentCreationHandler {
    fn step(&self) -> Step {
        Step::ContentCreation
    }

    async fn execute(&self, mut state: ConversationState) -> ConversationState {
        let themes: Vec<Theme> = recorded_themes(&state).into_iter().take(DRAFT_COUNT).collect();
        let drafts: Vec<DraftPost> = themes
            .iter()
            .enumerate()
            .map(|(i, theme)| draft(i, theme, state.subject_name()))
            .collect();

        state.push_message(Message::assistant(PROGRESS));
        state.push_message(Message::assistant(present(&themes)));
        state.set_artifact(&Step::ContentCreation, "drafts", json!(drafts));
        state.current_step = Step::ContentCreation;
        state.replace_actions(actions::creation_menu());
        state
    }
}
