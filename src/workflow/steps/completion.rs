use async_trait::async_trait;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::workflow::handler::StepHandler;
use crate::workflow::state::{ConversationState, Message, Step};

use super::creation::{DraftPost, draft_posts};

const PLATFORMS: [&str; 2] = ["Facebook", "Instagram"];
const ICONS: [&str; 2] = ["📱", "📸"];
const FIRST_SLOT_HOUR: u32 = 14;
const SLOT_SPACING_MINUTES: u32 = 5;

/// A draft assigned to a platform and a posting time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub post_id: String,
    pub platform: String,
    pub time: String,
}

fn slot(index: usize) -> String {
    let minutes = FIRST_SLOT_HOUR * 60 + SLOT_SPACING_MINUTES * index as u32;
    NaiveTime::from_hms_opt((minutes / 60) % 24, minutes % 60, 0)
        .map(|t| t.format("%-I:%M %p").to_string())
        .unwrap_or_default()
}

/// Alternate platforms, five minutes apart, starting at 2:00 PM.
pub fn schedule(drafts: &[DraftPost]) -> Vec<ScheduledPost> {
    drafts
        .iter()
        .enumerate()
        .map(|(i, draft)| ScheduledPost {
            post_id: draft.id.clone(),
            platform: PLATFORMS[i % PLATFORMS.len()].to_string(),
            time: slot(i),
        })
        .collect()
}

fn confirm(scheduled: &[ScheduledPost]) -> String {
    let lines: Vec<String> = scheduled
        .iter()
        .enumerate()
        .map(|(i, post)| {
            let line = format!(
                "{} Post {}: Going to {} at {}",
                ICONS[i % ICONS.len()],
                i + 1,
                post.platform,
                post.time
            );
            if i == 0 {
                format!("{line} (your best engagement time)")
            } else {
                line
            }
        })
        .collect();

    format!(
        "Perfect! Your content is ready to go:\n\n{}\n\n\
         I'll monitor the performance and suggest optimizations based on engagement. \
         You're all set!",
        lines.join("\n")
    )
}

/// Schedules the approved drafts and ends the conversation.
pub struct CompletionHandler;

#[async_trait]
impl StepHandler for CompletionHandler {
    fn step(&self) -> Step {
        Step::Completion
    }

    async fn execute(&self, mut state: ConversationState) -> ConversationState {
        let drafts: Vec<DraftPost> = state
            .artifact(&Step::ContentCreation, "drafts")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| draft_posts(&state));

        let scheduled = schedule(&drafts);
        info!(session_id = %state.session_id(), posts = scheduled.len(), "Scheduled approved posts");

        state.push_message(Message::assistant(confirm(&scheduled)));
        state.set_artifact(&Step::Completion, "schedule", json!(scheduled));
        state.current_step = Step::Terminal;
        state.replace_actions(Vec::new());
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_five_minutes_apart() {
        assert_eq!(slot(0), "2:00 PM");
        assert_eq!(slot(1), "2:05 PM");
        assert_eq!(slot(12), "3:00 PM");
    }

    #[tokio::test]
    async fn schedules_drafts_and_terminates() {
        let state = ConversationState::with_session_id("s")
            .with_subject("Mike's Pizza")
            .with_step(Step::Completion);

        let out = CompletionHandler.handle(state).await;

        let scheduled: Vec<ScheduledPost> =
            serde_json::from_value(out.artifact(&Step::Completion, "schedule").unwrap().clone()).unwrap();
        assert_eq!(scheduled.len(), 2);
        assert_eq!(scheduled[0].platform, "Facebook");
        assert_eq!(scheduled[0].time, "2:00 PM");
        assert_eq!(scheduled[1].platform, "Instagram");
        assert_eq!(scheduled[1].time, "2:05 PM");

        let content = &out.messages().as_slice()[0].content;
        assert!(content.contains("📱 Post 1: Going to Facebook at 2:00 PM (your best engagement time)"));
        assert!(content.contains("📸 Post 2: Going to Instagram at 2:05 PM"));
        assert_eq!(out.current_step, Step::Terminal);
        assert!(out.pending_actions.is_empty());
        assert!(out.is_completed(&Step::Completion));
    }

    #[tokio::test]
    async fn uses_recorded_drafts() {
        let mut state = ConversationState::with_session_id("s")
            .with_subject("Acme")
            .with_step(Step::Completion);
        let drafts = vec![DraftPost {
            id: "post_9".to_string(),
            post_type: "image_post".to_string(),
            theme: "x".to_string(),
            caption: "c".to_string(),
            image_description: "i".to_string(),
            hashtags: vec![],
            best_time: "2:00 PM".to_string(),
        }];
        state.set_artifact(&Step::ContentCreation, "drafts", json!(drafts));

        let out = CompletionHandler.handle(state).await;

        assert_eq!(
            out.artifact(&Step::Completion, "schedule"),
            Some(&json!([{"post_id": "post_9", "platform": "Facebook", "time": "2:00 PM"}]))
        );
    }
}
