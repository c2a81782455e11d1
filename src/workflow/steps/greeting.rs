use async_trait::async_trait;

use crate::workflow::actions;
use crate::workflow::handler::StepHandler;
use crate::workflow::state::{ConversationState, Message, Step};

const ASK_FOR_NAME: &str = "Hi! I'm Neta, your AI Marketing Freelancer. I'll help you create \
amazing social media content based on your existing social presence. What's your business name?";

/// Opens the conversation and collects the business name.
pub struct GreetingHandler;

#[async_trait]
impl StepHandler for GreetingHandler {
    fn step(&self) -> Step {
        Step::Greeting
    }

    async fn execute(&self, mut state: ConversationState) -> ConversationState {
        if state.has_subject() {
            let welcome = format!(
                "Nice to meet you, {}! Let me take a look at your social presence.",
                state.subject_name()
            );
            state.push_message(Message::assistant(welcome));
            state.replace_actions(Vec::new());
        } else {
            state.push_message(Message::assistant(ASK_FOR_NAME));
            state.replace_actions(actions::greeting_menu());
        }
        state.current_step = Step::Greeting;
        state
    }
}
