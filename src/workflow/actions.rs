//! Action menus offered at each suspend point, and the choices that move a
//! suspended session forward.

use super::state::{Action, Step};

pub const PROVIDE_BUSINESS_NAME: &str = "provide_business_name";
pub const ANALYZE_ACCOUNTS: &str = "analyze_accounts";
pub const ADD_MORE_ACCOUNTS: &str = "add_more_accounts";
pub const NO_SOCIAL_PAGES: &str = "no_social_pages";
pub const APPROVE_STRATEGY: &str = "approve_strategy";
pub const ADJUST_THEMES: &str = "adjust_themes";
pub const SHOW_EXAMPLES: &str = "show_examples";
pub const APPROVE_ALL: &str = "approve_all";
pub const REVIEW_INDIVIDUAL: &str = "review_individual";
pub const CREATE_DIFFERENT: &str = "create_different";

/// Greeting, while the business name is still unknown.
pub fn greeting_menu() -> Vec<Action> {
    vec![Action::new(
        PROVIDE_BUSINESS_NAME,
        "Tell me your business name",
        "input_text",
    )]
}

/// After discovery, waiting for the user to confirm the accounts.
pub fn discovery_menu() -> Vec<Action> {
    vec![
        Action::new(ANALYZE_ACCOUNTS, "Yes, analyze them", "confirm"),
        Action::new(ADD_MORE_ACCOUNTS, "Let me add more accounts", "modify"),
        Action::new(NO_SOCIAL_PAGES, "I don't have social pages yet", "create_new"),
    ]
}

/// After analysis, waiting for strategy approval.
pub fn analysis_menu() -> Vec<Action> {
    vec![
        Action::new(APPROVE_STRATEGY, "Sounds perfect", "approve"),
        Action::new(ADJUST_THEMES, "Let me adjust these themes", "modify"),
        Action::new(SHOW_EXAMPLES, "Show me examples first", "preview"),
    ]
}

/// After drafting, waiting for content approval.
pub fn creation_menu() -> Vec<Action> {
    vec![
        Action::new(APPROVE_ALL, "Post all now", "approve_all"),
        Action::new(REVIEW_INDIVIDUAL, "Let me review each one", "review"),
        Action::new(CREATE_DIFFERENT, "Create different styles", "regenerate"),
    ]
}

/// The marker step a chosen action advances the session to, if any.
///
/// Choices that are not listed keep the session at its current suspend point.
pub fn resolve_choice(action_id: &str) -> Option<Step> {
    match action_id {
        ANALYZE_ACCOUNTS | NO_SOCIAL_PAGES => Some(Step::ConfirmAccounts),
        APPROVE_STRATEGY => Some(Step::StrategyApproval),
        APPROVE_ALL => Some(Step::ContentApproval),
        _ => None,
    }
}

/// The step at which a resolved choice is accepted.
///
/// A marker is only applied when the session is suspended at the step that
/// offered it, so a stale or replayed choice cannot skip ahead.
pub fn choice_origin(marker: &Step) -> Option<Step> {
    match marker {
        Step::ConfirmAccounts => Some(Step::SocialDiscovery),
        Step::StrategyApproval => Some(Step::ContentAnalysis),
        Step::ContentApproval => Some(Step::ContentCreation),
        _ => None,
    }
}
