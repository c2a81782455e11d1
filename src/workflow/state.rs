//! Conversation state, the record threaded through every turn.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Step-produced artifacts and completion flags, keyed `<step>_<name>`.
pub type DataBag = serde_json::Map<String, serde_json::Value>;

/// A named stage of the conversation.
///
/// Progresses: Greeting → SocialDiscovery → ConfirmAccounts → ContentAnalysis →
/// StrategyApproval → ContentCreation → ContentApproval → Completion → Terminal.
///
/// `ConfirmAccounts`, `StrategyApproval` and `ContentApproval` are
/// post-confirmation markers set by the transport when the user accepts a
/// suspend point; no handler runs for them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Step {
    #[default]
    Greeting,
    SocialDiscovery,
    ConfirmAccounts,
    ContentAnalysis,
    StrategyApproval,
    ContentCreation,
    ContentApproval,
    Completion,
    Terminal,
    /// A tag outside the known set, kept verbatim so it round-trips.
    Unknown(String),
}

impl Step {
    /// Every known step, in canonical order.
    pub const ALL: [Step; 9] = [
        Step::Greeting,
        Step::SocialDiscovery,
        Step::ConfirmAccounts,
        Step::ContentAnalysis,
        Step::StrategyApproval,
        Step::ContentCreation,
        Step::ContentApproval,
        Step::Completion,
        Step::Terminal,
    ];

    /// Parse a wire tag. Legacy tags map onto their current equivalents;
    /// anything else becomes `Unknown`.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "greeting" | "collect_business_name" => Self::Greeting,
            "social_discovery" => Self::SocialDiscovery,
            "confirm_accounts" => Self::ConfirmAccounts,
            "content_analysis" => Self::ContentAnalysis,
            "strategy_approval" => Self::StrategyApproval,
            "content_creation" => Self::ContentCreation,
            "content_approval" => Self::ContentApproval,
            "completion" => Self::Completion,
            "terminal" | "completed" => Self::Terminal,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Greeting => "greeting",
            Self::SocialDiscovery => "social_discovery",
            Self::ConfirmAccounts => "confirm_accounts",
            Self::ContentAnalysis => "content_analysis",
            Self::StrategyApproval => "strategy_approval",
            Self::ContentCreation => "content_creation",
            Self::ContentApproval => "content_approval",
            Self::Completion => "completion",
            Self::Terminal => "terminal",
            Self::Unknown(tag) => tag,
        }
    }

    /// Position in the canonical ordering, `None` for unknown tags.
    pub fn ordinal(&self) -> Option<usize> {
        Self::ALL.iter().position(|s| s == self)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Whether this is a post-confirmation marker.
    pub fn is_marker(&self) -> bool {
        matches!(
            self,
            Self::ConfirmAccounts | Self::StrategyApproval | Self::ContentApproval
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    /// The `data_bag` key of this step's completion flag.
    pub fn completion_key(&self) -> String {
        format!("{}_completed", self.as_str())
    }

    /// The `data_bag` key of a step-produced artifact.
    pub fn artifact_key(&self, name: &str) -> String {
        format!("{}_{}", self.as_str(), name)
    }
}

impl From<String> for Step {
    fn from(tag: String) -> Self {
        Self::parse(&tag)
    }
}

impl From<&str> for Step {
    fn from(tag: &str) -> Self {
        Self::parse(tag)
    }
}

impl From<Step> for String {
    fn from(step: Step) -> Self {
        step.as_str().to_string()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Append-only, chronologically ordered message log.
///
/// There is no way to remove, reorder, or rewrite an entry once pushed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageLog(Vec<Message>);

impl MessageLog {
    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.0
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }
}

impl From<Vec<Message>> for MessageLog {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a MessageLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A choice offered to the user at a suspend point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: String,
    pub label: String,
    /// Opaque to the core; interpreted by the UI.
    #[serde(alias = "action")]
    pub action_kind: String,
}

impl Action {
    pub fn new(id: &str, label: &str, action_kind: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            action_kind: action_kind.to_string(),
        }
    }
}

/// An externally-found social account or page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredAccount {
    pub platform: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_followers",
        skip_serializing_if = "Option::is_none"
    )]
    pub followers: Option<u64>,
    #[serde(default)]
    pub verified: bool,
}

/// Follower counts arrive either as numbers or as numeric strings.
fn deserialize_followers<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Followers {
        Count(u64),
        Text(String),
    }

    Ok(match Option::<Followers>::deserialize(deserializer)? {
        Some(Followers::Count(n)) => Some(n),
        Some(Followers::Text(s)) => s.trim().replace(',', "").parse().ok(),
        None => None,
    })
}

/// The per-session conversation record.
///
/// Every field defaults, so partial or legacy snapshots deserialize. The
/// session id, subject name and message log are only reachable through
/// methods that keep them immutable or append-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    #[serde(default)]
    session_id: String,
    #[serde(default, alias = "business_name")]
    subject_name: String,
    #[serde(default, alias = "messages")]
    message_log: MessageLog,
    #[serde(default)]
    pub current_step: Step,
    #[serde(default, alias = "user_data")]
    pub data_bag: DataBag,
    #[serde(default, alias = "social_accounts")]
    pub discovered_resources: Vec<DiscoveredAccount>,
    #[serde(default, alias = "next_actions")]
    pub pending_actions: Vec<Action>,
}

impl ConversationState {
    /// Create a fresh session at the greeting step.
    pub fn new() -> Self {
        Self::with_session_id(Uuid::new_v4().to_string())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// Builder used by tests and snapshot construction.
    pub fn with_subject(mut self, name: &str) -> Self {
        self.set_subject_name(name);
        self
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.current_step = step;
        self
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Assign a session id if none was ever assigned. Returns whether it did.
    pub fn ensure_session_id(&mut self, candidate: impl Into<String>) -> bool {
        if !self.session_id.is_empty() {
            return false;
        }
        self.session_id = candidate.into();
        true
    }

    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    pub fn has_subject(&self) -> bool {
        !self.subject_name.is_empty()
    }

    /// Set the subject name once. Later calls, and blank names, are ignored.
    pub fn set_subject_name(&mut self, name: &str) -> bool {
        let name = name.trim();
        if self.has_subject() || name.is_empty() {
            return false;
        }
        self.subject_name = name.to_string();
        true
    }

    pub fn messages(&self) -> &MessageLog {
        &self.message_log
    }

    pub fn push_message(&mut self, message: Message) {
        self.message_log.push(message);
    }

    /// Whether `step` has already run its side effects for this session.
    pub fn is_completed(&self, step: &Step) -> bool {
        self.data_bag
            .get(&step.completion_key())
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    pub fn mark_completed(&mut self, step: &Step) {
        self.data_bag
            .insert(step.completion_key(), serde_json::Value::Bool(true));
    }

    pub fn artifact(&self, step: &Step, name: &str) -> Option<&serde_json::Value> {
        self.data_bag.get(&step.artifact_key(name))
    }

    pub fn set_artifact(&mut self, step: &Step, name: &str, value: serde_json::Value) {
        self.data_bag.insert(step.artifact_key(name), value);
    }

    /// Replace the action menu wholesale.
    pub fn replace_actions(&mut self, actions: Vec<Action>) {
        self.pending_actions = actions;
    }

    /// Apply inbound defaults: a missing session id is generated, and a
    /// session without a subject name is pinned to the greeting step.
    ///
    /// States carrying an unknown step are left alone.
    pub fn normalize(&mut self) {
        if self.ensure_session_id(Uuid::new_v4().to_string()) {
            tracing::debug!(session_id = %self.session_id, "Assigned session id");
        }
        if self.current_step.is_known()
            && !self.has_subject()
            && self.current_step != Step::Greeting
        {
            tracing::debug!(
                session_id = %self.session_id,
                step = %self.current_step,
                "No subject name yet, returning to greeting"
            );
            self.current_step = Step::Greeting;
        }
    }
}
