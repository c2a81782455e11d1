//! Account discovery: the resource-lookup collaborator and its
//! deterministic fallback.

pub mod http;

pub use http::HttpAccountLookup;

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::error::LookupError;
use crate::workflow::state::DiscoveredAccount;

static NON_HANDLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("valid handle regex"));

/// Finds the social accounts that belong to a business.
#[async_trait]
pub trait AccountLookup: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    async fn lookup(&self, subject: &str) -> Result<Vec<DiscoveredAccount>, LookupError>;
}

/// Run a lookup, giving up after `limit`. An empty result is an error.
pub async fn lookup_with_timeout(
    lookup: &dyn AccountLookup,
    subject: &str,
    limit: Duration,
) -> Result<Vec<DiscoveredAccount>, LookupError> {
    let accounts = tokio::time::timeout(limit, lookup.lookup(subject))
        .await
        .map_err(|_| LookupError::Timeout(limit))??;

    if accounts.is_empty() {
        return Err(LookupError::NoResults {
            subject: subject.to_string(),
        });
    }
    Ok(accounts)
}

/// Lowercase alphanumeric handle derived from a business name.
///
/// "Mike's Pizza" becomes "mikespizza".
pub fn handle_slug(subject: &str) -> String {
    NON_HANDLE_CHARS
        .replace_all(&subject.to_lowercase(), "")
        .into_owned()
}

/// The accounts assumed to exist when no lookup is available or it failed.
pub fn fallback_accounts(subject: &str) -> Vec<DiscoveredAccount> {
    let slug = handle_slug(subject);
    vec![
        DiscoveredAccount {
            platform: "Facebook".to_string(),
            name: format!("{subject} Official"),
            url: Some(format!("https://facebook.com/{slug}")),
            followers: Some(500),
            verified: true,
        },
        DiscoveredAccount {
            platform: "Instagram".to_string(),
            name: format!("@{slug}"),
            url: Some(format!("https://instagram.com/{slug}")),
            followers: Some(200),
            verified: false,
        },
    ]
}
