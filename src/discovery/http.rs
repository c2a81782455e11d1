//! HTTP account lookup: `GET <url>?q=<business name>` returning a JSON array
//! of accounts.

use async_trait::async_trait;
use tracing::debug;

use crate::error::LookupError;
use crate::workflow::state::DiscoveredAccount;

use super::AccountLookup;

pub struct HttpAccountLookup {
    client: reqwest::Client,
    url: String,
}

impl HttpAccountLookup {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl AccountLookup for HttpAccountLookup {
    fn name(&self) -> &str {
        "http"
    }

    async fn lookup(&self, subject: &str) -> Result<Vec<DiscoveredAccount>, LookupError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", subject)])
            .send()
            .await
            .map_err(|e| LookupError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let accounts: Vec<DiscoveredAccount> = response
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

        debug!(subject = subject, count = accounts.len(), "Account lookup returned");
        Ok(accounts)
    }
}
