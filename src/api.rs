use crate::puzzle::{ClueMap, ClueProvider, ClueProviderError, ClueRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct ClueBatchRequest<'a> {
    entries: &'a [ClueRequest],
}

#[derive(Debug, Deserialize)]
struct ClueBatchResponse {
    #[serde(default)]
    clues: ClueMap,
}

/// Fetches clues from an HTTP service in a single POST.
///
/// The service receives `{"entries": [...]}` and answers with
/// `{"clues": {"<number>-<direction>": "text", ...}}`.
#[derive(Debug, Clone)]
pub struct RemoteClueProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteClueProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self::with_client(client, endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl ClueProvider for RemoteClueProvider {
    async fn generate_clues(
        &self,
        requests: &[ClueRequest],
    ) -> Result<ClueMap, ClueProviderError> {
        debug!("Requesting {} clues from {}", requests.len(), self.endpoint);
        let response = self
            .client
            .post(self.endpoint.as_str())
            .json(&ClueBatchRequest { entries: requests })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClueProviderError::Status(response.status().as_u16()));
        }
        let body = response.json::<ClueBatchResponse>().await?;
        Ok(body.clues)
    }
}
