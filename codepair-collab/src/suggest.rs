//! Suggestion service client.
//!
//! `POST {autocomplete}` with `{code, cursor_position, language}` answers
//! `{suggestions: [...]}`. Only the first candidate is ever shown, but the
//! whole list is handed back so callers decide.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CollabError, Result};

/// Context sent to the suggestion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    /// Full document text
    pub code: String,
    /// Caret offset in characters
    pub cursor_position: usize,
    pub language: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    suggestions: Vec<String>,
}

/// Anything that can answer a completion request.
#[async_trait]
pub trait SuggestionSource: Send + Sync {
    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>>;
}

/// HTTP-backed suggestion source.
#[derive(Debug, Clone)]
pub struct HttpSuggestionClient {
    client: Client,
    endpoint: Url,
}

impl HttpSuggestionClient {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(config.autocomplete_url()?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl SuggestionSource for HttpSuggestionClient {
    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollabError::Request(format!(
                "suggestion service answered {status}"
            )));
        }

        let body: CompletionResponse = response.json().await?;
        log::debug!("Received {} suggestion(s)", body.suggestions.len());
        Ok(body.suggestions)
    }
}
