//! Client configuration.

use std::time::Duration;
use url::Url;

use crate::error::Result;

/// Quiet period after the last edit before a suggestion is requested.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(600);

/// Page the client is served from when nothing else is configured.
pub const DEFAULT_PAGE_URL: &str = "http://127.0.0.1:8000/";

/// Everything the client needs to reach its collaborators.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Page URL. Its origin addresses the HTTP endpoints and the room
    /// channel; its `room` query key names the room to auto-join.
    pub page_url: Url,
    /// Room creation endpoint path
    pub rooms_path: String,
    /// Suggestion endpoint path
    pub autocomplete_path: String,
    /// Debounce window for suggestion requests
    pub debounce: Duration,
    /// Language tag sent with suggestion requests
    pub language: String,
    /// Outbound frame buffer per room channel
    pub send_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(Url::parse(DEFAULT_PAGE_URL).expect("default page URL is valid"))
    }
}

impl ClientConfig {
    pub fn new(page_url: Url) -> Self {
        Self {
            page_url,
            rooms_path: "/rooms".to_string(),
            autocomplete_path: "/autocomplete".to_string(),
            debounce: DEFAULT_DEBOUNCE,
            language: "python".to_string(),
            send_capacity: 256,
        }
    }

    /// Parse the page URL, e.g. `http://host:8000/?room=abc`.
    pub fn from_page_url(page_url: &str) -> Result<Self> {
        Ok(Self::new(Url::parse(page_url)?))
    }

    /// Serve both HTTP endpoints under `prefix` (e.g. `/api`).
    pub fn with_api_prefix(mut self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        self.rooms_path = format!("{prefix}/rooms");
        self.autocomplete_path = format!("{prefix}/autocomplete");
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn rooms_url(&self) -> Result<Url> {
        Ok(self.page_url.join(&self.rooms_path)?)
    }

    pub fn autocomplete_url(&self) -> Result<Url> {
        Ok(self.page_url.join(&self.autocomplete_path)?)
    }
}
