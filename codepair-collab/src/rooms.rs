//! Room directory client.
//!
//! `POST {rooms}` with an optional `{name}` answers `{room_id}` or
//! `{roomId}` depending on the server revision; both are accepted.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{CollabError, Result};

#[derive(Debug, Serialize)]
struct CreateRoom<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreatedRoom {
    #[serde(alias = "roomId")]
    room_id: String,
}

/// Creates rooms. Only the returned identifier is consumed.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn create_room(&self, name: Option<&str>) -> Result<String>;
}

/// HTTP-backed room directory.
#[derive(Debug, Clone)]
pub struct HttpRoomDirectory {
    client: Client,
    endpoint: Url,
}

impl HttpRoomDirectory {
    pub fn new(endpoint: Url) -> Self {
        Self::with_client(Client::new(), endpoint)
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Self::new(config.rooms_url()?))
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl RoomDirectory for HttpRoomDirectory {
    async fn create_room(&self, name: Option<&str>) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&CreateRoom { name })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollabError::Request(format!("room directory answered {status}")));
        }

        let created: CreatedRoom = response.json().await?;
        if created.room_id.trim().is_empty() {
            return Err(CollabError::Request("room directory returned an empty id".into()));
        }
        log::info!("Created room {}", created.room_id);
        Ok(created.room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_room_accepts_both_spellings() {
        let snake: CreatedRoom = serde_json::from_str(r#"{"room_id":"r1"}"#).unwrap();
        let camel: CreatedRoom = serde_json::from_str(r#"{"roomId":"r2"}"#).unwrap();
        assert_eq!(snake.room_id, "r1");
        assert_eq!(camel.room_id, "r2");
    }

    #[test]
    fn test_create_body_omits_missing_name() {
        assert_eq!(serde_json::to_string(&CreateRoom { name: None }).unwrap(), "{}");
        assert_eq!(
            serde_json::to_string(&CreateRoom { name: Some("Untitled Room") }).unwrap(),
            r#"{"name":"Untitled Room"}"#
        );
    }

    #[tokio::test]
    async fn test_unreachable_directory_is_request_error() {
        let directory = HttpRoomDirectory::new(Url::parse("http://127.0.0.1:1/rooms").unwrap());
        let result = directory.create_room(None).await;
        assert!(matches!(result, Err(CollabError::Request(_))));
    }
}
