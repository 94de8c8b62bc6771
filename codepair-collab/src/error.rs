//! Error taxonomy for the collaboration client.
//!
//! Nothing here is fatal: connection failures become a status line, protocol
//! failures drop a single frame, request failures hide the suggestion.

use thiserror::Error;

use crate::protocol::ProtocolError;

#[derive(Debug, Error)]
pub enum CollabError {
    /// Opening, writing or closing the room channel failed.
    #[error("Connection error: {0}")]
    Connection(String),
    /// An inbound or outbound frame could not be (de)serialized.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    /// Room creation or suggestion fetch failed.
    #[error("Request error: {0}")]
    Request(String),
    /// Invalid client configuration (URLs, room ids).
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for CollabError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        CollabError::Connection(e.to_string())
    }
}

impl From<reqwest::Error> for CollabError {
    fn from(e: reqwest::Error) -> Self {
        CollabError::Request(e.to_string())
    }
}

impl From<url::ParseError> for CollabError {
    fn from(e: url::ParseError) -> Self {
        CollabError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CollabError>;
