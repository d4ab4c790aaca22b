//! Error types for the Palaver client.

use palaver_call::CallError;
use palaver_common::PalaverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP response had a non-2xx status code.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// An error from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// An error from the WebSocket layer.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The relay connection is gone.
    #[error("Relay is not connected")]
    NotConnected,

    #[error("Relay is already connected")]
    AlreadyConnected,

    /// The outbound relay queue is full.
    #[error("Relay outbound queue is full")]
    QueueFull,

    /// No conversation is open.
    #[error("No conversation selected")]
    NoConversation,

    #[error(transparent)]
    Common(#[from] PalaverError),

    #[error(transparent)]
    Call(#[from] CallError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
