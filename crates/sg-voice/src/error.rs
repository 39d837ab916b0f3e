//! Error types for sg-voice

use thiserror::Error;

/// sg-voice error type
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("No audio was received from the speech service")]
    NoAudio,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid audio format: {0}")]
    InvalidFormat(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Unexpected response from speech service: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

impl VoiceError {
    /// Whether the error was caused by the caller's input rather than the upstream service
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::InvalidFormat(_))
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, VoiceError>;
