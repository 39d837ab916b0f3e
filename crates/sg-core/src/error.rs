//! Error types for sg-core

use thiserror::Error;

/// Main error type for sg-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for sg-core
pub type Result<T> = std::result::Result<T, Error>;
