//! sg-core: Speech Gateway Core Library
//!
//! Configuration loading and the Markdown normalizer that cleans request
//! text before it is handed to a speech provider.

pub mod config;
pub mod error;
pub mod markdown;

pub use config::{ApiConfig, Config, SpeechConfig};
pub use error::{Error, Result};
pub use markdown::{normalize, NormalizationPipeline, NormalizationRule, Replacement, Scope};
