//! sg-voice: Speech synthesis backends for speech-gateway
//!
//! This crate provides the text-to-speech side of the gateway: output
//! formats, the OpenAI-compatible voice and model catalog, and the
//! [`SpeechProvider`] trait with its Microsoft Edge implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sg_voice::{AudioFormat, EdgeTtsClient, SpeechProvider, SpeechRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = EdgeTtsClient::new()?;
//!     let request = SpeechRequest::new("Hello, world!", "alloy")
//!         .with_format(AudioFormat::Mp3)
//!         .with_speed(1.2);
//!
//!     let result = client.synthesize(&request).await?;
//!     std::fs::write(result.file_name(), &result.audio_data)?;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod edge;
pub mod error;
pub mod format;
pub mod provider;

pub use catalog::{is_edge_voice_name, models, resolve_voice, ModelInfo, OpenAiVoice, VoiceFilter, VoiceInfo};
pub use edge::{EdgeTtsClient, EdgeTtsConfig};
pub use error::{Result, VoiceError};
pub use format::AudioFormat;
pub use provider::{SpeechProvider, SpeechRequest, SynthesisResult};
