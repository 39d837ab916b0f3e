//! Speech provider abstraction
//!
//! The HTTP layer only talks to [`SpeechProvider`]; the Edge client is one
//! implementation, and tests plug in their own.

use async_trait::async_trait;

use crate::catalog::{is_edge_voice_name, resolve_voice, VoiceInfo};
use crate::error::{Result, VoiceError};
use crate::format::AudioFormat;

/// Slowest speed accepted upstream
pub const MIN_SPEED: f32 = 0.25;
/// Fastest speed accepted upstream
pub const MAX_SPEED: f32 = 4.0;

/// A single synthesis request
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    /// Text to speak, already normalized
    pub text: String,
    /// Voice name, either an OpenAI alias or an Edge voice
    pub voice: String,
    /// Requested output format
    pub format: AudioFormat,
    /// Speed multiplier, 1.0 is normal speed
    pub speed: f32,
}

impl SpeechRequest {
    pub fn new(text: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: voice.into(),
            format: AudioFormat::default(),
            speed: 1.0,
        }
    }

    /// Set format
    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }

    /// Set speed
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    /// Reject requests the upstream service cannot serve
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(VoiceError::InvalidRequest(
                "Input text is empty after preprocessing".to_string(),
            ));
        }
        if self.voice.trim().is_empty() {
            return Err(VoiceError::InvalidRequest("Voice must not be empty".to_string()));
        }
        if !is_edge_voice_name(&resolve_voice(&self.voice)) {
            return Err(VoiceError::InvalidRequest(format!("Invalid voice: {}", self.voice)));
        }
        if !self.speed.is_finite() || self.speed <= 0.0 {
            return Err(VoiceError::InvalidRequest(format!(
                "Speed must be a positive number, got {}",
                self.speed
            )));
        }
        Ok(())
    }

    /// Speed clamped to the range the upstream accepts
    pub fn effective_speed(&self) -> f32 {
        self.speed.clamp(MIN_SPEED, MAX_SPEED)
    }

    /// Prosody rate relative to normal speed, e.g. `+20%` for 1.2
    pub fn rate(&self) -> String {
        let percent = ((self.effective_speed() - 1.0) * 100.0).round();
        // avoid "-0%"
        let percent = if percent == 0.0 { 0.0 } else { percent };
        format!("{:+.0}%", percent)
    }
}

/// TTS synthesis result
#[derive(Debug, Clone)]
pub struct SynthesisResult {
    /// Audio data (encoded in the delivered format)
    pub audio_data: Vec<u8>,
    /// Format actually delivered, which may differ from the requested one
    pub format: AudioFormat,
    /// Content type
    pub content_type: String,
}

impl SynthesisResult {
    pub fn new(audio_data: Vec<u8>, format: AudioFormat) -> Self {
        Self {
            audio_data,
            format,
            content_type: format.mime_type().to_string(),
        }
    }

    /// Download name for `Content-Disposition`
    pub fn file_name(&self) -> String {
        format!("speech.{}", self.format.extension())
    }
}

/// A text-to-speech backend
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Synthesize speech for the request
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SynthesisResult>;

    /// List every voice the provider offers
    async fn list_voices(&self) -> Result<Vec<VoiceInfo>>;
}
