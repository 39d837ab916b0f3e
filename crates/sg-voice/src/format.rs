//! Audio output formats
//!
//! The OpenAI speech API names six formats. Edge can only produce some of
//! them directly; the rest are delivered as MP3 since this service does no
//! transcoding.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::VoiceError;

/// Audio format for TTS output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Mp3,
    Opus,
    Aac,
    Flac,
    Wav,
    Pcm,
}

impl AudioFormat {
    pub const ALL: [AudioFormat; 6] = [
        Self::Mp3,
        Self::Opus,
        Self::Aac,
        Self::Flac,
        Self::Wav,
        Self::Pcm,
    ];

    /// Parse a request's `response_format`, falling back to MP3 for unknown names
    pub fn from_request(name: &str) -> Self {
        name.parse().unwrap_or_default()
    }

    /// MIME type sent back in `Content-Type`
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/ogg",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
            Self::Pcm => "audio/L16",
        }
    }

    /// File extension for the download name
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
            Self::Wav => "wav",
            Self::Pcm => "pcm",
        }
    }

    /// Edge output format identifier, if Edge can produce this format natively
    pub fn edge_output_format(&self) -> Option<&'static str> {
        match self {
            Self::Mp3 => Some("audio-24khz-48kbitrate-mono-mp3"),
            Self::Opus => Some("ogg-24khz-16bit-mono-opus"),
            Self::Wav => Some("riff-24khz-16bit-mono-pcm"),
            Self::Pcm => Some("raw-24khz-16bit-mono-pcm"),
            Self::Aac | Self::Flac => None,
        }
    }

    /// The format actually delivered when this one is requested
    pub fn delivered(self) -> Self {
        if self.edge_output_format().is_some() {
            self
        } else {
            Self::Mp3
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for AudioFormat {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| VoiceError::InvalidFormat(s.to_string()))
    }
}
