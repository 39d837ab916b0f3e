//! Voice and model catalog
//!
//! OpenAI clients only know six voice names and two model ids. Those are
//! mapped onto Edge neural voices here; any other voice name is assumed to
//! be an Edge voice already and passes through, as long as it is shaped
//! like one.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;

/// `en-US-AvaNeural`, `zh-CN-liaoning-XiaobeiNeural`
pub(crate) static SHORT_VOICE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]{2,})-([A-Z]{2,})-([A-Za-z0-9-]+Neural)$").unwrap());

/// `Microsoft Server Speech Text to Speech Voice (en-US, AvaNeural)`
static LONG_VOICE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Microsoft Server Speech Text to Speech Voice \([a-z]{2,}-[A-Z]{2,}(?:-[A-Za-z0-9]+)?, [A-Za-z0-9]+Neural\)$",
    )
    .unwrap()
});

/// A model entry as returned by `/v1/models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub name: &'static str,
}

/// Models advertised to OpenAI clients. Both use the same Edge voices.
pub fn models() -> Vec<ModelInfo> {
    vec![
        ModelInfo {
            id: "tts-1",
            name: "Text-to-speech v1",
        },
        ModelInfo {
            id: "tts-1-hd",
            name: "Text-to-speech v1 HD",
        },
    ]
}

/// Available OpenAI TTS voices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAiVoice {
    #[default]
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl OpenAiVoice {
    pub const ALL: [OpenAiVoice; 6] = [
        Self::Alloy,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Shimmer,
    ];

    /// The Edge voice that stands in for this OpenAI voice
    pub fn edge_voice(&self) -> &'static str {
        match self {
            Self::Alloy => "en-US-AvaNeural",
            Self::Echo => "en-US-AndrewNeural",
            Self::Fable => "en-GB-SoniaNeural",
            Self::Onyx => "en-US-EricNeural",
            Self::Nova => "en-US-SteffanNeural",
            Self::Shimmer => "en-US-EmmaNeural",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }
}

impl std::fmt::Display for OpenAiVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OpenAiVoice {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|voice| voice.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(())
    }
}

/// Resolve a requested voice name to an Edge voice name
pub fn resolve_voice(name: &str) -> String {
    match name.parse::<OpenAiVoice>() {
        Ok(voice) => voice.edge_voice().to_string(),
        Err(()) => name.trim().to_string(),
    }
}

/// Whether an already resolved voice is an Edge voice name, short or long form
pub fn is_edge_voice_name(name: &str) -> bool {
    SHORT_VOICE_NAME.is_match(name) || LONG_VOICE_NAME.is_match(name)
}

/// A voice entry as returned by `/v1/voices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Short voice name, e.g. `en-US-AvaNeural`
    pub name: String,
    pub gender: String,
    /// Locale, e.g. `en-US`
    pub language: String,
}

/// Which voices to list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum VoiceFilter {
    #[default]
    All,
    /// Only voices whose locale matches, ignoring ASCII case
    Locale(String),
}

impl VoiceFilter {
    /// Build a filter from a `language`/`locale` parameter. Missing, empty
    /// and `all` select every voice.
    pub fn from_param(param: Option<&str>) -> Self {
        match param.map(str::trim) {
            None | Some("") => Self::All,
            Some(p) if p.eq_ignore_ascii_case("all") => Self::All,
            Some(p) => Self::Locale(p.to_string()),
        }
    }

    pub fn matches(&self, voice: &VoiceInfo) -> bool {
        match self {
            Self::All => true,
            Self::Locale(locale) => voice.language.eq_ignore_ascii_case(locale),
        }
    }

    pub fn apply(&self, voices: Vec<VoiceInfo>) -> Vec<VoiceInfo> {
        voices.into_iter().filter(|v| self.matches(v)).collect()
    }
}
