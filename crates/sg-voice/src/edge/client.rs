//! Edge read-aloud client
//!
//! Voice listing is a plain HTTPS request. Synthesis opens one WebSocket
//! per text chunk and concatenates the audio payloads in order.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, info, warn};

use super::protocol;
use crate::catalog::{resolve_voice, VoiceInfo};
use crate::error::{Result, VoiceError};
use crate::format::AudioFormat;
use crate::provider::{SpeechProvider, SpeechRequest, SynthesisResult};

const DEFAULT_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

/// Timeouts for talking to the Edge service
#[derive(Debug, Clone)]
pub struct EdgeTtsConfig {
    /// Timeout for the voice list request and the WebSocket handshake
    pub connect_timeout: Duration,
    /// Longest silence tolerated between two frames of one synthesis
    pub receive_timeout: Duration,
}

impl Default for EdgeTtsConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(60),
        }
    }
}

/// Voice list entry as sent by the service
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EdgeVoice {
    short_name: String,
    gender: String,
    locale: String,
}

impl From<EdgeVoice> for VoiceInfo {
    fn from(voice: EdgeVoice) -> Self {
        Self {
            name: voice.short_name,
            gender: voice.gender,
            language: voice.locale,
        }
    }
}

/// Speech provider backed by Microsoft Edge's read-aloud service
pub struct EdgeTtsClient {
    client: Client,
    config: EdgeTtsConfig,
}

impl EdgeTtsClient {
    /// Create a new Edge TTS client with default timeouts
    pub fn new() -> Result<Self> {
        Self::with_config(EdgeTtsConfig::default())
    }

    pub fn with_config(config: EdgeTtsConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.receive_timeout)
            .user_agent(protocol::USER_AGENT)
            .build()
            .map_err(|e| VoiceError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn unix_now() -> u64 {
        Utc::now().timestamp().max(0) as u64
    }

    /// Synthesize one chunk of escaped text over a fresh WebSocket
    async fn synthesize_chunk(&self, voice: &str, rate: &str, output_format: &str, text: &str) -> Result<Vec<u8>> {
        let url = protocol::wss_url(&protocol::sec_ms_gec(Self::unix_now()), &protocol::connection_id());

        let mut request = url
            .into_client_request()
            .map_err(|e| VoiceError::WebSocketError(e.to_string()))?;
        let headers = request.headers_mut();
        headers.insert("Pragma", HeaderValue::from_static("no-cache"));
        headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
        headers.insert("Origin", HeaderValue::from_static(protocol::ORIGIN));
        headers.insert("Accept-Language", HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("User-Agent", HeaderValue::from_static(protocol::USER_AGENT));

        let (ws_stream, _) = tokio::time::timeout(self.config.connect_timeout, connect_async(request))
            .await
            .map_err(|_| VoiceError::WebSocketError("Connection timed out".to_string()))?
            .map_err(|e| VoiceError::WebSocketError(e.to_string()))?;

        debug!("Connected to Edge TTS");

        let (mut write, mut read) = ws_stream.split();

        let timestamp = protocol::timestamp(Utc::now());
        let ssml = protocol::build_ssml(voice, rate, text);

        write
            .send(WsMessage::Text(protocol::speech_config_frame(&timestamp, output_format).into()))
            .await
            .map_err(|e| VoiceError::WebSocketError(e.to_string()))?;
        write
            .send(WsMessage::Text(
                protocol::ssml_frame(&protocol::connection_id(), &timestamp, &ssml).into(),
            ))
            .await
            .map_err(|e| VoiceError::WebSocketError(e.to_string()))?;

        let mut audio = Vec::new();

        loop {
            let message = match tokio::time::timeout(self.config.receive_timeout, read.next()).await {
                Err(_) => {
                    return Err(VoiceError::WebSocketError(
                        "Timed out waiting for audio".to_string(),
                    ))
                }
                Ok(None) => {
                    warn!("Edge TTS closed the connection before turn.end");
                    break;
                }
                Ok(Some(Err(e))) => return Err(VoiceError::WebSocketError(e.to_string())),
                Ok(Some(Ok(message))) => message,
            };

            match message {
                WsMessage::Text(text) => {
                    let (headers, _) = protocol::split_text_frame(text.as_str());
                    match headers.get("Path").map(String::as_str) {
                        Some("turn.end") => break,
                        Some("turn.start" | "response" | "audio.metadata") => {}
                        other => {
                            return Err(VoiceError::UnexpectedResponse(format!(
                                "unknown text frame path {:?}",
                                other
                            )))
                        }
                    }
                }
                WsMessage::Binary(data) => {
                    let (headers, payload) = protocol::split_binary_frame(&data[..])?;
                    if headers.get("Path").map(String::as_str) != Some("audio") {
                        return Err(VoiceError::UnexpectedResponse(
                            "binary frame without audio path".to_string(),
                        ));
                    }
                    if headers.contains_key("Content-Type") {
                        audio.extend_from_slice(payload);
                    } else if !payload.is_empty() {
                        return Err(VoiceError::UnexpectedResponse(
                            "audio frame without content type".to_string(),
                        ));
                    }
                }
                WsMessage::Ping(data) => {
                    write
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| VoiceError::WebSocketError(e.to_string()))?;
                }
                WsMessage::Close(_) => break,
                _ => {}
            }
        }

        if let Err(e) = write.close().await {
            debug!("Error closing Edge TTS socket: {}", e);
        }

        if audio.is_empty() {
            return Err(VoiceError::NoAudio);
        }

        Ok(audio)
    }
}

#[async_trait]
impl SpeechProvider for EdgeTtsClient {
    fn name(&self) -> &str {
        "edge"
    }

    async fn synthesize(&self, request: &SpeechRequest) -> Result<SynthesisResult> {
        request.validate()?;

        let format: AudioFormat = request.format.delivered();
        if format != request.format {
            info!("Format {} is not produced by Edge, delivering {}", request.format, format);
        }
        let output_format = format.edge_output_format().unwrap_or(DEFAULT_OUTPUT_FORMAT);

        let voice = protocol::long_voice_name(&resolve_voice(&request.voice))?;
        let rate = request.rate();
        let chunks = protocol::split_text(&protocol::prepare_text(&request.text), protocol::MAX_CHUNK_BYTES);

        info!(
            "Synthesizing speech: {} chars in {} chunk(s) using Edge",
            request.text.chars().count(),
            chunks.len()
        );
        debug!("Voice: {}, Rate: {}, Format: {}", voice, rate, output_format);

        let mut audio_data = Vec::new();
        for chunk in &chunks {
            let audio = self.synthesize_chunk(&voice, &rate, output_format, chunk).await?;
            audio_data.extend_from_slice(&audio);
        }

        info!("Synthesis complete: {} bytes, format: {}", audio_data.len(), format);

        Ok(SynthesisResult::new(audio_data, format))
    }

    async fn list_voices(&self) -> Result<Vec<VoiceInfo>> {
        let url = protocol::voices_url(&protocol::sec_ms_gec(Self::unix_now()));

        let response = self
            .client
            .get(&url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| VoiceError::ApiError(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(VoiceError::ApiError(format!(
                "Voice list error {}: {}",
                status, error_text
            )));
        }

        let voices: Vec<EdgeVoice> = response.json().await?;
        info!("Fetched {} voices from Edge", voices.len());

        Ok(voices.into_iter().map(VoiceInfo::from).collect())
    }
}
