//! HTTP API handlers
//!
//! OpenAI-compatible speech endpoint plus model and voice listings.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use sg_voice::{models, AudioFormat, ModelInfo, SpeechRequest, VoiceFilter, VoiceInfo};

use crate::error::{ApiError, Result};
use crate::server::AppState;

const MISSING_INPUT: &str = "Missing 'input' in request body";

// ============================================================================
// Request/Response types
// ============================================================================

/// Speech request payload, as sent by OpenAI clients
#[derive(Debug, Default, Deserialize)]
pub struct SpeechBody {
    /// Text to speak
    pub input: Option<String>,
    /// Model id. Accepted for compatibility, every model uses the same voices.
    pub model: Option<String>,
    pub voice: Option<String>,
    pub response_format: Option<String>,
    /// Number or numeric string
    pub speed: Option<serde_json::Value>,
}

/// Voice filter parameters
#[derive(Debug, Default, Deserialize)]
pub struct VoiceQuery {
    pub language: Option<String>,
    pub locale: Option<String>,
}

impl VoiceQuery {
    /// `language` wins over `locale` when both are given
    fn filter(&self) -> VoiceFilter {
        VoiceFilter::from_param(self.language.as_deref().or(self.locale.as_deref()))
    }
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub data: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
}

fn parse_body<T>(body: &Bytes) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    serde_json::from_slice(body)
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid JSON body: {}", e)))
}

fn parse_speed(value: &serde_json::Value) -> Result<Option<f32>> {
    let speed = match value {
        serde_json::Value::Null => return Ok(None),
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    speed
        .map(|s| Some(s as f32))
        .ok_or_else(|| ApiError::InvalidRequest(format!("Invalid speed: {}", value)))
}

// ============================================================================
// Handler functions
// ============================================================================

/// Health check endpoint
pub async fn health() -> &'static str {
    "OK"
}

/// Speech endpoint - normalize the input and synthesize it
pub async fn text_to_speech(State(state): State<AppState>, body: Bytes) -> Result<Response> {
    let body: SpeechBody = parse_body(&body)?;
    let input = body
        .input
        .ok_or_else(|| ApiError::InvalidRequest(MISSING_INPUT.to_string()))?;

    let defaults = &state.config.speech;

    let text = if defaults.remove_filter {
        input
    } else {
        sg_core::normalize(&input)
    };

    let voice = body.voice.unwrap_or_else(|| defaults.default_voice.clone());
    let format = AudioFormat::from_request(
        body.response_format
            .as_deref()
            .unwrap_or(&defaults.default_response_format),
    );
    let speed = match &body.speed {
        Some(value) => parse_speed(value)?.unwrap_or(defaults.default_speed),
        None => defaults.default_speed,
    };

    let request = SpeechRequest::new(text, voice)
        .with_format(format)
        .with_speed(speed);
    request.validate()?;

    debug!(
        "Speech request: model={}, voice={}, format={}, speed={}",
        body.model.as_deref().unwrap_or(&defaults.default_model),
        request.voice,
        request.format,
        request.speed
    );

    let result = state.provider.synthesize(&request).await?;

    info!(
        "Serving {} bytes of {} from {}",
        result.audio_data.len(),
        result.format,
        state.provider.name()
    );

    let headers = [
        (header::CONTENT_TYPE, result.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", result.file_name()),
        ),
    ];

    Ok((headers, result.audio_data).into_response())
}

/// Model listing
pub async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse { data: models() })
}

/// Voice listing filtered by query parameters (GET)
pub async fn list_voices(
    State(state): State<AppState>,
    Query(query): Query<VoiceQuery>,
) -> Result<Json<VoicesResponse>> {
    voices_for(&state, query.filter()).await
}

/// Voice listing filtered by JSON body (POST)
pub async fn list_voices_post(State(state): State<AppState>, body: Bytes) -> Result<Json<VoicesResponse>> {
    let query: VoiceQuery = parse_body(&body)?;
    voices_for(&state, query.filter()).await
}

/// Every voice, unfiltered
pub async fn list_all_voices(State(state): State<AppState>) -> Result<Json<VoicesResponse>> {
    voices_for(&state, VoiceFilter::All).await
}

async fn voices_for(state: &AppState, filter: VoiceFilter) -> Result<Json<VoicesResponse>> {
    debug!("Voice list request: {:?}", filter);

    let voices = filter.apply(state.provider.list_voices().await?);
    Ok(Json(VoicesResponse { voices }))
}
