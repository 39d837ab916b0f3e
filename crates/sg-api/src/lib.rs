//! sg-api: HTTP API for speech-gateway
//!
//! Serves an OpenAI-compatible `/v1/audio/speech` endpoint backed by any
//! [`sg_voice::SpeechProvider`]. Built with axum for async HTTP handling.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;

pub use error::{ApiError, Result};
pub use server::{bind, build_router, serve, AppState};
