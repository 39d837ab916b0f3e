//! Route definitions
//!
//! Defines all HTTP API endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{
    list_all_voices, list_models, list_voices, list_voices_post, text_to_speech,
};
use crate::server::AppState;

/// Create the API router. Voice listings are only mounted when `expand` is set.
pub fn routes(expand: bool) -> Router<AppState> {
    let router = Router::new()
        // OpenAI-compatible surface
        .route("/v1/audio/speech", post(text_to_speech))
        .route("/v1/models", get(list_models).post(list_models));

    if !expand {
        return router;
    }

    router
        // Voice catalog
        .route("/v1/voices", get(list_voices).post(list_voices_post))
        .route("/v1/voices/all", get(list_all_voices).post(list_all_voices))
}
