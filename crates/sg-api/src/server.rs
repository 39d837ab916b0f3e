//! HTTP API Server
//!
//! Starts and manages the axum-based HTTP server.

use axum::{http::HeaderValue, middleware, routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use sg_core::Config;
use sg_voice::SpeechProvider;

use crate::handlers::health;
use crate::middleware::auth::auth_middleware;
use crate::routes::routes;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: Arc<dyn SpeechProvider>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn SpeechProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origins) = &config.api.allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router
pub fn build_router(state: AppState) -> Router {
    let api = routes(state.config.api.expand)
        .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config))
        .with_state(state)
}

/// Bind the HTTP listener on `0.0.0.0:<port>`
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    info!("HTTP API listening on {}", addr);
    Ok(listener)
}

/// Serve the HTTP API on an already bound listener
pub async fn serve(
    listener: TcpListener,
    config: Config,
    provider: Arc<dyn SpeechProvider>,
) -> anyhow::Result<()> {
    if config.api.key.is_none() {
        warn!("API_KEY is not set, the API is open to anyone who can reach it");
    }

    let app = build_router(AppState::new(config, provider));
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use sg_voice::{AudioFormat, SpeechRequest, SynthesisResult, VoiceError, VoiceInfo};
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tower::ServiceExt;

    #[derive(Default)]
    struct MockProvider {
        last_request: Mutex<Option<SpeechRequest>>,
        fail: bool,
    }

    #[async_trait]
    impl SpeechProvider for MockProvider {
        fn name(&self) -> &str {
            "mock"
        }

        async fn synthesize(&self, request: &SpeechRequest) -> sg_voice::Result<SynthesisResult> {
            *self.last_request.lock().unwrap() = Some(request.clone());
            if self.fail {
                return Err(VoiceError::NoAudio);
            }
            Ok(SynthesisResult::new(b"AUDIO".to_vec(), request.format.delivered()))
        }

        async fn list_voices(&self) -> sg_voice::Result<Vec<VoiceInfo>> {
            Ok(vec![
                VoiceInfo {
                    name: "en-US-AvaNeural".to_string(),
                    gender: "Female".to_string(),
                    language: "en-US".to_string(),
                },
                VoiceInfo {
                    name: "zh-CN-YunxiNeural".to_string(),
                    gender: "Male".to_string(),
                    language: "zh-CN".to_string(),
                },
            ])
        }
    }

    fn app_with(config: Config, provider: Arc<MockProvider>) -> Router {
        build_router(AppState::new(config, provider))
    }

    fn keyed_config() -> Config {
        let mut config = Config::default();
        config.api.key = Some("secret".to_string());
        config
    }

    fn speech_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/v1/audio/speech")
            .header(header::AUTHORIZATION, "Bearer secret")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_needs_no_key() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_speech_normalizes_input_and_returns_audio() {
        let provider = Arc::new(MockProvider::default());
        let app = app_with(keyed_config(), provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({
                "model": "tts-1",
                "input": "# 标题\n* 这是一个[链接文本](http://example.com)[1]",
                "voice": "nova",
                "response_format": "wav",
                "speed": 1.5
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/wav");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"speech.wav\""
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"AUDIO");

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.text, "标题\n这是一个链接文本");
        assert_eq!(request.voice, "nova");
        assert_eq!(request.format, AudioFormat::Wav);
        assert_eq!(request.speed, 1.5);
    }

    #[tokio::test]
    async fn test_speech_uses_configured_defaults() {
        let provider = Arc::new(MockProvider::default());
        let app = app_with(keyed_config(), provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({ "input": "Hello" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.voice, "en-US-AndrewNeural");
        assert_eq!(request.format, AudioFormat::Mp3);
        assert_eq!(request.speed, 1.2);
    }

    #[tokio::test]
    async fn test_speech_string_speed_and_unsupported_format() {
        let provider = Arc::new(MockProvider::default());
        let app = app_with(keyed_config(), provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({
                "input": "Hello",
                "response_format": "flac",
                "speed": "0.75"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"speech.mp3\""
        );

        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.format, AudioFormat::Flac);
        assert_eq!(request.speed, 0.75);
    }

    #[tokio::test]
    async fn test_speech_remove_filter_skips_normalization() {
        let provider = Arc::new(MockProvider::default());
        let mut config = keyed_config();
        config.speech.remove_filter = true;
        let app = app_with(config, provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({ "input": "# Title [1]" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request = provider.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.text, "# Title [1]");
    }

    #[tokio::test]
    async fn test_speech_missing_input() {
        let provider = Arc::new(MockProvider::default());
        let app = app_with(keyed_config(), provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({ "voice": "alloy" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Missing 'input' in request body" })
        );
        assert!(provider.last_request.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_speech_invalid_speed() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        for speed in [serde_json::json!("fast"), serde_json::json!(-1), serde_json::json!(0)] {
            let response = app
                .clone()
                .oneshot(speech_request(serde_json::json!({ "input": "Hello", "speed": speed })))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_speech_rejects_malformed_voice() {
        let provider = Arc::new(MockProvider::default());
        let app = app_with(keyed_config(), provider.clone());

        let response = app
            .oneshot(speech_request(serde_json::json!({
                "input": "hello",
                "voice": "x'><prosody rate='+300%'>pwned</prosody><voice name='en-US-AvaNeural"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("Invalid voice"));
        assert!(provider.last_request.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_speech_empty_after_normalization() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        let response = app
            .oneshot(speech_request(serde_json::json!({ "input": "[only a reference]" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_speech_provider_failure_is_bad_gateway() {
        let provider = Arc::new(MockProvider {
            fail: true,
            ..Default::default()
        });
        let app = app_with(keyed_config(), provider);

        let response = app
            .oneshot(speech_request(serde_json::json!({ "input": "Hello" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("No audio"));
    }

    #[tokio::test]
    async fn test_missing_and_wrong_api_key() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        let response = app
            .clone()
            .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Invalid API key" })
        );

        let response = app
            .oneshot(
                Request::get("/v1/models")
                    .header(header::AUTHORIZATION, "Bearer nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            serde_json::json!({ "error": "Invalid API key" })
        );
    }

    #[tokio::test]
    async fn test_no_key_configured_allows_requests() {
        let app = app_with(Config::default(), Arc::new(MockProvider::default()));

        let response = app
            .oneshot(Request::get("/v1/models").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_models_get_and_post() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        for method in ["GET", "POST"] {
            let response = app
                .clone()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri("/v1/models")
                        .header(header::AUTHORIZATION, "Bearer secret")
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = json_body(response).await;
            assert_eq!(body["data"][0]["id"], "tts-1");
            assert_eq!(body["data"][1]["id"], "tts-1-hd");
        }
    }

    #[tokio::test]
    async fn test_voices_filtered_by_query() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        let response = app
            .oneshot(
                Request::get("/v1/voices?locale=zh-CN")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body,
            serde_json::json!({
                "voices": [{ "name": "zh-CN-YunxiNeural", "gender": "Male", "language": "zh-CN" }]
            })
        );
    }

    #[tokio::test]
    async fn test_voices_filtered_by_post_body() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        let response = app
            .oneshot(
                Request::post("/v1/voices")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"language":"en-US"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["voices"].as_array().unwrap().len(), 1);
        assert_eq!(body["voices"][0]["name"], "en-US-AvaNeural");
    }

    #[tokio::test]
    async fn test_all_voices() {
        let app = app_with(keyed_config(), Arc::new(MockProvider::default()));

        let response = app
            .oneshot(
                Request::get("/v1/voices/all")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["voices"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_voice_routes_hidden_without_expand() {
        let mut config = keyed_config();
        config.api.expand = false;
        let app = app_with(config, Arc::new(MockProvider::default()));

        let response = app
            .oneshot(
                Request::get("/v1/voices/all")
                    .header(header::AUTHORIZATION, "Bearer secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_fails_on_port_in_use() {
        let first = bind(0).await.unwrap();
        let port = first.local_addr().unwrap().port();

        let err = bind(port).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind"));
    }

    #[tokio::test]
    async fn test_serve_answers_on_bound_listener() {
        let listener = bind(0).await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(serve(
            listener,
            Config::default(),
            Arc::new(MockProvider::default()),
        ));

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200 OK"));
        assert!(response.ends_with("OK"));
        server.abort();
    }

    #[test]
    fn test_cors_layer_with_origins() {
        let mut config = Config::default();
        config.api.allowed_origins = Some(vec![
            "http://localhost:3000".to_string(),
            "not a valid\norigin".to_string(),
        ]);
        // builds without panicking on the invalid entry
        let _ = cors_layer(&config);
    }
}
