//! speech-gateway: OpenAI-compatible text-to-speech server
//!
//! Main entry point. Loads configuration, connects the Edge speech provider
//! and serves the HTTP API until Ctrl+C.
//!
//! Usage:
//!   speech-gateway           - Start the server
//!   speech-gateway --help    - Show help
//!   speech-gateway --version - Show version

use sg_core::Config;
use sg_voice::{EdgeTtsClient, SpeechProvider};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Run mode
#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    Server,
    Help,
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    match parse_args(std::env::args().skip(1)) {
        RunMode::Help => {
            print_help();
            return Ok(());
        }
        RunMode::Version => {
            println!("speech-gateway {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        RunMode::Server => {}
    }

    // Load .env file before anything reads the environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::load().map_err(|e| anyhow::anyhow!("Config error: {}", e))?;

    tracing::info!("Starting speech-gateway...");
    tracing::info!(
        "Defaults: voice={}, format={}, speed={}",
        config.speech.default_voice,
        config.speech.default_response_format,
        config.speech.default_speed
    );
    if config.speech.remove_filter {
        tracing::info!("Markdown normalization is disabled");
    }

    let provider: Arc<dyn SpeechProvider> = Arc::new(
        EdgeTtsClient::new().map_err(|e| anyhow::anyhow!("Failed to create speech provider: {}", e))?,
    );

    run_server(config, provider).await
}

/// Parse command line arguments
fn parse_args<I>(args: I) -> RunMode
where
    I: IntoIterator<Item = String>,
{
    for arg in args {
        match arg.as_str() {
            "--help" | "-h" => return RunMode::Help,
            "--version" | "-v" => return RunMode::Version,
            _ => {}
        }
    }

    RunMode::Server
}

/// Print help message
fn print_help() {
    println!("speech-gateway - OpenAI-compatible text-to-speech server");
    println!();
    println!("Usage:");
    println!("  speech-gateway           Start the server");
    println!("  speech-gateway --help    Show this help message");
    println!("  speech-gateway --version Show version");
    println!();
    println!("Environment Variables:");
    println!("  API_KEY                  Bearer token required by the API (optional)");
    println!("  PORT                     HTTP port (default: 5050)");
    println!("  API_ALLOWED_ORIGINS      Comma-separated CORS origins (default: any)");
    println!("  DEFAULT_VOICE            Voice when none is requested (default: en-US-AndrewNeural)");
    println!("  DEFAULT_RESPONSE_FORMAT  Audio format (default: mp3)");
    println!("  DEFAULT_SPEED            Playback speed (default: 1.2)");
    println!("  DEFAULT_MODEL            Model id (default: tts-1)");
    println!("  REMOVE_FILTER            Skip Markdown normalization (default: false)");
    println!("  EXPAND_API               Serve the /v1/voices endpoints (default: true)");
    println!();
    println!("Settings may also be placed in {}.", sg_core::config::CONFIG_FILE);
}

fn print_banner(port: u16) {
    println!(" Edge TTS replacement for OpenAI's TTS API");
    println!();
    println!(" * Serving speech-gateway");
    println!(" * Server running on http://localhost:{}", port);
    println!(" * TTS Endpoint: http://localhost:{}/v1/audio/speech", port);
    println!();
}

/// Serve the HTTP API until Ctrl+C or a server error
async fn run_server(config: Config, provider: Arc<dyn SpeechProvider>) -> anyhow::Result<()> {
    let port = config.api.port;

    // Bind before printing the banner
    let listener = sg_api::bind(port).await?;
    print_banner(port);

    tracing::info!("HTTP API server started on port {}", port);
    tracing::info!("Press Ctrl+C to exit");

    tokio::select! {
        result = sg_api::serve(listener, config, provider) => {
            result.map_err(|e| anyhow::anyhow!("HTTP API error: {}", e))?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutting down...");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
