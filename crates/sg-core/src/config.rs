//! Configuration management
//!
//! 設定は以下の優先順位で読み込まれます:
//! 1. 環境変数
//! 2. speech-gateway.toml 設定ファイル
//! 3. デフォルト値
//!
//! 設定ファイル内では `${VAR_NAME}` 形式で環境変数を展開できます。

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::Error;

/// Default config file name, looked up in the working directory
pub const CONFIG_FILE: &str = "speech-gateway.toml";

/// HTTP API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Shared secret expected as `Authorization: Bearer <key>`.
    /// `None` disables the check.
    pub key: Option<String>,

    /// Port for HTTP API server
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Allowed CORS origins. `None` means permissive CORS.
    #[serde(default)]
    pub allowed_origins: Option<Vec<String>>,

    /// Serve the voice listing endpoints in addition to the OpenAI surface
    #[serde(default = "default_expand_api")]
    pub expand: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            key: None,
            port: default_api_port(),
            allowed_origins: None,
            expand: default_expand_api(),
        }
    }
}

/// Defaults applied to speech requests that leave fields out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Voice used when the request has none
    #[serde(default = "default_voice")]
    pub default_voice: String,

    /// Response format used when the request has none
    #[serde(default = "default_response_format")]
    pub default_response_format: String,

    /// Speed multiplier used when the request has none
    #[serde(default = "default_speed")]
    pub default_speed: f32,

    /// Model reported when the request has none. Synthesis ignores it.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Skip Markdown normalization of request text
    #[serde(default)]
    pub remove_filter: bool,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            default_voice: default_voice(),
            default_response_format: default_response_format(),
            default_speed: default_speed(),
            default_model: default_model(),
            remove_filter: false,
        }
    }
}

/// Main configuration for speech-gateway
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Speech request defaults
    #[serde(default)]
    pub speech: SpeechConfig,
}

fn default_api_port() -> u16 {
    5050
}

fn default_expand_api() -> bool {
    true
}

fn default_voice() -> String {
    "en-US-AndrewNeural".to_string()
}

fn default_response_format() -> String {
    "mp3".to_string()
}

fn default_speed() -> f32 {
    1.2
}

fn default_model() -> String {
    "tts-1".to_string()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

impl Config {
    /// 設定ファイルから環境変数を展開する
    ///
    /// `${VAR_NAME}` 形式の文字列を環境変数の値に置換します。
    /// 環境変数が存在しない場合は空文字列になります。
    fn expand_env_vars(value: &str) -> String {
        Self::expand_vars(value, |name| std::env::var(name).ok())
    }

    /// `${VAR_NAME}` を任意の検索関数で展開する
    fn expand_vars<F>(value: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut result = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("${") {
            result.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            match after.find('}') {
                Some(end) => {
                    if let Some(env_value) = lookup(&after[..end]) {
                        result.push_str(&env_value);
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // 閉じ括弧がない場合はそのまま残す
                    result.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        result.push_str(rest);
        result
    }

    /// TOML 設定ファイルから設定を読み込む
    ///
    /// 設定ファイル内の `${VAR_NAME}` は環境変数の値に置換され、
    /// その後で環境変数による上書きが適用されます。
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&Self::expand_env_vars(&toml_content))?;
        cfg.apply_env_overrides();

        Ok(cfg)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self::from_toml_config(config))
    }

    /// デフォルトパスから設定を読み込む
    ///
    /// `./speech-gateway.toml` があればそれを使い、
    /// なければ環境変数のみから読み込みます。
    pub fn load() -> crate::Result<Self> {
        if Path::new(CONFIG_FILE).exists() {
            return Self::from_toml_file(CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    /// TOML 構造から Config を構築
    fn from_toml_config(toml: TomlConfig) -> Self {
        let api = toml.api.unwrap_or_default();
        let speech = toml.speech.unwrap_or_default();

        Config {
            api: ApiConfig {
                key: api.key.filter(|k| !k.is_empty()),
                port: api.port.unwrap_or_else(default_api_port),
                allowed_origins: api.allowed_origins,
                expand: api.expand.unwrap_or_else(default_expand_api),
            },
            speech: SpeechConfig {
                default_voice: speech.default_voice.unwrap_or_else(default_voice),
                default_response_format: speech
                    .default_response_format
                    .unwrap_or_else(default_response_format),
                default_speed: speech.default_speed.unwrap_or_else(default_speed),
                default_model: speech.default_model.unwrap_or_else(default_model),
                remove_filter: speech.remove_filter.unwrap_or(false),
            },
        }
    }

    /// 環境変数で設定を上書きする
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// 任意の検索関数で設定を上書きする（空文字列は未設定として扱う）
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        // API 設定の上書き
        if let Some(key) = var("API_KEY") {
            self.api.key = Some(key);
        }
        if let Some(port) = var("PORT") {
            match port.trim().parse() {
                Ok(p) => self.api.port = p,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(origins) = var("API_ALLOWED_ORIGINS") {
            self.api.allowed_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(expand) = var("EXPAND_API") {
            self.api.expand = parse_flag(&expand);
        }

        // 音声設定の上書き
        if let Some(voice) = var("DEFAULT_VOICE") {
            self.speech.default_voice = voice;
        }
        if let Some(format) = var("DEFAULT_RESPONSE_FORMAT") {
            self.speech.default_response_format = format;
        }
        if let Some(speed) = var("DEFAULT_SPEED") {
            match speed.trim().parse::<f32>() {
                Ok(s) if s.is_finite() && s > 0.0 => self.speech.default_speed = s,
                _ => tracing::warn!("Ignoring invalid DEFAULT_SPEED value: {}", speed),
            }
        }
        if let Some(model) = var("DEFAULT_MODEL") {
            self.speech.default_model = model;
        }
        if let Some(remove) = var("REMOVE_FILTER") {
            self.speech.remove_filter = parse_flag(&remove);
        }
    }

    /// Whether requests must carry the shared API key
    pub fn requires_api_key(&self) -> bool {
        self.api.key.is_some()
    }
}

// ============================================================================
// TOML 構造体定義（ファイル解析用）
// ============================================================================

/// TOML ファイル用のトップレベル構造
#[derive(Debug, Deserialize)]
struct TomlConfig {
    /// HTTP API 設定
    api: Option<TomlApiConfig>,
    /// 音声設定
    speech: Option<TomlSpeechConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlApiConfig {
    /// API キー (オプション)
    #[serde(default)]
    key: Option<String>,
    /// ポート番号
    #[serde(default)]
    port: Option<u16>,
    /// 許可する CORS オリジン
    #[serde(default)]
    allowed_origins: Option<Vec<String>>,
    /// 音声一覧エンドポイントを公開するか
    #[serde(default)]
    expand: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct TomlSpeechConfig {
    #[serde(default)]
    default_voice: Option<String>,
    #[serde(default)]
    default_response_format: Option<String>,
    #[serde(default)]
    default_speed: Option<f32>,
    #[serde(default)]
    default_model: Option<String>,
    /// Markdown 除去を無効にする
    #[serde(default)]
    remove_filter: Option<bool>,
}
