//! Configuration management for the gateway.
//!
//! All settings come from environment variables, optionally seeded from a
//! `.env` file loaded at startup. Every value has a default so the server
//! always starts; a missing upstream API key is logged as a warning and
//! surfaces later as an authentication error from the upstream API.

use std::str::FromStr;

/// Main application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Upstream API key; requests are sent unauthenticated when unset
    pub llm_api_key: Option<String>,

    /// Base URL of the upstream OpenAI-compatible API
    pub llm_api_base: String,

    /// Model used when a request does not name one
    pub llm_default_model: String,

    /// Server configuration (host, port)
    pub server: ServerConfig,

    /// Whether to verify SSL certificates for upstream requests
    pub verify_ssl: bool,

    /// Request timeout in seconds for the upstream client
    pub request_timeout_secs: u64,

    /// Maximum seconds to wait between upstream chunks before the relay
    /// aborts the stream with an in-band error
    pub stream_idle_timeout_secs: u64,

    /// Audio simulation settings
    pub audio: AudioConfig,
}

/// Server-specific configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,
}

/// Settings for the simulated audio endpoint.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Path to the transcript text file
    pub transcript_file: String,

    /// Path to the raw 16-bit PCM file
    pub pcm_file: String,

    /// Sample rate of the PCM data in Hz
    pub sample_rate: u32,

    /// Duration of each emitted audio chunk in milliseconds
    pub chunk_duration_ms: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use convoai_llm_gateway::core::config::AppConfig;
    ///
    /// let config = AppConfig::from_env();
    /// println!("listening on {}:{}", config.server.host, config.server.port);
    /// ```
    pub fn from_env() -> Self {
        let llm_api_key = std::env::var("LLM_API_KEY").ok().filter(|v| !v.is_empty());
        if llm_api_key.is_none() {
            tracing::warn!(
                "LLM_API_KEY is not set; upstream requests will be sent unauthenticated"
            );
        }

        Self {
            llm_api_key,
            llm_api_base: env_or("LLM_API_BASE", "https://api.openai.com/v1"),
            llm_default_model: env_or("LLM_DEFAULT_MODEL", "gpt-4o-mini"),
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_parse_or("PORT", 8000),
            },
            verify_ssl: std::env::var("VERIFY_SSL")
                .map(|v| str_to_bool(&v))
                .unwrap_or(true),
            request_timeout_secs: env_parse_or("REQUEST_TIMEOUT_SECS", 300),
            stream_idle_timeout_secs: env_parse_or("STREAM_IDLE_TIMEOUT_SECS", 90),
            audio: AudioConfig {
                transcript_file: env_or("TRANSCRIPT_FILE", "./file.txt"),
                pcm_file: env_or("PCM_FILE", "./file.pcm"),
                sample_rate: env_parse_or("AUDIO_SAMPLE_RATE", 16000),
                chunk_duration_ms: env_parse_or("AUDIO_CHUNK_MS", 40),
            },
        }
    }
}

/// Read an environment variable, falling back to a default when the
/// variable is unset or empty.
fn env_or(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Read and parse an environment variable, falling back to a default
/// when the variable is unset or does not parse.
fn env_parse_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Convert string to boolean.
///
/// Accepts: "true", "1", "yes", "on" (case-insensitive)
fn str_to_bool(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
