//! # Configuration Management
//!
//! Loads and validates application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Special-case environment variables (`HOST`, `PORT`,
//!    `GOOGLE_APPLICATION_CREDENTIALS`, `GEMINI_API_KEY`)
//! 2. Environment variables (APP_SERVER_HOST, APP_CLOUD_TTS_VOICE, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! ## Cloud Credentials:
//! The two cloud variables mirror what the upstream SDKs expect:
//! `GOOGLE_APPLICATION_CREDENTIALS` points at a service-account JSON key
//! used for both STT and TTS, and `GEMINI_API_KEY` authenticates the chat
//! model. Both are read once at process start.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub cloud: CloudConfig,
    pub session: SessionConfig,
    pub limits: LimitsConfig,
}

/// Server-specific configuration settings.
///
/// ## Fields:
/// - `host`: IP address or hostname to bind the server to
/// - `port`: TCP port number to listen on
/// - `index_page`: Path to the HTML page served at `GET /`, read from disk
///   on every request so it can be edited without a restart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub index_page: String,
}

/// Settings for the three cloud collaborators (STT, LLM, TTS).
///
/// ## Fields:
/// - `credentials_path`: Service-account JSON key for Google Cloud speech
///   services (filled from `GOOGLE_APPLICATION_CREDENTIALS`)
/// - `gemini_api_key`: API key for the Gemini chat model (filled from
///   `GEMINI_API_KEY`)
/// - `chat_model`: Gemini model identifier
/// - `stt_language`: BCP-47 language code sent to speech recognition
/// - `tts_language` / `tts_gender`: voice selection for synthesis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudConfig {
    pub credentials_path: String,
    pub gemini_api_key: String,
    pub chat_model: String,
    pub stt_language: String,
    pub tts_language: String,
    pub tts_gender: String,
}

/// Dialogue session lifecycle settings.
///
/// ## Fields:
/// - `idle_timeout_secs`: A session untouched for this long is evicted
/// - `sweep_interval_secs`: How often the background sweeper runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

/// Request processing limits.
///
/// ## Fields:
/// - `max_upload_bytes`: Upper bound on the uploaded audio clip size
/// - `request_timeout_secs`: Per-call timeout for every cloud request,
///   so a hung upstream call cannot block a request forever
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
                index_page: "static/index.html".to_string(),
            },
            cloud: CloudConfig {
                credentials_path: String::new(), // must come from the environment
                gemini_api_key: String::new(),   // must come from the environment
                chat_model: "gemini-1.5-flash".to_string(),
                stt_language: "en-US".to_string(),
                tts_language: "en-US".to_string(),
                tts_gender: "FEMALE".to_string(),
            },
            session: SessionConfig {
                idle_timeout_secs: 1800, // 30 minutes of silence ends a conversation
                sweep_interval_secs: 60,
            },
            limits: LimitsConfig {
                max_upload_bytes: 10 * 1024 * 1024, // browser clips are a few hundred KB
                request_timeout_secs: 30,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources in priority order.
    ///
    /// ## Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle the special-case variables that don't follow the APP_
    ///    convention: `HOST`/`PORT` (deployment platforms) and the two
    ///    cloud credential variables named by the upstream SDKs
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(credentials) = env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            settings = settings.set_override("cloud.credentials_path", credentials)?;
        }

        if let Ok(key) = env::var("GEMINI_API_KEY") {
            settings = settings.set_override("cloud.gemini_api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// Catching these at startup gives a clear message instead of a failed
    /// cloud call on the first request.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.cloud.credentials_path.is_empty() {
            return Err(anyhow::anyhow!(
                "GOOGLE_APPLICATION_CREDENTIALS must point at a service-account key file"
            ));
        }

        if self.cloud.gemini_api_key.is_empty() {
            return Err(anyhow::anyhow!("GEMINI_API_KEY must be set"));
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Session idle timeout must be greater than 0"));
        }

        if self.limits.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        if self.limits.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Cloud request timeout must be greater than 0"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A config with credentials filled in, as validate() would see it
    /// after the environment overrides are applied.
    fn configured() -> AppConfig {
        let mut config = AppConfig::default();
        config.cloud.credentials_path = "/tmp/service-account.json".to_string();
        config.cloud.gemini_api_key = "test-key".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cloud.stt_language, "en-US");
        assert_eq!(config.cloud.tts_gender, "FEMALE");
    }

    #[test]
    fn test_defaults_require_credentials() {
        // Without the environment overrides the defaults must not validate;
        // starting without cloud credentials is always a mistake.
        assert!(AppConfig::default().validate().is_err());
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = configured();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.session.idle_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = configured();
        config.limits.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }
}
