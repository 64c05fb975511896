use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

use crate::rate_limiter::RateLimitConfig;
use crate::retry::RetryPolicy;

// Import logging macros
use crate::{log_system_event, log_validation};

/// Models tried for every credential, newest and fastest first
pub const DEFAULT_GEMINI_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-flash-latest",
    "gemini-1.5-flash-latest",
    "gemini-1.5-pro-latest",
    "gemini-1.5-flash",
];

pub const DEFAULT_CHANNEL_ID_MEDIO: &str = "UCwm7h_0nqI8I5I1c5K5q5qw";

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub ai: AiConfig,
    pub youtube: YouTubeConfig,
    pub validation: ValidationConfig,
    pub storage: StorageConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Generative AI credentials, model chain and call pacing
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub primary_key: Option<String>,
    pub backup_key: Option<String>,
    pub models: Vec<String>,
    pub base_url: Option<String>,
    pub min_interval_ms: u64,
    pub max_concurrent: usize,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_jitter_ms: u64,
}

/// Video platform API access and channel selection
#[derive(Debug, Clone)]
pub struct YouTubeConfig {
    pub api_key: Option<String>,
    pub channel_id_medio: String,
    pub channel_id_fundamental: String,
    pub base_url: Option<String>,
    pub cache_ttl_minutes: i64,
}

#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub live_check: bool,
    pub synthetic_failure_rate: f64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub local_store_path: PathBuf,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let youtube = YouTubeConfig::from_env()?;
        let config = Config {
            ai: AiConfig::from_env()?,
            validation: ValidationConfig::from_env(youtube.api_key.is_some())?,
            youtube,
            storage: StorageConfig::from_env(),
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env(),
        };

        log_system_event!(config, "Configuration loaded successfully");
        config.log_configuration_summary();

        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    fn log_configuration_summary(&self) {
        info!(
            ai_keys = self.ai.keys().len(),
            ai_primary_key = ?self.ai.primary_key.as_deref().map(mask_sensitive_data),
            ai_models = ?self.ai.models,
            youtube_configured = self.youtube.api_key.is_some(),
            live_video_check = self.validation.live_check,
            local_store = %self.storage.local_store_path.display(),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.ai.models.is_empty() {
            return Err(anyhow!("GEMINI_MODELS must list at least one model"));
        }

        if !(0.0..=1.0).contains(&self.validation.synthetic_failure_rate) {
            return Err(anyhow!(
                "VIDEO_SYNTHETIC_FAILURE_RATE must be between 0 and 1, got {}",
                self.validation.synthetic_failure_rate
            ));
        }

        if self.ai.keys().is_empty() {
            warn!("No Gemini API key configured - summaries, justifications and quizzes will use templates");
        }

        if self.youtube.api_key.is_none() {
            warn!("No YouTube API key configured - recommendations will use the static catalog only");
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.to_lowercase().as_str()) {
            warn!("Log level '{}' is a filter directive, passing it through as-is", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl AiConfig {
    pub fn from_env() -> Result<Self> {
        let primary_key = non_empty_var("GEMINI_API_KEY").or_else(|| non_empty_var("API_KEY"));
        let backup_key = non_empty_var("GEMINI_API_KEY_BACKUP");

        let models = match non_empty_var("GEMINI_MODELS") {
            Some(list) => list
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect(),
            None => DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
        };

        Ok(AiConfig {
            primary_key,
            backup_key,
            models,
            base_url: non_empty_var("GEMINI_BASE_URL"),
            min_interval_ms: parse_var("AI_MIN_INTERVAL_MS", 3000)?,
            max_concurrent: parse_var("AI_MAX_CONCURRENT", 1)?,
            max_retries: parse_var("AI_MAX_RETRIES", 3)?,
            retry_base_ms: parse_var("AI_RETRY_BASE_MS", 2000)?,
            retry_jitter_ms: parse_var("AI_RETRY_JITTER_MS", 1000)?,
        })
    }

    /// Configured keys in priority order, without duplicates
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for key in [&self.primary_key, &self.backup_key].into_iter().flatten() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_concurrent: self.max_concurrent,
            min_interval: Duration::from_millis(self.min_interval_ms),
            ..RateLimitConfig::default()
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_ms),
            max_jitter: Duration::from_millis(self.retry_jitter_ms),
        }
    }
}

impl YouTubeConfig {
    pub fn from_env() -> Result<Self> {
        let channel_id_medio = non_empty_var("YOUTUBE_CHANNEL_ID_EM")
            .unwrap_or_else(|| DEFAULT_CHANNEL_ID_MEDIO.to_string());

        let channel_id_fundamental = match non_empty_var("YOUTUBE_CHANNEL_ID_EF") {
            Some(id) => id,
            None => {
                warn!("YOUTUBE_CHANNEL_ID_EF not set, 9º ano searches will use the ensino médio channel");
                channel_id_medio.clone()
            }
        };

        Ok(YouTubeConfig {
            api_key: non_empty_var("YOUTUBE_API_KEY"),
            channel_id_medio,
            channel_id_fundamental,
            base_url: non_empty_var("YOUTUBE_BASE_URL"),
            cache_ttl_minutes: parse_var("VIDEO_CACHE_TTL_MINUTES", 30)?,
        })
    }
}

impl ValidationConfig {
    fn from_env(youtube_configured: bool) -> Result<Self> {
        Ok(ValidationConfig {
            live_check: parse_var("VIDEO_LIVE_CHECK", youtube_configured)?,
            synthetic_failure_rate: parse_var("VIDEO_SYNTHETIC_FAILURE_RATE", 0.0)?,
        })
    }
}

impl StorageConfig {
    fn from_env() -> Self {
        let path = env::var("LOCAL_STORE_PATH").unwrap_or_else(|_| "data/local_store.json".to_string());
        StorageConfig {
            local_store_path: PathBuf::from(path),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let port_str = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,netescola=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY")
            .unwrap_or_else(|_| "logs".to_string());

        LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match non_empty_var(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| anyhow!("Invalid {} value: '{}'", name, raw)),
        None => Ok(default),
    }
}

/// Mask sensitive data in configuration for safe logging
pub fn mask_sensitive_data(data: &str) -> String {
    let chars: Vec<char> = data.chars().collect();
    if chars.len() <= 8 {
        "*".repeat(chars.len())
    } else {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}***{}", head, tail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_sensitive_data() {
        assert_eq!(mask_sensitive_data("short"), "*****");
        assert_eq!(mask_sensitive_data("AIzaSyD-1234567890abcd"), "AIza***abcd");
    }

    #[test]
    fn test_keys_are_deduplicated_in_priority_order() {
        let config = AiConfig {
            primary_key: Some("key-a".to_string()),
            backup_key: Some("key-a".to_string()),
            models: vec!["m".to_string()],
            base_url: None,
            min_interval_ms: 0,
            max_concurrent: 1,
            max_retries: 0,
            retry_base_ms: 0,
            retry_jitter_ms: 0,
        };
        assert_eq!(config.keys(), vec!["key-a".to_string()]);

        let config = AiConfig {
            backup_key: Some("key-b".to_string()),
            ..config
        };
        assert_eq!(config.keys(), vec!["key-a".to_string(), "key-b".to_string()]);
    }

    #[test]
    fn test_config_validation() {
        let config = Config {
            ai: AiConfig {
                primary_key: None,
                backup_key: None,
                models: DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
                base_url: None,
                min_interval_ms: 3000,
                max_concurrent: 1,
                max_retries: 3,
                retry_base_ms: 2000,
                retry_jitter_ms: 1000,
            },
            youtube: YouTubeConfig {
                api_key: None,
                channel_id_medio: DEFAULT_CHANNEL_ID_MEDIO.to_string(),
                channel_id_fundamental: DEFAULT_CHANNEL_ID_MEDIO.to_string(),
                base_url: None,
                cache_ttl_minutes: 30,
            },
            validation: ValidationConfig {
                live_check: false,
                synthetic_failure_rate: 0.0,
            },
            storage: StorageConfig {
                local_store_path: PathBuf::from("data/test.json"),
            },
            server: ServerConfig {
                port: 3000,
                host: "0.0.0.0".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_enabled: true,
                console_enabled: true,
                log_directory: "logs".to_string(),
            },
        };

        assert!(config.validate().is_ok());

        let mut invalid_config = config.clone();
        invalid_config.server.port = 0;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config.clone();
        invalid_config.validation.synthetic_failure_rate = 1.5;
        assert!(invalid_config.validate().is_err());

        let mut invalid_config = config;
        invalid_config.ai.models.clear();
        assert!(invalid_config.validate().is_err());
    }
}
