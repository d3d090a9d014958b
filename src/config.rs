//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::llm::{DEFAULT_GENERATION_TIMEOUT, GenerationConfig, LlmBackend, LlmConfig};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_PATH: &str = "./data/habitloop.db";

/// Service configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `None` when no API key is set; every generation then falls back.
    pub llm: Option<LlmConfig>,
    pub generation: GenerationConfig,
    pub port: u16,
    pub db_path: PathBuf,
    /// Bypass billing-gated features.
    pub free_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: None,
            generation: GenerationConfig::default(),
            port: DEFAULT_PORT,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            free_mode: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values are logged and
    /// replaced by their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = get("OPENAI_API_KEY").map(|key| LlmConfig {
            backend: LlmBackend::OpenAi,
            api_key: SecretString::from(key),
            model: get("HABITLOOP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        });

        let timeout_ms = parse_or(
            "HABITLOOP_GENERATION_TIMEOUT_MS",
            get("HABITLOOP_GENERATION_TIMEOUT_MS"),
            DEFAULT_GENERATION_TIMEOUT.as_millis() as u64,
        );
        let simulated_delay = get("HABITLOOP_SIMULATED_DELAY_MS").and_then(|raw| {
            match raw.parse::<u64>() {
                Ok(ms) => Some(Duration::from_millis(ms)),
                Err(e) => {
                    tracing::warn!(key = "HABITLOOP_SIMULATED_DELAY_MS", value = %raw, error = %e, "Ignoring invalid value");
                    None
                }
            }
        });

        Self {
            llm,
            generation: GenerationConfig {
                timeout: Duration::from_millis(timeout_ms),
                simulated_delay,
                ..GenerationConfig::default()
            },
            port: parse_or("HABITLOOP_PORT", get("HABITLOOP_PORT"), DEFAULT_PORT),
            db_path: get("HABITLOOP_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            free_mode: get("HABITLOOP_FREE_MODE").is_some_and(|v| parse_flag(&v)),
        }
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    raw.parse().unwrap_or_else(|e| {
        tracing::warn!(key, value = %raw, error = %e, default = %default, "Invalid value, using default");
        default
    })
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let cfg = config(&[]);
        assert!(cfg.llm.is_none());
        assert_eq!(cfg.generation.timeout, DEFAULT_GENERATION_TIMEOUT);
        assert!(cfg.generation.simulated_delay.is_none());
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.db_path, PathBuf::from("./data/habitloop.db"));
        assert!(!cfg.free_mode);
    }

    #[test]
    fn api_key_enables_llm() {
        let cfg = config(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("HABITLOOP_MODEL", "gpt-4o"),
            ("OPENAI_BASE_URL", "http://localhost:9999"),
        ]);
        let llm = cfg.llm.unwrap();
        assert_eq!(llm.api_key.expose_secret(), "sk-test");
        assert_eq!(llm.model, "gpt-4o");
        assert_eq!(llm.base_url, "http://localhost:9999");
    }

    #[test]
    fn blank_api_key_is_unset() {
        assert!(config(&[("OPENAI_API_KEY", "  ")]).llm.is_none());
    }

    #[test]
    fn numeric_overrides() {
        let cfg = config(&[
            ("HABITLOOP_GENERATION_TIMEOUT_MS", "500"),
            ("HABITLOOP_SIMULATED_DELAY_MS", "20"),
            ("HABITLOOP_PORT", "9000"),
        ]);
        assert_eq!(cfg.generation.timeout, Duration::from_millis(500));
        assert_eq!(cfg.generation.simulated_delay, Some(Duration::from_millis(20)));
        assert_eq!(cfg.port, 9000);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let cfg = config(&[
            ("HABITLOOP_GENERATION_TIMEOUT_MS", "soon"),
            ("HABITLOOP_SIMULATED_DELAY_MS", "-5"),
            ("HABITLOOP_PORT", "99999"),
        ]);
        assert_eq!(cfg.generation.timeout, DEFAULT_GENERATION_TIMEOUT);
        assert!(cfg.generation.simulated_delay.is_none());
        assert_eq!(cfg.port, DEFAULT_PORT);
    }

    #[test]
    fn free_mode_flag() {
        assert!(config(&[("HABITLOOP_FREE_MODE", "true")]).free_mode);
        assert!(config(&[("HABITLOOP_FREE_MODE", "1")]).free_mode);
        assert!(!config(&[("HABITLOOP_FREE_MODE", "no")]).free_mode);
    }
}
