//! Environment configuration
//!
//! Values come from the process environment, optionally seeded by a `.env` file.

use crate::error::AppError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ANALYSIS_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.5-flash-image";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Empty when no key is configured
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub analysis_model: String,
    pub image_model: String,
    pub request_timeout: Duration,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            analysis_model: DEFAULT_ANALYSIS_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            request_timeout: Duration::from_secs(30),
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read settings from the environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| AppError::ConfigError(format!("invalid port '{}': {}", raw, e)))?,
            None => defaults.port,
        };

        let request_timeout = match non_empty("GEMINI_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.trim().parse::<u64>().map_err(|e| {
                AppError::ConfigError(format!("invalid GEMINI_TIMEOUT_SECS '{}': {}", raw, e))
            })?),
            None => defaults.request_timeout,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY")
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
            gemini_api_base: non_empty("GEMINI_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_api_base),
            analysis_model: non_empty("GEMINI_MODEL").unwrap_or(defaults.analysis_model),
            image_model: non_empty("GEMINI_IMAGE_MODEL").unwrap_or(defaults.image_model),
            request_timeout,
            port,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.gemini_api_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert!(!config.has_api_key());
        assert_eq!(config.port, 8080);
        assert_eq!(config.analysis_model, DEFAULT_ANALYSIS_MODEL);
        assert_eq!(config.image_model, DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn test_api_port_fallback_and_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("API_PORT", "9090"),
            ("GEMINI_API_KEY", " secret "),
            ("GEMINI_API_BASE", "http://localhost:9999/v1/"),
            ("GEMINI_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.gemini_api_key, "secret");
        assert_eq!(config.gemini_api_base, "http://localhost:9999/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_port_is_config_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
