//! Configuration module for dormbot.
//!
//! Loads typed configuration from `config.json` or `~/.dormbot/config.json`.
//! All fields use `serde` for zero-boilerplate deserialization.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::models::GeoPoint;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub routing: RoutingConfig,
    pub providers: ProvidersConfig,
    pub chatbot: ChatbotConfig,
}

impl Config {
    /// Load configuration.
    ///
    /// Priority:
    /// 1. local `config.json` in current directory
    /// 2. `~/.dormbot/config.json`
    ///
    /// API keys from `ORS_API_KEY` / `GROQ_API_KEY` override the file.
    pub fn load() -> anyhow::Result<Self> {
        let paths = [PathBuf::from("config.json"), Self::default_path()];

        let mut config = match paths.iter().find(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Loading config from: {}", path.display());
                Self::load_from(path)?
            }
            None => Config::default(),
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("ORS_API_KEY") {
            tracing::info!("Using routing API key from environment variable");
            self.routing.api_key = key;
        }
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            tracing::info!("Using Groq API key from environment variable");
            self.providers
                .groq
                .get_or_insert_with(ProviderEntry::default)
                .api_key = key;
        }
    }

    /// Get the default config file path (`~/.dormbot/config.json`).
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Get the default config directory path.
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".dormbot")
    }

    /// Write the default config template to disk.
    pub fn write_default_template() -> anyhow::Result<PathBuf> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = serde_json::json!({
            "routing": {
                "apiKey": "YOUR_OPENROUTESERVICE_KEY",
                "timeoutSeconds": 10
            },
            "providers": {
                "groq": {
                    "apiKey": "gsk_YOUR_KEY_HERE",
                    "model": "llama-3.1-8b-instant"
                }
            },
            "chatbot": {
                "dormsPath": "dorms.json",
                "nearestLimit": 5,
                "landmarks": [
                    { "name": "มหาวิทยาลัย", "latitude": 13.7563, "longitude": 100.5018 }
                ]
            }
        });

        std::fs::write(&path, serde_json::to_string_pretty(&template)?)?;
        Ok(path)
    }

    /// Validate configuration and return actionable error messages.
    ///
    /// A missing routing key is not an error: distances fall back to
    /// straight-line estimates.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.routing.timeout_seconds == 0 {
            errors.push("routing.timeoutSeconds must be greater than zero.".into());
        }

        if self.chatbot.nearest_limit == 0 {
            errors.push("chatbot.nearestLimit must be at least 1.".into());
        }

        for landmark in &self.chatbot.landmarks {
            if landmark.name.trim().is_empty() {
                errors.push("chatbot.landmarks contains an entry without a name.".into());
            } else if landmark.point().is_none() {
                errors.push(format!(
                    "Landmark '{}' has out-of-range coordinates.",
                    landmark.name
                ));
            }
        }

        if let Some(ref name) = self.chatbot.default_landmark {
            if self.chatbot.landmark(name).is_none() {
                errors.push(format!(
                    "chatbot.defaultLandmark '{}' is not in chatbot.landmarks.",
                    name
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

// ── Routing Configuration ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoutingConfig {
    pub api_key: String,
    pub api_base: String,
    pub timeout_seconds: u64,
    /// Memoize successful routes for this many seconds. Off when unset.
    pub cache_ttl_seconds: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: crate::distance::openroute::DEFAULT_BASE_URL.into(),
            timeout_seconds: crate::distance::openroute::DEFAULT_TIMEOUT.as_secs(),
            cache_ttl_seconds: None,
        }
    }
}

impl RoutingConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.contains("YOUR_")
    }
}

// ── Provider Configuration ──────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderEntry {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: Option<String>,
}

impl ProviderEntry {
    fn is_real(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.contains("YOUR_")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    pub groq: Option<ProviderEntry>,
}

impl ProvidersConfig {
    /// The LLM provider to use for general questions, if one has a real key.
    pub fn find_active(&self) -> Option<(&str, &ProviderEntry)> {
        self.groq
            .as_ref()
            .filter(|e| e.is_real())
            .map(|e| ("groq", e))
    }
}

// ── Chatbot Configuration ───────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChatbotConfig {
    pub dorms_path: String,
    pub nearest_limit: usize,
    /// Landmark used when a question names one dormitory and nothing else.
    pub default_landmark: Option<String>,
    pub landmarks: Vec<Landmark>,
}

impl Default for ChatbotConfig {
    fn default() -> Self {
        Self {
            dorms_path: "dorms.json".into(),
            nearest_limit: crate::distance::DEFAULT_NEAREST_LIMIT,
            default_landmark: None,
            landmarks: Vec::new(),
        }
    }
}

impl ChatbotConfig {
    pub fn landmark(&self, name: &str) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.name == name)
    }
}

/// A named place users ask about ("university", "BTS station", ...).
#[derive(Debug, Clone, Deserialize)]
pub struct Landmark {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Landmark {
    pub fn point(&self) -> Option<GeoPoint> {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.routing.api_base, "https://api.openrouteservice.org");
        assert_eq!(config.routing.timeout_seconds, 10);
        assert!(config.routing.cache_ttl_seconds.is_none());
        assert_eq!(config.chatbot.nearest_limit, 5);
        assert_eq!(config.chatbot.dorms_path, "dorms.json");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{"routing": {"apiKey": "ors-key"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.routing.api_key, "ors-key");
        assert_eq!(config.routing.timeout_seconds, 10);
        assert!(config.routing.is_configured());
    }

    #[test]
    fn test_find_active_provider() {
        let json = r#"{"providers": {"groq": {"apiKey": "gsk-xxx", "model": "llama3"}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let (name, entry) = config.providers.find_active().unwrap();
        assert_eq!(name, "groq");
        assert_eq!(entry.model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_placeholder_keys_are_inactive() {
        let json = r#"{"routing": {"apiKey": "YOUR_OPENROUTESERVICE_KEY"},
                       "providers": {"groq": {"apiKey": "gsk_YOUR_KEY_HERE"}}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(!config.routing.is_configured());
        assert!(config.providers.find_active().is_none());
    }

    #[test]
    fn test_validate_reports_bad_values() {
        let json = r#"{
            "routing": {"timeoutSeconds": 0},
            "chatbot": {
                "nearestLimit": 0,
                "defaultLandmark": "ตลาด",
                "landmarks": [{"name": "ขั้วโลก", "latitude": 95.0, "longitude": 0.0}]
            }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = std::env::temp_dir().join("dormbot_test_config");
        let _ = std::fs::create_dir_all(&tmp);
        let path = tmp.join("config.json");
        std::fs::write(
            &path,
            r#"{"chatbot": {"landmarks": [{"name": "มหาวิทยาลัย", "latitude": 13.7, "longitude": 100.5}]}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        let landmark = config.chatbot.landmark("มหาวิทยาลัย").unwrap();
        assert!(landmark.point().is_some());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
