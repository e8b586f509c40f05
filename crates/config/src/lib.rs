//! Configuration loading and validation for Keepsake.
//!
//! Loads configuration from `~/.keepsake/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.keepsake/config.toml`. A missing file means
/// defaults: the scripted backend against a local database, translation
/// off.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Which gateway backend to run: "scripted" or "ollama"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Path of the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Ollama backend settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Display/pivot translation settings
    #[serde(default)]
    pub translation: TranslationConfig,
}

fn default_provider() -> String {
    "scripted".into()
}
fn default_db_path() -> String {
    "keepsake.db".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL of the Ollama server
    #[serde(default = "default_ollama_url")]
    pub url: String,

    /// Model name passed to /api/generate
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}
fn default_ollama_model() -> String {
    "llama3.1:8b".into()
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: default_ollama_url(),
            model: default_ollama_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    /// Whether inputs and replies pass through the translation hop
    #[serde(default)]
    pub enabled: bool,

    /// The language the user reads and writes
    #[serde(default = "default_display_language")]
    pub display_language: String,

    /// The language judgments, replies, and extractions run in
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,
}

fn default_display_language() -> String {
    "Japanese".into()
}
fn default_pivot_language() -> String {
    "English".into()
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            display_language: default_display_language(),
            pivot_language: default_pivot_language(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.keepsake/config.toml),
    /// then apply environment variable overrides:
    /// - `LLM_PROVIDER` — gateway backend
    /// - `OLLAMA_URL`, `OLLAMA_MODEL` — Ollama settings
    /// - `KEEPSAKE_DB` — database path
    /// - `KEEPSAKE_TRANSLATION` — translation on/off
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Takes the lookup as a
    /// closure so tests can inject values without touching the process
    /// environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.provider = provider;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.ollama.url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.ollama.model = model;
        }
        if let Some(db_path) = lookup("KEEPSAKE_DB") {
            self.db_path = db_path;
        }
        if let Some(flag) = lookup("KEEPSAKE_TRANSLATION") {
            match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.translation.enabled = true,
                "0" | "false" | "no" | "off" => self.translation.enabled = false,
                other => {
                    tracing::warn!(value = other, "Unrecognized KEEPSAKE_TRANSLATION value, ignoring");
                }
            }
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".keepsake")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.provider.as_str() {
            "scripted" | "ollama" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "provider must be 'scripted' or 'ollama', got '{other}'"
                )));
            }
        }

        if self.db_path.trim().is_empty() {
            return Err(ConfigError::ValidationError("db_path must not be empty".into()));
        }

        if self.provider == "ollama" && self.ollama.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "ollama.url must not be empty when provider is 'ollama'".into(),
            ));
        }

        if self.translation.enabled
            && (self.translation.display_language.trim().is_empty()
                || self.translation.pivot_language.trim().is_empty())
        {
            return Err(ConfigError::ValidationError(
                "translation languages must not be empty when translation is enabled".into(),
            ));
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            db_path: default_db_path(),
            ollama: OllamaConfig::default(),
            translation: TranslationConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.provider, "scripted");
        assert_eq!(config.db_path, "keepsake.db");
        assert_eq!(config.ollama.url, "http://localhost:11434");
        assert!(!config.translation.enabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.provider, config.provider);
        assert_eq!(parsed.ollama.model, config.ollama.model);
        assert_eq!(parsed.translation.enabled, config.translation.enabled);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: AppConfig = toml::from_str("provider = \"ollama\"").unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.db_path, "keepsake.db");
        assert_eq!(config.ollama.model, "llama3.1:8b");
    }

    #[test]
    fn invalid_provider_rejected() {
        let config = AppConfig {
            provider: "gpt-service".into(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn enabled_translation_requires_languages() {
        let config = AppConfig {
            translation: TranslationConfig {
                enabled: true,
                display_language: "".into(),
                pivot_language: "English".into(),
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().provider, "scripted");
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            "provider = \"ollama\"\ndb_path = \"memories.db\"\n\n\
             [ollama]\nmodel = \"qwen2.5:7b\"\n\n\
             [translation]\nenabled = true\n"
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.provider, "ollama");
        assert_eq!(config.db_path, "memories.db");
        assert_eq!(config.ollama.model, "qwen2.5:7b");
        assert_eq!(config.ollama.url, "http://localhost:11434");
        assert!(config.translation.enabled);
        assert_eq!(config.translation.display_language, "Japanese");
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "provider = [not toml").unwrap();

        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn env_overrides_apply() {
        let mut env = HashMap::new();
        env.insert("LLM_PROVIDER", "ollama");
        env.insert("OLLAMA_URL", "http://gpu-box:11434");
        env.insert("OLLAMA_MODEL", "llama3.3:70b");
        env.insert("KEEPSAKE_DB", "/tmp/keepsake-test.db");
        env.insert("KEEPSAKE_TRANSLATION", "true");

        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.ollama.url, "http://gpu-box:11434");
        assert_eq!(config.ollama.model, "llama3.3:70b");
        assert_eq!(config.db_path, "/tmp/keepsake-test.db");
        assert!(config.translation.enabled);
    }

    #[test]
    fn translation_flag_spellings() {
        for (value, expected) in [("1", true), ("YES", true), ("off", false), ("0", false)] {
            let mut config = AppConfig::default();
            config.translation.enabled = !expected;
            config.apply_env_overrides(|name| {
                (name == "KEEPSAKE_TRANSLATION").then(|| value.to_string())
            });
            assert_eq!(config.translation.enabled, expected, "value {value:?}");
        }
    }

    #[test]
    fn unrecognized_translation_flag_is_ignored() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(|name| {
            (name == "KEEPSAKE_TRANSLATION").then(|| "maybe".to_string())
        });
        assert!(!config.translation.enabled);
    }
}
