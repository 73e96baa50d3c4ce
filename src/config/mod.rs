//! Configuration management for the locale synchronization engine
//!
//! This module handles loading the TOML configuration file, applying
//! environment variable overrides, and validating the result before an
//! engine is built from it.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::models::LanguageSpec;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A validation rule was violated
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// A vendor provider is selected but its secret file does not exist
    #[error("Secret file not found: {path}")]
    SecretFileMissing { path: PathBuf },
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Directories holding `{language_code}.json` resource files, in
    /// discovery order; the first entry is the primary locale path
    pub locale_paths: Vec<PathBuf>,

    /// Languages to keep in sync; must include the primary language
    pub languages: Vec<LanguageSpec>,

    /// Language whose values are authored by hand (source of truth)
    pub primary_language: String,

    /// Namespace used when a call site does not name one
    pub default_namespace: String,

    /// Strict mode: a missing or pending translation fails the build
    /// instead of being queued
    #[serde(default)]
    pub strict: bool,

    /// Reuse a translation already present under another namespace instead
    /// of calling the provider again
    #[serde(default = "default_prefer_existing")]
    pub prefer_existing_translation: bool,

    /// Interpolation delimiters
    #[serde(default)]
    pub interpolation: InterpolationConfig,

    /// Translation provider selection
    #[serde(default)]
    pub translate_api: TranslateApiConfig,

    /// Debounce windows for the deferred tasks
    #[serde(default)]
    pub debounce: DebounceConfig,
}

/// Interpolation delimiter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterpolationConfig {
    /// Opening delimiter of an interpolation token
    pub prefix: String,

    /// Closing delimiter of an interpolation token
    pub suffix: String,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            prefix: String::from("{{"),
            suffix: String::from("}}"),
        }
    }
}

/// Which translation provider handles queue batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Unauthenticated public endpoint; no credentials, lower reliability
    Free,
    /// Vendor A: keyed HTTP API, one word per request
    Google,
    /// Vendor B: signed HTTP API, newline-joined batch per request
    Youdao,
}

impl ProviderKind {
    /// Short lowercase name used in logs and config files
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Google => "google",
            Self::Youdao => "youdao",
        }
    }

    /// True when the provider needs credentials from the secret file
    pub fn requires_secret(&self) -> bool {
        !matches!(self, Self::Free)
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Translation provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateApiConfig {
    /// Selected provider
    pub provider: ProviderKind,

    /// Path of the dotenv-format secret file; required for vendor providers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_file: Option<PathBuf>,
}

impl Default for TranslateApiConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Free,
            secret_file: None,
        }
    }
}

/// Debounce windows for the three deferred tasks (milliseconds)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Delay between the last enqueue and the translation cycle
    pub translate_ms: u64,

    /// Delay between the last change notification and the merge pass
    pub rescan_ms: u64,

    /// Retry delay when a merge pass fires while the engine is busy
    pub rescan_retry_ms: u64,

    /// Quiet window after the last reported call before the compile burst
    /// counts as finished
    pub compile_quiet_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            translate_ms: 800,
            rescan_ms: 1000,
            rescan_retry_ms: 1000,
            compile_quiet_ms: 1200,
        }
    }
}

impl DebounceConfig {
    pub fn translate_window(&self) -> Duration {
        Duration::from_millis(self.translate_ms)
    }

    pub fn rescan_window(&self) -> Duration {
        Duration::from_millis(self.rescan_ms)
    }

    pub fn rescan_retry(&self) -> Duration {
        Duration::from_millis(self.rescan_retry_ms)
    }

    pub fn compile_quiet_window(&self) -> Duration {
        Duration::from_millis(self.compile_quiet_ms)
    }
}

fn default_prefer_existing() -> bool {
    true
}

impl SyncConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(config)
    }

    /// Load from a file, apply environment overrides, and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// `LOCSYNC_STRICT` (1/true/0/false) overrides the strict flag and
    /// `LOCSYNC_SECRET_FILE` overrides the secret file path.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("LOCSYNC_STRICT") {
            match value.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.strict = true,
                "0" | "false" | "no" => self.strict = false,
                other => {
                    tracing::warn!(value = other, "Ignoring unrecognized LOCSYNC_STRICT value");
                }
            }
        }

        if let Ok(value) = std::env::var("LOCSYNC_SECRET_FILE") {
            if !value.is_empty() {
                self.translate_api.secret_file = Some(PathBuf::from(value));
            }
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locale_paths.is_empty() {
            return Err(ConfigError::Invalid(
                "locale_paths must list at least one directory".into(),
            ));
        }

        if self.languages.len() < 2 {
            return Err(ConfigError::Invalid(
                "languages must list the primary language plus at least one target".into(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for lang in &self.languages {
            if lang.code.is_empty() {
                return Err(ConfigError::Invalid("language codes must be non-empty".into()));
            }
            if !seen.insert(lang.code.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "language {:?} is listed more than once",
                    lang.code
                )));
            }
        }

        if self.primary().is_none() {
            return Err(ConfigError::Invalid(format!(
                "primary_language {:?} is not listed in languages",
                self.primary_language
            )));
        }

        if self.default_namespace.is_empty() {
            return Err(ConfigError::Invalid("default_namespace must be non-empty".into()));
        }

        if self.interpolation.prefix.is_empty() || self.interpolation.suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "interpolation prefix and suffix must be non-empty".into(),
            ));
        }

        if self.translate_api.provider.requires_secret() {
            match &self.translate_api.secret_file {
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "provider {:?} requires translate_api.secret_file",
                        self.translate_api.provider.as_str()
                    )));
                }
                Some(path) if !path.exists() => {
                    return Err(ConfigError::SecretFileMissing { path: path.clone() });
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// The primary language entry, if listed
    pub fn primary(&self) -> Option<&LanguageSpec> {
        self.languages.iter().find(|l| l.code == self.primary_language)
    }

    /// All languages except the primary, in configuration order
    pub fn secondary_languages(&self) -> impl Iterator<Item = &LanguageSpec> {
        self.languages.iter().filter(|l| l.code != self.primary_language)
    }

    /// The first locale path (primary path, owns namespace auto-creation)
    pub fn primary_locale_path(&self) -> &Path {
        &self.locale_paths[0]
    }

    /// Resource file location for one language under one locale path
    pub fn locale_file(&self, dir: &Path, language: &str) -> PathBuf {
        dir.join(format!("{language}.json"))
    }

    /// Resolve an optional call-site namespace
    ///
    /// `None` and the empty string both fall back to the default namespace.
    pub fn resolve_namespace<'a>(&'a self, namespace: Option<&'a str>) -> &'a str {
        match namespace {
            Some(ns) if !ns.is_empty() => ns,
            _ => &self.default_namespace,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            locale_paths: vec![PathBuf::from("locales")],
            languages: vec![LanguageSpec::new("en"), LanguageSpec::new("zh")],
            primary_language: String::from("en"),
            default_namespace: String::from("common"),
            strict: false,
            prefer_existing_translation: true,
            interpolation: InterpolationConfig::default(),
            translate_api: TranslateApiConfig::default(),
            debounce: DebounceConfig::default(),
        }
    }
}
