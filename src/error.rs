//! Unified error handling for the locsync crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`LocsyncErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use locsync::error::{Error, ErrorCategory, LocsyncErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying later: {}", err);
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::cache::CacheError;
pub use crate::config::ConfigError;
pub use crate::engine::MissingTranslationError;
pub use crate::providers::ProviderError;

/// Common trait for all locsync error types
///
/// This trait provides a unified interface for error handling across
/// all modules, enabling consistent error processing strategies.
pub trait LocsyncErrorTrait: std::error::Error {
    /// Check if this error is recoverable (the next cycle may succeed)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (provider HTTP, timeout)
    Network,
    /// Parsing and data shape errors (JSON, locale file structure)
    Parsing,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
    /// Missing or pending translations surfaced in strict mode
    Translation,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short lowercase label used in structured log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Parsing => "parsing",
            Self::Storage => "storage",
            Self::Config => "config",
            Self::Translation => "translation",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unified error type for the locsync crate
///
/// This enum wraps all domain-specific errors, providing a single error type
/// that can be used across module boundaries while preserving the detailed
/// error information.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading and validation errors
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Locale resource cache errors (load, refresh, incremental update)
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// Translation provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Strict-mode lookup failures
    #[error("Missing translation: {0}")]
    MissingTranslation(#[from] MissingTranslationError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl LocsyncErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Cache(_) => false,
            // Provider failures resolve to sentinels and retry next cycle
            Self::Provider(_) => true,
            Self::MissingTranslation(_) => false,
            Self::Io(_) => true, // I/O errors are often transient
            Self::Json(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Config,
            Self::Cache(e) => match e {
                CacheError::DuplicateNamespace { .. } => ErrorCategory::Config,
                CacheError::MissingLocaleFile { .. } => ErrorCategory::Storage,
                CacheError::InvalidLocaleFile { .. } | CacheError::UnexpectedShape { .. } => {
                    ErrorCategory::Parsing
                }
            },
            Self::Provider(_) => ErrorCategory::Network,
            Self::MissingTranslation(_) => ErrorCategory::Translation,
            Self::Io(_) => ErrorCategory::Storage,
            Self::Json(_) => ErrorCategory::Parsing,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error (extractor boundary)
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
