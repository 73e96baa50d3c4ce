//! locsync - Locale Synchronization Engine
//!
//! Keeps JSON locale resource files in sync with the translatable strings
//! referenced by a source tree: missing words are machine-translated into
//! every configured language, stale keys are pruned, and files are only
//! rewritten when their content actually changes.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`cache`] - In-memory image of the locale files on disk
//! - [`queue`] - Deduplicating translation queue and cycle dispatcher
//! - [`providers`] - Translation providers (free, Google, Youdao)
//! - [`interpolation`] - Placeholder masking around provider calls
//! - [`merge`] - Reference reconciliation and locale file write-back
//! - [`events`] - Debounced task scheduling
//! - [`engine`] - The synchronization engine tying it all together
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use locsync::engine::{StaticExtractor, SyncEngine};
//! use locsync::config::SyncConfig;
//! use locsync::models::ExtractedCall;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::from_file(Path::new("locsync.toml"))?;
//!     let extractor = Arc::new(StaticExtractor::default());
//!     let engine = SyncEngine::new(config, extractor)?;
//!     engine
//!         .report_call(
//!             ExtractedCall::Translate {
//!                 text: "Hello world".into(),
//!                 namespace: None,
//!             },
//!             Path::new("src/app.tsx"),
//!         )
//!         .await?;
//!     // engine.start().await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod interpolation;
pub mod merge;
pub mod models;
pub mod providers;
pub mod queue;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::LocaleCache;
    pub use crate::config::{ProviderKind, SyncConfig};
    pub use crate::engine::{Extractor, StaticExtractor, SyncEngine};
    pub use crate::error::{Error, ErrorCategory, LocsyncErrorTrait, Result};
    pub use crate::models::{ExtractedCall, KeyReference, LanguageSpec, NOT_TRANSLATED};
    pub use crate::providers::ProviderSet;
}

// Direct re-exports for convenience
pub use models::{ExtractedCall, KeyReference, LanguageSpec, NOT_TRANSLATED};
