//! Translation providers
//!
//! This module contains the translation backends that render queued words
//! into target languages:
//! - [`free::FreeTranslator`]: unauthenticated public endpoint, word by word
//! - [`google::GoogleTranslator`]: keyed vendor API, word by word
//! - [`youdao::YoudaoTranslator`]: signed vendor API, newline-joined batches
//!
//! [`ProviderSet`] selects the backend per batch. Vendor credentials are
//! re-read from the secret file on every batch; a file that has gone
//! missing or lacks a required key downgrades that batch to the free
//! provider with a warning instead of failing the cycle.
//!
//! Providers never fail a batch as a whole: every word comes back as a
//! [`Rendition`], with the not-translated sentinel standing in for words
//! that could not be translated.

pub mod free;
pub mod google;
pub mod secrets;
pub mod youdao;

use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::config::{ProviderKind, SyncConfig};
use crate::models::Rendition;

pub use free::FreeTranslator;
pub use google::GoogleTranslator;
pub use secrets::SecretStore;
pub use youdao::YoudaoTranslator;

/// Shared HTTP client timeout; individual calls race much shorter
/// per-provider timers and discard late responses
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur inside provider calls
///
/// These never escape a translation cycle: the failing words are reported
/// as sentinel renditions and the error is logged.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The per-call timer won the race against the request
    #[error("{provider} request timed out after {seconds}s")]
    Timeout { provider: &'static str, seconds: u64 },

    /// Non-success HTTP status
    #[error("{provider} rejected the request with status {status}")]
    Status { provider: &'static str, status: u16 },

    /// Response body did not have the expected shape
    #[error("{provider} returned an unexpected response shape")]
    UnexpectedResponse { provider: &'static str },

    /// The detached request task ended without producing a result
    #[error("{provider} request task failed to complete")]
    TaskFailed { provider: &'static str },

    /// A vendor provider is selected but no secret file is configured
    #[error("No secret file configured for provider {provider}")]
    NotConfigured { provider: &'static str },

    /// The secret file could not be read or parsed
    #[error("Secret file {path} could not be read: {reason}")]
    SecretFile { path: PathBuf, reason: String },

    /// The secret file lacks a required credential
    #[error("Secret file {path} is missing required key {key:?}")]
    MissingCredential { path: PathBuf, key: &'static str },
}

/// A translation backend able to render a batch of masked texts from one
/// language into another
///
/// One rendition per input word, in input order. Implementations never fail
/// the batch; per-word failures become sentinel renditions so positions
/// stay intact for the caller's match-back.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &'static str;

    /// Translate the given masked texts from `from` to `to`
    async fn translate(&self, words: &[String], from: &str, to: &str) -> Vec<Rendition>;
}

/// Provider selection with the credential-downgrade policy
///
/// Holds the always-available free provider and builds the configured
/// vendor backend per batch, so credential changes on disk take effect
/// without restarting the engine.
pub struct ProviderSet {
    kind: ProviderKind,
    secret_file: Option<PathBuf>,
    client: Client,
    free: FreeTranslator,
    google_base_url: Option<String>,
    youdao_base_url: Option<String>,
}

impl ProviderSet {
    /// Build the provider set for an engine configuration
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the HTTP client cannot be created
    pub fn from_config(config: &SyncConfig) -> Result<Self, ProviderError> {
        let client = Client::builder().timeout(CLIENT_TIMEOUT).gzip(true).build()?;
        let free = FreeTranslator::new(client.clone());

        Ok(Self {
            kind: config.translate_api.provider,
            secret_file: config.translate_api.secret_file.clone(),
            client,
            free,
            google_base_url: None,
            youdao_base_url: None,
        })
    }

    /// Point the free provider at a custom base URL (mock servers)
    pub fn with_free_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.free = self.free.with_base_url(base_url);
        self
    }

    /// Point the vendor-A provider at a custom base URL (mock servers)
    pub fn with_google_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.google_base_url = Some(base_url.into());
        self
    }

    /// Point the vendor-B provider at a custom base URL (mock servers)
    pub fn with_youdao_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.youdao_base_url = Some(base_url.into());
        self
    }

    /// Selected provider kind
    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    /// Translate one batch with the configured provider
    ///
    /// When vendor credentials are unavailable the whole batch is handed to
    /// the free provider instead; the downgrade is logged once per batch.
    pub async fn translate_batch(&self, words: &[String], from: &str, to: &str) -> Vec<Rendition> {
        match self.vendor() {
            Ok(Some(vendor)) => vendor.translate(words, from, to).await,
            Ok(None) => self.free.translate(words, from, to).await,
            Err(err) => {
                warn!(
                    provider = self.kind.as_str(),
                    error = %err,
                    "Vendor credentials unavailable, downgrading batch to the free provider"
                );
                self.free.translate(words, from, to).await
            }
        }
    }

    /// Build the configured vendor backend, re-reading credentials
    ///
    /// `Ok(None)` means the free provider is configured directly.
    fn vendor(&self) -> Result<Option<Box<dyn Translator>>, ProviderError> {
        match self.kind {
            ProviderKind::Free => Ok(None),
            ProviderKind::Google => {
                let secrets = self.secrets("google")?;
                let key = secrets.require("secretKey")?;
                let mut translator = GoogleTranslator::new(self.client.clone(), key);
                if let Some(base) = &self.google_base_url {
                    translator = translator.with_base_url(base.clone());
                }
                Ok(Some(Box::new(translator)))
            }
            ProviderKind::Youdao => {
                let secrets = self.secrets("youdao")?;
                let app_key = secrets.require("appKey")?;
                let secret_key = secrets.require("secretKey")?;
                let mut translator = YoudaoTranslator::new(self.client.clone(), app_key, secret_key);
                if let Some(base) = &self.youdao_base_url {
                    translator = translator.with_base_url(base.clone());
                }
                Ok(Some(Box::new(translator)))
            }
        }
    }

    fn secrets(&self, provider: &'static str) -> Result<SecretStore, ProviderError> {
        let path = self
            .secret_file
            .as_deref()
            .ok_or(ProviderError::NotConfigured { provider })?;
        SecretStore::load(path)
    }
}

/// Race a request future against the provider timeout on a detached task
///
/// The losing request is not cancelled at the transport level; it keeps
/// running detached and its eventual result is discarded.
pub(crate) async fn race_detached<T, F>(
    provider: &'static str,
    seconds: u64,
    request: F,
) -> Result<T, ProviderError>
where
    T: Send + 'static,
    F: std::future::Future<Output = Result<T, ProviderError>> + Send + 'static,
{
    let handle = tokio::spawn(request);
    match tokio::time::timeout(Duration::from_secs(seconds), handle).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(ProviderError::TaskFailed { provider }),
        Err(_) => Err(ProviderError::Timeout { provider, seconds }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslateApiConfig;

    fn vendor_config(provider: ProviderKind, secret_file: Option<PathBuf>) -> SyncConfig {
        SyncConfig {
            translate_api: TranslateApiConfig {
                provider,
                secret_file,
            },
            ..SyncConfig::default()
        }
    }

    #[test]
    fn test_free_kind_uses_no_vendor() {
        let set = ProviderSet::from_config(&vendor_config(ProviderKind::Free, None)).unwrap();
        assert!(set.vendor().unwrap().is_none());
    }

    #[test]
    fn test_vendor_without_secret_file_is_not_configured() {
        let set = ProviderSet::from_config(&vendor_config(ProviderKind::Google, None)).unwrap();
        assert!(matches!(
            set.vendor(),
            Err(ProviderError::NotConfigured { provider: "google" })
        ));
    }

    #[test]
    fn test_vendor_with_incomplete_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("translate.env");
        std::fs::write(&secret, "appKey=abc\n").unwrap();

        let set =
            ProviderSet::from_config(&vendor_config(ProviderKind::Youdao, Some(secret))).unwrap();
        assert!(matches!(
            set.vendor(),
            Err(ProviderError::MissingCredential { key: "secretKey", .. })
        ));
    }

    #[test]
    fn test_vendor_with_complete_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let secret = dir.path().join("translate.env");
        std::fs::write(&secret, "appKey=abc\nsecretKey=def\n").unwrap();

        let set =
            ProviderSet::from_config(&vendor_config(ProviderKind::Youdao, Some(secret))).unwrap();
        let vendor = set.vendor().unwrap();
        assert_eq!(vendor.unwrap().name(), "youdao");
    }

    #[tokio::test]
    async fn test_race_detached_times_out() {
        let result: Result<(), _> = race_detached("free", 0, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ProviderError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_race_detached_passes_result_through() {
        let result = race_detached("free", 5, async { Ok(42u32) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
