//! Vendor-A translation API (keyed)
//!
//! One word per request against the v2 REST endpoint, authenticated with a
//! single API key from the secret file. Each request races a 3 second
//! timer; failed words become sentinel renditions without touching the rest
//! of the batch.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use super::{race_detached, ProviderError, Translator};
use crate::models::Rendition;

const DEFAULT_BASE_URL: &str = "https://translation.googleapis.com";
const GOOGLE_TIMEOUT_SECS: u64 = 3;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    data: TranslationList,
}

#[derive(Debug, Deserialize)]
struct TranslationList {
    translations: Vec<TranslationItem>,
}

#[derive(Debug, Deserialize)]
struct TranslationItem {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Keyed vendor translator (one word per request)
pub struct GoogleTranslator {
    client: Client,
    api_key: String,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl GoogleTranslator {
    /// Create a translator with the key read from the secret file
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Point the translator at a custom base URL for testing
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    async fn translate_word(&self, word: String, from: String, to: String) -> Rendition {
        let client = self.client.clone();
        let url = format!(
            "{}/language/translate/v2",
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
        );
        let key = self.api_key.clone();
        let query_word = word.clone();

        let outcome = race_detached("google", GOOGLE_TIMEOUT_SECS, async move {
            let response = client
                .get(&url)
                .query(&[
                    ("key", key.as_str()),
                    ("q", query_word.as_str()),
                    ("source", from.as_str()),
                    ("target", to.as_str()),
                    ("format", "text"),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    provider: "google",
                    status: status.as_u16(),
                });
            }

            let payload: TranslateResponse = response
                .json()
                .await
                .map_err(|_| ProviderError::UnexpectedResponse { provider: "google" })?;
            payload
                .data
                .translations
                .into_iter()
                .next()
                .map(|item| item.translated_text)
                .ok_or(ProviderError::UnexpectedResponse { provider: "google" })
        })
        .await;

        match outcome {
            Ok(text) => {
                info!(from = %word, to = %text, "Translated");
                Rendition::new(word, text)
            }
            Err(err) => {
                error!(word = %word, error = %err, "Vendor translation failed");
                Rendition::pending(word)
            }
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn translate(&self, words: &[String], from: &str, to: &str) -> Vec<Rendition> {
        let requests = words
            .iter()
            .map(|word| self.translate_word(word.clone(), from.to_string(), to.to_string()));
        join_all(requests).await
    }
}
