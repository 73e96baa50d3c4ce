//! Unauthenticated public translation endpoint
//!
//! Word-by-word requests against the public `translate_a/single` endpoint.
//! No credentials, so this is the fallback every vendor batch downgrades to,
//! and the default provider when nothing else is configured. Requests go
//! through a rate limiter and race a 10 second timer; a word whose request
//! loses the race comes back as a sentinel rendition.

use async_trait::async_trait;
use futures::future::join_all;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use std::num::NonZeroU32;
use tracing::{error, info};

use super::{race_detached, ProviderError, Translator};
use crate::models::Rendition;

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";
const FREE_TIMEOUT_SECS: u64 = 10;
const REQUESTS_PER_SECOND: u32 = 5;

/// Free public endpoint translator
pub struct FreeTranslator {
    client: Client,

    /// Rate limiter to keep the unauthenticated endpoint polite
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl FreeTranslator {
    /// Create a new free translator sharing the engine's HTTP client
    pub fn new(client: Client) -> Self {
        let rate = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Self {
            client,
            rate_limiter,
            base_url: None,
        }
    }

    /// Point the translator at a custom base URL for testing
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Language tag expected by the public endpoint
    ///
    /// Applied to both sides of the request.
    fn locale_tag(code: &str) -> &str {
        match code {
            "zh" => "zh-CN",
            other => other,
        }
    }

    async fn translate_word(&self, word: String, from: String, to: String) -> Rendition {
        self.rate_limiter.until_ready().await;

        let client = self.client.clone();
        let url = format!(
            "{}/translate_a/single",
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
        );
        let query_word = word.clone();

        let outcome = race_detached("free", FREE_TIMEOUT_SECS, async move {
            let response = client
                .get(&url)
                .query(&[
                    ("client", "gtx"),
                    ("dt", "t"),
                    ("sl", from.as_str()),
                    ("tl", to.as_str()),
                    ("q", query_word.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    provider: "free",
                    status: status.as_u16(),
                });
            }

            let payload: serde_json::Value = response.json().await?;
            parse_translation(&payload).ok_or(ProviderError::UnexpectedResponse { provider: "free" })
        })
        .await;

        match outcome {
            Ok(text) => Rendition::new(word, text),
            Err(err) => {
                error!(word = %word, error = %err, "Free translation failed");
                info!("A configured vendor translation API is more reliable than the free endpoint");
                Rendition::pending(word)
            }
        }
    }
}

#[async_trait]
impl Translator for FreeTranslator {
    fn name(&self) -> &'static str {
        "free"
    }

    async fn translate(&self, words: &[String], from: &str, to: &str) -> Vec<Rendition> {
        let from = Self::locale_tag(from).to_string();
        let to = Self::locale_tag(to).to_string();

        let requests = words
            .iter()
            .map(|word| self.translate_word(word.clone(), from.clone(), to.clone()));
        join_all(requests).await
    }
}

/// Pull the translated text out of the endpoint's nested array payload
///
/// The body is `[[["<translated>", "<source>", ...], ...], ...]`; the
/// translation is the concatenation of the first element of every segment.
fn parse_translation(payload: &serde_json::Value) -> Option<String> {
    let segments = payload.get(0)?.as_array()?;
    let mut text = String::new();
    for segment in segments {
        text.push_str(segment.get(0)?.as_str()?);
    }
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_locale_tag() {
        assert_eq!(FreeTranslator::locale_tag("zh"), "zh-CN");
        assert_eq!(FreeTranslator::locale_tag("fr"), "fr");
    }

    #[test]
    fn test_parse_translation_concatenates_segments() {
        let payload = json!([
            [
                ["Bonjour ", "Hello ", null],
                ["le monde", "world", null]
            ],
            null
        ]);
        assert_eq!(
            parse_translation(&payload).unwrap(),
            "Bonjour le monde"
        );
    }

    #[test]
    fn test_parse_translation_rejects_malformed_payload() {
        assert!(parse_translation(&json!({"not": "an array"})).is_none());
        assert!(parse_translation(&json!([])).is_none());
        assert!(parse_translation(&json!([[42]])).is_none());
    }
}
