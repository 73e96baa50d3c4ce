//! Vendor-B translation API (signed)
//!
//! Whole batches travel in a single request, newline-joined, and come back
//! as newline-joined text that is split positionally against the input
//! words. Requests carry a v3 signature: the SHA-256 hex digest of the app
//! key, the truncated query, a millisecond salt, a second timestamp, and
//! the secret key, concatenated in that order.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{error, info};

use super::{race_detached, ProviderError, Translator};
use crate::models::Rendition;

const DEFAULT_BASE_URL: &str = "https://openapi.youdao.com";
const YOUDAO_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translation: Vec<String>,
}

/// Signed vendor translator (newline-joined batches)
pub struct YoudaoTranslator {
    client: Client,
    app_key: String,
    secret_key: String,

    /// Optional base URL override for testing with mock servers
    base_url: Option<String>,
}

impl YoudaoTranslator {
    /// Create a translator with credentials read from the secret file
    pub fn new(
        client: Client,
        app_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            app_key: app_key.into(),
            secret_key: secret_key.into(),
            base_url: None,
        }
    }

    /// Point the translator at a custom base URL for testing
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Map a configured language code onto the vendor's own tag.
    ///
    /// Only the target side is rewritten, matching the vendor's docs.
    fn locale_tag(code: &str) -> &str {
        if code == "zh" {
            "zh-CHS"
        } else {
            code
        }
    }

    async fn request_batch(
        &self,
        query: String,
        from: String,
        to: String,
    ) -> Result<Vec<String>, ProviderError> {
        let client = self.client.clone();
        let url = format!(
            "{}/api",
            self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
        );
        let app_key = self.app_key.clone();
        let secret_key = self.secret_key.clone();

        race_detached("youdao", YOUDAO_TIMEOUT_SECS, async move {
            let now = Utc::now();
            let salt = now.timestamp_millis().to_string();
            let curtime = now.timestamp().to_string();
            let sign = sha256_hex(&sign_payload(&app_key, &query, &salt, &curtime, &secret_key));

            let response = client
                .get(&url)
                .query(&[
                    ("q", query.as_str()),
                    ("from", from.as_str()),
                    ("to", to.as_str()),
                    ("appKey", app_key.as_str()),
                    ("salt", salt.as_str()),
                    ("curtime", curtime.as_str()),
                    ("signType", "v3"),
                    ("sign", sign.as_str()),
                ])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(ProviderError::Status {
                    provider: "youdao",
                    status: status.as_u16(),
                });
            }

            let payload: TranslateResponse = response
                .json()
                .await
                .map_err(|_| ProviderError::UnexpectedResponse { provider: "youdao" })?;
            let joined = payload
                .translation
                .into_iter()
                .next()
                .ok_or(ProviderError::UnexpectedResponse { provider: "youdao" })?;
            Ok(joined.split('\n').map(str::to_string).collect())
        })
        .await
    }
}

#[async_trait]
impl Translator for YoudaoTranslator {
    fn name(&self) -> &'static str {
        "youdao"
    }

    async fn translate(&self, words: &[String], from: &str, to: &str) -> Vec<Rendition> {
        if words.is_empty() {
            return Vec::new();
        }

        let query = words.join("\n");
        let outcome = self
            .request_batch(query, from.to_string(), Self::locale_tag(to).to_string())
            .await;

        match outcome {
            Ok(lines) => words
                .iter()
                .enumerate()
                .map(|(index, word)| match lines.get(index) {
                    Some(text) => {
                        info!(from = %word, to = %text, "Translated");
                        Rendition::new(word.clone(), text.clone())
                    }
                    None => {
                        error!(word = %word, "Vendor response is missing a line");
                        Rendition::pending(word.clone())
                    }
                })
                .collect(),
            Err(err) => {
                error!(error = %err, words = words.len(), "Vendor batch failed");
                words.iter().map(|word| Rendition::pending(word.clone())).collect()
            }
        }
    }
}

/// Shorten a long query for signing: first ten chars, length, last ten chars
fn truncate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 20 {
        return text.to_string();
    }
    let head: String = chars[..10].iter().collect();
    let tail: String = chars[chars.len() - 10..].iter().collect();
    format!("{head}{}{tail}", chars.len())
}

fn sign_payload(app_key: &str, query: &str, salt: &str, curtime: &str, secret_key: &str) -> String {
    format!("{app_key}{}{salt}{curtime}{secret_key}", truncate(query))
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
