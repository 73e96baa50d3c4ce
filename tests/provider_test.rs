//! Integration tests for the translation providers using wiremock
//!
//! These tests validate the wire format of every provider and the
//! credential downgrade path of the provider set.

use std::path::Path;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use locsync::config::{ProviderKind, SyncConfig, TranslateApiConfig};
use locsync::models::NOT_TRANSLATED;
use locsync::providers::ProviderSet;

mod common;
use common::{config_for, free_body, LocaleTree};

fn write_secret_file(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join(".env.translate");
    std::fs::write(&path, content).unwrap();
    path
}

fn vendor_config(tree: &LocaleTree, kind: ProviderKind, secrets: &str) -> SyncConfig {
    let secret_file = write_secret_file(tree.path(), secrets);
    SyncConfig {
        translate_api: TranslateApiConfig {
            provider: kind,
            secret_file: Some(secret_file),
        },
        ..config_for(tree)
    }
}

/// Test the free endpoint wire format: one GET per word, zh mapped to zh-CN
#[tokio::test]
async fn test_free_provider_translates_each_word() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("client", "gtx"))
        .and(query_param("dt", "t"))
        .and(query_param("sl", "en"))
        .and(query_param("tl", "zh-CN"))
        .and(query_param("q", "Hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(free_body("你好", "Hello")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("q", "World"))
        .respond_with(ResponseTemplate::new(200).set_body_json(free_body("世界", "World")))
        .expect(1)
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let providers = ProviderSet::from_config(&config_for(&tree))
        .unwrap()
        .with_free_base_url(server.uri());

    let words = vec!["Hello".to_string(), "World".to_string()];
    let renditions = providers.translate_batch(&words, "en", "zh").await;

    assert_eq!(renditions.len(), 2);
    assert_eq!(renditions[0].source, "Hello");
    assert_eq!(renditions[0].target, "你好");
    assert_eq!(renditions[1].target, "世界");
}

/// Test that one failing word does not poison the rest of the batch
#[tokio::test]
async fn test_free_provider_isolates_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("q", "Good"))
        .respond_with(ResponseTemplate::new(200).set_body_json(free_body("好", "Good")))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("q", "Bad"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let providers = ProviderSet::from_config(&config_for(&tree))
        .unwrap()
        .with_free_base_url(server.uri());

    let words = vec!["Good".to_string(), "Bad".to_string()];
    let renditions = providers.translate_batch(&words, "en", "zh").await;

    assert_eq!(renditions[0].target, "好");
    assert!(renditions[1].is_pending());
    assert_eq!(renditions[1].target, NOT_TRANSLATED);
}

/// Test that an unexpected payload shape becomes a sentinel, not a panic
#[tokio::test]
async fn test_free_provider_rejects_malformed_payload() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"odd": true})))
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let providers = ProviderSet::from_config(&config_for(&tree))
        .unwrap()
        .with_free_base_url(server.uri());

    let renditions = providers
        .translate_batch(&["Hello".to_string()], "en", "zh")
        .await;

    assert!(renditions[0].is_pending());
}

/// Test the keyed vendor wire format: API key and text format flags
#[tokio::test]
async fn test_google_provider_sends_key_and_parses_response() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/language/translate/v2"))
        .and(query_param("key", "test-api-key"))
        .and(query_param("q", "Hello"))
        .and(query_param("source", "en"))
        .and(query_param("target", "zh"))
        .and(query_param("format", "text"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {"translations": [{"translatedText": "你好"}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let config = vendor_config(&tree, ProviderKind::Google, "secretKey=test-api-key\n");
    let providers = ProviderSet::from_config(&config)
        .unwrap()
        .with_google_base_url(server.uri());

    let renditions = providers
        .translate_batch(&["Hello".to_string()], "en", "zh")
        .await;

    assert_eq!(renditions[0].target, "你好");
}

/// Test that a missing vendor credential downgrades the batch to the free
/// provider instead of failing it
#[tokio::test]
async fn test_google_missing_credential_downgrades_to_free() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/language/translate/v2"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("q", "Hello"))
        .respond_with(ResponseTemplate::new(200).set_body_json(free_body("你好", "Hello")))
        .expect(1)
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    // The secret file exists but lacks the key the vendor needs
    let config = vendor_config(&tree, ProviderKind::Google, "appKey=irrelevant\n");
    let providers = ProviderSet::from_config(&config)
        .unwrap()
        .with_google_base_url(server.uri())
        .with_free_base_url(server.uri());

    let renditions = providers
        .translate_batch(&["Hello".to_string()], "en", "zh")
        .await;

    assert_eq!(renditions[0].target, "你好");
}

/// Test the signed vendor wire format: one newline-joined batch request,
/// split back positionally, zh mapped to zh-CHS on the target side only
#[tokio::test]
async fn test_youdao_provider_signs_and_splits_batch() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .and(query_param("appKey", "my-app"))
        .and(query_param("signType", "v3"))
        .and(query_param("from", "en"))
        .and(query_param("to", "zh-CHS"))
        .and(query_param("q", "Hello\nWorld"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errorCode": "0",
            "translation": ["你好\n世界"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let config = vendor_config(
        &tree,
        ProviderKind::Youdao,
        "appKey=my-app\nsecretKey=my-secret\n",
    );
    let providers = ProviderSet::from_config(&config)
        .unwrap()
        .with_youdao_base_url(server.uri());

    let words = vec!["Hello".to_string(), "World".to_string()];
    let renditions = providers.translate_batch(&words, "en", "zh").await;

    assert_eq!(renditions[0].source, "Hello");
    assert_eq!(renditions[0].target, "你好");
    assert_eq!(renditions[1].source, "World");
    assert_eq!(renditions[1].target, "世界");
}

/// Test that a failed batch request marks every word as pending
#[tokio::test]
async fn test_youdao_failure_marks_whole_batch_pending() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let config = vendor_config(
        &tree,
        ProviderKind::Youdao,
        "appKey=my-app\nsecretKey=my-secret\n",
    );
    let providers = ProviderSet::from_config(&config)
        .unwrap()
        .with_youdao_base_url(server.uri());

    let words = vec!["Hello".to_string(), "World".to_string()];
    let renditions = providers.translate_batch(&words, "en", "zh").await;

    assert!(renditions.iter().all(|r| r.is_pending()));
    assert_eq!(renditions[0].source, "Hello");
    assert_eq!(renditions[1].source, "World");
}

/// Test that a batch answer with fewer lines than words pads the tail
/// with sentinels instead of shifting translations
#[tokio::test]
async fn test_youdao_short_response_pads_with_sentinels() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "errorCode": "0",
            "translation": ["你好"]
        })))
        .mount(&server)
        .await;

    let tree = LocaleTree::new();
    let config = vendor_config(
        &tree,
        ProviderKind::Youdao,
        "appKey=my-app\nsecretKey=my-secret\n",
    );
    let providers = ProviderSet::from_config(&config)
        .unwrap()
        .with_youdao_base_url(server.uri());

    let words = vec!["Hello".to_string(), "World".to_string()];
    let renditions = providers.translate_batch(&words, "en", "zh").await;

    assert_eq!(renditions[0].target, "你好");
    assert!(renditions[1].is_pending());
}
