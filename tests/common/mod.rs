//! Common test utilities

use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use locsync::config::SyncConfig;
use locsync::models::LanguageSpec;

/// A temporary locale directory with one JSON file per language
pub struct LocaleTree {
    dir: TempDir,
}

impl LocaleTree {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, language: &str) -> PathBuf {
        self.dir.path().join(format!("{language}.json"))
    }

    pub fn write(&self, language: &str, content: Value) {
        std::fs::write(
            self.file(language),
            serde_json::to_string_pretty(&content).unwrap(),
        )
        .unwrap();
    }

    pub fn read(&self, language: &str) -> Value {
        serde_json::from_str(&self.raw(language)).unwrap()
    }

    #[allow(dead_code)]
    pub fn raw(&self, language: &str) -> String {
        std::fs::read_to_string(self.file(language)).unwrap()
    }
}

/// en -> zh configuration over a locale tree, free provider
#[allow(dead_code)]
pub fn config_for(tree: &LocaleTree) -> SyncConfig {
    SyncConfig {
        locale_paths: vec![tree.path().to_path_buf()],
        languages: vec![LanguageSpec::new("en"), LanguageSpec::new("zh")],
        ..SyncConfig::default()
    }
}

/// Response payload of the free endpoint for one translated word
pub fn free_body(translated: &str, source: &str) -> Value {
    serde_json::json!([[[translated, source, null]], null, "en"])
}
