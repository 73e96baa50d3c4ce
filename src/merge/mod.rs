//! Merge and write-back
//!
//! A reconciliation pass folds three inputs into fresh locale files: the
//! key references found in the latest source scan, the cached on-disk
//! content, and the translations accumulated since the last pass. Keys no
//! longer referenced anywhere are pruned, missing values are filled per
//! language, and a file is rewritten only when its computed content
//! differs from the cached content, which also keeps the locale watcher
//! from retriggering endlessly.
//!
//! Fill order for a non-primary key that still holds the sentinel: the
//! exact key in the cycle's translations, then the longest translated key
//! that is a prefix of a `_suffix`-variant key, then the cross-namespace
//! reuse map. The primary language never keeps a sentinel; it falls back
//! to the key text itself.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::cache::{read_language_file, LocaleCache};
use crate::config::SyncConfig;
use crate::models::{KeyReference, LanguageContent, NamespaceContent, NOT_TRANSLATED};
use crate::queue::CycleOutcome;

static VARIANT_PATTERN: OnceLock<Regex> = OnceLock::new();

/// True for keys carrying trailing `_suffix` variant segments
fn is_variant_key(key: &str) -> bool {
    let pattern = VARIANT_PATTERN.get_or_init(|| {
        // Fixed pattern, invariantly valid
        Regex::new(r".+(_[^_]+)+$").expect("Invalid variant pattern")
    });
    pattern.is_match(key)
}

#[derive(Error, Debug)]
enum WriteError {
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// What one reconciliation pass changed on disk
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Locale files rewritten because their content changed
    pub written: Vec<PathBuf>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.written.is_empty()
    }

    pub fn files_written(&self) -> usize {
        self.written.len()
    }
}

/// Reconciles references, cached content and fresh translations into files
pub struct Reconciler {
    config: Arc<SyncConfig>,
}

impl Reconciler {
    pub fn new(config: Arc<SyncConfig>) -> Self {
        Self { config }
    }

    /// Run one full reconciliation pass over every language and locale path
    ///
    /// In strict mode the pass is a no-op: strict builds must never rewrite
    /// locale files. IO failures are confined to the affected file; the
    /// remaining files are still processed.
    pub fn run(
        &self,
        references: &[KeyReference],
        outcome: &CycleOutcome,
        cache: &mut LocaleCache,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        if self.config.strict {
            debug!("Strict mode, locale files are read-only");
            return report;
        }

        let included = self.included_references(references, outcome, cache);
        for language in cache.languages().to_vec() {
            let output = self.reconcile_language(&language, &included, outcome, cache);
            self.write_language(&language, output, cache, &mut report);
        }

        if !report.is_empty() {
            info!(files = report.files_written(), "Locale files reconciled");
        }
        report
    }

    /// Create an empty namespace block in every language's file under the
    /// primary locale path and register it in the cache
    ///
    /// Must run synchronously with miss detection so the namespace exists
    /// before its first word enters the queue. A file that cannot be read
    /// or written is logged and skipped; the cache is registered either
    /// way, and the next reconciliation materializes the namespace.
    pub fn create_namespace(&self, namespace: &str, cache: &mut LocaleCache) {
        if cache.namespace_exists(namespace) {
            return;
        }

        let dir = self.config.primary_locale_path();
        for language in cache.languages().to_vec() {
            let path = self.config.locale_file(dir, &language);
            let mut content = match read_language_file(&path, &language) {
                Ok(content) => content,
                Err(err) => {
                    error!(file = %path.display(), error = %err, "Skipping namespace block");
                    continue;
                }
            };
            if content.contains_key(namespace) {
                continue;
            }
            content.insert(namespace.to_string(), NamespaceContent::new());
            if let Err(err) = write_locale_file(&path, &content) {
                error!(file = %path.display(), error = %err, "Skipping namespace block");
            }
        }

        cache.insert_namespace(namespace);
        info!(namespace, "Namespace created under primary locale path");
    }

    /// Derive the included reference set: namespace -> referenced keys
    ///
    /// A reference survives when the cache already knows it, when some
    /// cycle translated it, or when the reuse map answers it. References
    /// to namespaces the cache has never seen are dropped.
    fn included_references(
        &self,
        references: &[KeyReference],
        outcome: &CycleOutcome,
        cache: &LocaleCache,
    ) -> BTreeMap<String, BTreeSet<String>> {
        let mut included: BTreeMap<String, BTreeSet<String>> = cache
            .namespace_order()
            .iter()
            .map(|ns| (ns.clone(), BTreeSet::new()))
            .collect();

        for reference in references {
            let namespace = self.config.resolve_namespace(reference.namespace.as_deref());
            let Some(keys) = included.get_mut(namespace) else {
                debug!(namespace, text = %reference.text, "Reference to unknown namespace dropped");
                continue;
            };
            if self.is_included(&reference.text, namespace, outcome, cache) {
                keys.insert(reference.text.clone());
            }
        }

        included
    }

    fn is_included(
        &self,
        text: &str,
        namespace: &str,
        outcome: &CycleOutcome,
        cache: &LocaleCache,
    ) -> bool {
        cache.word_status(text, namespace).matched
            || outcome
                .translations
                .values()
                .any(|map| map.contains_key(text))
            || outcome.reused.contains_key(text)
    }

    /// Compute the full post-merge content of one language
    ///
    /// Old values win over fresh ones; only keys whose old value is absent,
    /// empty or the sentinel get filled.
    fn reconcile_language(
        &self,
        language: &str,
        included: &BTreeMap<String, BTreeSet<String>>,
        outcome: &CycleOutcome,
        cache: &LocaleCache,
    ) -> LanguageContent {
        let is_primary = language == cache.primary_language();
        let old = cache.language_content(language);

        let mut output = LanguageContent::new();
        for (namespace, keys) in included {
            let old_ns = old.and_then(|content| content.get(namespace));
            let mut content = NamespaceContent::new();
            for key in keys {
                let old_value = old_ns
                    .and_then(|ns| ns.get(key))
                    .filter(|v| !v.is_empty() && *v != NOT_TRANSLATED);
                let value = match old_value {
                    Some(v) => v.clone(),
                    None if is_primary => key.clone(),
                    None => self.fill_translation(key, language, outcome),
                };
                content.insert(key.clone(), value);
            }
            output.insert(namespace.clone(), content);
        }
        output
    }

    /// Pick a value for a non-primary key with no usable old value
    fn fill_translation(&self, key: &str, language: &str, outcome: &CycleOutcome) -> String {
        if let Some(map) = outcome.translations.get(language) {
            if let Some(value) = map.get(key) {
                if value != NOT_TRANSLATED {
                    return value.clone();
                }
            }
            if is_variant_key(key) {
                let base = map
                    .keys()
                    .filter(|candidate| candidate.len() < key.len() && key.starts_with(candidate.as_str()))
                    .max_by_key(|candidate| candidate.len());
                if let Some(base) = base {
                    if let Some(value) = map.get(base) {
                        if value != NOT_TRANSLATED {
                            debug!(key, base = %base, "Variant key borrows base translation");
                            return value.clone();
                        }
                    }
                }
            }
        }

        if let Some(hit) = outcome.reused.get(key) {
            if let Some(value) = hit.values.get(language) {
                return value.clone();
            }
        }

        NOT_TRANSLATED.to_string()
    }

    /// Write one language's files path by path, skipping unchanged ones
    fn write_language(
        &self,
        language: &str,
        output: LanguageContent,
        cache: &mut LocaleCache,
        report: &mut MergeReport,
    ) {
        for entry in cache.path_entries().to_vec() {
            let mut file_content = LanguageContent::new();
            for ns in &entry.namespaces {
                match output.get(ns) {
                    Some(content) if !content.is_empty() => {
                        file_content.insert(ns.clone(), content.clone());
                    }
                    _ => {
                        // A namespace emptied by pruning is dropped from the
                        // file; one that was already empty keeps its block
                        let old_ns = cache
                            .language_content(language)
                            .and_then(|content| content.get(ns));
                        if matches!(old_ns, Some(m) if m.is_empty()) {
                            file_content.insert(ns.clone(), NamespaceContent::new());
                        }
                    }
                }
            }

            let old_content = cache.content_for(language, &entry.namespaces);
            if file_content.is_empty() && old_content.is_empty() {
                continue;
            }
            if file_content == old_content {
                continue;
            }

            let path = self.config.locale_file(&entry.path, language);
            match write_locale_file(&path, &file_content) {
                Ok(()) => {
                    info!(file = %path.display(), "Locale file updated");
                    cache.replace_namespaces(language, &entry.namespaces, file_content);
                    report.written.push(path);
                }
                Err(err) => {
                    error!(file = %path.display(), error = %err, "Locale file write failed");
                }
            }
        }
    }
}

/// Serialize a language's content with 2-space indentation, keys sorted
fn write_locale_file(path: &Path, content: &LanguageContent) -> Result<(), WriteError> {
    let serialized = serde_json::to_string_pretty(content)?;
    std::fs::write(path, serialized)?;
    Ok(())
}
