//! In-memory locale resource cache
//!
//! The cache mirrors every locale resource file and is the single source of
//! truth the rest of the engine reads from:
//! - Lookup: is a (text, namespace) pair present for every language, and is
//!   any of the stored values still the not-translated sentinel
//! - Reuse: find an existing translation of a text under another namespace
//! - Mapping: which namespaces each locale path owns (discovery order)
//!
//! The cache is loaded once at engine start and kept current afterwards:
//! the merge engine refreshes it after every file write, and external edits
//! to a locale file are applied through [`LocaleCache::apply_file_update`].
//!
//! # Example
//!
//! ```rust,ignore
//! use locsync::cache::LocaleCache;
//!
//! let cache = LocaleCache::load(&config)?;
//! let status = cache.word_status("Hello", "common");
//! if !status.matched {
//!     // queue the word for translation
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::models::{LanguageContent, ReusableTranslation, NOT_TRANSLATED};

/// Errors raised while loading or updating the locale cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// The same namespace is declared by the primary-language file of more
    /// than one locale path
    #[error("Duplicate namespace: {namespace}")]
    DuplicateNamespace { namespace: String },

    /// A resource file expected for a configured language could not be read
    #[error("Locale file for language {language:?} could not be read at {path}: {source}")]
    MissingLocaleFile {
        language: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A resource file is not valid JSON or has non-string leaf values
    #[error("Locale file {path} could not be parsed: {source}")]
    InvalidLocaleFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A resource file does not hold a top-level object of namespaces
    #[error("Locale file {path} must contain a top-level object of namespaces")]
    UnexpectedShape { path: PathBuf },
}

/// Lookup outcome for one (text, namespace) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordStatus {
    /// True when every configured language holds a non-empty value for the
    /// pair; the sentinel counts as present
    pub matched: bool,
    /// True when at least one inspected language still holds the sentinel
    pub pending: bool,
}

impl WordStatus {
    /// A word needs translation when it is absent somewhere or still pending
    pub fn needs_translation(&self) -> bool {
        !self.matched || self.pending
    }
}

/// Namespaces owned by one locale path, in discovery order
#[derive(Debug, Clone)]
pub struct PathNamespaces {
    pub path: PathBuf,
    pub namespaces: Vec<String>,
}

/// In-memory mirror of all locale resource files
#[derive(Debug, Clone)]
pub struct LocaleCache {
    /// language code -> namespace -> key -> value
    resources: HashMap<String, LanguageContent>,
    /// locale path -> namespaces it owns, in configuration order
    mapping: Vec<PathNamespaces>,
    /// every known namespace, in discovery order across paths
    namespace_order: Vec<String>,
    /// configured language codes, primary included
    languages: Vec<String>,
    primary_language: String,
}

impl LocaleCache {
    /// Load all resource files declared by the configuration
    ///
    /// The primary language's file determines which namespaces a path owns.
    /// Every configured language must have a readable file under every path.
    ///
    /// # Errors
    ///
    /// [`CacheError::DuplicateNamespace`] when two paths declare the same
    /// namespace, [`CacheError::MissingLocaleFile`] when an expected file is
    /// absent, [`CacheError::InvalidLocaleFile`] on malformed content.
    pub fn load(config: &SyncConfig) -> Result<Self, CacheError> {
        let languages: Vec<String> = config.languages.iter().map(|l| l.code.clone()).collect();
        let primary_language = config.primary_language.clone();

        let mut resources: HashMap<String, LanguageContent> = languages
            .iter()
            .map(|code| (code.clone(), LanguageContent::new()))
            .collect();
        let mut mapping = Vec::new();
        let mut namespace_order: Vec<String> = Vec::new();

        for dir in &config.locale_paths {
            let primary_file = config.locale_file(dir, &primary_language);
            let primary_content = read_language_file(&primary_file, &primary_language)?;
            let file_namespaces: Vec<String> = primary_content.keys().cloned().collect();

            for ns in &file_namespaces {
                if namespace_order.contains(ns) {
                    return Err(CacheError::DuplicateNamespace {
                        namespace: ns.clone(),
                    });
                }
            }
            namespace_order.extend(file_namespaces.iter().cloned());

            resources
                .entry(primary_language.clone())
                .or_default()
                .extend(primary_content);

            for code in &languages {
                if code == &primary_language {
                    continue;
                }
                let file = config.locale_file(dir, code);
                let content = read_language_file(&file, code)?;
                resources.entry(code.clone()).or_default().extend(content);
            }

            mapping.push(PathNamespaces {
                path: dir.clone(),
                namespaces: file_namespaces,
            });
        }

        info!(
            languages = languages.len(),
            namespaces = namespace_order.len(),
            paths = mapping.len(),
            "Locale cache loaded"
        );

        Ok(Self {
            resources,
            mapping,
            namespace_order,
            languages,
            primary_language,
        })
    }

    /// Check whether a (text, namespace) pair is known and fully translated
    ///
    /// Languages are inspected in configuration order and the scan stops at
    /// the first language missing the pair, so `pending` only reflects the
    /// languages inspected up to that point.
    pub fn word_status(&self, text: &str, namespace: &str) -> WordStatus {
        let mut pending = false;
        let matched = self.languages.iter().all(|code| {
            let value = self
                .resources
                .get(code)
                .and_then(|content| content.get(namespace))
                .and_then(|ns| ns.get(text));
            match value {
                Some(v) => {
                    if v == NOT_TRANSLATED {
                        pending = true;
                    }
                    !v.is_empty()
                }
                None => false,
            }
        });

        WordStatus { matched, pending }
    }

    /// True when the namespace was discovered at load time or added later
    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.namespace_order.iter().any(|ns| ns == namespace)
    }

    /// Find an existing translation of `text` under any namespace
    ///
    /// Scans namespaces in discovery order and stops at the first one whose
    /// primary-language content has `text` as a key. The hit only counts when
    /// every language holds a non-empty, non-sentinel value there; a partial
    /// hit yields `None` and the word goes to the provider instead.
    pub fn find_reusable(&self, text: &str) -> Option<ReusableTranslation> {
        let primary = self.resources.get(&self.primary_language)?;
        let namespace = self
            .namespace_order
            .iter()
            .find(|ns| primary.get(*ns).is_some_and(|content| content.contains_key(text)))?;

        let mut values = HashMap::new();
        for code in &self.languages {
            match self
                .resources
                .get(code)
                .and_then(|content| content.get(namespace))
                .and_then(|ns| ns.get(text))
            {
                Some(v) if !v.is_empty() && v != NOT_TRANSLATED => {
                    values.insert(code.clone(), v.clone());
                }
                _ => return None,
            }
        }

        Some(ReusableTranslation {
            namespace: namespace.clone(),
            values,
        })
    }

    /// Register a freshly created namespace under the primary locale path
    ///
    /// Adds an empty namespace object for every language and appends the
    /// namespace to the discovery order. File writes are the caller's job.
    pub fn insert_namespace(&mut self, namespace: &str) {
        if self.namespace_exists(namespace) {
            return;
        }
        for content in self.resources.values_mut() {
            content.entry(namespace.to_string()).or_default();
        }
        if let Some(entry) = self.mapping.first_mut() {
            entry.namespaces.push(namespace.to_string());
        }
        self.namespace_order.push(namespace.to_string());
        debug!(namespace, "Namespace registered in locale cache");
    }

    /// Apply an external edit of one locale resource file
    ///
    /// The file name determines the language, the directory determines which
    /// path's namespaces get replaced. The file's own namespace set becomes
    /// the path's new namespace set. Returns `false` when the path or
    /// language is not part of this cache.
    pub fn apply_file_update(&mut self, file_path: &Path) -> Result<bool, CacheError> {
        let Some(language) = file_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string)
        else {
            return Ok(false);
        };
        if !self.languages.contains(&language) {
            warn!(file = %file_path.display(), "Changed locale file does not match a configured language");
            return Ok(false);
        }
        let Some(dir) = file_path.parent() else {
            return Ok(false);
        };
        let Some(entry_index) = self.mapping.iter().position(|entry| entry.path == dir) else {
            debug!(file = %file_path.display(), "Changed file is outside the configured locale paths");
            return Ok(false);
        };

        let content = read_language_file(file_path, &language)?;
        let file_namespaces: Vec<String> = content.keys().cloned().collect();

        let old_namespaces = self.mapping[entry_index].namespaces.clone();
        if let Some(resource) = self.resources.get_mut(&language) {
            for ns in &old_namespaces {
                resource.remove(ns);
            }
            resource.extend(content);
        }

        self.namespace_order.retain(|ns| !old_namespaces.contains(ns));
        self.namespace_order.extend(file_namespaces.iter().cloned());
        self.mapping[entry_index].namespaces = file_namespaces;

        debug!(file = %file_path.display(), language, "Locale cache updated from file change");
        Ok(true)
    }

    /// Replace the given namespaces of one language with freshly written
    /// content (cache refresh after a file write)
    pub fn replace_namespaces(
        &mut self,
        language: &str,
        namespaces: &[String],
        content: LanguageContent,
    ) {
        let resource = self.resources.entry(language.to_string()).or_default();
        for ns in namespaces {
            resource.remove(ns);
        }
        resource.extend(content);
    }

    /// Clone the content of the listed namespaces for one language
    pub fn content_for(&self, language: &str, namespaces: &[String]) -> LanguageContent {
        let mut out = LanguageContent::new();
        if let Some(full) = self.resources.get(language) {
            for ns in namespaces {
                if let Some(content) = full.get(ns) {
                    out.insert(ns.clone(), content.clone());
                }
            }
        }
        out
    }

    /// Full resource content of one language
    pub fn language_content(&self, language: &str) -> Option<&LanguageContent> {
        self.resources.get(language)
    }

    /// Configured language codes, primary included
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn primary_language(&self) -> &str {
        &self.primary_language
    }

    /// All known namespaces in discovery order
    pub fn namespace_order(&self) -> &[String] {
        &self.namespace_order
    }

    /// Locale paths with the namespaces each one owns
    pub fn path_entries(&self) -> &[PathNamespaces] {
        &self.mapping
    }
}

/// Read and parse one `{language}.json` resource file
pub(crate) fn read_language_file(path: &Path, language: &str) -> Result<LanguageContent, CacheError> {
    let raw = std::fs::read_to_string(path).map_err(|source| CacheError::MissingLocaleFile {
        language: language.to_string(),
        path: path.to_path_buf(),
        source,
    })?;

    let value: serde_json::Value =
        serde_json::from_str(&raw).map_err(|source| CacheError::InvalidLocaleFile {
            path: path.to_path_buf(),
            source,
        })?;
    if !value.is_object() {
        return Err(CacheError::UnexpectedShape {
            path: path.to_path_buf(),
        });
    }

    serde_json::from_value(value).map_err(|source| CacheError::InvalidLocaleFile {
        path: path.to_path_buf(),
        source,
    })
}
