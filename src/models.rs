// Core data structures shared across the synchronization engine

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

/// Sentinel value written for keys whose translation has not arrived yet.
///
/// The sentinel is visible in locale files between a failed (or pending)
/// translation and the cycle that eventually fills the real value in. A key
/// whose value equals the sentinel counts as present but not translated.
pub const NOT_TRANSLATED: &str = "__NOT_TRANSLATED__";

/// Key-value pairs of a single namespace: translation key to leaf string.
///
/// BTreeMap keeps keys sorted, so serialized namespaces come out in
/// lexicographic order without a separate sort step.
pub type NamespaceContent = BTreeMap<String, String>;

/// Full resource content of one language: namespace to its key-value pairs.
pub type LanguageContent = BTreeMap<String, NamespaceContent>;

/// One language participating in synchronization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LanguageSpec {
    /// Language code used for file names and cache keys (e.g. "en", "zh")
    pub code: String,
    /// Provider-specific override sent to translation APIs instead of `code`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_code: Option<String>,
}

impl LanguageSpec {
    /// Create a language with no provider-specific code
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            provider_code: None,
        }
    }

    /// Create a language with a provider-specific code override
    pub fn with_provider_code(code: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            provider_code: Some(provider.into()),
        }
    }

    /// Code to hand to a translation provider: the override if set, else `code`
    pub fn resolved_code(&self) -> &str {
        self.provider_code.as_deref().unwrap_or(&self.code)
    }
}

/// A call site reported by the extractor during compilation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractedCall {
    /// A translatable call carrying the primary-language text and an
    /// optional namespace (engine falls back to the default namespace)
    Translate {
        text: String,
        namespace: Option<String>,
    },
    /// A recognized call that is already in its final form; registers the
    /// origin file for watching but queues nothing
    PassThrough,
}

/// A (text, namespace) pair referenced somewhere in the scanned sources
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyReference {
    pub text: String,
    pub namespace: Option<String>,
}

impl KeyReference {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            namespace: None,
        }
    }

    pub fn with_namespace(text: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            namespace: Some(namespace.into()),
        }
    }
}

/// A word waiting in the translation queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWord {
    /// Primary-language text exactly as written at the call site
    pub text: String,
    /// Namespace the key belongs to (already resolved, never empty)
    pub namespace: String,
    /// Source file whose compilation reported the word; bookkeeping only,
    /// never part of the queue identity
    pub origin_file: PathBuf,
    /// Interpolation tokens found in `text`, in order of appearance,
    /// delimiters included
    pub interpolations: Vec<String>,
}

impl PendingWord {
    pub fn new(
        text: impl Into<String>,
        namespace: impl Into<String>,
        origin_file: impl Into<PathBuf>,
        interpolations: Vec<String>,
    ) -> Self {
        Self {
            text: text.into(),
            namespace: namespace.into(),
            origin_file: origin_file.into(),
            interpolations,
        }
    }

    /// Queue identity: two words are duplicates when text and namespace match
    pub fn dedup_key(&self) -> (&str, &str) {
        (&self.text, &self.namespace)
    }
}

/// One provider answer: source text in, translated text out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendition {
    /// The (masked) text that was sent to the provider
    pub source: String,
    /// The provider's answer, or the sentinel when the word failed
    pub target: String,
}

impl Rendition {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }

    /// Failure marker for a single word: keeps batch positions intact
    pub fn pending(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: NOT_TRANSLATED.to_string(),
        }
    }

    /// True when the target is the not-translated sentinel
    pub fn is_pending(&self) -> bool {
        self.target == NOT_TRANSLATED
    }
}

/// A fully translated word found elsewhere in the cache, reusable without
/// calling a provider
#[derive(Debug, Clone)]
pub struct ReusableTranslation {
    /// Namespace that already holds the word (first match in discovery order)
    pub namespace: String,
    /// Existing value per language code, complete across all languages
    pub values: HashMap<String, String>,
}
