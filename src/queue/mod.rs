//! Translation queue and batch dispatch
//!
//! Reported call sites land in a [`TranslationQueue`] that deduplicates by
//! (text, namespace). A translation cycle drains the queue, masks
//! interpolation tokens, siphons off words whose translation already exists
//! elsewhere in the cache, and sends the rest to the provider set once per
//! target language.
//!
//! Provider answers are matched back positionally: renditions are grouped
//! by the masked text they answer and consumed first-in-first-out, so two
//! different texts that mask to the same string still receive their own
//! answers.

use std::collections::{HashMap, HashSet, VecDeque};
use std::mem;
use std::path::Path;

use tracing::{debug, info};

use crate::cache::LocaleCache;
use crate::interpolation::InterpolationSpec;
use crate::models::{LanguageSpec, PendingWord, Rendition, ReusableTranslation, NOT_TRANSLATED};
use crate::providers::ProviderSet;

/// Words waiting for the next translation cycle
///
/// Duplicate (text, namespace) pairs collapse into one entry; the same text
/// under two namespaces stays as two entries because each namespace needs
/// its own key.
#[derive(Debug, Default)]
pub struct TranslationQueue {
    words: Vec<PendingWord>,
}

impl TranslationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a word unless an equal (text, namespace) pair is already queued
    ///
    /// Interpolation tokens are extracted here, once, so the cycle can mask
    /// and unmask without re-scanning the text. The origin file rides along
    /// on the word; a duplicate report from another file keeps the first.
    pub fn enqueue(
        &mut self,
        text: &str,
        namespace: &str,
        origin: &Path,
        interpolation: &InterpolationSpec,
    ) -> bool {
        if self
            .words
            .iter()
            .any(|word| word.dedup_key() == (text, namespace))
        {
            return false;
        }

        let interpolations = interpolation.extract(text);
        self.words.push(PendingWord::new(text, namespace, origin, interpolations));
        true
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Drain the queue for one cycle
    ///
    /// Words reported while the cycle runs accumulate in the emptied queue
    /// and are picked up by the next cycle.
    pub fn take_all(&mut self) -> Vec<PendingWord> {
        mem::take(&mut self.words)
    }
}

/// Everything one translation cycle produced
///
/// Outcomes accumulate across cycles until a merge pass consumes them, so
/// translations from a cycle that ran while the merge engine was busy are
/// not lost.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// target language code -> original text -> translated text; failed
    /// words carry the not-translated sentinel
    pub translations: HashMap<String, HashMap<String, String>>,
    /// original text -> existing translation found elsewhere in the cache
    pub reused: HashMap<String, ReusableTranslation>,
}

impl CycleOutcome {
    pub fn is_empty(&self) -> bool {
        self.translations.values().all(|map| map.is_empty()) && self.reused.is_empty()
    }

    /// Fold another cycle's outcome into this one; on equal texts the newer
    /// cycle wins
    pub fn merge(&mut self, other: CycleOutcome) {
        for (language, map) in other.translations {
            self.translations.entry(language).or_default().extend(map);
        }
        self.reused.extend(other.reused);
    }
}

/// One word prepared for the provider: original text plus its masked form
#[derive(Debug, Clone)]
struct OutboundWord {
    text: String,
    masked: String,
    tokens: Vec<String>,
}

/// Runs translation cycles against the provider set
pub struct Dispatcher {
    providers: ProviderSet,
    interpolation: InterpolationSpec,
    /// Reuse translations already present under another namespace instead
    /// of calling a provider
    prefer_existing: bool,
}

impl Dispatcher {
    pub fn new(providers: ProviderSet, interpolation: InterpolationSpec, prefer_existing: bool) -> Self {
        Self {
            providers,
            interpolation,
            prefer_existing,
        }
    }

    /// Translate one drained queue snapshot into every target language
    ///
    /// Words with a complete existing translation elsewhere in the cache are
    /// answered from the cache and never reach a provider. The rest are
    /// masked, deduplicated and sent as one batch per target language.
    pub async fn run_cycle(
        &self,
        words: Vec<PendingWord>,
        cache: &LocaleCache,
        primary: &LanguageSpec,
        targets: &[LanguageSpec],
    ) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();
        if words.is_empty() {
            return outcome;
        }

        let mut to_translate: Vec<PendingWord> = Vec::new();
        for word in words {
            if self.prefer_existing {
                if let Some(hit) = cache.find_reusable(&word.text) {
                    info!(
                        word = %word.text,
                        namespace = %hit.namespace,
                        "Reusing existing translation"
                    );
                    outcome.reused.insert(word.text.clone(), hit);
                    continue;
                }
            }
            to_translate.push(word);
        }

        if to_translate.is_empty() {
            return outcome;
        }

        // Mask once per distinct text; the same text queued under several
        // namespaces travels to the provider a single time
        let mut seen: HashSet<(String, String)> = HashSet::new();
        let mut unique: Vec<OutboundWord> = Vec::new();
        for word in &to_translate {
            let masked = self.interpolation.mask(&word.text, &word.interpolations);
            if seen.insert((word.text.clone(), masked.clone())) {
                unique.push(OutboundWord {
                    text: word.text.clone(),
                    masked,
                    tokens: word.interpolations.clone(),
                });
            }
        }

        debug!(
            provider = self.providers.kind().as_str(),
            words = unique.len(),
            reused = outcome.reused.len(),
            targets = targets.len(),
            "Dispatching translation batch"
        );

        let batch: Vec<String> = unique.iter().map(|word| word.masked.clone()).collect();
        for target in targets {
            let renditions = self
                .providers
                .translate_batch(&batch, primary.resolved_code(), target.resolved_code())
                .await;
            let resolved = resolve_renditions(&unique, &renditions, &self.interpolation);
            outcome.translations.insert(target.code.clone(), resolved);
        }

        outcome
    }
}

/// Match provider renditions back to the original texts
///
/// Renditions are grouped by the masked source text and consumed in order,
/// one per outbound word. A missing rendition and the sentinel both map the
/// word to the sentinel; everything else is unmasked.
fn resolve_renditions(
    words: &[OutboundWord],
    renditions: &[Rendition],
    interpolation: &InterpolationSpec,
) -> HashMap<String, String> {
    let mut by_source: HashMap<&str, VecDeque<&str>> = HashMap::new();
    for rendition in renditions {
        by_source
            .entry(rendition.source.as_str())
            .or_default()
            .push_back(rendition.target.as_str());
    }

    let mut resolved = HashMap::new();
    for word in words {
        let answer = by_source
            .get_mut(word.masked.as_str())
            .and_then(|queue| queue.pop_front());
        let value = match answer {
            Some(text) if text != NOT_TRANSLATED => interpolation.unmask(text, &word.tokens),
            _ => NOT_TRANSLATED.to_string(),
        };
        resolved.insert(word.text.clone(), value);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use serde_json::json;

    #[test]
    fn test_enqueue_dedups_by_text_and_namespace() {
        let spec = InterpolationSpec::default();
        let origin = Path::new("src/app.tsx");
        let mut queue = TranslationQueue::new();

        assert!(queue.enqueue("Hello", "common", origin, &spec));
        assert!(!queue.enqueue("Hello", "common", origin, &spec));
        assert!(queue.enqueue("Hello", "checkout", origin, &spec));
        assert_eq!(queue.len(), 2);

        let drained = queue.take_all();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_enqueue_keeps_first_origin_for_duplicates() {
        let spec = InterpolationSpec::default();
        let mut queue = TranslationQueue::new();

        assert!(queue.enqueue("Hello", "common", Path::new("src/a.tsx"), &spec));
        assert!(!queue.enqueue("Hello", "common", Path::new("src/b.tsx"), &spec));

        let words = queue.take_all();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].origin_file, Path::new("src/a.tsx"));
    }

    #[test]
    fn test_enqueue_extracts_tokens_once() {
        let spec = InterpolationSpec::default();
        let mut queue = TranslationQueue::new();
        queue.enqueue(
            "Hello {{name}}, bye {{name}}",
            "common",
            Path::new("src/app.tsx"),
            &spec,
        );

        let words = queue.take_all();
        assert_eq!(words[0].interpolations, vec!["{{name}}", "{{name}}"]);
    }

    #[test]
    fn test_resolve_renditions_fifo_on_colliding_masks() {
        let spec = InterpolationSpec::default();
        let words = vec![
            OutboundWord {
                text: "Hi {{a}}".into(),
                masked: "Hi @0".into(),
                tokens: vec!["{{a}}".into()],
            },
            OutboundWord {
                text: "Hi {{b}}".into(),
                masked: "Hi @0".into(),
                tokens: vec!["{{b}}".into()],
            },
        ];
        let renditions = vec![
            Rendition::new("Hi @0", "Salut @0"),
            Rendition::new("Hi @0", "Coucou @0"),
        ];

        let resolved = resolve_renditions(&words, &renditions, &spec);
        assert_eq!(resolved["Hi {{a}}"], "Salut {{a}}");
        assert_eq!(resolved["Hi {{b}}"], "Coucou {{b}}");
    }

    #[test]
    fn test_resolve_renditions_keeps_sentinel_and_fills_missing() {
        let spec = InterpolationSpec::default();
        let words = vec![
            OutboundWord {
                text: "One".into(),
                masked: "One".into(),
                tokens: vec![],
            },
            OutboundWord {
                text: "Two".into(),
                masked: "Two".into(),
                tokens: vec![],
            },
        ];
        let renditions = vec![Rendition::pending("One")];

        let resolved = resolve_renditions(&words, &renditions, &spec);
        assert_eq!(resolved["One"], NOT_TRANSLATED);
        assert_eq!(resolved["Two"], NOT_TRANSLATED);
    }

    #[test]
    fn test_outcome_merge_prefers_newer_cycle() {
        let mut first = CycleOutcome::default();
        first
            .translations
            .entry("zh".into())
            .or_default()
            .insert("Hello".into(), NOT_TRANSLATED.into());

        let mut second = CycleOutcome::default();
        second
            .translations
            .entry("zh".into())
            .or_default()
            .insert("Hello".into(), "你好".into());

        first.merge(second);
        assert_eq!(first.translations["zh"]["Hello"], "你好");
        assert!(!first.is_empty());
    }

    fn write_locale(dir: &Path, language: &str, content: serde_json::Value) {
        std::fs::write(
            dir.join(format!("{language}.json")),
            serde_json::to_string_pretty(&content).unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn test_run_cycle_answers_from_cache_without_provider() {
        let dir = tempfile::tempdir().unwrap();
        write_locale(dir.path(), "en", json!({"alpha": {"Save": "Save"}}));
        write_locale(dir.path(), "zh", json!({"alpha": {"Save": "保存"}}));

        let config = SyncConfig {
            locale_paths: vec![dir.path().to_path_buf()],
            ..SyncConfig::default()
        };
        let cache = LocaleCache::load(&config).unwrap();
        let providers = ProviderSet::from_config(&config).unwrap();
        let dispatcher = Dispatcher::new(providers, InterpolationSpec::default(), true);

        let words = vec![PendingWord::new("Save", "checkout", "src/form.tsx", vec![])];
        let primary = LanguageSpec::new("en");
        let targets = [LanguageSpec::new("zh")];

        let outcome = dispatcher.run_cycle(words, &cache, &primary, &targets).await;

        assert_eq!(outcome.reused["Save"].namespace, "alpha");
        assert_eq!(outcome.reused["Save"].values["zh"], "保存");
        assert!(outcome.translations.is_empty());
    }
}
