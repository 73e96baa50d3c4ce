//! Synchronization engine
//!
//! [`SyncEngine`] is the synchronization context: it owns the locale cache,
//! the translation queue, the dispatcher, the reconciler, the status flags
//! and the task scheduler, and exposes the operations an embedding
//! compiler or file watcher calls into.
//!
//! Control flow: the extractor reports call sites through
//! [`SyncEngine::report_call`]; misses are queued and the translate task is
//! armed. The coordinator loop ([`SyncEngine::start`]) consumes fired tasks
//! and runs translation cycles and merge passes. A merge pass that fires
//! while a cycle or compilation burst is active defers itself instead of
//! running concurrently with them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::cache::LocaleCache;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::events::{TaskKind, TaskScheduler};
use crate::interpolation::InterpolationSpec;
use crate::merge::{MergeReport, Reconciler};
use crate::models::{ExtractedCall, KeyReference, LanguageSpec};
use crate::providers::ProviderSet;
use crate::queue::{CycleOutcome, Dispatcher, TranslationQueue};

/// Lookup failures surfaced in strict mode
///
/// In normal mode these conditions queue the word instead of failing.
#[derive(Error, Debug)]
pub enum MissingTranslationError {
    /// The call site references a namespace absent from every locale file
    #[error("Namespace {namespace:?} does not exist in the locale files")]
    NamespaceNotFound { namespace: String },

    /// No language holds a value for the text
    #[error("No translation found for {text:?} in namespace {namespace:?}")]
    KeyNotFound { text: String, namespace: String },

    /// The text is known but some language still holds the sentinel
    #[error("Translation for {text:?} in namespace {namespace:?} is still pending")]
    StillPending { text: String, namespace: String },
}

/// Cooperative re-entrancy flags shared across the engine's tasks
///
/// These are advisory flags, not locks: every mutation happens inside the
/// engine's own async operations and the flags only sequence them.
#[derive(Debug, Default)]
pub struct StatusFlags {
    initialized: AtomicBool,
    translating: AtomicBool,
    compiling: AtomicBool,
    rescan_chain: AtomicBool,
}

impl StatusFlags {
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    fn set_initialized(&self) {
        self.initialized.store(true, Ordering::SeqCst);
    }

    pub fn is_translating(&self) -> bool {
        self.translating.load(Ordering::SeqCst)
    }

    /// True when this caller acquired the cycle lock
    fn begin_translating(&self) -> bool {
        !self.translating.swap(true, Ordering::SeqCst)
    }

    fn end_translating(&self) {
        self.translating.store(false, Ordering::SeqCst);
    }

    pub fn is_compiling(&self) -> bool {
        self.compiling.load(Ordering::SeqCst)
    }

    fn set_compiling(&self, active: bool) {
        self.compiling.store(active, Ordering::SeqCst);
    }

    /// True when this caller started the retry chain; false while another
    /// chain is already armed
    fn begin_rescan_chain(&self) -> bool {
        !self.rescan_chain.swap(true, Ordering::SeqCst)
    }

    fn end_rescan_chain(&self) {
        self.rescan_chain.store(false, Ordering::SeqCst);
    }
}

/// Source-scanning collaborator
///
/// The engine never parses source syntax itself. The embedding compiler
/// reports individual call sites through [`SyncEngine::report_call`] and
/// supplies the full reference set on demand through this trait.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Derive every (text, namespace) reference in the current source tree
    async fn scan_references(&self) -> anyhow::Result<Vec<KeyReference>>;
}

/// Extractor over a fixed reference list
///
/// Serves the CLI fill command and tests; the reference set can be swapped
/// at runtime to simulate source edits.
#[derive(Default)]
pub struct StaticExtractor {
    references: RwLock<Vec<KeyReference>>,
}

impl StaticExtractor {
    pub fn new(references: Vec<KeyReference>) -> Self {
        Self {
            references: RwLock::new(references),
        }
    }

    /// Replace the whole reference set
    pub async fn set_references(&self, references: Vec<KeyReference>) {
        *self.references.write().await = references;
    }

    pub async fn push(&self, reference: KeyReference) {
        self.references.write().await.push(reference);
    }
}

#[async_trait]
impl Extractor for StaticExtractor {
    async fn scan_references(&self) -> anyhow::Result<Vec<KeyReference>> {
        Ok(self.references.read().await.clone())
    }
}

/// The locale synchronization engine
pub struct SyncEngine {
    config: Arc<SyncConfig>,
    interpolation: InterpolationSpec,
    cache: RwLock<LocaleCache>,
    queue: Mutex<TranslationQueue>,
    /// Translations and reuse hits accumulated since the last merge pass
    pending: Mutex<CycleOutcome>,
    dispatcher: Dispatcher,
    reconciler: Reconciler,
    scheduler: TaskScheduler,
    /// Taken by the first `start` call
    receiver: Mutex<Option<mpsc::UnboundedReceiver<TaskKind>>>,
    flags: StatusFlags,
    extractor: Arc<dyn Extractor>,
    watched: Mutex<BTreeSet<PathBuf>>,
}

impl SyncEngine {
    /// Build an engine from a validated configuration
    ///
    /// # Errors
    ///
    /// Configuration validation failures, unreadable locale files and
    /// provider client construction failures.
    pub fn new(config: SyncConfig, extractor: Arc<dyn Extractor>) -> Result<Self> {
        let providers = ProviderSet::from_config(&config)?;
        Self::with_providers(config, extractor, providers)
    }

    /// Build an engine around a preconfigured provider set
    ///
    /// Lets callers point providers at custom base URLs (mock servers).
    pub fn with_providers(
        config: SyncConfig,
        extractor: Arc<dyn Extractor>,
        providers: ProviderSet,
    ) -> Result<Self> {
        config.validate()?;
        let cache = LocaleCache::load(&config)?;
        info!(
            languages = cache.languages().len(),
            namespaces = cache.namespace_order().len(),
            provider = config.translate_api.provider.as_str(),
            strict = config.strict,
            "Synchronization engine initialized"
        );

        let config = Arc::new(config);
        let interpolation = InterpolationSpec::from_config(&config.interpolation);
        let dispatcher = Dispatcher::new(
            providers,
            interpolation.clone(),
            config.prefer_existing_translation,
        );
        let reconciler = Reconciler::new(Arc::clone(&config));
        let (scheduler, receiver) = TaskScheduler::new();

        let flags = StatusFlags::default();
        flags.set_initialized();

        Ok(Self {
            config,
            interpolation,
            cache: RwLock::new(cache),
            queue: Mutex::new(TranslationQueue::new()),
            pending: Mutex::new(CycleOutcome::default()),
            dispatcher,
            reconciler,
            scheduler,
            receiver: Mutex::new(Some(receiver)),
            flags,
            extractor,
            watched: Mutex::new(BTreeSet::new()),
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn flags(&self) -> &StatusFlags {
        &self.flags
    }

    /// Words waiting for the next translation cycle
    pub async fn queue_len(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Clone of the current cache state
    pub async fn cache_snapshot(&self) -> LocaleCache {
        self.cache.read().await.clone()
    }

    /// Files the embedding layer should watch for changes
    pub async fn watched_files(&self) -> Vec<PathBuf> {
        self.watched.lock().await.iter().cloned().collect()
    }

    /// Handle one call site reported by the extractor during compilation
    ///
    /// Returns `Ok(true)` when nothing is left to do for the call (already
    /// fully translated, or a pass-through call) and `Ok(false)` when the
    /// word was queued or dropped as empty. Either way the origin file
    /// joins the watch set and the compilation window is (re)opened.
    ///
    /// # Errors
    ///
    /// In strict mode a miss, an unknown namespace or a pending sentinel
    /// fails with [`MissingTranslationError`] instead of queueing.
    pub async fn report_call(&self, call: ExtractedCall, origin: &Path) -> Result<bool> {
        self.watch_file(origin).await;
        self.open_compile_window().await;

        let ExtractedCall::Translate { text, namespace } = call else {
            return Ok(true);
        };
        if text.is_empty() {
            debug!(file = %origin.display(), "Empty text reported, ignored");
            return Ok(false);
        }

        if matches!(namespace.as_deref(), Some("")) {
            warn!(text = %text, "Empty namespace, falling back to the default");
        }
        let namespace = self.config.resolve_namespace(namespace.as_deref()).to_string();

        let (status, namespace_known) = {
            let cache = self.cache.read().await;
            (
                cache.word_status(&text, &namespace),
                cache.namespace_exists(&namespace),
            )
        };
        if status.matched && !status.pending {
            return Ok(true);
        }

        if self.config.strict {
            let err = if !namespace_known {
                MissingTranslationError::NamespaceNotFound { namespace }
            } else if status.pending {
                MissingTranslationError::StillPending { text, namespace }
            } else {
                MissingTranslationError::KeyNotFound { text, namespace }
            };
            return Err(err.into());
        }

        if !namespace_known {
            // Must exist before the word enters the queue
            let mut cache = self.cache.write().await;
            self.reconciler.create_namespace(&namespace, &mut cache);
        }

        let queued = self
            .queue
            .lock()
            .await
            .enqueue(&text, &namespace, origin, &self.interpolation);
        if queued {
            debug!(text = %text, namespace = %namespace, "Word queued for translation");
            self.scheduler
                .reschedule(TaskKind::Translate, self.config.debounce.translate_window())
                .await;
        }
        Ok(false)
    }

    /// A watched source file changed; references are re-derived on the
    /// next merge pass
    pub async fn handle_source_change(&self, path: &Path) {
        if !self.watched.lock().await.contains(path) {
            return;
        }
        debug!(file = %path.display(), "Source file changed");
        self.schedule_rescan().await;
    }

    /// A watched source file disappeared; its references are pruned on the
    /// next merge pass
    pub async fn handle_source_removed(&self, path: &Path) {
        if self.watched.lock().await.remove(path) {
            debug!(file = %path.display(), "Source file removed from watch set");
            self.schedule_rescan().await;
        }
    }

    /// A locale resource file was edited outside the engine
    ///
    /// Unparseable or foreign files are logged and skipped; a successful
    /// update schedules a merge pass.
    pub async fn handle_locale_change(&self, path: &Path) {
        let applied = {
            let mut cache = self.cache.write().await;
            cache.apply_file_update(path)
        };
        match applied {
            Ok(true) => self.schedule_rescan().await,
            Ok(false) => {}
            Err(err) => {
                warn!(file = %path.display(), error = %err, "Locale file change not applied");
            }
        }
    }

    /// Drain the queue and translate it into every non-primary language
    ///
    /// No-op while another cycle runs; words enqueued meanwhile stay in the
    /// fresh queue for the next cycle.
    pub async fn run_translation_cycle(&self) {
        if !self.flags.is_initialized() {
            return;
        }
        if !self.flags.begin_translating() {
            debug!("Translation cycle already running");
            return;
        }

        let words = self.queue.lock().await.take_all();
        if words.is_empty() {
            self.flags.end_translating();
            return;
        }
        let Some(primary) = self.config.primary().cloned() else {
            self.flags.end_translating();
            return;
        };
        let targets: Vec<LanguageSpec> = self.config.secondary_languages().cloned().collect();

        info!(words = words.len(), targets = targets.len(), "Translation cycle started");
        let snapshot = self.cache.read().await.clone();
        let outcome = self
            .dispatcher
            .run_cycle(words, &snapshot, &primary, &targets)
            .await;

        let produced = !outcome.is_empty();
        self.pending.lock().await.merge(outcome);
        self.flags.end_translating();

        if produced {
            self.schedule_rescan().await;
        }
        if !self.queue.lock().await.is_empty() {
            // Words arrived mid-cycle; start the next one
            self.scheduler
                .reschedule(TaskKind::Translate, self.config.debounce.translate_window())
                .await;
        }
    }

    /// Run one merge pass: scan references, reconcile, write changed files
    ///
    /// Defers itself while a translation cycle or compilation burst is
    /// active; at most one retry chain is armed at a time.
    pub async fn run_merge_pass(&self) -> MergeReport {
        if !self.flags.is_initialized() {
            return MergeReport::default();
        }
        if self.flags.is_translating() || self.flags.is_compiling() {
            if self.flags.begin_rescan_chain() {
                debug!("Engine busy, merge pass deferred");
                self.scheduler
                    .reschedule(TaskKind::Rescan, self.config.debounce.rescan_retry())
                    .await;
            }
            return MergeReport::default();
        }

        let references = match self.extractor.scan_references().await {
            Ok(references) => references,
            Err(err) => {
                error!(error = %err, "Source scan failed, merge pass skipped");
                return MergeReport::default();
            }
        };

        let outcome = std::mem::take(&mut *self.pending.lock().await);
        let mut cache = self.cache.write().await;
        self.reconciler.run(&references, &outcome, &mut cache)
    }

    /// Close the compilation burst window immediately
    ///
    /// The coordinator normally closes it when the quiet-period timer
    /// fires; one-shot drivers close it by hand before a merge pass.
    pub async fn close_compile_window(&self) {
        self.scheduler.cancel(TaskKind::CompileWindow).await;
        self.flags.set_compiling(false);
    }

    /// Run the coordinator loop, consuming deferred task signals
    ///
    /// Runs until the engine is dropped; embedders usually `select!` this
    /// against their shutdown signal.
    ///
    /// # Errors
    ///
    /// A second concurrent `start` call fails; the loop may only run once.
    pub async fn start(&self) -> Result<()> {
        let mut receiver = self
            .receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| crate::error::Error::other("Coordinator loop already started"))?;

        info!("Coordinator loop started");
        while let Some(task) = receiver.recv().await {
            match task {
                TaskKind::Translate => self.run_translation_cycle().await,
                TaskKind::Rescan => {
                    self.flags.end_rescan_chain();
                    self.run_merge_pass().await;
                }
                TaskKind::CompileWindow => {
                    self.flags.set_compiling(false);
                    debug!("Compilation window closed");
                }
            }
        }
        Ok(())
    }

    /// Mark extraction activity and restart the quiet-period timer
    async fn open_compile_window(&self) {
        self.flags.set_compiling(true);
        self.scheduler
            .reschedule(TaskKind::CompileWindow, self.config.debounce.compile_quiet_window())
            .await;
    }

    async fn watch_file(&self, path: &Path) {
        self.watched.lock().await.insert(path.to_path_buf());
    }

    async fn schedule_rescan(&self) {
        self.scheduler
            .reschedule(TaskKind::Rescan, self.config.debounce.rescan_window())
            .await;
    }
}
