//! Media library core shared between the indexing engine and the UI.
//!
//! `MediaLibrary` receives engine events on arbitrary threads, coalesces
//! file additions into "library changed" notifications, routes single-item
//! updates, and answers media queries asynchronously. Every observer and
//! query callback runs on the UI thread through the `UiDispatcher`.

use std::{
    path::Path,
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, Ordering},
    },
};

use {
    parking_lot::Mutex,
    tokio::runtime::Handle,
    tracing::{debug, info, warn},
};

use crate::{
    config::storage::StorageLayout,
    dispatch::UiDispatcher,
    error::{
        ErrorReporter,
        domain::{EngineError, LibraryError},
    },
    library::{
        coalescer::{ChangeCoalescer, Flush},
        config::LibraryConfig,
        engine::{EngineCallbacks, IndexingEngine, TracingLogger},
        models::{FileRecord, MediaItem},
        query::{MediaQuery, spawn_query},
        registry::{ChangeObserver, ItemUpdatedObserver, ListenerRegistry, dispatch_item_updated},
    },
};

/// State guarded by the library's single lock.
#[derive(Default)]
struct CoreState {
    /// Discovery and change bookkeeping.
    coalescer: ChangeCoalescer,
    /// Registered observers.
    registry: ListenerRegistry,
}

/// Thread-safe media library.
///
/// Construct it with `MediaLibrary::new`, then call `start` once to open the
/// engine storage. Share it as `Arc<MediaLibrary>`.
pub struct MediaLibrary {
    /// Indexing engine.
    engine: Arc<dyn IndexingEngine>,
    /// Route to the UI thread.
    dispatcher: UiDispatcher,
    /// Runtime providing query workers.
    runtime: Handle,
    /// Coalescer and observers, one lock domain.
    state: Mutex<CoreState>,
    /// Set once `start` succeeded.
    started: AtomicBool,
}

impl MediaLibrary {
    /// Creates a media library around the engine built by `factory`.
    ///
    /// # Arguments
    ///
    /// * `factory` - Builds the indexing engine.
    /// * `dispatcher` - Delivers callbacks to the UI thread.
    /// * `runtime` - Runtime whose blocking pool runs queries.
    /// * `config` - Optional configuration, defaults apply when `None`.
    ///
    /// # Returns
    ///
    /// A new `MediaLibrary` that is not started yet.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::EngineCreation` if the factory fails.
    pub fn new<F>(
        factory: F,
        dispatcher: UiDispatcher,
        runtime: Handle,
        config: Option<LibraryConfig>,
    ) -> Result<Arc<Self>, LibraryError>
    where
        F: FnOnce() -> Result<Arc<dyn IndexingEngine>, EngineError>,
    {
        let config = config.unwrap_or_default();
        let engine = factory().map_err(|e| {
            let error = LibraryError::EngineCreation(e);
            ErrorReporter::error(&error, "Creating media library");
            error
        })?;

        debug!(
            "Media library created with change threshold {}",
            config.change_threshold
        );

        Ok(Arc::new(Self {
            engine,
            dispatcher,
            runtime,
            state: Mutex::new(CoreState {
                coalescer: ChangeCoalescer::new(config.change_threshold),
                registry: ListenerRegistry::new(),
            }),
            started: AtomicBool::new(false),
        }))
    }

    /// Prepares storage under `data_dir` and initializes the engine.
    ///
    /// Creates `<data_dir>` and `<data_dir>/snapshots` owner-only, hands the
    /// engine a `TracingLogger`, and opens `<data_dir>/medialib.db`.
    ///
    /// # Arguments
    ///
    /// * `data_dir` - Application data directory, `None` if unknown.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError` if the data directory is unknown, cannot be
    /// created, or the engine fails to initialize. The library stays
    /// unstarted in that case.
    pub fn start(self: &Arc<Self>, data_dir: Option<&Path>) -> Result<(), LibraryError> {
        if self.is_started() {
            warn!("Media library already started, ignoring start request");
            return Ok(());
        }

        let result = self.open_storage(data_dir);
        match &result {
            Ok(()) => {
                self.started.store(true, Ordering::Release);
                info!("Media library started");
            }
            Err(e) => ErrorReporter::error(e, "Starting media library"),
        }
        result
    }

    fn open_storage(self: &Arc<Self>, data_dir: Option<&Path>) -> Result<(), LibraryError> {
        let data_dir = data_dir.ok_or(LibraryError::MissingDataDirectory)?;
        let layout = StorageLayout::new(data_dir);
        layout.prepare()?;

        self.engine.set_logger(Arc::new(TracingLogger));

        let callbacks: Weak<dyn EngineCallbacks> = Arc::<Self>::downgrade(self);
        self.engine
            .initialize(&layout.database_path, &layout.snapshot_dir, callbacks)
            .map_err(LibraryError::EngineInitialization)
    }

    /// Reports whether `start` succeeded.
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Asks the engine to discover `entry_point`.
    ///
    /// Ignored with a warning until the library is started. Engine failures
    /// are logged, never returned.
    pub fn discover(&self, entry_point: &Path) {
        if !self.is_started() {
            warn!("Media library not started, ignoring discovery of {:?}", entry_point);
            return;
        }

        info!("Discovering {:?}", entry_point);
        if let Err(e) = self.engine.discover(entry_point) {
            ErrorReporter::warn(&e, &format!("Discovering {:?}", entry_point));
        }
    }

    /// Asks the engine to re-discover every known entry point.
    pub fn reload(&self) {
        if !self.is_started() {
            warn!("Media library not started, ignoring reload");
            return;
        }

        info!("Reloading media library");
        if let Err(e) = self.engine.reload() {
            ErrorReporter::warn(&e, "Reloading media library");
        }
    }

    /// Reports whether any discovery is in progress.
    pub fn is_discovering(&self) -> bool {
        self.state.lock().coalescer.active_discoveries() > 0
    }

    /// Dispatcher delivering this library's callbacks.
    pub fn dispatcher(&self) -> &UiDispatcher {
        &self.dispatcher
    }

    /// Registers a library-changed observer.
    pub fn register_on_change(&self, observer: Arc<dyn ChangeObserver>) {
        self.state.lock().registry.register_on_change(observer);
    }

    /// Removes the first registration of `observer`; no-op when absent.
    pub fn unregister_on_change(&self, observer: &Arc<dyn ChangeObserver>) {
        if !self.state.lock().registry.unregister_on_change(observer) {
            debug!("Change observer was not registered");
        }
    }

    /// Registers an item-updated observer.
    pub fn register_on_item_updated(&self, observer: Arc<dyn ItemUpdatedObserver>) {
        self.state.lock().registry.register_on_item_updated(observer);
    }

    /// Removes the first registration of `observer`; no-op when absent.
    pub fn unregister_on_item_updated(&self, observer: &Arc<dyn ItemUpdatedObserver>) {
        if !self.state.lock().registry.unregister_on_item_updated(observer) {
            debug!("Item-updated observer was not registered");
        }
    }

    /// Number of library-changed and item-updated registrations.
    pub fn observer_counts(&self) -> (usize, usize) {
        let state = self.state.lock();
        (
            state.registry.change_observer_count(),
            state.registry.item_observer_count(),
        )
    }

    /// Fetches every audio file and passes it to `callback` on the UI thread.
    ///
    /// Returns immediately. The callback runs exactly once; a failed query
    /// yields an empty list.
    pub fn get_audio_files<F>(&self, callback: F)
    where
        F: FnOnce(Vec<MediaItem>) + Send + 'static,
    {
        self.query(MediaQuery::AudioFiles, callback);
    }

    /// Fetches every video file and passes it to `callback` on the UI thread.
    ///
    /// Same delivery contract as `get_audio_files`.
    pub fn get_video_files<F>(&self, callback: F)
    where
        F: FnOnce(Vec<MediaItem>) + Send + 'static,
    {
        self.query(MediaQuery::VideoFiles, callback);
    }

    fn query<F>(&self, query: MediaQuery, callback: F)
    where
        F: FnOnce(Vec<MediaItem>) + Send + 'static,
    {
        spawn_query(
            &self.runtime,
            self.engine.clone(),
            self.dispatcher.clone(),
            query,
            callback,
        );
    }

    /// Routes an updated item to the first item-updated observer that takes it.
    ///
    /// The observers are captured now; dispatch happens on the UI thread.
    pub fn notify_item_updated(&self, item: MediaItem) {
        let observers = self.state.lock().registry.item_observers();
        if observers.is_empty() {
            return;
        }

        self.dispatcher.dispatch(move || {
            if dispatch_item_updated(&observers, &item).is_none() {
                debug!("No observer handled update of item {}", item.id);
            }
        });
    }

    /// Sends one library-changed notification to every change observer.
    fn notify_library_changed(&self, observers: Vec<Arc<dyn ChangeObserver>>, reason: Flush) {
        info!(
            "Library changed ({:?}), notifying {} observers",
            reason,
            observers.len()
        );
        for observer in observers {
            self.dispatcher.dispatch(move || observer.on_library_changed());
        }
    }
}

impl EngineCallbacks for MediaLibrary {
    fn on_file_added(&self, file: &FileRecord) {
        debug!("File added: {:?}", file.path);
        let flush = {
            let mut state = self.state.lock();
            state
                .coalescer
                .file_added()
                .map(|flush| (flush, state.registry.change_observers()))
        };

        if let Some((reason, observers)) = flush {
            self.notify_library_changed(observers, reason);
        }
    }

    fn on_file_updated(&self, file: &FileRecord) {
        debug!("File updated: {:?}", file.path);
        match MediaItem::try_from(file) {
            Ok(item) => self.notify_item_updated(item),
            Err(e) => ErrorReporter::debug(&e, "Mapping updated file"),
        }
    }

    fn on_discovery_started(&self, entry_point: &Path) {
        info!("Discovery started: {:?}", entry_point);
        self.state.lock().coalescer.discovery_started();
    }

    fn on_discovery_completed(&self, entry_point: &Path) {
        info!("Discovery completed: {:?}", entry_point);
        let (idle, flush) = {
            let mut state = self.state.lock();
            let flush = state
                .coalescer
                .discovery_completed()
                .map(|flush| (flush, state.registry.change_observers()));
            (state.coalescer.active_discoveries() == 0, flush)
        };

        if idle {
            info!("Completed all active discovery operations");
        }
        if let Some((reason, observers)) = flush {
            self.notify_library_changed(observers, reason);
        }
    }
}
