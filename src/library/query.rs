//! Asynchronous media queries delivered on the UI thread.
//!
//! A query runs against the engine on a blocking worker, maps the engine's
//! records to `MediaItem`s and hands the result to the caller's callback
//! through the `UiDispatcher`. The callback always runs exactly once.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
};

use {tokio::runtime::Handle, tracing::debug};

use crate::{
    dispatch::UiDispatcher,
    error::{ErrorReporter, domain::EngineError},
    library::{
        engine::IndexingEngine,
        models::{FileRecord, MediaItem},
    },
};

/// Media lists the façade can fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaQuery {
    /// Every indexed audio file.
    AudioFiles,
    /// Every indexed video file.
    VideoFiles,
}

impl MediaQuery {
    /// Runs the query against `engine`.
    ///
    /// # Errors
    ///
    /// Propagates the engine's `EngineError`.
    pub fn fetch(self, engine: &dyn IndexingEngine) -> Result<Vec<FileRecord>, EngineError> {
        match self {
            MediaQuery::AudioFiles => engine.audio_files(),
            MediaQuery::VideoFiles => engine.video_files(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            MediaQuery::AudioFiles => "audio files",
            MediaQuery::VideoFiles => "video files",
        }
    }
}

/// Maps engine records to media items, keeping their order.
///
/// Records that cannot be mapped are skipped.
#[must_use]
pub fn materialize(records: &[FileRecord]) -> Vec<MediaItem> {
    records
        .iter()
        .filter_map(|record| match MediaItem::try_from(record) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!("Skipping record {}: {}", record.id, e);
                None
            }
        })
        .collect()
}

/// State of one in-flight query, owned by the worker and then the UI task.
pub struct QueryContext<F> {
    /// Engine answering the query.
    engine: Arc<dyn IndexingEngine>,
    /// Where the callback is delivered.
    dispatcher: UiDispatcher,
    /// Which list to fetch.
    query: MediaQuery,
    /// Caller's completion callback.
    callback: F,
    /// Result slot filled by `run`.
    items: Vec<MediaItem>,
}

impl<F> QueryContext<F>
where
    F: FnOnce(Vec<MediaItem>) + Send + 'static,
{
    /// Creates a context with an empty result slot.
    pub fn new(
        engine: Arc<dyn IndexingEngine>,
        dispatcher: UiDispatcher,
        query: MediaQuery,
        callback: F,
    ) -> Self {
        Self {
            engine,
            dispatcher,
            query,
            callback,
            items: Vec::new(),
        }
    }

    /// Queries the engine and schedules delivery on the UI thread.
    ///
    /// Blocks on the engine; call it from a worker thread. A failed or
    /// panicking query delivers an empty list.
    pub fn run(mut self) {
        let engine = self.engine.as_ref();
        let query = self.query;
        let fetched = catch_unwind(AssertUnwindSafe(|| query.fetch(engine))).unwrap_or_else(|_| {
            Err(EngineError::Query {
                reason: "engine panicked".to_string(),
            })
        });

        match fetched {
            Ok(records) => {
                self.items = materialize(&records);
                debug!(
                    "Fetched {} {} ({} records)",
                    self.items.len(),
                    self.query.label(),
                    records.len()
                );
            }
            Err(e) => ErrorReporter::warn(&e, &format!("Failed to fetch {}", self.query.label())),
        }

        let dispatcher = self.dispatcher.clone();
        dispatcher.dispatch(move || self.deliver());
    }

    /// Hands the result to the callback. Runs on the UI thread.
    fn deliver(self) {
        (self.callback)(self.items);
    }
}

/// Starts `query` on a blocking worker of `runtime`.
pub(crate) fn spawn_query<F>(
    runtime: &Handle,
    engine: Arc<dyn IndexingEngine>,
    dispatcher: UiDispatcher,
    query: MediaQuery,
    callback: F,
) where
    F: FnOnce(Vec<MediaItem>) + Send + 'static,
{
    let context = QueryContext::new(engine, dispatcher, query, callback);
    // Detached: the callback is the only completion signal.
    drop(runtime.spawn_blocking(move || context.run()));
}
