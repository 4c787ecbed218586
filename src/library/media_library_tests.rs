//! Scenario tests for the media library core.
//!
//! Engine events are fed straight into `MediaLibrary`'s `EngineCallbacks`
//! implementation and the UI loop is pumped on the test thread.

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
        time::Duration,
    };

    use {
        parking_lot::Mutex,
        tempfile::tempdir,
        tokio::runtime::Runtime,
    };

    use crate::{
        dispatch::{LoopExit, UiLoop, ui_channel},
        error::domain::{EngineError, LibraryError},
        library::{
            LibraryConfig, MediaLibrary,
            engine::{
                EngineCallbacks, IndexingEngine,
                mock::{MockEngine, record},
            },
            models::{FileKind, MediaItem},
            registry::{ChangeObserver, ItemUpdatedObserver},
        },
    };

    // Generous budget for worker round trips
    const TEST_TIMEOUT: Duration = Duration::from_secs(5);

    struct Harness {
        // Keeps the query workers alive for the test's duration
        _runtime: Runtime,
        engine: Arc<MockEngine>,
        library: Arc<MediaLibrary>,
        ui_loop: UiLoop,
    }

    fn harness_with(engine: Arc<MockEngine>, config: Option<LibraryConfig>) -> Harness {
        let runtime = Runtime::new().unwrap();
        let (dispatcher, ui_loop) = ui_channel();
        let factory_engine = engine.clone();
        let library = MediaLibrary::new(
            move || Ok(factory_engine as Arc<dyn IndexingEngine>),
            dispatcher,
            runtime.handle().clone(),
            config,
        )
        .unwrap();

        Harness {
            _runtime: runtime,
            engine,
            library,
            ui_loop,
        }
    }

    fn harness() -> Harness {
        harness_with(MockEngine::new(), None)
    }

    fn counting_observer(library: &MediaLibrary) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let observed = count.clone();
        library.register_on_change(Arc::new(move || {
            observed.fetch_add(1, Ordering::SeqCst);
        }));
        count
    }

    fn add_files(library: &MediaLibrary, count: usize) {
        for i in 0..count {
            library.on_file_added(&record(
                i64::try_from(i).unwrap(),
                &format!("/music/track_{i}.flac"),
                FileKind::Audio,
            ));
        }
    }

    #[test]
    fn test_threshold_fires_once_for_49_plus_1() {
        let h = harness();
        let notifications = counting_observer(&h.library);
        let root = Path::new("/music");

        h.library.on_discovery_started(root);
        add_files(&h.library, 49);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 0);

        add_files(&h.library, 1);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 1);

        h.library.on_discovery_completed(root);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_completion_flushes_remainder() {
        let h = harness();
        let notifications = counting_observer(&h.library);
        let root = Path::new("/music");

        h.library.on_discovery_started(root);
        add_files(&h.library, 10);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 0);

        h.library.on_discovery_completed(root);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert!(!h.library.is_discovering());
    }

    #[test]
    fn test_overlapping_discoveries_flush_after_last() {
        let h = harness();
        let notifications = counting_observer(&h.library);
        let root = Path::new("/music");

        for _ in 0..3 {
            h.library.on_discovery_started(root);
        }
        add_files(&h.library, 5);

        h.library.on_discovery_completed(root);
        h.library.on_discovery_completed(root);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 0);
        assert!(h.library.is_discovering());

        h.library.on_discovery_completed(root);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 1);
        assert!(!h.library.is_discovering());
    }

    #[test]
    fn test_completion_without_pending_changes_is_silent() {
        let h = harness();
        let notifications = counting_observer(&h.library);
        let root = Path::new("/music");

        h.library.on_discovery_started(root);
        h.library.on_discovery_completed(root);
        h.library.on_discovery_completed(root);
        h.ui_loop.run_pending();

        assert_eq!(notifications.load(Ordering::SeqCst), 0);
        assert!(!h.library.is_discovering());
    }

    #[test]
    fn test_configured_threshold() {
        let h = harness_with(
            MockEngine::new(),
            Some(LibraryConfig {
                change_threshold: 3,
            }),
        );
        let notifications = counting_observer(&h.library);

        add_files(&h.library, 7);
        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_adds_are_counted_exactly() {
        let h = harness();
        let notifications = counting_observer(&h.library);

        let workers: Vec<_> = (0..4)
            .map(|_| {
                let library = h.library.clone();
                thread::spawn(move || add_files(&library, 50))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        h.ui_loop.run_pending();
        assert_eq!(notifications.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_notifications_run_on_ui_thread() {
        let h = harness();
        let on_ui_thread = Arc::new(Mutex::new(Vec::new()));
        {
            let on_ui_thread = on_ui_thread.clone();
            let dispatcher = h.library.dispatcher().clone();
            h.library.register_on_change(Arc::new(move || {
                on_ui_thread.lock().push(dispatcher.is_ui_thread());
                dispatcher.quit();
            }));
        }

        let library = h.library.clone();
        thread::spawn(move || {
            library.on_discovery_started(Path::new("/music"));
            add_files(&library, 2);
            library.on_discovery_completed(Path::new("/music"));
        });

        assert_eq!(h.ui_loop.run_for(TEST_TIMEOUT), LoopExit::Quit);
        assert_eq!(*on_ui_thread.lock(), vec![true]);
    }

    #[test]
    fn test_duplicate_registration_removed_one_at_a_time() {
        let h = harness();
        let count = Arc::new(AtomicUsize::new(0));
        let observer: Arc<dyn ChangeObserver> = {
            let count = count.clone();
            Arc::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        h.library.register_on_change(observer.clone());
        h.library.register_on_change(observer.clone());
        h.library.unregister_on_change(&observer);
        assert_eq!(h.library.observer_counts(), (1, 0));

        add_files(&h.library, 50);
        h.ui_loop.run_pending();
        assert_eq!(count.load(Ordering::SeqCst), 1);

        let stranger: Arc<dyn ChangeObserver> = Arc::new(|| {});
        h.library.unregister_on_change(&stranger);
        assert_eq!(h.library.observer_counts(), (1, 0));
    }

    #[test]
    fn test_observer_may_register_during_notification() {
        let h = harness();
        let late = Arc::new(AtomicUsize::new(0));
        {
            let library = Arc::downgrade(&h.library);
            let late = late.clone();
            h.library.register_on_change(Arc::new(move || {
                if let Some(library) = library.upgrade() {
                    let late = late.clone();
                    library.register_on_change(Arc::new(move || {
                        late.fetch_add(1, Ordering::SeqCst);
                    }));
                }
            }));
        }

        add_files(&h.library, 50);
        h.ui_loop.run_pending();
        assert_eq!(h.library.observer_counts(), (2, 0));
        assert_eq!(late.load(Ordering::SeqCst), 0);

        add_files(&h.library, 50);
        h.ui_loop.run_pending();
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_item_update_stops_at_first_handler() {
        let h = harness();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let handles = [false, true, false];
        for (index, handled) in handles.into_iter().enumerate() {
            let calls = calls.clone();
            let observer: Arc<dyn ItemUpdatedObserver> = Arc::new(move |item: &MediaItem| {
                calls.lock().push((index, item.id));
                handled
            });
            h.library.register_on_item_updated(observer);
        }

        let library = h.library.clone();
        thread::spawn(move || {
            library.on_file_updated(&record(7, "/music/song.flac", FileKind::Audio));
        })
        .join()
        .unwrap();

        h.ui_loop.run_pending();
        assert_eq!(*calls.lock(), vec![(0, 7), (1, 7)]);
    }

    #[test]
    fn test_unmappable_update_is_not_dispatched() {
        let h = harness();
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let calls = calls.clone();
            h.library
                .register_on_item_updated(Arc::new(move |_item: &MediaItem| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    true
                }));
        }

        h.library
            .on_file_updated(&record(1, "/music/blob.bin", FileKind::Unknown));
        assert_eq!(h.ui_loop.run_pending(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_audio_query_skips_unmappable_records() {
        let h = harness_with(
            MockEngine::with_audio(vec![
                record(1, "/music/a.flac", FileKind::Audio),
                record(2, "/music/b.dat", FileKind::Unknown),
                record(3, "/music/c.flac", FileKind::Audio),
            ]),
            None,
        );
        let deliveries = Arc::new(Mutex::new(Vec::new()));
        {
            let deliveries = deliveries.clone();
            let dispatcher = h.library.dispatcher().clone();
            h.library.get_audio_files(move |items| {
                deliveries.lock().push((dispatcher.is_ui_thread(), items));
                dispatcher.quit();
            });
        }

        assert_eq!(h.ui_loop.run_for(TEST_TIMEOUT), LoopExit::Quit);
        let deliveries = deliveries.lock();
        assert_eq!(deliveries.len(), 1);
        let (on_ui_thread, items) = &deliveries[0];
        assert!(*on_ui_thread);
        let ids: Vec<i64> = items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_video_query_failure_yields_empty_list() {
        let engine = MockEngine::new();
        *engine.video.write() = vec![record(1, "/videos/a.mkv", FileKind::Video)];
        *engine.fail_queries.write() = true;
        let h = harness_with(engine, None);

        let received = Arc::new(Mutex::new(None));
        {
            let received = received.clone();
            let dispatcher = h.library.dispatcher().clone();
            h.library.get_video_files(move |items| {
                *received.lock() = Some(items);
                dispatcher.quit();
            });
        }

        assert_eq!(h.ui_loop.run_for(TEST_TIMEOUT), LoopExit::Quit);
        assert_eq!(*received.lock(), Some(Vec::new()));
    }

    #[test]
    fn test_panicking_engine_still_answers_query() {
        let engine = MockEngine::with_audio(vec![record(1, "/music/a.flac", FileKind::Audio)]);
        *engine.panic_queries.write() = true;
        let h = harness_with(engine, None);

        let deliveries = Arc::new(Mutex::new(Vec::new()));
        {
            let deliveries = deliveries.clone();
            let dispatcher = h.library.dispatcher().clone();
            h.library.get_audio_files(move |items| {
                deliveries.lock().push(items);
                dispatcher.quit();
            });
        }

        assert_eq!(h.ui_loop.run_for(TEST_TIMEOUT), LoopExit::Quit);
        assert_eq!(*deliveries.lock(), vec![Vec::<MediaItem>::new()]);
    }

    #[test]
    fn test_factory_failure_is_reported() {
        let runtime = Runtime::new().unwrap();
        let (dispatcher, _ui_loop) = ui_channel();

        let result = MediaLibrary::new(
            || {
                Err(EngineError::Creation {
                    reason: "no backend".to_string(),
                })
            },
            dispatcher,
            runtime.handle().clone(),
            None,
        );

        assert!(matches!(result, Err(LibraryError::EngineCreation(_))));
    }

    #[test]
    fn test_start_requires_data_directory() {
        let h = harness();

        let result = h.library.start(None);
        assert!(matches!(result, Err(LibraryError::MissingDataDirectory)));
        assert!(!h.library.is_started());
        assert!(h.engine.initialized_with.lock().is_none());
    }

    #[test]
    fn test_start_prepares_storage_and_initializes_engine() {
        let h = harness();
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("medialib");

        h.library.start(Some(&data_dir)).unwrap();

        assert!(h.library.is_started());
        assert!(data_dir.join("snapshots").is_dir());
        assert_eq!(
            *h.engine.initialized_with.lock(),
            Some((data_dir.join("medialib.db"), data_dir.join("snapshots")))
        );
        assert!(*h.engine.logger_set.lock());

        let callbacks = h.engine.callbacks().unwrap();
        callbacks.on_discovery_started(Path::new("/music"));
        assert!(h.library.is_discovering());
    }

    #[test]
    fn test_engine_initialization_failure_leaves_library_unstarted() {
        let h = harness();
        *h.engine.fail_initialize.write() = true;
        let dir = tempdir().unwrap();

        let result = h.library.start(Some(dir.path()));
        assert!(matches!(
            result,
            Err(LibraryError::EngineInitialization(_))
        ));
        assert!(!h.library.is_started());
    }

    #[test]
    fn test_discover_and_reload_require_start() {
        let h = harness();
        h.library.discover(Path::new("/music"));
        h.library.reload();
        assert!(h.engine.discovered.lock().is_empty());
        assert_eq!(*h.engine.reloads.lock(), 0);

        let dir = tempdir().unwrap();
        h.library.start(Some(dir.path())).unwrap();
        h.library.discover(Path::new("/music"));
        h.library.reload();
        assert_eq!(*h.engine.discovered.lock(), vec![Path::new("/music").to_path_buf()]);
        assert_eq!(*h.engine.reloads.lock(), 1);
    }

    #[test]
    fn test_engine_does_not_keep_library_alive() {
        let h = harness();
        let dir = tempdir().unwrap();
        h.library.start(Some(dir.path())).unwrap();

        let Harness {
            engine, library, ..
        } = h;
        drop(library);
        assert!(engine.callbacks().is_none());
    }
}
