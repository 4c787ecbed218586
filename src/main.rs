//! medialib - media library indexer
//!
//! Loads the user's settings, starts the media library on the reference
//! filesystem engine, discovers the configured directories and reports the
//! indexed content once discovery has settled.

use std::{sync::Arc, time::Duration};

use {
    anyhow::Result,
    tokio::{runtime::Builder, time::interval},
    tracing::{Level, info},
    tracing_subscriber::EnvFilter,
};

use medialib::{
    config::SettingsManager,
    dispatch::ui_channel,
    error::ResultExt,
    library::{
        ContentSource, ControllerOptions, FsEngine, LibraryConfig, LibraryController,
        MediaLibrary,
    },
};

/// How often the host checks whether discovery is still running.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let settings_manager = SettingsManager::new().add_context("Failed to load settings")?;
    let settings = settings_manager.get_settings().clone();
    info!(
        "Loaded settings from {:?}",
        settings_manager.get_config_path()
    );

    let runtime = Builder::new_multi_thread()
        .enable_all()
        .thread_name("medialib-worker")
        .build()
        .add_context("Failed to build runtime")?;
    let (dispatcher, ui_loop) = ui_channel();

    let handle = runtime.handle().clone();
    let library = MediaLibrary::new(
        move || FsEngine::create(handle),
        dispatcher.clone(),
        runtime.handle().clone(),
        Some(LibraryConfig::from(&settings)),
    )
    .add_context("Failed to create media library")?;

    let data_dir = settings.data_dir();
    library
        .start(data_dir.as_deref())
        .add_contextf(format!("Failed to start media library in {:?}", data_dir))?;

    let controllers = [ContentSource::Audio, ContentSource::Video].map(|source| {
        LibraryController::new(
            &library,
            source,
            ControllerOptions::default()
                .compare(|a, b| a.path.cmp(&b.path))
                .on_content_changed(move |content| {
                    info!("{:?} library holds {} items", source, content.len());
                }),
        )
    });

    if settings.discovery_directories.is_empty() {
        info!("No discovery directories configured");
    }
    for directory in &settings.discovery_directories {
        library.discover(directory);
    }

    let watcher = Arc::clone(&library);
    runtime.spawn(async move {
        let mut ticks = interval(IDLE_POLL_INTERVAL);
        loop {
            ticks.tick().await;
            if !watcher.is_discovering() {
                break;
            }
        }

        let library = Arc::clone(&watcher);
        watcher.get_audio_files(move |audio| {
            info!("Discovery idle, {} audio files indexed", audio.len());
            let dispatcher = library.dispatcher().clone();
            library.get_video_files(move |video| {
                info!("Discovery idle, {} video files indexed", video.len());
                dispatcher.quit();
            });
        });
    });

    let exit = ui_loop.run();
    info!("UI loop stopped: {:?}", exit);

    drop(controllers);
    drop(library);
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
