//! List controller keeping a filtered, ordered view of library content.
//!
//! A `LibraryController` is what a list widget binds to. It refreshes its
//! content whenever the library reports a change and patches single items
//! in place when they are updated.

use std::{
    cmp::Ordering as CmpOrdering,
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, Ordering},
    },
};

use {parking_lot::Mutex, tracing::debug};

use crate::library::{
    MediaLibrary,
    models::{MediaItem, MediaKind},
    registry::{ChangeObserver, ItemUpdatedObserver},
};

/// Predicate deciding whether an item belongs in the view.
pub type AcceptFn = Box<dyn Fn(&MediaItem) -> bool + Send + Sync>;

/// Ordering of the view.
pub type CompareFn = Box<dyn Fn(&MediaItem, &MediaItem) -> CmpOrdering + Send + Sync>;

/// Listener called on the UI thread after the content changed.
pub type ContentChangedFn = Box<dyn Fn(&[MediaItem]) + Send + Sync>;

/// Which library list a controller mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentSource {
    /// Audio files.
    Audio,
    /// Video files.
    Video,
}

impl ContentSource {
    fn kind(self) -> MediaKind {
        match self {
            ContentSource::Audio => MediaKind::Audio,
            ContentSource::Video => MediaKind::Video,
        }
    }
}

/// Optional behaviour of a `LibraryController`.
#[derive(Default)]
pub struct ControllerOptions {
    /// Filter, every item is accepted when `None`.
    pub accept: Option<AcceptFn>,
    /// Ordering, library order is kept when `None`.
    pub compare: Option<CompareFn>,
    /// Content-changed listener.
    pub on_content_changed: Option<ContentChangedFn>,
}

impl ControllerOptions {
    /// Sets the filter.
    #[must_use]
    pub fn accept(mut self, accept: impl Fn(&MediaItem) -> bool + Send + Sync + 'static) -> Self {
        self.accept = Some(Box::new(accept));
        self
    }

    /// Sets the ordering.
    #[must_use]
    pub fn compare(
        mut self,
        compare: impl Fn(&MediaItem, &MediaItem) -> CmpOrdering + Send + Sync + 'static,
    ) -> Self {
        self.compare = Some(Box::new(compare));
        self
    }

    /// Sets the content-changed listener.
    #[must_use]
    pub fn on_content_changed(
        mut self,
        listener: impl Fn(&[MediaItem]) + Send + Sync + 'static,
    ) -> Self {
        self.on_content_changed = Some(Box::new(listener));
        self
    }
}

/// State shared between the controller handle and its observers.
struct ControllerInner {
    library: Weak<MediaLibrary>,
    source: ContentSource,
    options: ControllerOptions,
    content: Mutex<Arc<Vec<MediaItem>>>,
    /// Bumped by every refresh; only the newest result is applied.
    generation: AtomicU64,
}

impl ControllerInner {
    fn refresh(self: &Arc<Self>) {
        let Some(library) = self.library.upgrade() else {
            debug!("Media library is gone, skipping refresh");
            return;
        };

        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let inner = Arc::downgrade(self);
        let apply = move |items: Vec<MediaItem>| {
            if let Some(inner) = inner.upgrade() {
                inner.apply(generation, items);
            }
        };

        match self.source {
            ContentSource::Audio => library.get_audio_files(apply),
            ContentSource::Video => library.get_video_files(apply),
        }
    }

    fn apply(&self, generation: u64, items: Vec<MediaItem>) {
        if self.generation.load(Ordering::Acquire) != generation {
            debug!("Dropping stale {:?} refresh {}", self.source, generation);
            return;
        }

        let mut items: Vec<MediaItem> = match &self.options.accept {
            Some(accept) => items.into_iter().filter(|item| accept(item)).collect(),
            None => items,
        };
        self.sort(&mut items);

        let content = Arc::new(items);
        *self.content.lock() = content.clone();
        debug!("{:?} controller holds {} items", self.source, content.len());
        self.notify(&content);
    }

    fn sort(&self, items: &mut [MediaItem]) {
        if let Some(compare) = &self.options.compare {
            items.sort_by(|a, b| compare(a, b));
        }
    }

    fn accepts(&self, item: &MediaItem) -> bool {
        self.options.accept.as_ref().is_none_or(|accept| accept(item))
    }

    /// Patches a held item in place and keeps the view sorted.
    ///
    /// Returns `true` only for items the view already holds. An accepted item
    /// the view does not hold (new, or previously filtered out) is left to the
    /// next observer and picked up by a refresh.
    fn item_updated(self: &Arc<Self>, item: &MediaItem) -> bool {
        if item.kind != self.source.kind() {
            return false;
        }

        let accepted = self.accepts(item);
        let content = {
            let mut content = self.content.lock();
            let Some(index) = content.iter().position(|existing| existing.id == item.id) else {
                drop(content);
                if accepted {
                    debug!("Item {} entered the {:?} view, refreshing", item.id, self.source);
                    self.refresh();
                }
                return false;
            };

            let items = Arc::make_mut(&mut *content);
            if accepted {
                items[index] = item.clone();
                self.sort(items);
            } else {
                items.remove(index);
            }
            content.clone()
        };

        self.notify(&content);
        true
    }

    fn notify(&self, content: &[MediaItem]) {
        if let Some(listener) = &self.options.on_content_changed {
            listener(content);
        }
    }
}

/// Filtered, ordered view of one library list.
///
/// Registers itself with the library on creation and unregisters on drop.
pub struct LibraryController {
    inner: Arc<ControllerInner>,
    change_observer: Arc<dyn ChangeObserver>,
    item_observer: Arc<dyn ItemUpdatedObserver>,
}

impl LibraryController {
    /// Creates a controller and starts its first refresh.
    ///
    /// # Arguments
    ///
    /// * `library` - Library to mirror.
    /// * `source` - Which list to mirror.
    /// * `options` - Filter, ordering and content-changed listener.
    pub fn new(library: &Arc<MediaLibrary>, source: ContentSource, options: ControllerOptions) -> Self {
        let inner = Arc::new(ControllerInner {
            library: Arc::downgrade(library),
            source,
            options,
            content: Mutex::new(Arc::new(Vec::new())),
            generation: AtomicU64::new(0),
        });

        let weak = Arc::downgrade(&inner);
        let change_observer: Arc<dyn ChangeObserver> = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        });

        let weak = Arc::downgrade(&inner);
        let item_observer: Arc<dyn ItemUpdatedObserver> = Arc::new(move |item: &MediaItem| {
            weak.upgrade().is_some_and(|inner| inner.item_updated(item))
        });

        library.register_on_change(change_observer.clone());
        library.register_on_item_updated(item_observer.clone());
        inner.refresh();

        Self {
            inner,
            change_observer,
            item_observer,
        }
    }

    /// Re-queries the library; the result is applied on the UI thread.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    /// Current content.
    pub fn content(&self) -> Arc<Vec<MediaItem>> {
        self.inner.content.lock().clone()
    }

    /// Number of items in the view.
    pub fn len(&self) -> usize {
        self.inner.content.lock().len()
    }

    /// Reports whether the view is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List this controller mirrors.
    pub fn source(&self) -> ContentSource {
        self.inner.source
    }
}

impl Drop for LibraryController {
    fn drop(&mut self) {
        if let Some(library) = self.inner.library.upgrade() {
            library.unregister_on_change(&self.change_observer);
            library.unregister_on_item_updated(&self.item_observer);
        }
    }
}
