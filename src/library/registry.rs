//! Ordered registries for library observers.
//!
//! Observers are shared trait objects. Identity is the `Arc` allocation, so
//! the same observer can be registered several times and each registration is
//! removed independently, first match first.

use std::sync::Arc;

use crate::library::models::MediaItem;

/// Observer of coalesced "library changed" notifications.
pub trait ChangeObserver: Send + Sync {
    /// Called on the UI thread after the library content changed.
    fn on_library_changed(&self);
}

/// Observer of single-item updates.
pub trait ItemUpdatedObserver: Send + Sync {
    /// Called on the UI thread with an updated item.
    ///
    /// # Returns
    ///
    /// `true` when the observer consumed the update. Dispatch stops at the
    /// first observer that returns `true`.
    fn on_item_updated(&self, item: &MediaItem) -> bool;
}

impl<F> ChangeObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_library_changed(&self) {
        self()
    }
}

impl<F> ItemUpdatedObserver for F
where
    F: Fn(&MediaItem) -> bool + Send + Sync,
{
    fn on_item_updated(&self, item: &MediaItem) -> bool {
        self(item)
    }
}

/// Registered observers for both event classes, in registration order.
///
/// Not synchronized on its own; `MediaLibrary` keeps it in the same lock
/// domain as the change coalescer.
#[derive(Default)]
pub struct ListenerRegistry {
    /// Library-changed observers.
    change_observers: Vec<Arc<dyn ChangeObserver>>,
    /// Item-updated observers.
    item_observers: Vec<Arc<dyn ItemUpdatedObserver>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a library-changed observer.
    pub fn register_on_change(&mut self, observer: Arc<dyn ChangeObserver>) {
        self.change_observers.push(observer);
    }

    /// Removes the first registration of `observer`.
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed, `false` if none matched.
    pub fn unregister_on_change(&mut self, observer: &Arc<dyn ChangeObserver>) -> bool {
        remove_first(&mut self.change_observers, observer)
    }

    /// Appends an item-updated observer.
    pub fn register_on_item_updated(&mut self, observer: Arc<dyn ItemUpdatedObserver>) {
        self.item_observers.push(observer);
    }

    /// Removes the first registration of `observer`.
    ///
    /// # Returns
    ///
    /// `true` if a registration was removed, `false` if none matched.
    pub fn unregister_on_item_updated(&mut self, observer: &Arc<dyn ItemUpdatedObserver>) -> bool {
        remove_first(&mut self.item_observers, observer)
    }

    /// Snapshot of the library-changed observers, for fan-out outside the lock.
    pub fn change_observers(&self) -> Vec<Arc<dyn ChangeObserver>> {
        self.change_observers.clone()
    }

    /// Snapshot of the item-updated observers, for dispatch outside the lock.
    pub fn item_observers(&self) -> Vec<Arc<dyn ItemUpdatedObserver>> {
        self.item_observers.clone()
    }

    /// Number of library-changed registrations.
    pub fn change_observer_count(&self) -> usize {
        self.change_observers.len()
    }

    /// Number of item-updated registrations.
    pub fn item_observer_count(&self) -> usize {
        self.item_observers.len()
    }
}

/// Hands `item` to each observer in order until one reports it handled.
///
/// # Returns
///
/// The index of the observer that handled the item, if any.
pub fn dispatch_item_updated(
    observers: &[Arc<dyn ItemUpdatedObserver>],
    item: &MediaItem,
) -> Option<usize> {
    observers
        .iter()
        .position(|observer| observer.on_item_updated(item))
}

fn remove_first<T: ?Sized>(observers: &mut Vec<Arc<T>>, observer: &Arc<T>) -> bool {
    match observers.iter().position(|o| Arc::ptr_eq(o, observer)) {
        Some(index) => {
            observers.remove(index);
            true
        }
        None => false,
    }
}
