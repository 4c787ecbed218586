//! Coalescing of per-file change events into library-changed notifications.
//!
//! Discovery scans can report thousands of files. Refreshing the UI for each
//! one would thrash the UI thread, so notifications are batched: one every
//! `threshold` added files, plus one when the last active discovery completes
//! with changes still unflushed.

use tracing::{debug, warn};

/// Default number of added files that forces a notification.
pub const DEFAULT_CHANGE_THRESHOLD: usize = 50;

/// Reason a notification must be sent to change observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flush {
    /// The added-file counter reached the threshold.
    Threshold,
    /// The last active discovery completed with changes pending.
    DiscoveryCompleted,
}

/// Discovery-session and changed-item bookkeeping.
///
/// The coalescer itself is not synchronized; the owner keeps it behind the
/// library's state lock and fans out notifications after releasing it.
#[derive(Debug, Clone)]
pub struct ChangeCoalescer {
    /// Discoveries started and not yet completed.
    active_discoveries: usize,
    /// Files added since the last notification.
    pending_changes: usize,
    /// Added-file count that forces a notification.
    threshold: usize,
}

impl Default for ChangeCoalescer {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }
}

impl ChangeCoalescer {
    /// Creates a coalescer.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Added-file count that forces a notification. Values
    ///   below 1 are treated as 1.
    ///
    /// # Returns
    ///
    /// A new `ChangeCoalescer` with no active discovery and nothing pending.
    #[must_use]
    pub fn new(threshold: usize) -> Self {
        Self {
            active_discoveries: 0,
            pending_changes: 0,
            threshold: threshold.max(1),
        }
    }

    /// Records the start of a discovery.
    pub fn discovery_started(&mut self) {
        self.active_discoveries += 1;
        debug!("Active discoveries: {}", self.active_discoveries);
    }

    /// Records the completion of a discovery.
    ///
    /// # Returns
    ///
    /// `Some(Flush::DiscoveryCompleted)` when this was the last active
    /// discovery and changes were pending. The pending counter is reset in
    /// that case.
    #[must_use]
    pub fn discovery_completed(&mut self) -> Option<Flush> {
        if self.active_discoveries == 0 {
            warn!("Discovery completed while none was in progress, ignoring");
            return None;
        }

        self.active_discoveries -= 1;
        if self.active_discoveries > 0 || self.pending_changes == 0 {
            return None;
        }

        self.pending_changes = 0;
        Some(Flush::DiscoveryCompleted)
    }

    /// Records one added file.
    ///
    /// # Returns
    ///
    /// `Some(Flush::Threshold)` when the pending counter reached the
    /// threshold. The pending counter is reset in that case.
    #[must_use]
    pub fn file_added(&mut self) -> Option<Flush> {
        self.pending_changes += 1;
        if self.pending_changes < self.threshold {
            return None;
        }

        self.pending_changes = 0;
        Some(Flush::Threshold)
    }

    /// Number of discoveries currently in progress.
    pub fn active_discoveries(&self) -> usize {
        self.active_discoveries
    }

    /// Number of added files not yet covered by a notification.
    pub fn pending_changes(&self) -> usize {
        self.pending_changes
    }

    /// Added-file count that forces a notification.
    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
