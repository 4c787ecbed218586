//! Configuration for the media library core.

use crate::library::coalescer::DEFAULT_CHANGE_THRESHOLD;

/// Configuration for the media library core.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Number of added files that forces a library-changed notification.
    pub change_threshold: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
        }
    }
}
