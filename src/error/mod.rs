//! Error handling for the media library core, using `thiserror` and `anyhow`.
//!
//! Domain errors are precise enums returned at the library and engine
//! boundaries. Operational helpers add context and centralize error logging.

pub mod domain;
pub mod operational;

pub use {
    domain::{EngineError, LibraryError},
    operational::{ErrorReporter, ResultExt},
};
