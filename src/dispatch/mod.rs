//! Cross-thread marshaling onto the single UI thread.
//!
//! Background workers never touch UI state directly. They hand closures to a
//! `UiDispatcher`, and the thread running the matching `UiLoop` executes them
//! one at a time in the order they were scheduled.

pub mod ui_loop;

pub use ui_loop::{LoopExit, UiDispatcher, UiLoop, UiTask, ui_channel};
