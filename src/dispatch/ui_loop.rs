//! Task queue between worker threads and the UI event loop.

use std::{
    sync::Arc,
    thread::{ThreadId, current},
    time::{Duration, Instant},
};

use {
    async_channel::{Receiver, Sender, TryRecvError, unbounded},
    parking_lot::{Condvar, Mutex},
    tracing::{debug, trace},
};

/// Unit of work executed on the UI thread.
pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// Longest wait in `UiLoop::run_for` before re-checking for disconnect.
///
/// Dispatchers wake the loop on every send; this bound only matters when the
/// last dispatcher is dropped while the loop sleeps.
const DISCONNECT_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// Wakes a loop sleeping in `UiLoop::run_for` when a message is sent.
#[derive(Default)]
struct Wakeup {
    /// Held by the loop between its emptiness check and its wait.
    lock: Mutex<()>,
    /// Signalled after each send.
    condvar: Condvar,
}

impl Wakeup {
    fn notify(&self) {
        let _guard = self.lock.lock();
        self.condvar.notify_one();
    }
}

/// Messages carried by the UI channel.
enum UiMessage {
    /// Run a task on the UI thread.
    Run(UiTask),
    /// Stop the loop after the messages queued before this one.
    Quit,
}

/// Why a `UiLoop` stopped running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// `UiDispatcher::quit` was called.
    Quit,
    /// Every dispatcher was dropped and the queue is drained.
    Disconnected,
    /// The time budget given to `UiLoop::run_for` ran out.
    TimedOut,
}

/// Handle used by any thread to schedule work on the UI thread.
///
/// Cloning is cheap; all clones feed the same FIFO queue.
#[derive(Clone)]
pub struct UiDispatcher {
    /// Sending half of the UI queue.
    sender: Sender<UiMessage>,
    /// Thread currently running the loop, if any.
    ui_thread: Arc<Mutex<Option<ThreadId>>>,
    /// Wakes a sleeping `run_for`.
    wakeup: Arc<Wakeup>,
}

/// Consumer side of the UI queue.
///
/// Whatever thread calls one of the `run*` methods acts as the UI thread for
/// the duration of that call.
pub struct UiLoop {
    /// Receiving half of the UI queue.
    receiver: Receiver<UiMessage>,
    /// Shared with every dispatcher so they can tell where they are running.
    ui_thread: Arc<Mutex<Option<ThreadId>>>,
    /// Signalled by dispatchers after each send.
    wakeup: Arc<Wakeup>,
}

/// Creates a connected dispatcher/loop pair.
///
/// # Returns
///
/// A `UiDispatcher` for producers and the `UiLoop` that consumes its tasks.
#[must_use]
pub fn ui_channel() -> (UiDispatcher, UiLoop) {
    let (sender, receiver) = unbounded();
    let ui_thread = Arc::new(Mutex::new(None));
    let wakeup = Arc::new(Wakeup::default());

    (
        UiDispatcher {
            sender,
            ui_thread: ui_thread.clone(),
            wakeup: wakeup.clone(),
        },
        UiLoop {
            receiver,
            ui_thread,
            wakeup,
        },
    )
}

impl UiDispatcher {
    /// Schedules `task` to run on the UI thread and returns immediately.
    ///
    /// Tasks scheduled from the same thread run in the order they were
    /// scheduled. If the loop has already gone away the task is dropped.
    ///
    /// # Arguments
    ///
    /// * `task` - Closure to execute on the UI thread.
    pub fn dispatch<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(UiMessage::Run(Box::new(task)), "dropping dispatched task");
    }

    /// Asks the loop to stop once the tasks already queued have run.
    pub fn quit(&self) {
        self.send(UiMessage::Quit, "ignoring quit request");
    }

    fn send(&self, message: UiMessage, on_closed: &str) {
        if self.sender.try_send(message).is_err() {
            debug!("UI loop is gone, {}", on_closed);
            return;
        }
        self.wakeup.notify();
    }

    /// Reports whether the caller is running on the UI thread.
    ///
    /// # Returns
    ///
    /// `true` while called from inside a running `UiLoop`.
    pub fn is_ui_thread(&self) -> bool {
        *self.ui_thread.lock() == Some(current().id())
    }
}

impl std::fmt::Debug for UiDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiDispatcher")
            .field("pending", &self.sender.len())
            .field("closed", &self.sender.is_closed())
            .finish()
    }
}

impl UiLoop {
    /// Runs tasks on the calling thread until quit or disconnect.
    ///
    /// # Returns
    ///
    /// The reason the loop stopped (never `LoopExit::TimedOut`).
    pub fn run(&self) -> LoopExit {
        let _guard = self.enter();
        loop {
            match self.receiver.recv_blocking() {
                Ok(UiMessage::Run(task)) => task(),
                Ok(UiMessage::Quit) => return LoopExit::Quit,
                Err(_) => return LoopExit::Disconnected,
            }
        }
    }

    /// Runs tasks on the calling thread for at most `timeout`.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Upper bound on how long to keep pumping the queue.
    ///
    /// # Returns
    ///
    /// The reason the loop stopped.
    pub fn run_for(&self, timeout: Duration) -> LoopExit {
        let _guard = self.enter();
        let deadline = Instant::now() + timeout;
        loop {
            match self.receiver.try_recv() {
                Ok(UiMessage::Run(task)) => task(),
                Ok(UiMessage::Quit) => return LoopExit::Quit,
                Err(TryRecvError::Closed) => return LoopExit::Disconnected,
                Err(TryRecvError::Empty) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return LoopExit::TimedOut;
                    }
                    self.wait_for_message(deadline.min(now + DISCONNECT_CHECK_INTERVAL));
                }
            }
        }
    }

    /// Runs every task that is already queued, without blocking.
    ///
    /// Meant for hosts that drive their own event loop and pump this queue
    /// from an idle handler. A pending quit request is consumed and stops the
    /// drain.
    ///
    /// # Returns
    ///
    /// The number of tasks executed.
    pub fn run_pending(&self) -> usize {
        let _guard = self.enter();
        let mut executed = 0;
        while let Ok(message) = self.receiver.try_recv() {
            match message {
                UiMessage::Run(task) => {
                    task();
                    executed += 1;
                }
                UiMessage::Quit => break,
            }
        }
        trace!("Ran {} pending UI tasks", executed);
        executed
    }

    /// Sleeps until a dispatcher sends something or `until` passes.
    fn wait_for_message(&self, until: Instant) {
        let mut guard = self.wakeup.lock.lock();
        // Checked under the lock so a send cannot slip in before the wait.
        if self.receiver.is_empty() && !self.receiver.is_closed() {
            let _ = self.wakeup.condvar.wait_until(&mut guard, until);
        }
    }

    /// Marks the calling thread as the UI thread until the guard drops.
    fn enter(&self) -> UiThreadGuard<'_> {
        *self.ui_thread.lock() = Some(current().id());
        UiThreadGuard {
            ui_thread: &self.ui_thread,
        }
    }
}

/// Clears the recorded UI thread when a run ends.
struct UiThreadGuard<'a> {
    ui_thread: &'a Mutex<Option<ThreadId>>,
}

impl Drop for UiThreadGuard<'_> {
    fn drop(&mut self) {
        *self.ui_thread.lock() = None;
    }
}
