//! A trigger that runs an action once a stream of signals goes quiet.

use std::{fmt::Debug, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// The action a [`Debouncer`] runs once signals stop arriving.
pub type DebouncedAction = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Coalesces bursts of signals into a single run of an action.
///
/// Every [`Self::signal`] pushes the pending run `window` into the future, replacing whatever was
/// scheduled before. The action only runs once `window` elapses without another signal. Signals
/// that keep arriving faster than `window` postpone the action indefinitely.
///
/// Once fired, the action runs on its own task, so later signals never interrupt it.
///
/// See: [`example`]
pub struct Debouncer {
    window: Duration,
    action: DebouncedAction,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates a [`Debouncer`] that runs `action` after `window` of silence.
    pub fn new<F>(window: Duration, action: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        Self {
            window,
            action: Arc::new(action),
            pending: Mutex::new(None),
        }
    }

    /// Returns the quiescence window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Whether a run is scheduled and has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// Schedules the action `window` from now, cancelling the previously scheduled run.
    ///
    /// Never blocks. Must be called from within a Tokio runtime.
    pub fn signal(&self) {
        let window = self.window;
        let action = self.action.clone();

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            if !previous.is_finished() {
                trace!("resetting debounce timer");
            }
            previous.abort();
        }

        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            debug!("quiet for {window:?}, firing debounced action");
            // No await between waking up and spawning, so an abort can no longer lose this run.
            drop(tokio::spawn(action()));
        }));
    }
}

impl Debug for Debouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Debouncer")
            .field("window", &self.window)
            .field("pending", &self.is_pending())
            .finish_non_exhaustive()
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.get_mut().take() {
            pending.abort();
        }
    }
}

#[cfg(test)]
#[tokio::test(start_paused = true)]
async fn example() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();

    // Defines the action to run once signals go quiet
    let debouncer = Debouncer::new(Duration::from_secs(2), move || {
        let counter = counter.clone();
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });

    // A burst of signals...
    for _ in 0..3 {
        debouncer.signal();
        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    // ...runs the action once, two seconds after the last one
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
