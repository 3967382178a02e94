//! Trailing-edge debounce as a cancelable delayed task.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Runs at most one delayed task at a time. Scheduling again cancels the
/// pending task and restarts the delay.
///
/// Each scheduled task receives a generation number; it must call
/// [`Debouncer::complete`] with it before doing work, which rejects tasks
/// superseded while they were waiting.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Arms the timer. Returns false if no tokio runtime is available.
    pub fn schedule<F, Fut>(&mut self, task: F) -> bool
    where
        F: FnOnce(u64) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                tracing::warn!("No async runtime available; debounced task not scheduled");
                return false;
            }
        };

        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let delay = self.delay;

        self.pending = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task(generation).await;
        }));
        true
    }

    /// Cancels the pending task, if any. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        match self.pending.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Claims the firing for `generation`. Returns false if the task was
    /// superseded or cancelled in the meantime.
    pub fn complete(&mut self, generation: u64) -> bool {
        if self.pending.is_some() && generation == self.generation {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
