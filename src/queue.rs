use std::collections::VecDeque;
use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::parser::RawEvent;

/// Unbounded FIFO between the Telegram listener and the single drain loop.
#[derive(Debug)]
pub struct UpdateQueue {
    events: Mutex<VecDeque<RawEvent>>,
    notify: Notify,
    running: AtomicBool,
    poll_interval: Duration,
}

impl UpdateQueue {
    /// The queue starts out armed: `is_running` is true until `stop`.
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            running: AtomicBool::new(true),
            poll_interval,
        }
    }

    fn events(&self) -> MutexGuard<'_, VecDeque<RawEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, event: RawEvent) {
        self.events().push_back(event);
        self.notify.notify_one();
    }

    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }

    fn pop(&self) -> Option<RawEvent> {
        self.events().pop_front()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Drains the queue until [`UpdateQueue::stop`] is called.
    ///
    /// Every queued event is handed to `process` in arrival order; then the
    /// loop sleeps until the next enqueue or `poll_interval`, whichever
    /// comes first. `process` must not block: errors are logged and the
    /// loop carries on.
    pub async fn start<F, E>(&self, mut process: F)
    where
        F: FnMut(RawEvent) -> Result<(), E>,
        E: Display,
    {
        self.running.store(true, Ordering::Release);
        info!(poll_interval = ?self.poll_interval, "[START] Update queue");

        while self.is_running() {
            while let Some(event) = self.pop() {
                let chat_id = event.chat_id;
                debug!(chat_id, "Draining update");
                if let Err(e) = process(event) {
                    error!(chat_id, error = %e, "Failed to process update");
                }
            }

            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }

        info!(left = self.len(), "[STOP] Update queue drain loop exited");
    }

    /// Returns `true` only when this call stopped a running queue.
    pub fn stop(&self) -> bool {
        if self.running.swap(false, Ordering::AcqRel) {
            info!("[STOP] Update queue stopped");
            self.notify.notify_one();
            true
        } else {
            warn!("[WARN] Update queue already stopped");
            false
        }
    }
}
