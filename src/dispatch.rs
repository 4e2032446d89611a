//! Per-chat sequential execution.
//!
//! Every chat with work in flight gets one worker task fed by an unbounded
//! channel, so jobs of one chat run strictly in order while different chats
//! run in parallel. A worker retires after `idle` without jobs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::SendError, UnboundedSender};
use tracing::{debug, warn};

use crate::commands::{Command, RequestData};
use crate::errors::DispatchError;
use crate::parser::{self, RawEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    Request(RequestData),
    /// A re-engagement wake-up for the chat.
    Resume(i64),
}

impl Job {
    pub fn chat_id(&self) -> i64 {
        match self {
            Job::Request(request) => request.chat_id,
            Job::Resume(chat_id) => *chat_id,
        }
    }
}

#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    async fn handle_job(&self, job: Job);
}

pub struct ChatWorkers<H> {
    handler: Arc<H>,
    workers: Arc<DashMap<i64, UnboundedSender<Job>>>,
    idle: Duration,
}

impl<H> Clone for ChatWorkers<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            workers: Arc::clone(&self.workers),
            idle: self.idle,
        }
    }
}

impl<H: JobHandler> ChatWorkers<H> {
    pub fn new(handler: Arc<H>, idle: Duration) -> Self {
        Self {
            handler,
            workers: Arc::new(DashMap::new()),
            idle,
        }
    }

    pub fn active(&self) -> usize {
        self.workers.len()
    }

    /// Parses a drained event and queues it on its chat's worker.
    /// Unrecognised commands are dropped here.
    pub fn route(&self, event: RawEvent) -> Result<(), DispatchError> {
        let request = parser::parse(&event);
        if request.command == Command::Unknown {
            debug!(chat_id = request.chat_id, "Ignoring unrecognised update");
            return Ok(());
        }
        self.dispatch(Job::Request(request))
    }

    pub fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        let chat_id = job.chat_id();
        // The entry guard is held while sending so a retiring worker can
        // never miss a job.
        let mut sender = self
            .workers
            .entry(chat_id)
            .or_insert_with(|| self.spawn_worker(chat_id));

        match sender.send(job) {
            Ok(()) => Ok(()),
            Err(SendError(job)) => {
                warn!(chat_id, "Chat worker died, starting a new one");
                *sender = self.spawn_worker(chat_id);
                sender
                    .send(job)
                    .map_err(|_| DispatchError::WorkerClosed(chat_id))
            }
        }
    }

    /// Feeds re-engagement wake-ups into the chats' workers until the
    /// scheduler side of the channel is gone.
    pub fn forward_wakeups(&self, mut wakeups: mpsc::UnboundedReceiver<i64>) {
        let workers = self.clone();
        tokio::spawn(async move {
            while let Some(chat_id) = wakeups.recv().await {
                if let Err(e) = workers.dispatch(Job::Resume(chat_id)) {
                    warn!(chat_id, error = %e, "Could not deliver wake-up");
                }
            }
            debug!("Wake-up channel closed");
        });
    }

    fn spawn_worker(&self, chat_id: i64) -> UnboundedSender<Job> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let own = tx.clone();
        let handler = Arc::clone(&self.handler);
        let workers = Arc::clone(&self.workers);
        let idle = self.idle;

        debug!(chat_id, "Starting chat worker");
        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(idle, rx.recv()).await {
                    Ok(Some(job)) => handler.handle_job(job).await,
                    Ok(None) => break,
                    Err(_) => {
                        let retired = workers
                            .remove_if(&chat_id, |_, tx| tx.same_channel(&own) && rx.is_empty())
                            .is_some();
                        if retired {
                            debug!(chat_id, "Chat worker retired");
                            break;
                        }
                    }
                }
            }
        });

        tx
    }
}
