//! One-shot re-engagement timers.
//!
//! When a timer fires, the chat id is sent on the wake-up channel handed to
//! [`Scheduler::new`]; whoever owns the receiver resumes the quiz flow.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happens when a chat is scheduled while a wake-up is still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReschedulePolicy {
    /// Abort the pending wake-up; at most one exists per chat.
    #[default]
    Replace,
    /// Keep every timer; the chat is woken once per schedule call.
    Stack,
}

impl FromStr for ReschedulePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(Self::Replace),
            "stack" => Ok(Self::Stack),
            other => Err(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledTask {
    pub chat_id: i64,
    pub fire_at: Instant,
}

#[derive(Debug)]
struct Pending {
    ticket: Uuid,
    fire_at: Instant,
    handle: AbortHandle,
}

#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: ReschedulePolicy,
    pending: Arc<DashMap<i64, Vec<Pending>>>,
    wake: UnboundedSender<i64>,
}

impl Scheduler {
    pub fn new(policy: ReschedulePolicy, wake: UnboundedSender<i64>) -> Self {
        Self {
            policy,
            pending: Arc::new(DashMap::new()),
            wake,
        }
    }

    pub fn policy(&self) -> ReschedulePolicy {
        self.policy
    }

    /// Arms a wake-up for `chat_id` after `delay`, counted from now.
    pub fn schedule(&self, chat_id: i64, delay: Duration) -> ScheduledTask {
        let fire_at = Instant::now() + delay;
        let ticket = Uuid::new_v4();

        let mut timers = self.pending.entry(chat_id).or_default();
        if self.policy == ReschedulePolicy::Replace && !timers.is_empty() {
            debug!(chat_id, replaced = timers.len(), "Replacing pending wake-up");
            for timer in timers.drain(..) {
                timer.handle.abort();
            }
        }

        let pending = Arc::clone(&self.pending);
        let wake = self.wake.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(fire_at).await;
            forget(&pending, chat_id, ticket);
            info!(chat_id, "Re-engagement wake-up fired");
            if wake.send(chat_id).is_err() {
                warn!(chat_id, "Nobody listens for wake-ups anymore");
            }
        })
        .abort_handle();

        timers.push(Pending {
            ticket,
            fire_at,
            handle,
        });

        ScheduledTask { chat_id, fire_at }
    }

    pub fn pending(&self, chat_id: i64) -> Vec<ScheduledTask> {
        self.pending
            .get(&chat_id)
            .map(|timers| {
                timers
                    .iter()
                    .map(|timer| ScheduledTask {
                        chat_id,
                        fire_at: timer.fire_at,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Time until the earliest pending wake-up of the chat.
    pub fn remaining(&self, chat_id: i64) -> Option<Duration> {
        let now = Instant::now();
        self.pending
            .get(&chat_id)?
            .iter()
            .map(|timer| timer.fire_at.saturating_duration_since(now))
            .min()
    }

    /// Aborts every pending wake-up of the chat and returns how many there were.
    pub fn cancel(&self, chat_id: i64) -> usize {
        match self.pending.remove(&chat_id) {
            Some((_, timers)) => {
                for timer in &timers {
                    timer.handle.abort();
                }
                timers.len()
            }
            None => 0,
        }
    }
}

fn forget(pending: &DashMap<i64, Vec<Pending>>, chat_id: i64, ticket: Uuid) {
    if let Entry::Occupied(mut timers) = pending.entry(chat_id) {
        timers.get_mut().retain(|timer| timer.ticket != ticket);
        if timers.get().is_empty() {
            timers.remove();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn scheduler(policy: ReschedulePolicy) -> (Scheduler, UnboundedReceiver<i64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Scheduler::new(policy, tx), rx)
    }

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!(
            "Replace".parse::<ReschedulePolicy>(),
            Ok(ReschedulePolicy::Replace)
        );
        assert_eq!(
            " stack ".parse::<ReschedulePolicy>(),
            Ok(ReschedulePolicy::Stack)
        );
        assert_eq!(
            "never".parse::<ReschedulePolicy>(),
            Err("never".to_owned())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_the_delay() {
        let (scheduler, mut rx) = scheduler(ReschedulePolicy::Replace);

        let task = scheduler.schedule(7, Duration::from_secs(60));
        assert_eq!(task.chat_id, 7);
        assert_eq!(scheduler.pending(7), vec![task]);

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(7));
        tokio::task::yield_now().await;
        assert!(scheduler.pending(7).is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn replace_keeps_only_the_latest_timer() {
        let (scheduler, mut rx) = scheduler(ReschedulePolicy::Replace);

        scheduler.schedule(1, Duration::from_secs(10));
        let latest = scheduler.schedule(1, Duration::from_secs(30));
        assert_eq!(scheduler.pending(1), vec![latest]);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(rx.try_recv().is_err());

        assert_eq!(rx.recv().await, Some(1));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stack_wakes_for_every_call() {
        let (scheduler, mut rx) = scheduler(ReschedulePolicy::Stack);

        scheduler.schedule(1, Duration::from_secs(10));
        scheduler.schedule(1, Duration::from_secs(30));
        assert_eq!(scheduler.pending(1).len(), 2);
        assert_eq!(scheduler.remaining(1), Some(Duration::from_secs(10)));

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(rx.recv().await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_pending_timers() {
        let (scheduler, mut rx) = scheduler(ReschedulePolicy::Stack);

        scheduler.schedule(3, Duration::from_secs(5));
        scheduler.schedule(3, Duration::from_secs(6));
        scheduler.schedule(4, Duration::from_secs(5));

        assert_eq!(scheduler.cancel(3), 2);
        assert_eq!(scheduler.cancel(3), 0);
        assert_eq!(scheduler.remaining(3), None);

        assert_eq!(rx.recv().await, Some(4));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }
}
