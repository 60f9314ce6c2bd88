//! Repeating tasks behind a cancellable handle.

use parking_lot::Mutex;
use std::{fmt::Debug, sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub type Task = Arc<dyn Fn() + Send + Sync>;

pub trait Scheduler: Send + Sync + Debug {
    /// Runs `task` every `period`, first one period from now.
    fn every(&self, period: Duration, task: Task) -> TaskHandle;
}

/// Cancels its task on `cancel()` or when dropped.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    pub fn cancel(&mut self) {
        self.token.cancel();
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Interval timer on the ambient tokio runtime. Must be called from within one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, task: Task) -> TaskHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => task(),
                }
            }
        });

        TaskHandle::new(token)
    }
}

/// Ticks only when told to. For hosts that own their clock, and for tests.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    tasks: Arc<Mutex<Vec<ManualEntry>>>,
}

struct ManualEntry {
    period: Duration,
    token: CancellationToken,
    task: Task,
}

impl Debug for ManualEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualEntry")
            .field("period", &self.period)
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every live task once and returns how many ran.
    pub fn tick(&self) -> usize {
        let live: Vec<Task> = {
            let mut tasks = self.tasks.lock();
            tasks.retain(|entry| !entry.token.is_cancelled());
            tasks.iter().map(|entry| entry.task.clone()).collect()
        };

        for task in &live {
            task();
        }
        live.len()
    }

    pub fn active(&self) -> usize {
        self.tasks
            .lock()
            .iter()
            .filter(|entry| !entry.token.is_cancelled())
            .count()
    }

    pub fn periods(&self) -> Vec<Duration> {
        self.tasks.lock().iter().map(|entry| entry.period).collect()
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: Task) -> TaskHandle {
        let token = CancellationToken::new();
        self.tasks.lock().push(ManualEntry { period, token: token.clone(), task });
        TaskHandle::new(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, Task) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let task: Task = Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (count, task)
    }

    #[test]
    fn manual_ticks_until_cancelled() {
        let scheduler = ManualScheduler::new();
        let (count, task) = counter();

        let mut handle = scheduler.every(Duration::from_secs(30), task);
        assert_eq!(scheduler.tick(), 1);
        assert_eq!(scheduler.tick(), 1);

        handle.cancel();
        assert_eq!(scheduler.active(), 0);
        assert_eq!(scheduler.tick(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_the_handle_cancels() {
        let scheduler = ManualScheduler::new();
        let (_count, task) = counter();

        drop(scheduler.every(Duration::from_secs(1), task));
        assert_eq!(scheduler.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_waits_one_period_before_first_run() {
        let (count, task) = counter();
        let mut handle = TokioScheduler.every(Duration::from_secs(30), task);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(90)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
