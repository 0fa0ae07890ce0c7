//! # Stage: Scheduler
//!
//! ## Responsibility
//! Re-run a widget's fetch→render path, or any other periodic action, on a
//! fixed interval, and hand back a handle that stops it.
//!
//! ## Guarantees
//! - The first scheduled run happens one full period after start
//!   ([`spawn_poll`] additionally runs once immediately)
//! - Runs of one task never overlap: each run is awaited before the next
//!   tick, and ticks missed meanwhile are skipped
//! - Stopping (or dropping) a [`TaskHandle`] cancels the task at its next
//!   await point
//! - Tasks are independent; one widget's schedule never waits on another's
//!
//! ## NOT Responsible For
//! - Timeouts of the work itself (a hung fetch holds its own task only)

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::widgets::PollWidget;

/// Handle to a running scheduled task.
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl TaskHandle {
    fn idle(name: String) -> Self {
        Self { name, handle: None }
    }

    /// Task name, as given at spawn time.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the task is still scheduled.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the task. Idempotent.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!(task = %self.name, "scheduled task stopped");
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Run `task` every `period`, starting one period from now.
///
/// A zero period is rejected with a warning and yields a handle that is not
/// running.
pub fn spawn_repeating<F, Fut>(name: impl Into<String>, period: Duration, mut task: F) -> TaskHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    if period.is_zero() {
        warn!(task = %name, "refusing to schedule task with zero period");
        return TaskHandle::idle(name);
    }

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            task().await;
        }
    });

    debug!(task = %name, period_ms = period.as_millis() as u64, "scheduled task started");
    TaskHandle {
        name,
        handle: Some(handle),
    }
}

/// Refresh `widget` now, then every `period`.
pub fn spawn_poll<W: PollWidget>(widget: Arc<W>, period: Duration) -> TaskHandle {
    let name = widget.name().to_string();
    if period.is_zero() {
        warn!(task = %name, "refusing to poll with zero period");
        return TaskHandle::idle(name);
    }

    let handle = tokio::spawn(async move {
        widget.refresh().await;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            widget.refresh().await;
        }
    });

    debug!(task = %name, period_ms = period.as_millis() as u64, "poll loop started");
    TaskHandle {
        name,
        handle: Some(handle),
    }
}

/// Run `work` once in the background.
pub fn spawn_detached<Fut>(name: impl Into<String>, work: Fut) -> TaskHandle
where
    Fut: Future<Output = ()> + Send + 'static,
{
    let name = name.into();
    let handle = tokio::spawn(work);
    debug!(task = %name, "one-shot task started");
    TaskHandle {
        name,
        handle: Some(handle),
    }
}

/// Refresh `widget` once in the background (documents loaded at startup).
pub fn spawn_once<W: PollWidget>(widget: Arc<W>) -> TaskHandle {
    let name = widget.name().to_string();
    spawn_detached(name, async move {
        widget.refresh().await;
    })
}

/// Owner of every long-lived task; stopping it is the page-teardown path.
#[derive(Debug, Default)]
pub struct TaskSet {
    tasks: Vec<TaskHandle>,
}

impl TaskSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `handle`.
    pub fn push(&mut self, handle: TaskHandle) {
        self.tasks.push(handle);
    }

    /// Number of tasks held (running or not).
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the set holds no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stop every task.
    pub fn shutdown(&mut self) {
        for task in &mut self.tasks {
            task.stop();
        }
        debug!(count = self.tasks.len(), "all scheduled tasks stopped");
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        hits: AtomicUsize,
    }

    #[async_trait]
    impl PollWidget for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn refresh(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeating_first_run_after_one_period() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let _task = spawn_repeating("tick", Duration::from_millis(1000), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2501)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_ticks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let mut task = spawn_repeating("tick", Duration::from_millis(100), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(250)).await;
        task.stop();
        let seen = hits.load(Ordering::SeqCst);
        assert_eq!(seen, 2);
        assert!(!task.is_running());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(hits.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_refreshes_immediately_then_periodically() {
        let widget = Arc::new(Counting {
            hits: AtomicUsize::new(0),
        });
        let _task = spawn_poll(widget.clone(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(widget.hits.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(widget.hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_once_refreshes_exactly_once() {
        let widget = Arc::new(Counting {
            hits: AtomicUsize::new(0),
        });
        let task = spawn_once(widget.clone());
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(widget.hits.load(Ordering::SeqCst), 1);
        assert!(!task.is_running());
    }

    #[tokio::test]
    async fn test_zero_period_is_not_scheduled() {
        let task = spawn_repeating("never", Duration::ZERO, || async {});
        assert!(!task.is_running());
        assert_eq!(task.name(), "never");
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_set_shutdown_stops_all() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut set = TaskSet::new();
        for _ in 0..3 {
            let counter = hits.clone();
            set.push(spawn_repeating("t", Duration::from_millis(100), move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            }));
        }
        assert_eq!(set.len(), 3);
        set.shutdown();
        assert!(set.is_empty());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
