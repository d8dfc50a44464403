//! Cancellable timers
//!
//! Both timer kinds run as tokio tasks tied to a child of a caller-supplied
//! [`CancellationToken`]. Cancelling the parent, calling `cancel`, or
//! dropping the timer stops the task.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// A task that runs an async callback on a fixed period
///
/// The first tick fires immediately. A tick never overlaps the previous
/// callback; missed ticks are delayed rather than bunched.
#[derive(Debug)]
pub struct RepeatingTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RepeatingTask {
    /// Spawns the task
    pub fn spawn<F, Fut>(period: Duration, parent: &CancellationToken, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = interval.tick() => {}
                }
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = tick() => {}
                }
            }
        });

        Self { token, handle }
    }

    /// Stops the task
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the task was cancelled or finished
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled() || self.handle.is_finished()
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// A one-shot callback scheduled after a delay
#[derive(Debug)]
pub struct DelayedTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    /// Schedules `fire` to run after `delay` unless cancelled first
    pub fn spawn<F>(delay: Duration, parent: &CancellationToken, fire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let token = parent.child_token();
        let task_token = token.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = task_token.cancelled() => {}
                _ = tokio::time::sleep(delay) => fire(),
            }
        });

        Self { token, handle }
    }

    /// Cancels the callback if it has not fired yet
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the callback fired or was cancelled
    pub fn is_done(&self) -> bool {
        self.token.is_cancelled() || self.handle.is_finished()
    }
}

impl Drop for DelayedTask {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_repeating_task_ticks_until_cancelled() {
        let root = CancellationToken::new();
        let ticks = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&ticks);

        let task = RepeatingTask::spawn(Duration::from_millis(500), &root, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        // Ticks at 0, 500, 1000 ms
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        task.cancel();
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(task.is_stopped());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_children() {
        let root = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&fired);

        let delayed = DelayedTask::spawn(Duration::from_secs(1), &root, move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });

        root.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert!(delayed.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_task_fires_once() {
        let root = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&fired);

        let _delayed = DelayedTask::spawn(Duration::from_millis(1500), &root, move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1400)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_delayed_task_cancels_it() {
        let root = CancellationToken::new();
        let fired = Arc::new(AtomicU32::new(0));
        let flag = Arc::clone(&fired);

        let delayed = DelayedTask::spawn(Duration::from_millis(100), &root, move || {
            flag.fetch_add(1, Ordering::SeqCst);
        });
        drop(delayed);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
