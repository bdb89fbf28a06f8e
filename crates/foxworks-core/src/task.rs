//! Background Tasks
//!
//! Owned handles for long-running worker threads with cooperative stop.
//! The owner must stop and join its task before releasing anything the task
//! reports back to; [`TaskHandle::shutdown`] does both.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{CoreError, CoreResult};

/// Cooperative stop flag shared between a task and its owner
#[derive(Debug, Clone, Default)]
pub struct StopToken {
    stopped: Arc<AtomicBool>,
}

impl StopToken {
    /// Create a token that has not been stopped
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the task to exit at its next check
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    /// Check whether a stop has been requested
    pub fn is_stop_requested(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Sleep for up to `interval`, returning early when woken.
    ///
    /// Returns `false` once a stop has been requested.
    pub fn idle(&self, interval: Duration) -> bool {
        if self.is_stop_requested() {
            return false;
        }
        thread::park_timeout(interval);
        !self.is_stop_requested()
    }
}

/// Named worker thread that is stopped and joined by its owner
pub struct TaskHandle {
    handle: Option<JoinHandle<()>>,
    name: String,
    stop: StopToken,
}

impl TaskHandle {
    /// Spawn a new task; `f` receives the task's stop token
    pub fn spawn<F>(name: impl Into<String>, f: F) -> CoreResult<Self>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let name = name.into();
        let stop = StopToken::new();
        let task_stop = stop.clone();

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || f(task_stop))
            .map_err(|source| CoreError::Spawn {
                name: name.clone(),
                source,
            })?;

        Ok(Self {
            handle: Some(handle),
            name,
            stop,
        })
    }

    /// Get the task name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True while the thread is alive and no stop has been requested
    pub fn is_running(&self) -> bool {
        !self.stop.is_stop_requested()
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Wake the task if it is idling
    pub fn wake(&self) {
        if let Some(handle) = &self.handle {
            handle.thread().unpark();
        }
    }

    /// Request a stop without waiting
    pub fn request_stop(&self) {
        self.stop.request_stop();
        self.wake();
    }

    /// Stop the task and wait for it to exit.
    ///
    /// Returns `false` if the task panicked. Calling it again is a no-op.
    pub fn shutdown(&mut self) -> bool {
        self.request_stop();
        match self.handle.take() {
            Some(handle) => match handle.join() {
                Ok(()) => {
                    log::debug!("Task '{}' stopped", self.name);
                    true
                }
                Err(_) => {
                    log::error!("Task '{}' panicked", self.name);
                    false
                }
            },
            None => true,
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    #[test]
    fn test_task_runs_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_clone = counter.clone();

        let mut task = TaskHandle::spawn("test-task", move |stop| {
            while stop.idle(Duration::from_millis(1)) {
                counter_clone.fetch_add(1, Ordering::Relaxed);
            }
        })
        .unwrap();

        assert_eq!(task.name(), "test-task");
        let start = Instant::now();
        while counter.load(Ordering::Relaxed) == 0 {
            assert!(start.elapsed().as_secs() < 5, "Task never ran");
            thread::yield_now();
        }
        assert!(task.is_running());

        assert!(task.shutdown());
        assert!(!task.is_running());
        let count = counter.load(Ordering::Relaxed);
        thread::sleep(Duration::from_millis(10));
        assert_eq!(counter.load(Ordering::Relaxed), count);
    }

    #[test]
    fn test_stop_wakes_idle_task() {
        let mut task = TaskHandle::spawn("sleepy-task", |stop| {
            while stop.idle(Duration::from_secs(60)) {}
        })
        .unwrap();

        let start = Instant::now();
        assert!(task.shutdown());
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut task = TaskHandle::spawn("once", |_| {}).unwrap();
        assert!(task.shutdown());
        assert!(task.shutdown());
    }

    #[test]
    fn test_panicking_task_reports_failure() {
        let mut task = TaskHandle::spawn("panics", |_| panic!("boom")).unwrap();
        assert!(!task.shutdown());
    }
}
