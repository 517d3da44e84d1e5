//! Pacer for outbound Birdeye API calls.
//!
//! Tasks are drained by a single worker in submission order; no task starts
//! until the previous one has completed. Before each start the worker prunes
//! a trailing one-second window of start timestamps and sleeps out the
//! remainder of the window when the ceiling is met, so no more than
//! `max_per_second` calls ever begin within any trailing window.

use futures::{future::BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// The pacer worker has shut down and can no longer run tasks.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("pacer worker is no longer running")]
pub struct PacerClosed;

/// Serial task queue with a trailing-window start-rate ceiling.
pub struct BirdeyePacer {
    jobs: mpsc::UnboundedSender<Job>,
    window: Arc<Mutex<VecDeque<Instant>>>,
    max_per_window: usize,
    window_length: Duration,
}

impl BirdeyePacer {
    /// Creates the pacer and spawns its drain worker.
    #[must_use]
    pub fn new(max_per_second: usize) -> Self {
        Self::with_window(max_per_second, Duration::from_secs(1))
    }

    /// Window length is configurable for tests; production uses one second.
    #[must_use]
    pub fn with_window(max_per_window: usize, window_length: Duration) -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let window: Arc<Mutex<VecDeque<Instant>>> = Arc::new(Mutex::new(VecDeque::new()));

        let worker_window = Arc::clone(&window);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                Self::wait_for_slot(&worker_window, max_per_window, window_length).await;
                job().await;
            }
            trace!("pacer worker shutting down");
        });

        Self { jobs, window, max_per_window, window_length }
    }

    /// Enqueues a task and resolves to its output once the worker has run it.
    ///
    /// The task is enqueued before this function returns, so call order is
    /// execution order. Tasks run strictly FIFO, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`PacerClosed`] if the worker has shut down.
    pub fn schedule<T, F>(&self, task: F) -> impl Future<Output = Result<T, PacerClosed>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            async move {
                // The receiver may have been dropped; the task still ran.
                let _ = tx.send(task.await);
            }
            .boxed()
        });
        let enqueued = self.jobs.send(job).map_err(|_| PacerClosed);
        async move {
            enqueued?;
            rx.await.map_err(|_| PacerClosed)
        }
    }

    /// Blocks until starting a call would keep the trailing window under the
    /// ceiling, then records the start timestamp.
    async fn wait_for_slot(
        window: &Mutex<VecDeque<Instant>>,
        max_per_window: usize,
        window_length: Duration,
    ) {
        loop {
            let wait = {
                let mut timestamps = window.lock();
                let now = Instant::now();
                while timestamps
                    .front()
                    .is_some_and(|start| now.duration_since(*start) >= window_length)
                {
                    timestamps.pop_front();
                }
                if timestamps.len() < max_per_window {
                    timestamps.push_back(now);
                    None
                } else {
                    // Sleep until the oldest recorded start leaves the window.
                    timestamps
                        .front()
                        .map(|oldest| window_length.saturating_sub(now.duration_since(*oldest)))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    trace!(delay_ms = delay.as_millis() as u64, "pacer window full, waiting");
                    tokio::time::sleep(delay.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Number of starts recorded in the current trailing window.
    #[must_use]
    pub fn recent_starts(&self) -> usize {
        let now = Instant::now();
        self.window
            .lock()
            .iter()
            .filter(|start| now.duration_since(**start) < self.window_length)
            .count()
    }

    /// Configured per-window ceiling.
    #[must_use]
    pub fn max_per_window(&self) -> usize {
        self.max_per_window
    }
}
