//! Admission queue serializing access to the primary upstream.
//!
//! The primary fullnode publishes no concurrency guarantee, so bursty client
//! traffic is converted into a gently paced serial stream: one request holds
//! the slot while the rest park in FIFO order. Releasing the slot is
//! deliberately slow — a fixed settle delay plus a backlog-proportional
//! delay (capped) — which trades latency for upstream stability.
//!
//! Slot release is driven by a dedicated worker fed from an unbounded
//! channel, so the RAII permit can trigger it from `Drop` without spawning
//! a task per request. Every permit sends exactly one release message on
//! drop, which keeps the FIFO from deadlocking on error paths.

use crate::config::QueueConfig;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::{mpsc, oneshot};
use tracing::trace;

struct QueueState {
    processing: bool,
    waiters: VecDeque<oneshot::Sender<()>>,
}

/// Queue counters reported on `/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    pub queued: usize,
    pub processing: bool,
    pub active: usize,
}

/// Single-slot admission gate with a FIFO backlog.
pub struct AdmissionQueue {
    state: Mutex<QueueState>,
    active: AtomicUsize,
    releases: mpsc::UnboundedSender<()>,
    config: QueueConfig,
}

/// RAII permit for the admission slot.
///
/// Dropping the permit decrements the active counter and schedules the slot
/// release through the queue's release worker. Holding it across every exit
/// path of a request is what guarantees exactly-one release.
pub struct AdmissionPermit {
    queue: Arc<AdmissionQueue>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.queue.active.fetch_sub(1, Ordering::SeqCst);
        // If the worker is gone the process is shutting down; parked
        // waiters are abandoned along with everything else.
        let _ = self.queue.releases.send(());
    }
}

impl AdmissionQueue {
    /// Creates the queue and spawns its release worker.
    #[must_use]
    pub fn new(config: QueueConfig) -> Arc<Self> {
        let (releases, mut rx) = mpsc::unbounded_channel::<()>();
        let queue = Arc::new(Self {
            state: Mutex::new(QueueState { processing: false, waiters: VecDeque::new() }),
            active: AtomicUsize::new(0),
            releases,
            config,
        });

        let worker = Arc::clone(&queue);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(worker.release_delay()).await;
                worker.wake_next();
            }
        });

        queue
    }

    /// Acquires the admission slot, parking FIFO behind the current holder.
    pub async fn acquire(self: &Arc<Self>) -> AdmissionPermit {
        loop {
            let waiter = {
                let mut state = self.state.lock();
                if !state.processing && self.active.load(Ordering::SeqCst) < self.config.max_concurrent
                {
                    state.processing = true;
                    None
                } else {
                    let (tx, rx) = oneshot::channel();
                    state.waiters.push_back(tx);
                    Some(rx)
                }
            };

            match waiter {
                None => {
                    self.active.fetch_add(1, Ordering::SeqCst);
                    return AdmissionPermit { queue: Arc::clone(self) };
                }
                Some(rx) => {
                    if rx.await.is_ok() {
                        // The releaser handed the slot over without clearing
                        // the processing flag, so no one barged in between.
                        self.active.fetch_add(1, Ordering::SeqCst);
                        return AdmissionPermit { queue: Arc::clone(self) };
                    }
                    // Sender dropped without a handoff; retry from scratch.
                }
            }
        }
    }

    /// Whether new work should bypass the queue and go straight to the
    /// fallback endpoint.
    #[must_use]
    pub fn overloaded(&self) -> bool {
        self.state.lock().waiters.len() > self.config.overflow_threshold
            || self.active.load(Ordering::SeqCst) > self.config.max_concurrent
    }

    #[must_use]
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            queued: state.waiters.len(),
            processing: state.processing,
            active: self.active.load(Ordering::SeqCst),
        }
    }

    /// Settle delay plus the backlog-proportional component, capped.
    fn release_delay(&self) -> Duration {
        let queued = self.state.lock().waiters.len() as u64;
        let extra = (queued * self.config.per_waiter_delay_ms).min(self.config.max_extra_delay_ms);
        Duration::from_millis(self.config.settle_delay_ms + extra)
    }

    /// Hands the slot to the next live waiter, or returns the queue to idle.
    fn wake_next(&self) {
        let mut state = self.state.lock();
        loop {
            match state.waiters.pop_front() {
                Some(waiter) => {
                    if waiter.send(()).is_ok() {
                        trace!(queued = state.waiters.len(), "admission slot handed to next waiter");
                        return;
                    }
                    // Waiter gave up (client gone); try the next one.
                }
                None => {
                    state.processing = false;
                    trace!("admission queue idle");
                    return;
                }
            }
        }
    }
}
