//! Drives poll cycles: one immediately on activation, then one per interval.

use crate::api::{Endpoint, Fetch};
use crate::sync::store::{CommitOutcome, SnapshotStore};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
}

/// What happened to one requested cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A new snapshot was published
    Applied { seq: u64 },
    /// Every endpoint failed; the error banner was published
    Failed { seq: u64 },
    /// Another cycle was still in flight
    Skipped,
    /// The scheduler was deactivated before the results could land
    Discarded,
    /// A newer cycle had already been applied
    OutOfOrder,
}

/// Holds the in-flight slot for one cycle. The slot stores the holder's id
/// (0 when free), so a guard dropped late by an aborted task cannot release a
/// slot that a newer cycle has since taken.
struct InFlightGuard {
    slot: Arc<AtomicU64>,
    id: u64,
}

impl InFlightGuard {
    fn acquire(slot: &Arc<AtomicU64>, id: u64) -> Option<Self> {
        slot.compare_exchange(0, id, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                slot: Arc::clone(slot),
                id,
            })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let _ = self
            .slot
            .compare_exchange(self.id, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

struct Shared<F> {
    fetcher: F,
    endpoints: Vec<Endpoint>,
    interval: Duration,
    store: SnapshotStore,
    in_flight: Arc<AtomicU64>,
    next_guard: AtomicU64,
    next_seq: AtomicU64,
    cycle: Mutex<Option<AbortHandle>>,
}

impl<F> Shared<F> {
    fn try_acquire(&self) -> Option<InFlightGuard> {
        let id = self.next_guard.fetch_add(1, Ordering::AcqRel) + 1;
        InFlightGuard::acquire(&self.in_flight, id)
    }
}

impl<F: Fetch> Shared<F> {
    async fn run_cycle(&self, epoch: u64, _guard: InFlightGuard) -> PollOutcome {
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel) + 1;
        if !self.store.begin_cycle(epoch) {
            return PollOutcome::Discarded;
        }
        debug!(seq, endpoints = self.endpoints.len(), "poll cycle started");

        let results = self.fetcher.fetch_all(&self.endpoints).await;

        match self.store.commit(epoch, seq, results) {
            CommitOutcome::Applied => PollOutcome::Applied { seq },
            CommitOutcome::Failed => PollOutcome::Failed { seq },
            CommitOutcome::OutOfOrder => PollOutcome::OutOfOrder,
            CommitOutcome::Discarded => PollOutcome::Discarded,
        }
    }

    /// Timer tick: start a cycle in the background unless one is running
    fn spawn_cycle(self: &Arc<Self>, epoch: u64) {
        let Some(guard) = self.try_acquire() else {
            debug!("poll tick skipped, previous cycle still in flight");
            return;
        };
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            shared.run_cycle(epoch, guard).await;
        });
        *self.cycle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle.abort_handle());
    }
}

/// Polls a fixed set of endpoints on an interval and publishes into a `SnapshotStore`
pub struct PollScheduler<F> {
    shared: Arc<Shared<F>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<F> Clone for PollScheduler<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            ticker: Arc::clone(&self.ticker),
        }
    }
}

impl<F: Fetch> PollScheduler<F> {
    pub fn new(
        fetcher: F,
        endpoints: Vec<Endpoint>,
        interval: Duration,
        store: SnapshotStore,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                fetcher,
                endpoints,
                interval,
                store,
                in_flight: Arc::new(AtomicU64::new(0)),
                next_guard: AtomicU64::new(0),
                next_seq: AtomicU64::new(0),
                cycle: Mutex::new(None),
            }),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.shared.store
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    pub fn state(&self) -> SchedulerState {
        match *self.ticker.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(_) => SchedulerState::Polling,
            None => SchedulerState::Idle,
        }
    }

    /// Idle -> Polling: run a cycle now, then on every interval.
    /// Calling this while already polling does nothing. Needs a tokio runtime.
    pub fn activate(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(|e| e.into_inner());
        if ticker.is_some() {
            return;
        }

        let epoch = self.shared.store.open_epoch();
        let shared = Arc::clone(&self.shared);
        info!(
            epoch,
            interval_secs = shared.interval.as_secs_f64(),
            "polling activated"
        );
        *ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(shared.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                // The first tick completes immediately
                interval.tick().await;
                shared.spawn_cycle(epoch);
            }
        }));
    }

    /// Polling -> Idle: stop the timer, abort the running cycle and make sure
    /// nothing still outstanding can touch the store.
    pub fn deactivate(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(ticker) = ticker {
            ticker.abort();
            info!("polling deactivated");
        }
        if let Some(cycle) = self
            .shared
            .cycle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            cycle.abort();
        }
        // The aborted task may not be dropped until later; free its slot now
        // so a prompt reactivation polls immediately. The closed epoch keeps
        // its results out of the store.
        self.shared.in_flight.store(0, Ordering::Release);
        self.shared.store.close_epoch();
    }

    /// Run one cycle on the caller's task, under the same one-at-a-time rule as the timer
    pub async fn poll_now(&self) -> PollOutcome {
        let Some(epoch) = self.shared.store.current_epoch() else {
            return PollOutcome::Discarded;
        };
        let Some(guard) = self.shared.try_acquire() else {
            debug!("poll skipped, previous cycle still in flight");
            return PollOutcome::Skipped;
        };
        self.shared.run_cycle(epoch, guard).await
    }
}
