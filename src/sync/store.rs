//! The published view state, behind a watch channel.
//!
//! Every change goes through `send_if_modified`, so a rejected commit neither
//! mutates the state nor wakes subscribers.

use crate::api::{EndpointResult, FetchError};
use crate::models::Snapshot;
use crate::sync::merger::merge;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// What the front ends observe
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    /// The latest applied snapshot, if any cycle has succeeded
    pub snapshot: Option<Arc<Snapshot>>,
    /// A cycle is running right now
    pub loading: bool,
    /// The scheduler is armed
    pub polling: bool,
    /// Non-blocking message about the latest cycle
    pub banner: Option<String>,
    /// The latest cycle produced nothing usable; any snapshot shown is older
    pub last_cycle_failed: bool,
    /// A protected endpoint rejected the session
    pub auth_required: bool,
    pub last_applied_seq: u64,
    epoch: u64,
    closed: bool,
}

/// Result of handing a cycle's results to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new snapshot replaced the old one
    Applied,
    /// Every endpoint failed; the previous snapshot stays on display
    Failed,
    /// A newer cycle was already applied
    OutOfOrder,
    /// The epoch was closed or replaced; nothing changed
    Discarded,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<ViewState>>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Start from a snapshot saved by an earlier run
    pub fn seeded(snapshot: Snapshot) -> Self {
        let banner = format!(
            "Showing cached data from {}",
            snapshot.fetched_at.format("%Y-%m-%d %H:%M UTC")
        );
        let (tx, _rx) = watch::channel(ViewState {
            snapshot: Some(Arc::new(snapshot)),
            banner: Some(banner),
            ..ViewState::default()
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().snapshot.clone()
    }

    /// The epoch results must carry to be accepted, or `None` once closed
    pub fn current_epoch(&self) -> Option<u64> {
        let state = self.tx.borrow();
        (!state.closed).then_some(state.epoch)
    }

    /// Begin a new activation period, invalidating everything from earlier ones
    pub fn open_epoch(&self) -> u64 {
        let mut epoch = 0;
        self.tx.send_modify(|state| {
            state.epoch += 1;
            state.closed = false;
            state.polling = true;
            epoch = state.epoch;
        });
        epoch
    }

    /// After this, no result from the current epoch can change the state
    pub fn close_epoch(&self) {
        self.tx.send_if_modified(|state| {
            let changed = !state.closed || state.polling || state.loading;
            state.closed = true;
            state.polling = false;
            state.loading = false;
            changed
        });
    }

    /// Mark a cycle as running. False when the epoch is no longer current.
    pub fn begin_cycle(&self, epoch: u64) -> bool {
        let mut accepted = false;
        self.tx.send_if_modified(|state| {
            if state.closed || state.epoch != epoch {
                return false;
            }
            accepted = true;
            let changed = !state.loading;
            state.loading = true;
            changed
        });
        accepted
    }

    /// Merge one cycle's results into the next snapshot and publish it.
    ///
    /// Results are dropped when their epoch is stale or when a cycle with a
    /// higher sequence number has already been applied.
    pub fn commit(&self, epoch: u64, seq: u64, results: Vec<EndpointResult>) -> CommitOutcome {
        let mut outcome = CommitOutcome::Discarded;
        self.tx.send_if_modified(|state| {
            if state.closed || state.epoch != epoch {
                debug!(seq, epoch, "discarding results from an inactive epoch");
                return false;
            }
            if seq <= state.last_applied_seq {
                warn!(
                    seq,
                    last_applied = state.last_applied_seq,
                    "discarding out-of-order poll results"
                );
                outcome = CommitOutcome::OutOfOrder;
                return false;
            }

            let failures: Vec<(String, &FetchError)> = results
                .iter()
                .filter_map(|r| {
                    r.outcome
                        .as_ref()
                        .err()
                        .map(|e| (r.endpoint.kind.to_string(), e))
                })
                .collect();
            let auth_required = failures.iter().any(|(_, e)| **e == FetchError::Auth);
            let all_failed = !results.is_empty() && failures.len() == results.len();

            state.loading = false;
            state.last_applied_seq = seq;
            state.auth_required = auth_required;
            state.last_cycle_failed = all_failed;

            if all_failed {
                state.banner = Some(match &state.snapshot {
                    Some(snapshot) => format!(
                        "Refresh failed ({}); showing data from {}",
                        describe(&failures),
                        snapshot.fetched_at.format("%H:%M:%S UTC")
                    ),
                    None => format!("Could not load data ({})", describe(&failures)),
                });
                warn!(seq, failed = failures.len(), "poll cycle failed on every endpoint");
                outcome = CommitOutcome::Failed;
                return true;
            }

            let snapshot = merge(state.snapshot.as_deref(), &results, seq);
            state.banner = (!failures.is_empty())
                .then(|| format!("Some sections could not be refreshed ({})", describe(&failures)));
            state.snapshot = Some(Arc::new(snapshot));
            info!(seq, failed = failures.len(), "snapshot applied");
            outcome = CommitOutcome::Applied;
            true
        });
        outcome
    }
}

fn describe(failures: &[(String, &FetchError)]) -> String {
    failures
        .iter()
        .map(|(section, error)| format!("{}: {}", section, error))
        .collect::<Vec<_>>()
        .join("; ")
}
