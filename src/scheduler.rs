//! # Polling Scheduler
//!
//! Divisor-aligned periodic polling. One round of `interval` seconds is
//! cut into `round_size` equal ticks; every declared frequency that
//! divides `round_size` owns an exact subset of those ticks, so no
//! per-entry timers are needed.
//!
//! The divisor pairing makes the arithmetic work out: the divisors of
//! `round_size` listed ascending, zipped with themselves reversed, map
//! every divisor `d` to its mirror `round_size / d`. A tick `t` fires
//! frequency `f` when `(t + 1)` is a multiple of `f`'s mirror, which
//! happens exactly `f` times per round. Frequencies that do not divide
//! `round_size` never fire; clamping `round_size` to at least 12 (a
//! highly composite number) keeps the useful frequencies 1, 2, 3, 4, 6
//! and 12 available.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::{broadcast, Notify};
use tracing::{debug, warn};

use crate::datamap::{Datamap, Method};
use crate::db::DbEvent;
use crate::executor::{Executor, RequestOptions};
use crate::transaction::{Priority, TransactionKind};

/// Shortest accepted round duration, seconds.
pub(crate) const MIN_INTERVAL_SECS: u64 = 60;

/// Longest accepted round duration, seconds.
pub(crate) const MAX_INTERVAL_SECS: u64 = 3600;

/// Smallest accepted round size (ticks per round).
pub(crate) const MIN_ROUND_SIZE: u32 = 12;

/// Largest accepted round size (ticks per round).
pub(crate) const MAX_ROUND_SIZE: u32 = 36;

/// Floor for the delay between consecutive ticks.
const MIN_TICK_DELAY: Duration = Duration::from_secs(1);

/// Divisors of `n`, ascending.
pub(crate) fn divisors(n: u32) -> Vec<u32> {
    (1..=n).filter(|d| n % d == 0).collect()
}

/// Each divisor of `round_size` paired with its mirror from the reversed
/// divisor list. Divisors pair up as `d * mirror == round_size`.
pub(crate) fn divisor_map(round_size: u32) -> Vec<(u32, u32)> {
    let divs = divisors(round_size);
    divs.iter()
        .copied()
        .zip(divs.iter().rev().copied())
        .collect()
}

/// Frequencies whose keys are due for a refresh at 0-based tick `t`.
pub(crate) fn due_frequencies(tick: u32, round_size: u32) -> Vec<u32> {
    divisor_map(round_size)
        .into_iter()
        .filter(|(divisor, _)| (tick + 1) % divisor == 0)
        .map(|(_, freq)| freq)
        .collect()
}

struct SchedulerState {
    round: AtomicU32,
    tick: AtomicU32,
    destroyed: AtomicBool,
    cancel: Notify,
}

/// Handle on the recurring poll timer.
pub(crate) struct Scheduler {
    state: Arc<SchedulerState>,
}

impl Scheduler {
    /// Start the tick loop. `interval_secs` and `round_size` must already
    /// be clamped by the caller.
    pub(crate) fn start(
        datamap: Arc<Datamap>,
        executor: Executor,
        events: broadcast::Sender<DbEvent>,
        interval_secs: u64,
        round_size: u32,
    ) -> Self {
        let state = Arc::new(SchedulerState {
            round: AtomicU32::new(0),
            tick: AtomicU32::new(0),
            destroyed: AtomicBool::new(false),
            cancel: Notify::new(),
        });

        tokio::spawn(run(
            state.clone(),
            datamap,
            executor,
            events,
            interval_secs,
            round_size,
        ));

        Self { state }
    }

    /// Cancel the pending timer and stop the loop. Idempotent.
    pub(crate) fn destroy(&self) {
        self.state.destroyed.store(true, Ordering::SeqCst);
        self.state.cancel.notify_one();
    }

    /// Completed rounds since start.
    pub(crate) fn round(&self) -> u32 {
        self.state.round.load(Ordering::SeqCst)
    }

    /// Current 0-based tick within the round.
    pub(crate) fn tick(&self) -> u32 {
        self.state.tick.load(Ordering::SeqCst)
    }
}

async fn run(
    state: Arc<SchedulerState>,
    datamap: Arc<Datamap>,
    executor: Executor,
    events: broadcast::Sender<DbEvent>,
    interval_secs: u64,
    round_size: u32,
) {
    let tick_interval = Duration::from_secs(interval_secs / u64::from(round_size));

    loop {
        if state.destroyed.load(Ordering::SeqCst) {
            break;
        }

        let started = Instant::now();
        let tick = state.tick.load(Ordering::SeqCst);
        let round = state.round.load(Ordering::SeqCst);
        let _ = events.send(DbEvent::Tick { round, tick });

        let keys: Vec<u32> = {
            let mut set = BTreeSet::new();
            for freq in due_frequencies(tick, round_size) {
                if let Ok(freq) = u8::try_from(freq) {
                    if let Some(bucket) = datamap.watch_bucket(freq) {
                        set.extend(bucket.iter().copied());
                    }
                }
            }
            set.into_iter().collect()
        };

        if !keys.is_empty() {
            match datamap.select_all(Method::Read, &keys) {
                Ok(selects) => {
                    debug!(tick, round, requests = selects.len(), "Dispatching watch reads");
                    let requests = selects.into_iter().map(|select| {
                        executor.request(
                            TransactionKind::Read,
                            select,
                            RequestOptions {
                                priority: Priority::Low,
                                body: None,
                            },
                        )
                    });
                    join_all(requests).await;
                }
                Err(error) => warn!(%error, "Watch planning failed"),
            }
        }

        if tick + 1 >= round_size {
            state.tick.store(0, Ordering::SeqCst);
            state.round.fetch_add(1, Ordering::SeqCst);
        } else {
            state.tick.store(tick + 1, Ordering::SeqCst);
        }

        let elapsed = started.elapsed();
        let delay = tick_interval.saturating_sub(elapsed).max(MIN_TICK_DELAY);
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = state.cancel.notified() => break,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
