//! # Transaction Executor
//!
//! Priority queue of concurrency 1 feeding a single worker task. At most
//! one wire request is outstanding per instance, across all units, so
//! statistics and the read-modify-write sequence for register bits need no
//! further locking.
//!
//! Each dequeued task becomes a [`Transaction`]: the worker races the
//! driver call against the configured deadline, records per-unit and
//! aggregate statistics, and emits the `Request`/`Response`/`Data` events
//! in that order. Units that keep timing out shed low-priority traffic for
//! a cooldown window (three timeout spans) so the watcher cannot starve
//! interactive requests against a dead device.

use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, oneshot, Notify};
use tracing::{debug, warn};

use crate::api;
use crate::codec::{apply_read_scale, apply_write_scale, get_bit, set_bit};
use crate::datamap::Select;
use crate::db::DbEvent;
use crate::driver::ModbusDriver;
use crate::error::{DbError, DbResult};
use crate::transaction::{Priority, Transaction, TransactionKind};
use crate::value::{DataType, Value};

/// Transaction ids wrap at this bound.
const TRANSACTION_ID_MODULO: u64 = 1024;

/// Consecutive timeouts beyond which a unit sheds low-priority traffic.
const BACKOFF_TIMEOUT_THRESHOLD: u32 = 2;

/// Cooldown window, as a multiple of the configured timeout.
const BACKOFF_WINDOW_FACTOR: u32 = 3;

/// Ring capacity for response time samples.
const RESPONSE_TIME_SAMPLES: usize = 100;

/// Samples required before an average response time is reported.
const MIN_RESPONSE_TIME_SAMPLES: usize = 3;

/// Per-unit communication statistics.
///
/// `timeouts_count` tracks consecutive timeouts only: any non-timeout
/// response resets it. `timed_out_at` carries the instant of the latest
/// timeout and drives the low-priority cooldown predicate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnitStats {
    /// Total responses observed for the unit.
    pub requests_count: u64,
    /// Responses that carried an error.
    pub errors_count: u64,
    /// Consecutive timeouts since the last successful response.
    pub timeouts_count: u32,
    /// Instant of the most recent timeout, if the streak is live.
    pub timed_out_at: Option<Instant>,
}

/// Dispatch options for one request.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestOptions {
    /// Queue priority.
    pub(crate) priority: Priority,
    /// Values to write, keyed by register key. `None` for reads.
    pub(crate) body: Option<Vec<(u32, f64)>>,
}

struct QueuedTask {
    kind: TransactionKind,
    select: Select,
    options: RequestOptions,
    seq: u64,
    responder: oneshot::Sender<Transaction>,
}

impl PartialEq for QueuedTask {
    fn eq(&self, other: &Self) -> bool {
        self.options.priority == other.options.priority && self.seq == other.seq
    }
}

impl Eq for QueuedTask {}

impl PartialOrd for QueuedTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedTask {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: higher priority first, then FIFO within a band.
        self.options
            .priority
            .cmp(&other.options.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Inner {
    driver: Arc<dyn ModbusDriver>,
    timeout: Duration,
    queue: Mutex<BinaryHeap<QueuedTask>>,
    wake: Notify,
    destroyed: AtomicBool,
    id_serial: AtomicU64,
    enqueue_serial: AtomicU64,
    pending: Mutex<HashSet<u16>>,
    units: Mutex<HashMap<u8, UnitStats>>,
    requests_count: AtomicU64,
    errors_count: AtomicU64,
    response_times: Mutex<VecDeque<Duration>>,
    events: broadcast::Sender<DbEvent>,
}

/// Handle on the single-worker executor. Cheap to clone.
#[derive(Clone)]
pub(crate) struct Executor {
    inner: Arc<Inner>,
}

impl Executor {
    /// Spawn the worker task and return the handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn new(
        driver: Arc<dyn ModbusDriver>,
        timeout: Duration,
        events: broadcast::Sender<DbEvent>,
    ) -> Self {
        let inner = Arc::new(Inner {
            driver,
            timeout,
            queue: Mutex::new(BinaryHeap::new()),
            wake: Notify::new(),
            destroyed: AtomicBool::new(false),
            id_serial: AtomicU64::new(0),
            enqueue_serial: AtomicU64::new(0),
            pending: Mutex::new(HashSet::new()),
            units: Mutex::new(HashMap::new()),
            requests_count: AtomicU64::new(0),
            errors_count: AtomicU64::new(0),
            response_times: Mutex::new(VecDeque::with_capacity(RESPONSE_TIME_SAMPLES)),
            events,
        });

        tokio::spawn(worker(inner.clone()));

        Self { inner }
    }

    /// Enqueue one planned request and await its finished transaction.
    ///
    /// Never fails at the call level: driver failures, timeouts, backoff
    /// shortcuts and aborts all surface on the returned transaction.
    pub(crate) async fn request(
        &self,
        kind: TransactionKind,
        select: Select,
        options: RequestOptions,
    ) -> Transaction {
        if self.inner.destroyed.load(Ordering::SeqCst) {
            return self.inner.aborted_transaction(kind, select, options);
        }

        let (responder, receiver) = oneshot::channel();
        let fallback_select = select.clone();
        let fallback_options = options.clone();

        {
            let task = QueuedTask {
                kind,
                select,
                options,
                seq: self.inner.enqueue_serial.fetch_add(1, Ordering::SeqCst),
                responder,
            };
            self.inner.queue.lock().unwrap().push(task);
        }
        self.inner.wake.notify_one();

        match receiver.await {
            Ok(transaction) => transaction,
            // The worker dropped the responder without answering; only
            // possible around teardown.
            Err(_) => self
                .inner
                .aborted_transaction(kind, fallback_select, fallback_options),
        }
    }

    /// Drop all queued tasks (each finishes "Aborted") and stop the
    /// worker. Idempotent.
    pub(crate) fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }

        let drained = {
            let mut queue = self.inner.queue.lock().unwrap();
            std::mem::take(&mut *queue).into_vec()
        };
        for task in drained {
            let transaction =
                self.inner
                    .aborted_transaction(task.kind, task.select, task.options);
            let _ = task.responder.send(transaction);
        }

        self.inner.pending.lock().unwrap().clear();
        self.inner.wake.notify_one();
    }

    /// Snapshot of one unit's statistics.
    pub(crate) fn unit_stats(&self, unit: u8) -> Option<UnitStats> {
        self.inner.units.lock().unwrap().get(&unit).copied()
    }

    /// Total responses observed.
    pub(crate) fn requests_count(&self) -> u64 {
        self.inner.requests_count.load(Ordering::SeqCst)
    }

    /// Total error responses observed.
    pub(crate) fn errors_count(&self) -> u64 {
        self.inner.errors_count.load(Ordering::SeqCst)
    }

    /// Average of the recent non-timeout response times, once enough
    /// samples exist.
    pub(crate) fn avg_response_time(&self) -> Option<Duration> {
        let ring = self.inner.response_times.lock().unwrap();
        if ring.len() <= MIN_RESPONSE_TIME_SAMPLES {
            return None;
        }
        let total: Duration = ring.iter().sum();
        Some(total / ring.len() as u32)
    }

    /// Number of transactions currently dispatched and unfinished.
    pub(crate) fn pending_count(&self) -> usize {
        self.inner.pending.lock().unwrap().len()
    }

    /// True once `destroy` has been called.
    pub(crate) fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::SeqCst)
    }
}

async fn worker(inner: Arc<Inner>) {
    loop {
        let task = inner.queue.lock().unwrap().pop();
        match task {
            Some(task) => inner.execute(task).await,
            None => {
                if inner.destroyed.load(Ordering::SeqCst) {
                    break;
                }
                inner.wake.notified().await;
            }
        }
    }
}

impl Inner {
    fn next_id(&self) -> u16 {
        (self.id_serial.fetch_add(1, Ordering::SeqCst) % TRANSACTION_ID_MODULO) as u16
    }

    fn aborted_transaction(
        &self,
        kind: TransactionKind,
        select: Select,
        options: RequestOptions,
    ) -> Transaction {
        let mut transaction = Transaction::from_select(
            self.next_id(),
            kind,
            select,
            options.body,
            options.priority,
            self.timeout,
        );
        transaction.finish(Err(DbError::Aborted));
        transaction
    }

    fn in_cooldown(&self, unit: u8) -> bool {
        let units = self.units.lock().unwrap();
        match units.get(&unit) {
            Some(stats) => {
                stats.timeouts_count > BACKOFF_TIMEOUT_THRESHOLD
                    && stats
                        .timed_out_at
                        .is_some_and(|at| at.elapsed() < self.timeout * BACKOFF_WINDOW_FACTOR)
            }
            None => false,
        }
    }

    fn emit(&self, event: DbEvent) {
        let _ = self.events.send(event);
    }

    async fn execute(&self, task: QueuedTask) {
        let QueuedTask {
            kind,
            select,
            options,
            responder,
            ..
        } = task;

        let id = self.next_id();
        let mut transaction = Transaction::from_select(
            id,
            kind,
            select,
            options.body,
            options.priority,
            self.timeout,
        );

        if self.destroyed.load(Ordering::SeqCst) {
            transaction.finish(Err(DbError::Aborted));
            let _ = responder.send(transaction);
            return;
        }

        if transaction.priority == Priority::Low && self.in_cooldown(transaction.unit) {
            warn!(
                unit = transaction.unit,
                "Skipping low-priority request: unit in timeout cooldown"
            );
            transaction.finish(Err(DbError::TooManyTimeouts {
                unit: transaction.unit,
            }));
            let _ = responder.send(transaction);
            return;
        }

        self.pending.lock().unwrap().insert(id);
        self.emit(DbEvent::Request(transaction.clone()));
        debug!(
            id,
            unit = transaction.unit,
            entries = transaction.entries.len(),
            "Dispatching transaction"
        );

        let result = match tokio::time::timeout(
            self.timeout,
            run_transaction(self.driver.as_ref(), &transaction),
        )
        .await
        {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(error)) => Err(error),
            Err(_) => Err(DbError::Timeout {
                millis: self.timeout.as_millis() as u64,
            }),
        };

        if result.as_ref().err().is_some_and(DbError::is_timeout) {
            warn!(id, unit = transaction.unit, "Transaction timed out");
        }

        transaction.finish(result);
        self.record_stats(&transaction);
        self.emit(DbEvent::Response(transaction.clone()));
        if let Some(data) = transaction.data() {
            if !data.is_empty() {
                self.emit(DbEvent::Data(data.clone()));
            }
        }
        self.pending.lock().unwrap().remove(&id);
        let _ = responder.send(transaction);
    }

    fn record_stats(&self, transaction: &Transaction) {
        self.requests_count.fetch_add(1, Ordering::SeqCst);

        let mut units = self.units.lock().unwrap();
        let stats = units.entry(transaction.unit).or_default();
        stats.requests_count += 1;

        match transaction.error() {
            Some(error) => {
                stats.errors_count += 1;
                self.errors_count.fetch_add(1, Ordering::SeqCst);
                if error.is_timeout() {
                    stats.timeouts_count += 1;
                    stats.timed_out_at = Some(Instant::now());
                } else {
                    stats.timeouts_count = 0;
                    stats.timed_out_at = None;
                }
            }
            None => {
                stats.timeouts_count = 0;
                stats.timed_out_at = None;
            }
        }
        drop(units);

        if !transaction.is_timed_out() {
            let mut ring = self.response_times.lock().unwrap();
            if ring.len() == RESPONSE_TIME_SAMPLES {
                ring.pop_front();
            }
            ring.push_back(transaction.duration());
        }
    }
}

// ============================================================================
// Per-transaction wire semantics
// ============================================================================

async fn run_transaction(
    driver: &dyn ModbusDriver,
    transaction: &Transaction,
) -> DbResult<HashMap<u32, f64>> {
    match transaction.kind {
        TransactionKind::Read => {
            let words = api::read(driver, transaction).await?;
            derive_read_payload(transaction, &words)
        }
        TransactionKind::Write => {
            let body: HashMap<u32, f64> = transaction
                .body
                .as_ref()
                .ok_or_else(|| DbError::validation("Write transaction requires a body"))?
                .iter()
                .copied()
                .collect();

            // Register-scope bits live inside whole words: fetch the
            // current words first, then patch the addressed bits. Both
            // wire operations run inside this one queue slot.
            let needs_read_modify_write = transaction.scope.is_register()
                && transaction
                    .entries
                    .iter()
                    .any(|e| e.data_type == DataType::Bit);
            let current = if needs_read_modify_write {
                api::read(driver, transaction).await?
            } else {
                BTreeMap::new()
            };

            let (values, echo) = build_write_values(transaction, &body, current)?;
            api::write(driver, transaction, &values).await?;
            Ok(echo)
        }
    }
}

/// Derive the user-facing value for each declared entry of a read.
fn derive_read_payload(
    transaction: &Transaction,
    words: &BTreeMap<u16, Value>,
) -> DbResult<HashMap<u32, f64>> {
    let mut payload = HashMap::with_capacity(transaction.entries.len());

    for entry in &transaction.entries {
        let value = words.get(&entry.address).ok_or(DbError::MissingAddress {
            address: entry.address,
        })?;

        let user = if transaction.scope.is_state() {
            value.as_f64()
        } else if entry.data_type == DataType::Bit {
            let word = value.as_word().ok_or(DbError::MissingAddress {
                address: entry.address,
            })?;
            f64::from(get_bit(word, entry.bit)?)
        } else if entry.data_type.is_integer() {
            apply_read_scale(value.as_f64(), entry.scale)
        } else {
            value.as_f64()
        };

        payload.insert(entry.key, user);
    }

    Ok(payload)
}

/// Turn the user-supplied body into per-address wire values, plus the echo
/// map reported as the write's result.
fn build_write_values(
    transaction: &Transaction,
    body: &HashMap<u32, f64>,
    current: BTreeMap<u16, Value>,
) -> DbResult<(BTreeMap<u16, Value>, HashMap<u32, f64>)> {
    let mut values = current;
    let mut echo = HashMap::with_capacity(transaction.entries.len());

    for entry in &transaction.entries {
        let requested = *body.get(&entry.key).ok_or_else(|| {
            DbError::validation(format!("No value supplied for key {}", entry.key))
        })?;

        if transaction.scope.is_state() {
            let on = requested > 0.0;
            values.insert(entry.address, Value::Bit(on));
            echo.insert(entry.key, f64::from(u8::from(on)));
        } else if entry.data_type == DataType::Bit {
            let word = values
                .get(&entry.address)
                .and_then(Value::as_word)
                .ok_or(DbError::MissingAddress {
                    address: entry.address,
                })?;
            let on = requested > 0.0;
            let updated = set_bit(word, entry.bit, on)?;
            values.insert(entry.address, Value::U16(updated));
            echo.insert(entry.key, f64::from(u8::from(on)));
        } else if entry.data_type.is_integer() {
            let scaled = apply_write_scale(requested, entry.scale);
            values.insert(entry.address, Value::from_f64(entry.data_type, scaled));
            echo.insert(entry.key, requested);
        } else {
            values.insert(entry.address, Value::from_f64(entry.data_type, requested));
            echo.insert(entry.key, requested);
        }
    }

    Ok((values, echo))
}

// ============================================================================
// Tests
// ============================================================================
