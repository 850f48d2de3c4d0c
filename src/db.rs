//! # Database Facade
//!
//! [`Modbusdb`] ties the pieces together: the datamap plans wire requests,
//! the executor serializes them through its priority queue, and the
//! scheduler refreshes watched entries on the tick grid. Methods resolve
//! to [`Transaction`] objects or aggregate results even when individual
//! requests failed; callers inspect `transaction.error()`. Synchronous
//! errors are reserved for validation and use on a destroyed instance.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use modbusdb::{
//!     create_register_key, DataType, Datamap, DbResult, Modbusdb, ModbusDriver,
//!     ReadResponse, SchemaEntry, Scope, UnitConfig,
//! };
//!
//! struct LoopbackDriver;
//!
//! #[async_trait::async_trait]
//! impl ModbusDriver for LoopbackDriver {
//!     async fn read_coils(&self, _: u8, _: u16, count: u16) -> DbResult<ReadResponse> {
//!         Ok(ReadResponse::from_bits(vec![false; count as usize]))
//!     }
//!     async fn read_discrete_inputs(&self, _: u8, _: u16, count: u16) -> DbResult<ReadResponse> {
//!         Ok(ReadResponse::from_bits(vec![false; count as usize]))
//!     }
//!     async fn read_holding_registers(&self, _: u8, _: u16, count: u16) -> DbResult<ReadResponse> {
//!         Ok(ReadResponse::from_words(vec![0; count as usize]))
//!     }
//!     async fn read_input_registers(&self, _: u8, _: u16, count: u16) -> DbResult<ReadResponse> {
//!         Ok(ReadResponse::from_words(vec![0; count as usize]))
//!     }
//!     async fn write_coil(&self, _: u8, _: u16, _: bool) -> DbResult<()> { Ok(()) }
//!     async fn write_register(&self, _: u8, _: u16, _: &[u8]) -> DbResult<()> { Ok(()) }
//!     async fn write_coils(&self, _: u8, _: u16, _: &[bool]) -> DbResult<()> { Ok(()) }
//!     async fn write_registers(&self, _: u8, _: u16, _: &[u8]) -> DbResult<()> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DbResult<()> {
//!     let key = create_register_key(1, Scope::InternalRegister, 10, 0)?;
//!     let datamap = Datamap::new(
//!         vec![SchemaEntry::new(key, DataType::UInt16).with_freq(6)],
//!         vec![UnitConfig::new(1)],
//!     )?;
//!
//!     let db = Modbusdb::new(Arc::new(LoopbackDriver), datamap);
//!     let transaction = db.get(key).await?;
//!     println!("value: {:?}", transaction.data());
//!
//!     db.watch()?;
//!     db.destroy()?;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::info;

use crate::datamap::{Datamap, Method};
use crate::driver::ModbusDriver;
use crate::error::{DbError, DbResult};
use crate::executor::{Executor, RequestOptions, UnitStats};
use crate::scheduler::{
    Scheduler, MAX_INTERVAL_SECS, MAX_ROUND_SIZE, MIN_INTERVAL_SECS, MIN_ROUND_SIZE,
};
use crate::transaction::{Priority, Transaction, TransactionKind};

/// Shortest accepted per-transaction timeout, seconds.
const MIN_TIMEOUT_SECS: u64 = 1;

/// Longest accepted per-transaction timeout, seconds.
const MAX_TIMEOUT_SECS: u64 = 900;

const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const DEFAULT_ROUND_SIZE: u32 = 12;

/// Buffered event slots per subscriber.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Event stream emitted by the database.
///
/// `Request` is always emitted strictly before the matching `Response`;
/// `Data` follows the `Response` that produced it.
#[derive(Debug, Clone)]
pub enum DbEvent {
    /// A scheduler tick started.
    Tick {
        /// Completed rounds so far.
        round: u32,
        /// 0-based tick within the round.
        tick: u32,
    },
    /// A transaction was dispatched to the driver.
    Request(Transaction),
    /// A transaction finished, successfully or not.
    Response(Transaction),
    /// A finished transaction produced a non-empty value map.
    Data(HashMap<u32, f64>),
}

/// Runtime configuration, clamped into the supported ranges at
/// construction.
///
/// # Example
///
/// ```rust
/// use modbusdb::DbConfig;
///
/// let config = DbConfig::new()
///     .with_interval_secs(120)
///     .with_timeout_secs(5)
///     .with_round_size(24);
/// assert_eq!(config.round_size, 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbConfig {
    /// Round duration in seconds (clamped to 60-3600).
    pub interval_secs: u64,
    /// Per-transaction timeout in seconds (clamped to 1-900).
    pub timeout_secs: u64,
    /// Ticks per round (clamped to 12-36).
    pub round_size: u32,
}

impl DbConfig {
    /// Default configuration: 60 s rounds, 60 s timeout, 12 ticks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the round duration in seconds.
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Set the per-transaction timeout in seconds.
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the number of ticks per round.
    pub fn with_round_size(mut self, round_size: u32) -> Self {
        self.round_size = round_size;
        self
    }

    fn clamped(self) -> Self {
        Self {
            interval_secs: self.interval_secs.clamp(MIN_INTERVAL_SECS, MAX_INTERVAL_SECS),
            timeout_secs: self.timeout_secs.clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
            round_size: self.round_size.clamp(MIN_ROUND_SIZE, MAX_ROUND_SIZE),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            round_size: DEFAULT_ROUND_SIZE,
        }
    }
}

/// Aggregate result of [`Modbusdb::mget`] and [`Modbusdb::mset`].
#[derive(Debug, Clone)]
pub struct MultiResult {
    /// Wall-clock time from dispatch to the last completion.
    pub total_time: Duration,
    /// Every produced transaction, including failed ones.
    pub transactions: Vec<Transaction>,
    /// Merged value maps of the successful transactions.
    pub payload: HashMap<u32, f64>,
}

/// Point-in-time snapshot of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbState {
    /// True once `destroy` was called.
    pub destroyed: bool,
    /// True while the watcher is running.
    pub watching: bool,
    /// Completed polling rounds.
    pub round: u32,
    /// Current tick within the round.
    pub tick: u32,
    /// Transactions dispatched and not yet finished.
    pub pending_count: usize,
    /// Total responses observed.
    pub requests_count: u64,
    /// Responses that carried an error.
    pub errors_count: u64,
    /// Average recent non-timeout response time, once more than three
    /// samples exist.
    pub avg_response_time: Option<Duration>,
}

/// Typed register database over a Modbus driver.
///
/// Construction spawns the executor worker, so a Tokio runtime must be
/// current. All user entry points are `&self`; the instance is intended to
/// be shared behind an `Arc`.
pub struct Modbusdb {
    datamap: Arc<Datamap>,
    executor: Executor,
    scheduler: Mutex<Option<Scheduler>>,
    events: broadcast::Sender<DbEvent>,
    config: DbConfig,
    destroyed: AtomicBool,
}

impl Modbusdb {
    /// Create an instance with the default configuration.
    pub fn new(driver: Arc<dyn ModbusDriver>, datamap: Datamap) -> Self {
        Self::with_config(driver, datamap, DbConfig::default())
    }

    /// Create an instance with an explicit configuration. Out-of-range
    /// values are clamped, not rejected.
    pub fn with_config(driver: Arc<dyn ModbusDriver>, datamap: Datamap, config: DbConfig) -> Self {
        let config = config.clamped();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let executor = Executor::new(
            driver,
            Duration::from_secs(config.timeout_secs),
            events.clone(),
        );

        Self {
            datamap: Arc::new(datamap),
            executor,
            scheduler: Mutex::new(None),
            events,
            config,
            destroyed: AtomicBool::new(false),
        }
    }

    /// Subscribe to the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<DbEvent> {
        self.events.subscribe()
    }

    /// The declared datamap.
    pub fn datamap(&self) -> &Datamap {
        &self.datamap
    }

    /// The effective (clamped) configuration.
    pub fn config(&self) -> DbConfig {
        self.config
    }

    /// Read one entry at normal priority.
    pub async fn get(&self, key: u32) -> DbResult<Transaction> {
        self.check_alive()?;
        let select = self.datamap.select_one(Method::Read, key)?;
        Ok(self
            .executor
            .request(
                TransactionKind::Read,
                select,
                RequestOptions {
                    priority: Priority::Normal,
                    body: None,
                },
            )
            .await)
    }

    /// Write one entry at high priority.
    ///
    /// Writing a register-scope bit entry performs a read-modify-write:
    /// observers of the wire see two operations.
    pub async fn set(&self, key: u32, value: f64) -> DbResult<Transaction> {
        self.check_alive()?;
        let select = self.datamap.select_one(Method::Write, key)?;
        Ok(self
            .executor
            .request(
                TransactionKind::Write,
                select,
                RequestOptions {
                    priority: Priority::High,
                    body: Some(vec![(key, value)]),
                },
            )
            .await)
    }

    /// Read many entries at normal priority, batched into minimal wire
    /// requests.
    ///
    /// Individual transaction failures do not fail the call; the payload
    /// merges the value maps of the successful transactions only.
    pub async fn mget(&self, keys: &[u32]) -> DbResult<MultiResult> {
        self.check_alive()?;
        let selects = self.datamap.select_all(Method::Read, keys)?;

        let started = Instant::now();
        let requests = selects.into_iter().map(|select| {
            self.executor.request(
                TransactionKind::Read,
                select,
                RequestOptions {
                    priority: Priority::Normal,
                    body: None,
                },
            )
        });
        let transactions = join_all(requests).await;
        Ok(aggregate(started, transactions))
    }

    /// Write many entries at high priority, batched into minimal wire
    /// requests.
    pub async fn mset(&self, pairs: &[(u32, f64)]) -> DbResult<MultiResult> {
        self.check_alive()?;
        let keys: Vec<u32> = pairs.iter().map(|(key, _)| *key).collect();
        let selects = self.datamap.select_all(Method::Write, &keys)?;
        let by_key: HashMap<u32, f64> = pairs.iter().copied().collect();

        let started = Instant::now();
        let requests = selects.into_iter().map(|select| {
            let body: Vec<(u32, f64)> = select
                .entries
                .iter()
                .filter_map(|entry| by_key.get(&entry.key).map(|value| (entry.key, *value)))
                .collect();
            self.executor.request(
                TransactionKind::Write,
                select,
                RequestOptions {
                    priority: Priority::High,
                    body: Some(body),
                },
            )
        });
        let transactions = join_all(requests).await;
        Ok(aggregate(started, transactions))
    }

    /// Start periodic polling of watched entries.
    ///
    /// Fails when nothing is watched, when the watcher already runs, or on
    /// a destroyed instance.
    pub fn watch(&self) -> DbResult<()> {
        self.check_alive()?;
        if self.datamap.is_watch_empty() {
            return Err(DbError::validation("No entries declare a polling frequency"));
        }

        let mut scheduler = self.scheduler.lock().unwrap();
        if scheduler.is_some() {
            return Err(DbError::validation("Already watching"));
        }

        info!(
            interval_secs = self.config.interval_secs,
            round_size = self.config.round_size,
            "Watch started"
        );
        *scheduler = Some(Scheduler::start(
            self.datamap.clone(),
            self.executor.clone(),
            self.events.clone(),
            self.config.interval_secs,
            self.config.round_size,
        ));
        Ok(())
    }

    /// Tear down the watcher, the queue, and all pending state. Every
    /// queued transaction finishes with "Aborted"; later operations fail
    /// with `Destroyed`.
    pub fn destroy(&self) -> DbResult<()> {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return Err(DbError::Destroyed);
        }
        if let Some(scheduler) = self.scheduler.lock().unwrap().take() {
            scheduler.destroy();
        }
        self.executor.destroy();
        info!("Instance destroyed");
        Ok(())
    }

    /// Statistics snapshot for one unit, if it has seen traffic.
    pub fn unit(&self, id: u8) -> Option<UnitStats> {
        self.executor.unit_stats(id)
    }

    /// Aggregate state snapshot.
    pub fn state(&self) -> DbState {
        let scheduler = self.scheduler.lock().unwrap();
        let (watching, round, tick) = match scheduler.as_ref() {
            Some(scheduler) => (true, scheduler.round(), scheduler.tick()),
            None => (false, 0, 0),
        };

        DbState {
            destroyed: self.destroyed.load(Ordering::SeqCst),
            watching,
            round,
            tick,
            pending_count: self.executor.pending_count(),
            requests_count: self.executor.requests_count(),
            errors_count: self.executor.errors_count(),
            avg_response_time: self.executor.avg_response_time(),
        }
    }

    /// Average of the recent non-timeout response times, once more than
    /// three samples exist.
    pub fn avg_response_time(&self) -> Option<Duration> {
        self.executor.avg_response_time()
    }

    fn check_alive(&self) -> DbResult<()> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(DbError::Destroyed);
        }
        Ok(())
    }
}

impl Drop for Modbusdb {
    fn drop(&mut self) {
        if let Some(scheduler) = self.scheduler.lock().unwrap().take() {
            scheduler.destroy();
        }
        self.executor.destroy();
    }
}

fn aggregate(started: Instant, transactions: Vec<Transaction>) -> MultiResult {
    let mut payload = HashMap::new();
    for transaction in &transactions {
        if let Some(data) = transaction.data() {
            payload.extend(data.iter().map(|(key, value)| (*key, *value)));
        }
    }

    MultiResult {
        total_time: started.elapsed(),
        transactions,
        payload,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datamap::{SchemaEntry, UnitConfig};
    use crate::driver::mock::{Call, MockDriver};
    use crate::driver::ReadResponse;
    use crate::key::{create_register_key, Scope};
    use crate::value::DataType;

    fn holding(unit: u8, address: u16) -> u32 {
        create_register_key(unit, Scope::InternalRegister, address, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_resolves_transaction() {
        let key = holding(1, 10);
        let datamap = Datamap::new(
            vec![SchemaEntry::new(key, DataType::UInt16)],
            vec![UnitConfig::new(1).with_big_endian(true)],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        driver.push_read(Ok(ReadResponse::from_words(vec![99])));

        let db = Modbusdb::new(driver, datamap);
        let tx = db.get(key).await.unwrap();
        assert_eq!(tx.data().unwrap().get(&key), Some(&99.0));
        assert_eq!(db.unit(1).unwrap().requests_count, 1);
    }

    #[tokio::test]
    async fn test_get_unknown_key_fails_synchronously() {
        let datamap = Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::UInt16)],
            vec![],
        )
        .unwrap();

        let db = Modbusdb::new(Arc::new(MockDriver::new()), datamap);
        let unknown = holding(2, 0);
        assert_eq!(
            db.get(unknown).await.err(),
            Some(DbError::UnknownKey { key: unknown })
        );
    }

    #[tokio::test]
    async fn test_set_read_only_scope_fails_synchronously() {
        let key = create_register_key(1, Scope::PhysicalRegister, 0, 0).unwrap();
        let datamap =
            Datamap::new(vec![SchemaEntry::new(key, DataType::UInt16)], vec![]).unwrap();

        let db = Modbusdb::new(Arc::new(MockDriver::new()), datamap);
        assert!(db.set(key, 1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_mget_merges_payload_across_units() {
        let k1 = holding(1, 0);
        let k2 = holding(2, 0);
        let datamap = Datamap::new(
            vec![
                SchemaEntry::new(k1, DataType::UInt16),
                SchemaEntry::new(k2, DataType::UInt16),
            ],
            vec![
                UnitConfig::new(1).with_big_endian(true),
                UnitConfig::new(2).with_big_endian(true),
            ],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        driver.push_read(Ok(ReadResponse::from_words(vec![11])));
        driver.push_read(Ok(ReadResponse::from_words(vec![22])));

        let db = Modbusdb::new(driver, datamap);
        let result = db.mget(&[k2, k1]).await.unwrap();

        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.payload.get(&k1), Some(&11.0));
        assert_eq!(result.payload.get(&k2), Some(&22.0));
    }

    #[tokio::test]
    async fn test_mget_partial_failure_keeps_successes() {
        let k1 = holding(1, 0);
        let k2 = holding(2, 0);
        let datamap = Datamap::new(
            vec![
                SchemaEntry::new(k1, DataType::UInt16),
                SchemaEntry::new(k2, DataType::UInt16),
            ],
            vec![
                UnitConfig::new(1).with_big_endian(true),
                UnitConfig::new(2).with_big_endian(true),
            ],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        driver.push_read(Ok(ReadResponse::from_words(vec![11])));
        driver.push_read(Err(DbError::driver("unit 2 unreachable")));

        let db = Modbusdb::new(driver, datamap);
        let result = db.mget(&[k1, k2]).await.unwrap();

        assert_eq!(result.payload.get(&k1), Some(&11.0));
        assert!(!result.payload.contains_key(&k2));

        let failed: Vec<_> = result
            .transactions
            .iter()
            .filter(|tx| tx.error().is_some())
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].unit, 2);
    }

    #[tokio::test]
    async fn test_mset_routes_values_to_selects() {
        let k0 = holding(1, 0);
        let k1 = holding(1, 1);
        let datamap = Datamap::new(
            vec![
                SchemaEntry::new(k0, DataType::UInt16),
                SchemaEntry::new(k1, DataType::UInt16),
            ],
            vec![UnitConfig::new(1).with_big_endian(true)],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        let db = Modbusdb::new(driver.clone(), datamap);
        let result = db.mset(&[(k0, 170.0), (k1, 187.0)]).await.unwrap();

        assert_eq!(result.transactions.len(), 1);
        assert!(result.transactions[0].is_ok());
        assert_eq!(
            driver.calls()[0],
            Call::WriteRegisters {
                unit: 1,
                address: 0,
                payload: vec![0x00, 0xAA, 0x00, 0xBB]
            }
        );
    }

    #[tokio::test]
    async fn test_event_ordering() {
        let key = holding(1, 0);
        let datamap = Datamap::new(
            vec![SchemaEntry::new(key, DataType::UInt16)],
            vec![UnitConfig::new(1).with_big_endian(true)],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        driver.push_read(Ok(ReadResponse::from_words(vec![1])));

        let db = Modbusdb::new(driver, datamap);
        let mut events = db.subscribe();

        let tx = db.get(key).await.unwrap();
        assert!(tx.is_ok());

        match events.recv().await.unwrap() {
            DbEvent::Request(request) => assert!(!request.is_done()),
            other => panic!("expected Request, got {:?}", other),
        }
        match events.recv().await.unwrap() {
            DbEvent::Response(response) => assert!(response.is_done()),
            other => panic!("expected Response, got {:?}", other),
        }
        match events.recv().await.unwrap() {
            DbEvent::Data(data) => assert_eq!(data.get(&key), Some(&1.0)),
            other => panic!("expected Data, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_destroyed_instance_rejects_operations() {
        let key = holding(1, 0);
        let datamap =
            Datamap::new(vec![SchemaEntry::new(key, DataType::UInt16)], vec![]).unwrap();

        let db = Modbusdb::new(Arc::new(MockDriver::new()), datamap);
        db.destroy().unwrap();

        assert_eq!(db.get(key).await.err(), Some(DbError::Destroyed));
        assert_eq!(db.set(key, 1.0).await.err(), Some(DbError::Destroyed));
        assert_eq!(db.mget(&[key]).await.err(), Some(DbError::Destroyed));
        assert_eq!(db.watch().err(), Some(DbError::Destroyed));
        assert_eq!(db.destroy().err(), Some(DbError::Destroyed));
        assert!(db.state().destroyed);
    }

    #[tokio::test]
    async fn test_watch_requires_watched_entries() {
        let datamap = Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::UInt16)],
            vec![],
        )
        .unwrap();

        let db = Modbusdb::new(Arc::new(MockDriver::new()), datamap);
        assert!(db.watch().is_err());
    }

    #[tokio::test]
    async fn test_watch_twice_rejected() {
        let datamap = Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::UInt16).with_freq(6)],
            vec![],
        )
        .unwrap();

        let db = Modbusdb::new(Arc::new(MockDriver::new()), datamap);
        db.watch().unwrap();
        assert!(db.watch().is_err());
        assert!(db.state().watching);
        db.destroy().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_watch_polls_at_declared_frequency() {
        let key = holding(1, 10);
        let datamap = Datamap::new(
            vec![SchemaEntry::new(key, DataType::UInt16).with_freq(6)],
            vec![UnitConfig::new(1).with_big_endian(true)],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        for _ in 0..12 {
            driver.push_read(Ok(ReadResponse::from_words(vec![7])));
        }

        let db = Modbusdb::new(driver.clone(), datamap);
        let mut events = db.subscribe();
        db.watch().unwrap();

        // Run one full round: the next Tick with round == 1 means all 12
        // ticks of round 0 completed.
        loop {
            if let DbEvent::Tick { round: 1, .. } = events.recv().await.unwrap() {
                break;
            }
        }

        let reads = driver
            .calls()
            .iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::ReadHoldingRegisters {
                        unit: 1,
                        address: 10,
                        count: 1
                    }
                )
            })
            .count();
        assert_eq!(reads, 6);

        db.destroy().unwrap();
    }

    #[tokio::test]
    async fn test_config_clamping() {
        let datamap = Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::UInt16)],
            vec![],
        )
        .unwrap();

        let config = DbConfig::new()
            .with_interval_secs(10)
            .with_timeout_secs(0)
            .with_round_size(5);
        let db = Modbusdb::with_config(Arc::new(MockDriver::new()), datamap, config);

        assert_eq!(db.config().interval_secs, 60);
        assert_eq!(db.config().timeout_secs, 1);
        assert_eq!(db.config().round_size, 12);
    }

    #[tokio::test]
    async fn test_state_snapshot() {
        let key = holding(1, 0);
        let datamap = Datamap::new(
            vec![SchemaEntry::new(key, DataType::UInt16)],
            vec![UnitConfig::new(1).with_big_endian(true)],
        )
        .unwrap();

        let driver = Arc::new(MockDriver::new());
        driver.push_read(Ok(ReadResponse::from_words(vec![1])));

        let db = Modbusdb::new(driver, datamap);
        let before = db.state();
        assert_eq!(before.requests_count, 0);
        assert!(!before.watching);
        assert!(!before.destroyed);

        db.get(key).await.unwrap();
        let after = db.state();
        assert_eq!(after.requests_count, 1);
        assert_eq!(after.errors_count, 0);
        assert_eq!(after.pending_count, 0);
        assert!(after.avg_response_time.is_none());
    }
}
