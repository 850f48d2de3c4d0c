//! # Transactions
//!
//! Typed envelope for one wire request. A transaction is created when its
//! task is scheduled, carries the planner's group plus dispatch options,
//! and transitions exactly once to the finished state, either with a
//! result map keyed by the original register keys or with an error.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::datamap::{Entry, Select};
use crate::error::{DbError, DbResult};
use crate::key::Scope;
use crate::value::DataType;

/// Dispatch priority. Higher dispatches first; FIFO within a band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    /// Background work (the watcher).
    Low = 1,
    /// Interactive reads (`get`, `mget`).
    Normal = 3,
    /// Writes (`set`, `mset`).
    High = 5,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionKind {
    /// Read request.
    Read,
    /// Write request.
    Write,
}

/// One enqueued wire request with its result state.
///
/// The envelope fields are immutable after construction; only the result
/// tail (`finished_at`, `data`, `error`) changes, exactly once, through
/// [`Transaction::finish`].
#[derive(Debug, Clone)]
pub struct Transaction {
    /// Sequential id, assigned modulo 1024 at dequeue time.
    pub id: u16,
    /// Read or write.
    pub kind: TransactionKind,
    /// The planner group, address-sorted.
    pub entries: Vec<Entry>,
    /// Unit shared by all entries.
    pub unit: u8,
    /// Scope shared by all entries.
    pub scope: Scope,
    /// Endianness from the unit config.
    pub big_endian: bool,
    /// Word-swap flag from the unit config.
    pub swap_words: bool,
    /// Multi-write preference from the unit config.
    pub force_write_many: bool,
    /// Values to write, keyed by register key. `None` for reads.
    pub body: Option<Vec<(u32, f64)>>,
    /// Dispatch priority.
    pub priority: Priority,
    /// Per-transaction deadline.
    pub timeout: Duration,
    /// Dequeue timestamp.
    pub started_at: Instant,

    finished_at: Option<Instant>,
    data: Option<HashMap<u32, f64>>,
    error: Option<DbError>,
}

impl Transaction {
    /// Build a transaction from explicit parts, validating that every
    /// entry shares one unit and one scope.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u16,
        kind: TransactionKind,
        entries: Vec<Entry>,
        unit: u8,
        scope: Scope,
        body: Option<Vec<(u32, f64)>>,
        priority: Priority,
        timeout: Duration,
    ) -> DbResult<Self> {
        if entries.is_empty() {
            return Err(DbError::validation("Transaction requires entries"));
        }
        if entries.iter().any(|e| e.unit != unit || e.scope != scope) {
            return Err(DbError::validation(
                "All transaction entries must share one unit and one scope",
            ));
        }

        Ok(Self {
            id,
            kind,
            entries,
            unit,
            scope,
            big_endian: false,
            swap_words: false,
            force_write_many: false,
            body,
            priority,
            timeout,
            started_at: Instant::now(),
            finished_at: None,
            data: None,
            error: None,
        })
    }

    /// Build a transaction from a planner select. The select already
    /// guarantees the shared unit/scope invariant.
    pub fn from_select(
        id: u16,
        kind: TransactionKind,
        select: Select,
        body: Option<Vec<(u32, f64)>>,
        priority: Priority,
        timeout: Duration,
    ) -> Self {
        Self {
            id,
            kind,
            unit: select.unit,
            scope: select.scope,
            big_endian: select.big_endian,
            swap_words: select.swap_words,
            force_write_many: select.force_write_many,
            entries: select.entries,
            body,
            priority,
            timeout,
            started_at: Instant::now(),
            finished_at: None,
            data: None,
            error: None,
        }
    }

    /// First (lowest) address of the group.
    pub fn anchor(&self) -> u16 {
        self.entries.first().map(|e| e.address).unwrap_or(0)
    }

    /// Wire type per address: state scopes stay bits, register-scope bit
    /// entries widen to whole words.
    pub fn wire_map(&self) -> BTreeMap<u16, DataType> {
        let mut map = BTreeMap::new();
        for entry in &self.entries {
            let data_type = if self.scope.is_state() {
                DataType::Bit
            } else if entry.data_type == DataType::Bit {
                DataType::UInt16
            } else {
                entry.data_type
            };
            map.insert(entry.address, data_type);
        }
        map
    }

    /// Record completion. Idempotent: the first call wins, later calls are
    /// no-ops.
    pub fn finish(&mut self, result: Result<HashMap<u32, f64>, DbError>) {
        if self.finished_at.is_some() {
            return;
        }
        self.finished_at = Some(Instant::now());
        match result {
            Ok(data) => self.data = Some(data),
            Err(error) => self.error = Some(error),
        }
    }

    /// The result map, when the transaction succeeded.
    pub fn data(&self) -> Option<&HashMap<u32, f64>> {
        self.data.as_ref()
    }

    /// The error, when the transaction failed.
    pub fn error(&self) -> Option<&DbError> {
        self.error.as_ref()
    }

    /// Completion timestamp, if finished.
    pub fn finished_at(&self) -> Option<Instant> {
        self.finished_at
    }

    /// Elapsed time from dequeue to completion, or to now while in flight.
    pub fn duration(&self) -> Duration {
        self.finished_at
            .unwrap_or_else(Instant::now)
            .duration_since(self.started_at)
    }

    /// True once `finish` has been called.
    pub fn is_done(&self) -> bool {
        self.finished_at.is_some()
    }

    /// True when finished without error.
    pub fn is_ok(&self) -> bool {
        self.is_done() && self.error.is_none()
    }

    /// True when the recorded error came from the per-transaction
    /// deadline.
    pub fn is_timed_out(&self) -> bool {
        self.error.as_ref().is_some_and(DbError::is_timeout)
    }
}

// ============================================================================
// Tests
// ============================================================================
