//! # Modbusdb - Typed Register Database over Modbus
//!
//! **Author:** Evan Liu <liuyifanz.1996@gmail.com>
//! **License:** MIT
//!
//! An abstraction layer over the Modbus protocol for industrial
//! deployments with many small devices. Every addressable item (a
//! register, a coil, a discrete input, or a single bit inside a register)
//! is one entry in a flat database keyed by a compact 32-bit integer;
//! reads and writes are automatically packed into the minimum number of
//! wire requests each device can serve.
//!
//! ## Features
//!
//! - **Compact keys**: one `u32` packs unit, scope, address and bit
//! - **Request planning**: adjacent entries coalesce into ranged reads and
//!   writes, respecting per-unit request size limits and optional gap
//!   bridging
//! - **Typed codec**: Int16/UInt16/Int32/UInt32/Float and single bits,
//!   with endianness, word swapping, and decimal scaling
//! - **Priority execution**: one in-flight wire request, higher priority
//!   first, per-transaction timeouts, per-unit timeout backoff
//! - **Periodic polling**: divisor-aligned tick grid refreshes entries at
//!   their declared per-round frequency
//! - **Driver-agnostic**: the transport is a consumer-supplied trait with
//!   the eight standard read/write function codes
//!
//! ## Supported Function Codes
//!
//! | Code | Function | Used by |
//! |------|----------|---------|
//! | 0x01 | Read Coils | internal state reads |
//! | 0x02 | Read Discrete Inputs | physical state reads |
//! | 0x03 | Read Holding Registers | internal register reads |
//! | 0x04 | Read Input Registers | physical register reads |
//! | 0x05 | Write Single Coil | internal state writes |
//! | 0x06 | Write Single Register | internal register writes |
//! | 0x0F | Write Multiple Coils | internal state writes |
//! | 0x10 | Write Multiple Registers | internal register writes |
//!
//! ## Quick Start
//!
//! See [`Modbusdb`] for a complete example with a driver implementation.
//!
//! ```rust
//! use modbusdb::{create_register_key, parse_register_key, Scope};
//!
//! // Holding register 10 on unit 1.
//! let key = create_register_key(1, Scope::InternalRegister, 10, 0).unwrap();
//! let (unit, scope, address, bit) = parse_register_key(key).unwrap();
//! assert_eq!((unit, scope, address, bit), (1, Scope::InternalRegister, 10, 0));
//! ```

// ============================================================================
// Core modules
// ============================================================================

/// Core error types and result handling
pub mod error;

/// 32-bit register keys and the four Modbus address scopes
pub mod key;

/// Data types and typed register values
pub mod value;

/// Encoding/decoding with endianness, word swap, bits and scaling
pub mod codec;

/// Abstract Modbus transport consumed by the core
pub mod driver;

/// Entry registry, unit configs and the request planner
pub mod datamap;

/// Wire-request envelopes with priority, timeout and result state
pub mod transaction;

/// Read/write packing against the driver
mod api;

/// Single-concurrency priority executor with statistics and backoff
mod executor;

/// Divisor-aligned polling scheduler
mod scheduler;

/// Public database facade and event stream
pub mod db;

// ============================================================================
// Re-exports for convenience
// ============================================================================

// === Async runtime (users can use modbusdb::tokio) ===
pub use tokio;

// === Core database API ===
pub use db::{DbConfig, DbEvent, DbState, Modbusdb, MultiResult};

// === Error handling ===
pub use error::{DbError, DbResult};

// === Keys and scopes ===
pub use key::{create_register_key, parse_register_key, Scope};

// === Schema ===
pub use datamap::{Datamap, Entry, Method, SchemaEntry, Select, UnitConfig};

// === Values and codec ===
pub use codec::{
    apply_read_scale, apply_write_scale, decode, encode, get_bit, set_bit, swap_words,
};
pub use value::{DataType, Value};

// === Driver interface ===
pub use driver::{ModbusDriver, ReadResponse};

// === Transactions ===
pub use executor::UnitStats;
pub use transaction::{Priority, Transaction, TransactionKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
