//! # Driver Interface
//!
//! Narrow abstraction over a Modbus transport. The database core never
//! frames requests or touches sockets; it calls these eight operations and
//! treats any failure as an opaque error on the owning transaction.
//!
//! ## Supported Function Codes
//!
//! | Code | Operation |
//! |------|-----------|
//! | 0x01 | [`read_coils`](ModbusDriver::read_coils) |
//! | 0x02 | [`read_discrete_inputs`](ModbusDriver::read_discrete_inputs) |
//! | 0x03 | [`read_holding_registers`](ModbusDriver::read_holding_registers) |
//! | 0x04 | [`read_input_registers`](ModbusDriver::read_input_registers) |
//! | 0x05 | [`write_coil`](ModbusDriver::write_coil) |
//! | 0x06 | [`write_register`](ModbusDriver::write_register) |
//! | 0x0F | [`write_coils`](ModbusDriver::write_coils) |
//! | 0x10 | [`write_registers`](ModbusDriver::write_registers) |

use async_trait::async_trait;

use crate::error::DbResult;

/// Result of a driver read.
///
/// `data` holds one element per requested item: 16-bit words for register
/// reads, 0/1 for coil and discrete-input reads. `buffer` carries the raw
/// response body bytes (registers in wire big-endian order), which the
/// packing layer slices per declared address.
#[derive(Debug, Clone, Default)]
pub struct ReadResponse {
    /// Raw response body bytes.
    pub buffer: Vec<u8>,
    /// Parsed values, one per requested register or bit.
    pub data: Vec<u16>,
}

impl ReadResponse {
    /// Build a register response from words, deriving the wire buffer.
    pub fn from_words(words: Vec<u16>) -> Self {
        let mut buffer = Vec::with_capacity(words.len() * 2);
        for word in &words {
            buffer.extend_from_slice(&word.to_be_bytes());
        }
        Self {
            buffer,
            data: words,
        }
    }

    /// Build a bit response from 0/1 states.
    pub fn from_bits(bits: Vec<bool>) -> Self {
        let mut buffer = vec![0u8; bits.len().div_ceil(8)];
        for (i, &on) in bits.iter().enumerate() {
            if on {
                buffer[i / 8] |= 1 << (i % 8);
            }
        }
        Self {
            buffer,
            data: bits.into_iter().map(u16::from).collect(),
        }
    }
}

/// Consumer-supplied Modbus transport.
///
/// Implementations wrap whatever wire access the deployment uses (TCP,
/// RTU, a simulator). All methods take the unit (slave) id and a starting
/// address; multi-byte register payloads are raw big-endian body bytes per
/// the Modbus specification.
#[async_trait]
pub trait ModbusDriver: Send + Sync {
    /// Read `count` coils (function code 0x01).
    async fn read_coils(&self, unit: u8, address: u16, count: u16) -> DbResult<ReadResponse>;

    /// Read `count` discrete inputs (function code 0x02).
    async fn read_discrete_inputs(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse>;

    /// Read `count` holding registers (function code 0x03).
    async fn read_holding_registers(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse>;

    /// Read `count` input registers (function code 0x04).
    async fn read_input_registers(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse>;

    /// Write a single coil (function code 0x05).
    async fn write_coil(&self, unit: u8, address: u16, on: bool) -> DbResult<()>;

    /// Write a single register from a 2-byte payload (function code 0x06).
    async fn write_register(&self, unit: u8, address: u16, payload: &[u8]) -> DbResult<()>;

    /// Write multiple coils (function code 0x0F).
    async fn write_coils(&self, unit: u8, address: u16, states: &[bool]) -> DbResult<()>;

    /// Write multiple registers from raw body bytes (function code 0x10).
    /// The register count is `payload.len() / 2`.
    async fn write_registers(&self, unit: u8, address: u16, payload: &[u8]) -> DbResult<()>;
}

// ============================================================================
// Mock driver for tests
// ============================================================================


// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_words() {
        let response = ReadResponse::from_words(vec![0x1234, 0x5678]);
        assert_eq!(response.buffer, vec![0x12, 0x34, 0x56, 0x78]);
        assert_eq!(response.data, vec![0x1234, 0x5678]);
    }

    #[test]
    fn test_from_bits() {
        let response = ReadResponse::from_bits(vec![true, false, true]);
        assert_eq!(response.data, vec![1, 0, 1]);
        assert_eq!(response.buffer, vec![0b0000_0101]);
    }

    #[test]
    fn test_from_bits_multi_byte() {
        let bits: Vec<bool> = (0..10).map(|i| i % 2 == 0).collect();
        let response = ReadResponse::from_bits(bits);
        assert_eq!(response.data.len(), 10);
        assert_eq!(response.buffer, vec![0b0101_0101, 0b0000_0001]);
    }
}
