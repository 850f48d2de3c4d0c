//! # Register Codec
//!
//! Encoding and decoding of typed values to and from register byte buffers,
//! with endianness and word-swap support, plus bit manipulation inside
//! 16-bit words and decimal scaling helpers.
//!
//! ## Buffer Sizes
//!
//! | Type | Bytes |
//! |------|-------|
//! | Bit / Int16 / UInt16 | 2 |
//! | Int32 / UInt32 / Float | 4 |
//!
//! The `big_endian` flag selects how the buffer bytes are interpreted at
//! the application level; the wire itself is always big-endian per the
//! Modbus specification, so the transport-facing layer passes raw body
//! bytes through unchanged. Word swapping ([`swap_words`]) exchanges the
//! two 16-bit halves of a 4-byte buffer and is applied after encoding and
//! before decoding for units that store 32-bit values word-swapped.

use crate::error::{DbError, DbResult};
use crate::value::{DataType, Value};

// ============================================================================
// Encoding / Decoding
// ============================================================================

/// Encode a typed value into a register byte buffer.
///
/// The buffer length is `2 * register_count` for the value's type. `Bit`
/// values encode as a full word holding 0 or 1 (bit packing into an
/// existing word is the executor's read-modify-write concern).
///
/// # Example
///
/// ```rust
/// use modbusdb::{encode, Value};
///
/// assert_eq!(encode(&Value::U16(0x1234), true), vec![0x12, 0x34]);
/// assert_eq!(encode(&Value::U16(0x1234), false), vec![0x34, 0x12]);
/// ```
pub fn encode(value: &Value, big_endian: bool) -> Vec<u8> {
    match value {
        Value::Bit(b) => {
            let word = u16::from(*b);
            if big_endian {
                word.to_be_bytes().to_vec()
            } else {
                word.to_le_bytes().to_vec()
            }
        }
        Value::U16(v) => {
            if big_endian {
                v.to_be_bytes().to_vec()
            } else {
                v.to_le_bytes().to_vec()
            }
        }
        Value::I16(v) => {
            if big_endian {
                v.to_be_bytes().to_vec()
            } else {
                v.to_le_bytes().to_vec()
            }
        }
        Value::U32(v) => {
            if big_endian {
                v.to_be_bytes().to_vec()
            } else {
                v.to_le_bytes().to_vec()
            }
        }
        Value::I32(v) => {
            if big_endian {
                v.to_be_bytes().to_vec()
            } else {
                v.to_le_bytes().to_vec()
            }
        }
        Value::F32(v) => {
            if big_endian {
                v.to_be_bytes().to_vec()
            } else {
                v.to_le_bytes().to_vec()
            }
        }
    }
}

/// Decode a register byte buffer into a typed value.
///
/// The buffer must be exactly `2 * register_count` bytes for the requested
/// type. Word un-swapping, where the unit requires it, happens before this
/// call.
///
/// # Example
///
/// ```rust
/// use modbusdb::{decode, DataType, Value};
///
/// let v = decode(&[0x12, 0x34, 0x56, 0x78], DataType::UInt32, true).unwrap();
/// assert_eq!(v, Value::U32(0x12345678));
/// ```
pub fn decode(buffer: &[u8], data_type: DataType, big_endian: bool) -> DbResult<Value> {
    let expected = usize::from(data_type.register_count()) * 2;
    if buffer.len() != expected {
        return Err(DbError::validation(format!(
            "Buffer length mismatch for {}: expected {}, got {}",
            data_type,
            expected,
            buffer.len()
        )));
    }

    match data_type {
        DataType::Bit => {
            let bytes = [buffer[0], buffer[1]];
            let word = if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            };
            Ok(Value::Bit(word != 0))
        }
        DataType::UInt16 => {
            let bytes = [buffer[0], buffer[1]];
            Ok(Value::U16(if big_endian {
                u16::from_be_bytes(bytes)
            } else {
                u16::from_le_bytes(bytes)
            }))
        }
        DataType::Int16 => {
            let bytes = [buffer[0], buffer[1]];
            Ok(Value::I16(if big_endian {
                i16::from_be_bytes(bytes)
            } else {
                i16::from_le_bytes(bytes)
            }))
        }
        DataType::UInt32 => {
            let bytes = [buffer[0], buffer[1], buffer[2], buffer[3]];
            Ok(Value::U32(if big_endian {
                u32::from_be_bytes(bytes)
            } else {
                u32::from_le_bytes(bytes)
            }))
        }
        DataType::Int32 => {
            let bytes = [buffer[0], buffer[1], buffer[2], buffer[3]];
            Ok(Value::I32(if big_endian {
                i32::from_be_bytes(bytes)
            } else {
                i32::from_le_bytes(bytes)
            }))
        }
        DataType::Float => {
            let bytes = [buffer[0], buffer[1], buffer[2], buffer[3]];
            Ok(Value::F32(if big_endian {
                f32::from_be_bytes(bytes)
            } else {
                f32::from_le_bytes(bytes)
            }))
        }
    }
}

/// Swap the two 16-bit halves of a 4-byte buffer.
///
/// Involutive: applying it twice restores the original buffer. Used for
/// units whose 32-bit values arrive word-swapped (CDAB order).
///
/// # Example
///
/// ```rust
/// use modbusdb::swap_words;
///
/// let swapped = swap_words(&[0x12, 0x34, 0x56, 0x78]).unwrap();
/// assert_eq!(swapped, [0x56, 0x78, 0x12, 0x34]);
/// assert_eq!(swap_words(&swapped).unwrap(), [0x12, 0x34, 0x56, 0x78]);
/// ```
pub fn swap_words(buffer: &[u8]) -> DbResult<[u8; 4]> {
    if buffer.len() != 4 {
        return Err(DbError::validation(format!(
            "Word swap requires exactly 4 bytes, got {}",
            buffer.len()
        )));
    }
    Ok([buffer[2], buffer[3], buffer[0], buffer[1]])
}

// ============================================================================
// Bit Helpers
// ============================================================================

/// Extract bit `i` of a 16-bit word as 0/1.
#[inline]
pub fn get_bit(word: u16, i: u8) -> DbResult<u16> {
    if i > 15 {
        return Err(DbError::validation(format!(
            "Invalid bit index: {} (must be 0-15)",
            i
        )));
    }
    Ok((word >> i) & 0x01)
}

/// Return `word` with bit `i` set or cleared.
#[inline]
pub fn set_bit(word: u16, i: u8, on: bool) -> DbResult<u16> {
    if i > 15 {
        return Err(DbError::validation(format!(
            "Invalid bit index: {} (must be 0-15)",
            i
        )));
    }
    Ok(if on { word | (1 << i) } else { word & !(1 << i) })
}

// ============================================================================
// Decimal Scaling
// ============================================================================

/// Scale a raw integer reading down by `10^scale` (floating division).
#[inline]
pub fn apply_read_scale(raw: f64, scale: u8) -> f64 {
    if scale == 0 {
        raw
    } else {
        raw / 10f64.powi(i32::from(scale))
    }
}

/// Scale a user value up by `10^scale` and floor it for encoding.
#[inline]
pub fn apply_write_scale(value: f64, scale: u8) -> f64 {
    if scale == 0 {
        value.floor()
    } else {
        (value * 10f64.powi(i32::from(scale))).floor()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_lengths() {
        assert_eq!(encode(&Value::Bit(true), true).len(), 2);
        assert_eq!(encode(&Value::U16(1), true).len(), 2);
        assert_eq!(encode(&Value::I16(-1), true).len(), 2);
        assert_eq!(encode(&Value::U32(1), true).len(), 4);
        assert_eq!(encode(&Value::I32(-1), true).len(), 4);
        assert_eq!(encode(&Value::F32(1.0), true).len(), 4);
    }

    #[test]
    fn test_round_trip_all_types() {
        let cases = [
            (Value::I16(-12345), DataType::Int16),
            (Value::U16(54321), DataType::UInt16),
            (Value::I32(-1234567), DataType::Int32),
            (Value::U32(3123456789), DataType::UInt32),
        ];

        for big_endian in [true, false] {
            for (value, data_type) in cases {
                let buffer = encode(&value, big_endian);
                let decoded = decode(&buffer, data_type, big_endian).unwrap();
                assert_eq!(decoded, value, "{:?} big_endian={}", value, big_endian);
            }
        }
    }

    #[test]
    fn test_float_round_trip_bit_exact() {
        for big_endian in [true, false] {
            for v in [0.0f32, 1.5, -2.25, std::f32::consts::PI, 1e-20, 3.4e38] {
                let buffer = encode(&Value::F32(v), big_endian);
                let decoded = decode(&buffer, DataType::Float, big_endian).unwrap();
                if let Value::F32(out) = decoded {
                    assert_eq!(out.to_bits(), v.to_bits());
                } else {
                    panic!("Expected F32");
                }
            }
        }
    }

    #[test]
    fn test_decode_float_known_bits() {
        // 25.0 in IEEE 754: 0x41C80000
        let v = decode(&[0x41, 0xC8, 0x00, 0x00], DataType::Float, true).unwrap();
        if let Value::F32(f) = v {
            assert!((f - 25.0).abs() < f32::EPSILON);
        } else {
            panic!("Expected F32");
        }
    }

    #[test]
    fn test_decode_length_mismatch() {
        assert!(decode(&[0x00], DataType::UInt16, true).is_err());
        assert!(decode(&[0x00, 0x01], DataType::UInt32, true).is_err());
        assert!(decode(&[0x00, 0x01, 0x02, 0x03], DataType::Int16, true).is_err());
    }

    #[test]
    fn test_swap_words_involution() {
        let original = [0x12u8, 0x34, 0x56, 0x78];
        let swapped = swap_words(&original).unwrap();
        assert_eq!(swapped, [0x56, 0x78, 0x12, 0x34]);
        assert_eq!(swap_words(&swapped).unwrap(), original);
    }

    #[test]
    fn test_swap_words_length() {
        assert!(swap_words(&[0x00, 0x01]).is_err());
        assert!(swap_words(&[0x00; 6]).is_err());
    }

    #[test]
    fn test_swapped_decode() {
        // Big-endian 0x12345678 stored word-swapped on the wire as 5678 1234.
        let wire = [0x56u8, 0x78, 0x12, 0x34];
        let restored = swap_words(&wire).unwrap();
        assert_eq!(
            decode(&restored, DataType::UInt32, true).unwrap(),
            Value::U32(0x12345678)
        );
    }

    #[test]
    fn test_get_bit() {
        assert_eq!(get_bit(0x0004, 2).unwrap(), 1);
        assert_eq!(get_bit(0x0003, 2).unwrap(), 0);
        assert_eq!(get_bit(0x8000, 15).unwrap(), 1);
        assert!(get_bit(0, 16).is_err());
    }

    #[test]
    fn test_set_bit() {
        assert_eq!(set_bit(0x0000, 2, true).unwrap(), 0x0004);
        assert_eq!(set_bit(0x0004, 2, false).unwrap(), 0x0000);
        assert_eq!(set_bit(0xFFFF, 0, false).unwrap(), 0xFFFE);
        assert!(set_bit(0, 16, true).is_err());
    }

    #[test]
    fn test_set_bit_idempotent() {
        for on in [true, false] {
            let once = set_bit(0x00F0, 5, on).unwrap();
            let twice = set_bit(once, 5, on).unwrap();
            assert_eq!(once, twice);
            assert_eq!(get_bit(once, 5).unwrap(), u16::from(on));
        }
    }

    #[test]
    fn test_read_scale() {
        assert_eq!(apply_read_scale(123.0, 0), 123.0);
        assert_eq!(apply_read_scale(123.0, 2), 1.23);
        assert_eq!(apply_read_scale(5.0, 1), 0.5);
        assert_eq!(apply_read_scale(1000.0, 3), 1.0);
    }

    #[test]
    fn test_write_scale() {
        assert_eq!(apply_write_scale(1.23, 2), 123.0);
        assert_eq!(apply_write_scale(1.239, 2), 123.0); // floored
        assert_eq!(apply_write_scale(42.9, 0), 42.0);
        assert_eq!(apply_write_scale(0.5, 1), 5.0);
    }
}
