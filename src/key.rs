//! # Register Keys
//!
//! Compresses a full Modbus coordinate into a single 32-bit integer so that
//! map and set keys stay primitive and comparable. Numeric ordering of the
//! packed form is unit-major, then scope, then address, then bit, which is
//! exactly the order the request planner wants to walk.
//!
//! ## Layout
//!
//! | Bits | Field | Range |
//! |-------|---------|----------|
//! | 31-24 | unit | 0-255 (semantically 1-250) |
//! | 23-20 | scope | 1-4 |
//! | 19-4 | address | 0-65535 |
//! | 3-0 | bit | 0-15 |
//!
//! ## Example
//!
//! ```rust
//! use modbusdb::{create_register_key, parse_register_key, Scope};
//!
//! let key = create_register_key(1, Scope::InternalRegister, 10, 0).unwrap();
//! let (unit, scope, address, bit) = parse_register_key(key).unwrap();
//! assert_eq!((unit, scope, address, bit), (1, Scope::InternalRegister, 10, 0));
//! ```

use std::fmt;

use crate::error::{DbError, DbResult};

const SCOPE_MASK: u32 = 0x0F;
const ADDRESS_MASK: u32 = 0xFFFF;
const BIT_MASK: u32 = 0x0F;

const UNIT_SHIFT: u32 = 24;
const SCOPE_SHIFT: u32 = 20;
const ADDRESS_SHIFT: u32 = 4;

/// One of the four Modbus address spaces.
///
/// The numeric values are the wire values packed into register keys; they
/// also decide which function codes a scope maps to:
///
/// | Scope | Bits/Words | Function codes | Access |
/// |-------|------------|----------------|--------|
/// | `PhysicalState` | single bits | 2 | read-only |
/// | `InternalState` | single bits | 1 / 5 / 15 | read-write |
/// | `PhysicalRegister` | 16-bit words | 4 | read-only |
/// | `InternalRegister` | 16-bit words | 3 / 6 / 16 | read-write |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Scope {
    /// Discrete inputs (function code 2).
    PhysicalState = 1,
    /// Coils (function codes 1, 5, 15).
    InternalState = 2,
    /// Input registers (function code 4).
    PhysicalRegister = 3,
    /// Holding registers (function codes 3, 6, 16).
    InternalRegister = 4,
}

impl Scope {
    /// True for the single-bit address spaces (coils and discrete inputs).
    #[inline]
    pub fn is_state(&self) -> bool {
        matches!(self, Scope::PhysicalState | Scope::InternalState)
    }

    /// True for the 16-bit word address spaces.
    #[inline]
    pub fn is_register(&self) -> bool {
        matches!(self, Scope::PhysicalRegister | Scope::InternalRegister)
    }

    /// True when the scope accepts writes (coils and holding registers).
    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self, Scope::InternalState | Scope::InternalRegister)
    }

    /// Descriptive name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::PhysicalState => "physical state (discrete inputs)",
            Scope::InternalState => "internal state (coils)",
            Scope::PhysicalRegister => "physical register (input registers)",
            Scope::InternalRegister => "internal register (holding registers)",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<u8> for Scope {
    type Error = DbError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Scope::PhysicalState),
            2 => Ok(Scope::InternalState),
            3 => Ok(Scope::PhysicalRegister),
            4 => Ok(Scope::InternalRegister),
            _ => Err(DbError::validation(format!(
                "Invalid scope: {} (must be 1-4)",
                value
            ))),
        }
    }
}

/// Pack a Modbus coordinate into a 32-bit register key.
///
/// For the state scopes `bit` must be 0 (each address is already a single
/// bit). For register scopes `bit` may be 1-15 only for entries that the
/// datamap declares as [`DataType::Bit`](crate::DataType::Bit); the range is
/// validated here, the type pairing is validated by the datamap.
pub fn create_register_key(unit: u8, scope: Scope, address: u16, bit: u8) -> DbResult<u32> {
    if bit > 15 {
        return Err(DbError::validation(format!(
            "Invalid bit index: {} (must be 0-15)",
            bit
        )));
    }
    if scope.is_state() && bit != 0 {
        return Err(DbError::validation(format!(
            "Bit index must be 0 for state scopes, got {}",
            bit
        )));
    }

    Ok((u32::from(unit) << UNIT_SHIFT)
        | ((scope as u32) << SCOPE_SHIFT)
        | (u32::from(address) << ADDRESS_SHIFT)
        | u32::from(bit))
}

/// Unpack a 32-bit register key into `(unit, scope, address, bit)`.
///
/// Inverse of [`create_register_key`]; round-trips exactly over the legal
/// domain. Fails when the scope nibble is not 1-4.
pub fn parse_register_key(key: u32) -> DbResult<(u8, Scope, u16, u8)> {
    let unit = (key >> UNIT_SHIFT) as u8;
    let scope = Scope::try_from(((key >> SCOPE_SHIFT) & SCOPE_MASK) as u8)?;
    let address = ((key >> ADDRESS_SHIFT) & ADDRESS_MASK) as u16;
    let bit = (key & BIT_MASK) as u8;
    Ok((unit, scope, address, bit))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_layout() {
        let key = create_register_key(1, Scope::InternalRegister, 10, 0).unwrap();
        assert_eq!(key, (1 << 24) | (4 << 20) | (10 << 4));
    }

    #[test]
    fn test_round_trip() {
        let samples = [
            (0u8, Scope::PhysicalState, 0u16, 0u8),
            (1, Scope::InternalRegister, 10, 0),
            (250, Scope::InternalRegister, 65535, 15),
            (17, Scope::PhysicalRegister, 1000, 0),
            (42, Scope::InternalState, 123, 0),
            (199, Scope::InternalRegister, 40001, 7),
        ];

        for (unit, scope, address, bit) in samples {
            let key = create_register_key(unit, scope, address, bit).unwrap();
            let parsed = parse_register_key(key).unwrap();
            assert_eq!(parsed, (unit, scope, address, bit), "key {:#010x}", key);
        }
    }

    #[test]
    fn test_numeric_ordering_matches_coordinates() {
        // Unit-major, then scope, then address, then bit.
        let a = create_register_key(1, Scope::InternalRegister, 500, 0).unwrap();
        let b = create_register_key(2, Scope::PhysicalState, 0, 0).unwrap();
        assert!(a < b);

        let c = create_register_key(1, Scope::PhysicalState, 500, 0).unwrap();
        let d = create_register_key(1, Scope::InternalRegister, 0, 0).unwrap();
        assert!(c < d);

        let e = create_register_key(1, Scope::InternalRegister, 10, 0).unwrap();
        let f = create_register_key(1, Scope::InternalRegister, 11, 0).unwrap();
        assert!(e < f);

        let g = create_register_key(1, Scope::InternalRegister, 11, 3).unwrap();
        assert!(f < g);
    }

    #[test]
    fn test_bit_range_rejected() {
        assert!(create_register_key(1, Scope::InternalRegister, 0, 16).is_err());
    }

    #[test]
    fn test_state_scope_bit_rejected() {
        assert!(create_register_key(1, Scope::InternalState, 0, 1).is_err());
        assert!(create_register_key(1, Scope::PhysicalState, 0, 1).is_err());
        assert!(create_register_key(1, Scope::InternalState, 0, 0).is_ok());
    }

    #[test]
    fn test_parse_invalid_scope() {
        // Scope nibble 0 and 5 are outside the legal domain.
        assert!(parse_register_key(0).is_err());
        assert!(parse_register_key(5 << 20).is_err());
    }

    #[test]
    fn test_scope_predicates() {
        assert!(Scope::PhysicalState.is_state());
        assert!(Scope::InternalState.is_state());
        assert!(Scope::PhysicalRegister.is_register());
        assert!(Scope::InternalRegister.is_register());

        assert!(!Scope::PhysicalState.is_writable());
        assert!(Scope::InternalState.is_writable());
        assert!(!Scope::PhysicalRegister.is_writable());
        assert!(Scope::InternalRegister.is_writable());
    }

    #[test]
    fn test_scope_try_from() {
        assert_eq!(Scope::try_from(1).unwrap(), Scope::PhysicalState);
        assert_eq!(Scope::try_from(4).unwrap(), Scope::InternalRegister);
        assert!(Scope::try_from(0).is_err());
        assert!(Scope::try_from(5).is_err());
    }
}
