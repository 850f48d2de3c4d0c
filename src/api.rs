//! # Read/Write Packing
//!
//! Turns one [`Transaction`] into the matching driver call. Reads slice
//! the raw response body per declared address and decode typed values;
//! writes encode and concatenate a payload, choosing the single- or
//! multi-value function code from the payload size and the unit's
//! `force_write_many` flag.

use std::collections::BTreeMap;

use crate::codec::{decode, encode, swap_words};
use crate::driver::ModbusDriver;
use crate::error::{DbError, DbResult};
use crate::key::Scope;
use crate::transaction::Transaction;
use crate::value::Value;

/// Smallest legal wire request, in registers or bits.
const MIN_REQUEST_COUNT: u16 = 1;

/// Largest legal wire request, in registers or bits.
const MAX_REQUEST_COUNT: u16 = 999;

fn checked_count(transaction: &Transaction) -> DbResult<(u16, u16)> {
    let anchor = transaction.anchor();
    let count = {
        let map = transaction.wire_map();
        match (map.first_key_value(), map.last_key_value()) {
            (Some((&first, _)), Some((&last, data_type))) => {
                last - first + data_type.register_count()
            }
            _ => 0,
        }
    };

    if !(MIN_REQUEST_COUNT..=MAX_REQUEST_COUNT).contains(&count) {
        return Err(DbError::validation(format!(
            "Request count {} out of range {}-{}",
            count, MIN_REQUEST_COUNT, MAX_REQUEST_COUNT
        )));
    }
    Ok((anchor, count))
}

/// Execute the read half of a transaction and decode one [`Value`] per
/// declared address.
///
/// Register scopes are decoded from the raw body buffer: each declared
/// address owns `register_count * 2` bytes at offset
/// `(address - anchor) * 2`, un-swapped when the unit stores 32-bit values
/// word-swapped, then interpreted per the unit's endianness. State scopes
/// map positionally from the driver's bit array.
pub(crate) async fn read(
    driver: &dyn ModbusDriver,
    transaction: &Transaction,
) -> DbResult<BTreeMap<u16, Value>> {
    let (anchor, count) = checked_count(transaction)?;

    let response = match transaction.scope {
        Scope::PhysicalState => {
            driver
                .read_discrete_inputs(transaction.unit, anchor, count)
                .await?
        }
        Scope::InternalState => driver.read_coils(transaction.unit, anchor, count).await?,
        Scope::PhysicalRegister => {
            driver
                .read_input_registers(transaction.unit, anchor, count)
                .await?
        }
        Scope::InternalRegister => {
            driver
                .read_holding_registers(transaction.unit, anchor, count)
                .await?
        }
    };

    if response.data.len() != usize::from(count) {
        return Err(DbError::ResponseMismatch {
            expected: usize::from(count),
            actual: response.data.len(),
        });
    }

    let mut values = BTreeMap::new();

    if transaction.scope.is_state() {
        for (&address, _) in transaction.wire_map().iter() {
            let index = usize::from(address - anchor);
            let raw = response
                .data
                .get(index)
                .ok_or(DbError::MissingAddress { address })?;
            values.insert(address, Value::Bit(*raw != 0));
        }
        return Ok(values);
    }

    for (&address, &data_type) in transaction.wire_map().iter() {
        let offset = usize::from(address - anchor) * 2;
        let width = usize::from(data_type.register_count()) * 2;
        let slice = response
            .buffer
            .get(offset..offset + width)
            .ok_or_else(|| DbError::validation("Buffer slice out of bounds"))?;

        let value = if width == 4 && transaction.swap_words {
            decode(&swap_words(slice)?, data_type, transaction.big_endian)?
        } else {
            decode(slice, data_type, transaction.big_endian)?
        };
        values.insert(address, value);
    }

    Ok(values)
}

/// Execute the write half of a transaction from per-address values.
///
/// Register payloads are the concatenation of each encoded value in
/// address order; the multi-register function code is used whenever the
/// payload spans more than one register or the unit forces it. State
/// writes collapse to the single-coil function code only for a lone value
/// on a unit that does not force multi-writes.
pub(crate) async fn write(
    driver: &dyn ModbusDriver,
    transaction: &Transaction,
    values: &BTreeMap<u16, Value>,
) -> DbResult<()> {
    if !transaction.scope.is_writable() {
        return Err(DbError::validation(format!(
            "Scope {} is read-only",
            transaction.scope
        )));
    }

    let (anchor, count) = checked_count(transaction)?;

    if transaction.scope.is_state() {
        let mut states = Vec::with_capacity(values.len());
        for (&address, _) in transaction.wire_map().iter() {
            let value = values
                .get(&address)
                .ok_or(DbError::MissingAddress { address })?;
            states.push(value.as_f64() > 0.0);
        }

        if states.len() > 1 || transaction.force_write_many {
            return driver
                .write_coils(transaction.unit, anchor, &states)
                .await;
        }
        let on = states
            .first()
            .copied()
            .ok_or_else(|| DbError::validation("Empty state payload"))?;
        return driver.write_coil(transaction.unit, anchor, on).await;
    }

    let mut payload = Vec::with_capacity(usize::from(count) * 2);
    for (&address, _) in transaction.wire_map().iter() {
        let value = values
            .get(&address)
            .ok_or(DbError::MissingAddress { address })?;
        let encoded = encode(value, transaction.big_endian);
        if encoded.len() == 4 && transaction.swap_words {
            payload.extend_from_slice(&swap_words(&encoded)?);
        } else {
            payload.extend_from_slice(&encoded);
        }
    }

    if payload.len() != usize::from(count) * 2 {
        return Err(DbError::validation(format!(
            "Write payload length {} does not match request span {}",
            payload.len(),
            usize::from(count) * 2
        )));
    }

    if payload.len() > 2 || transaction.force_write_many {
        driver
            .write_registers(transaction.unit, anchor, &payload)
            .await
    } else {
        driver
            .write_register(transaction.unit, anchor, &payload)
            .await
    }
}

// ============================================================================
// Tests
// ============================================================================
