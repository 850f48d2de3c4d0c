//! # Datamap
//!
//! Registry of declared register entries and per-unit configuration, plus
//! the request planner that groups keys into the minimum number of wire
//! requests a unit can serve.
//!
//! The datamap is built once and read-only afterwards. Construction
//! validates every entry against its scope (state entries are single bits,
//! register entries may carry typed values or single bits inside a word)
//! and indexes polled entries by their declared frequency.
//!
//! ## Planning
//!
//! [`Datamap::select_all`] walks the requested keys in ascending numeric
//! order. Because keys pack unit, scope and address in descending
//! significance, numeric order is already unit-major, scope-major,
//! address-major. Consecutive entries coalesce into one [`Select`] while
//! they share unit and scope, the running span stays within the unit's
//! `max_request_size`, and the address gap to the previous entry does not
//! exceed the unit's gap allowance (reads on gap-tolerant units may bridge
//! up to a quarter of `max_request_size`; writes never bridge).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::{DbError, DbResult};
use crate::key::{parse_register_key, Scope};
use crate::value::DataType;

/// Default request size cap (16-bit registers or bits) for units declared
/// implicitly through an entry.
pub const DEFAULT_MAX_REQUEST_SIZE: u16 = 32;

/// Highest accepted polling frequency (requests per round).
pub const MAX_FREQUENCY: u8 = 60;

/// Highest accepted decimal scale for integer register entries.
pub const MAX_SCALE: u8 = 3;

/// Direction of a planned wire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Read from the device.
    Read,
    /// Write to the device.
    Write,
}

/// Declaration row for [`Datamap::new`].
///
/// The unit, scope, address and bit live inside the packed key; only the
/// value interpretation is declared alongside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SchemaEntry {
    /// Packed register key.
    pub key: u32,
    /// Value interpretation.
    pub data_type: DataType,
    /// Decimal scale, 0-3; integer register types only.
    pub scale: u8,
    /// Polling frequency in requests per round, 0-60; 0 means unwatched.
    pub freq: u8,
}

impl SchemaEntry {
    /// Declare an unscaled, unwatched entry.
    pub fn new(key: u32, data_type: DataType) -> Self {
        Self {
            key,
            data_type,
            scale: 0,
            freq: 0,
        }
    }

    /// Set the decimal scale (0-3).
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale;
        self
    }

    /// Set the polling frequency (0-60 requests per round).
    pub fn with_freq(mut self, freq: u8) -> Self {
        self.freq = freq;
        self
    }
}

/// A validated datamap row.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Packed register key.
    pub key: u32,
    /// Unit (slave) id.
    pub unit: u8,
    /// Address space.
    pub scope: Scope,
    /// Address within the scope.
    pub address: u16,
    /// Bit index inside the word for register-scope `Bit` entries; 0
    /// otherwise.
    pub bit: u8,
    /// Value interpretation.
    pub data_type: DataType,
    /// Decimal scale (0-3).
    pub scale: u8,
    /// Polling frequency (0 = unwatched).
    pub freq: u8,
}

/// Per-unit protocol configuration.
///
/// # Example
///
/// ```rust
/// use modbusdb::UnitConfig;
///
/// let unit = UnitConfig::new(1)
///     .with_max_request_size(64)
///     .with_request_with_gaps(true);
/// assert_eq!(unit.max_request_size, 64);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitConfig {
    /// Unit (slave) address.
    pub address: u8,
    /// Cap on 16-bit registers (or bits) per wire request.
    pub max_request_size: u16,
    /// Always use the multi-write function codes (15/16), even for a
    /// single value.
    pub force_write_many: bool,
    /// Interpret multi-register values big-endian at the application
    /// level.
    pub big_endian: bool,
    /// 32-bit values arrive with their 16-bit words swapped.
    pub swap_words: bool,
    /// Allow reads to bridge small address gaps into one request.
    pub request_with_gaps: bool,
}

impl UnitConfig {
    /// Create a config with default limits for the given unit address.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            force_write_many: false,
            big_endian: false,
            swap_words: false,
            request_with_gaps: false,
        }
    }

    /// Set the per-request register/bit cap.
    pub fn with_max_request_size(mut self, size: u16) -> Self {
        self.max_request_size = size;
        self
    }

    /// Always use multi-write function codes.
    pub fn with_force_write_many(mut self, force: bool) -> Self {
        self.force_write_many = force;
        self
    }

    /// Interpret multi-register values big-endian.
    pub fn with_big_endian(mut self, big_endian: bool) -> Self {
        self.big_endian = big_endian;
        self
    }

    /// Expect word-swapped 32-bit values.
    pub fn with_swap_words(mut self, swap: bool) -> Self {
        self.swap_words = swap;
        self
    }

    /// Allow gap-bridged read requests.
    pub fn with_request_with_gaps(mut self, gaps: bool) -> Self {
        self.request_with_gaps = gaps;
        self
    }

    /// Largest address gap a read request may bridge for this unit.
    ///
    /// A quarter of `max_request_size`, rounded, when gap coalescing is
    /// enabled and the request cap leaves room; 0 otherwise. Writes always
    /// get 0.
    pub fn max_gap(&self, method: Method) -> u16 {
        if self.request_with_gaps && self.max_request_size > 2 && method == Method::Read {
            (f64::from(self.max_request_size) * 0.25).round() as u16
        } else {
            0
        }
    }
}

/// One planner-produced group of entries that fits a single wire request.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    /// Request direction.
    pub method: Method,
    /// Unit all entries belong to.
    pub unit: u8,
    /// Scope all entries belong to.
    pub scope: Scope,
    /// Entries in ascending address order.
    pub entries: Vec<Entry>,
    /// Endianness copied from the unit config.
    pub big_endian: bool,
    /// Word-swap flag copied from the unit config.
    pub swap_words: bool,
    /// Multi-write preference copied from the unit config.
    pub force_write_many: bool,
}

impl Select {
    /// First (lowest) address of the group.
    pub fn anchor(&self) -> u16 {
        self.entries.first().map(|e| e.address).unwrap_or(0)
    }

    /// Wire type per address.
    ///
    /// State scopes always read and write single bits. Register-scope
    /// `Bit` entries are widened to `UInt16`: the bit lives inside a whole
    /// word, so the wire carries the word.
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

    /// Total register (or bit) count of the wire request, anchor through
    /// the end of the last entry.
    pub fn count(&self) -> u16 {
        let map = self.wire_map();
        match (map.first_key_value(), map.last_key_value()) {
            (Some((&first, _)), Some((&last, data_type))) => {
                last - first + data_type.register_count()
            }
            _ => 0,
        }
    }
}

/// Read-only registry of entries, unit configs, and the polling index.
#[derive(Debug, Clone, Default)]
pub struct Datamap {
    entries: BTreeMap<u32, Entry>,
    units: HashMap<u8, UnitConfig>,
    watch: BTreeMap<u8, BTreeSet<u32>>,
}

impl Datamap {
    /// Build a datamap from declaration rows and unit configs.
    ///
    /// Every entry is validated against its scope; entries referencing an
    /// undeclared unit get a default [`UnitConfig`]. Fails on duplicate
    /// keys, duplicate unit declarations, or illegal type/scope/scale/bit
    /// combinations.
    pub fn new(schema: Vec<SchemaEntry>, units: Vec<UnitConfig>) -> DbResult<Self> {
        let mut map = Datamap::default();

        for unit in units {
            if unit.max_request_size == 0 {
                return Err(DbError::schema(format!(
                    "Unit {}: max_request_size must be at least 1",
                    unit.address
                )));
            }
            if map.units.insert(unit.address, unit).is_some() {
                return Err(DbError::schema(format!(
                    "Duplicate config for unit {}",
                    unit.address
                )));
            }
        }

        for item in schema {
            let (unit, scope, address, bit) = parse_register_key(item.key)?;

            if item.freq > MAX_FREQUENCY {
                return Err(DbError::schema(format!(
                    "Key {}: frequency {} exceeds {}",
                    item.key, item.freq, MAX_FREQUENCY
                )));
            }
            if item.scale > MAX_SCALE {
                return Err(DbError::schema(format!(
                    "Key {}: scale {} exceeds {}",
                    item.key, item.scale, MAX_SCALE
                )));
            }
            if item.scale > 0 && !item.data_type.is_integer() {
                return Err(DbError::schema(format!(
                    "Key {}: scale applies only to integer register types, not {}",
                    item.key, item.data_type
                )));
            }

            if scope.is_state() {
                if item.data_type != DataType::Bit {
                    return Err(DbError::schema(format!(
                        "Key {}: state-scope entries must be bit typed, got {}",
                        item.key, item.data_type
                    )));
                }
                if bit != 0 {
                    return Err(DbError::schema(format!(
                        "Key {}: state-scope entries must use bit index 0",
                        item.key
                    )));
                }
            } else if item.data_type != DataType::Bit && bit != 0 {
                return Err(DbError::schema(format!(
                    "Key {}: bit index {} requires the bit type, got {}",
                    item.key, bit, item.data_type
                )));
            }

            let entry = Entry {
                key: item.key,
                unit,
                scope,
                address,
                bit,
                data_type: item.data_type,
                scale: item.scale,
                freq: item.freq,
            };

            if map.entries.insert(item.key, entry).is_some() {
                return Err(DbError::schema(format!("Duplicate key {}", item.key)));
            }

            map.units.entry(unit).or_insert_with(|| UnitConfig::new(unit));

            if item.freq > 0 {
                map.watch.entry(item.freq).or_default().insert(item.key);
            }
        }

        Ok(map)
    }

    /// Look up a declared entry.
    pub fn entry(&self, key: u32) -> Option<&Entry> {
        self.entries.get(&key)
    }

    /// Look up a unit config.
    pub fn unit(&self, address: u8) -> Option<&UnitConfig> {
        self.units.get(&address)
    }

    /// Keys declared at the given polling frequency.
    pub fn watch_bucket(&self, freq: u8) -> Option<&BTreeSet<u32>> {
        self.watch.get(&freq)
    }

    /// Frequencies that have at least one watched key.
    pub fn watched_frequencies(&self) -> Vec<u8> {
        self.watch.keys().copied().collect()
    }

    /// True when no frequency has watched keys.
    pub fn is_watch_empty(&self) -> bool {
        self.watch.is_empty()
    }

    /// Number of declared entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Group keys into the minimum number of per-unit, per-scope wire
    /// requests.
    ///
    /// Keys are sorted (and de-duplicated) numerically, which orders them
    /// unit-major, scope-major, address-major. An entry joins the current
    /// group iff it shares the group's unit and scope, the gap to the
    /// previous entry is within the unit's allowance for `method`, and the
    /// total span including the entry stays within `max_request_size`.
    ///
    /// Fails synchronously on an empty key list, an undeclared key, or a
    /// write against a read-only scope.
    pub fn select_all(&self, method: Method, keys: &[u32]) -> DbResult<Vec<Select>> {
        if keys.is_empty() {
            return Err(DbError::validation("Empty key set"));
        }

        let mut sorted = keys.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut selects = Vec::new();
        let mut group: Vec<Entry> = Vec::new();

        for key in sorted {
            let entry = self
                .entries
                .get(&key)
                .ok_or(DbError::UnknownKey { key })?
                .clone();

            if method == Method::Write && !entry.scope.is_writable() {
                return Err(DbError::validation(format!(
                    "Scope {} is read-only",
                    entry.scope
                )));
            }

            let joins = match (group.first(), group.last()) {
                (Some(anchor), Some(prev))
                    if entry.unit == anchor.unit && entry.scope == anchor.scope =>
                {
                    let config = self.unit_config(anchor.unit)?;
                    // Sorted keys guarantee entry.address >= anchor.address
                    // within one unit and scope; the gap may still be
                    // negative when entries overlap (bits of one word).
                    let gap = i32::from(entry.address)
                        - i32::from(prev.address)
                        - i32::from(prev.data_type.register_count());
                    let span = u32::from(entry.address) - u32::from(anchor.address)
                        + u32::from(entry.data_type.register_count());

                    gap <= i32::from(config.max_gap(method))
                        && span <= u32::from(config.max_request_size)
                }
                _ => false,
            };

            if !joins && !group.is_empty() {
                selects.push(self.build_select(method, std::mem::take(&mut group))?);
            }
            group.push(entry);
        }

        if !group.is_empty() {
            selects.push(self.build_select(method, group)?);
        }

        Ok(selects)
    }

    /// Plan a single key and assert it produces exactly one request.
    pub fn select_one(&self, method: Method, key: u32) -> DbResult<Select> {
        let mut selects = self.select_all(method, &[key])?;
        if selects.len() != 1 {
            return Err(DbError::schema(format!(
                "Expected one select for key {}, got {}",
                key,
                selects.len()
            )));
        }
        Ok(selects.remove(0))
    }

    fn unit_config(&self, address: u8) -> DbResult<&UnitConfig> {
        self.units
            .get(&address)
            .ok_or_else(|| DbError::schema(format!("No config for unit {}", address)))
    }

    fn build_select(&self, method: Method, entries: Vec<Entry>) -> DbResult<Select> {
        let first = entries
            .first()
            .ok_or_else(|| DbError::schema("Cannot build an empty select"))?;
        let config = self.unit_config(first.unit)?;

        Ok(Select {
            method,
            unit: first.unit,
            scope: first.scope,
            big_endian: config.big_endian,
            swap_words: config.swap_words,
            force_write_many: config.force_write_many,
            entries,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::create_register_key;

    fn holding(unit: u8, address: u16) -> u32 {
        create_register_key(unit, Scope::InternalRegister, address, 0).unwrap()
    }

    fn holding_bit(unit: u8, address: u16, bit: u8) -> u32 {
        create_register_key(unit, Scope::InternalRegister, address, bit).unwrap()
    }

    fn coil(unit: u8, address: u16) -> u32 {
        create_register_key(unit, Scope::InternalState, address, 0).unwrap()
    }

    fn input(unit: u8, address: u16) -> u32 {
        create_register_key(unit, Scope::PhysicalRegister, address, 0).unwrap()
    }

    #[test]
    fn test_construction_indexes_watch() {
        let map = Datamap::new(
            vec![
                SchemaEntry::new(holding(1, 10), DataType::UInt16).with_freq(6),
                SchemaEntry::new(holding(1, 11), DataType::UInt16).with_freq(6),
                SchemaEntry::new(holding(1, 12), DataType::UInt16),
            ],
            vec![UnitConfig::new(1)],
        )
        .unwrap();

        assert_eq!(map.len(), 3);
        assert_eq!(map.watch_bucket(6).unwrap().len(), 2);
        assert!(map.watch_bucket(3).is_none());
        assert_eq!(map.watched_frequencies(), vec![6]);
    }

    #[test]
    fn test_default_unit_config_created() {
        let map = Datamap::new(
            vec![SchemaEntry::new(holding(7, 0), DataType::UInt16)],
            vec![],
        )
        .unwrap();

        let unit = map.unit(7).unwrap();
        assert_eq!(unit.address, 7);
        assert_eq!(unit.max_request_size, DEFAULT_MAX_REQUEST_SIZE);
        assert!(!unit.big_endian);
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let result = Datamap::new(
            vec![
                SchemaEntry::new(holding(1, 10), DataType::UInt16),
                SchemaEntry::new(holding(1, 10), DataType::Int16),
            ],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_unit_rejected() {
        let result = Datamap::new(vec![], vec![UnitConfig::new(1), UnitConfig::new(1)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_state_scope_must_be_bit() {
        let result = Datamap::new(
            vec![SchemaEntry::new(coil(1, 0), DataType::UInt16)],
            vec![],
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_register_bit_index_requires_bit_type() {
        let result = Datamap::new(
            vec![SchemaEntry::new(holding_bit(1, 10, 3), DataType::UInt16)],
            vec![],
        );
        assert!(result.is_err());

        let ok = Datamap::new(
            vec![SchemaEntry::new(holding_bit(1, 10, 3), DataType::Bit)],
            vec![],
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn test_scale_validation() {
        assert!(Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::Int16).with_scale(4)],
            vec![],
        )
        .is_err());

        assert!(Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::Float).with_scale(1)],
            vec![],
        )
        .is_err());

        assert!(Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::Int16).with_scale(3)],
            vec![],
        )
        .is_ok());
    }

    #[test]
    fn test_freq_validation() {
        assert!(Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::Int16).with_freq(61)],
            vec![],
        )
        .is_err());
    }

    #[test]
    fn test_zero_request_size_rejected() {
        let result = Datamap::new(vec![], vec![UnitConfig::new(1).with_max_request_size(0)]);
        assert!(result.is_err());
    }

    fn gap_map(gaps: bool) -> Datamap {
        Datamap::new(
            vec![
                SchemaEntry::new(holding(1, 10), DataType::UInt16),
                SchemaEntry::new(holding(1, 11), DataType::Int32),
                SchemaEntry::new(holding(1, 20), DataType::UInt16),
            ],
            vec![UnitConfig::new(1)
                .with_max_request_size(32)
                .with_request_with_gaps(gaps)],
        )
        .unwrap()
    }

    #[test]
    fn test_read_planning_with_gap_coalescing() {
        // Addresses 10 (1 reg), 11 (2 regs, ends at 13), 20. The 7-address
        // gap to 20 is within round(32 * 0.25) = 8, so one request covers
        // the span 10..=20 (11 registers).
        let map = gap_map(true);
        let selects = map
            .select_all(Method::Read, &[holding(1, 10), holding(1, 11), holding(1, 20)])
            .unwrap();

        assert_eq!(selects.len(), 1);
        assert_eq!(selects[0].anchor(), 10);
        assert_eq!(selects[0].count(), 11);
        assert_eq!(selects[0].entries.len(), 3);
    }

    #[test]
    fn test_read_planning_without_gaps() {
        let map = gap_map(false);
        let selects = map
            .select_all(Method::Read, &[holding(1, 10), holding(1, 11), holding(1, 20)])
            .unwrap();

        assert_eq!(selects.len(), 2);
        assert_eq!(selects[0].entries.len(), 2);
        assert_eq!(selects[0].anchor(), 10);
        assert_eq!(selects[1].entries.len(), 1);
        assert_eq!(selects[1].anchor(), 20);
    }

    #[test]
    fn test_write_planning_never_bridges_gaps() {
        let map = gap_map(true);
        let selects = map
            .select_all(
                Method::Write,
                &[holding(1, 10), holding(1, 11), holding(1, 20)],
            )
            .unwrap();
        assert_eq!(selects.len(), 2);
    }

    #[test]
    fn test_span_respects_max_request_size() {
        let map = Datamap::new(
            vec![
                SchemaEntry::new(holding(1, 0), DataType::UInt16),
                SchemaEntry::new(holding(1, 1), DataType::UInt16),
                SchemaEntry::new(holding(1, 2), DataType::UInt16),
                SchemaEntry::new(holding(1, 3), DataType::UInt16),
            ],
            vec![UnitConfig::new(1).with_max_request_size(2)],
        )
        .unwrap();

        let selects = map
            .select_all(
                Method::Read,
                &[holding(1, 0), holding(1, 1), holding(1, 2), holding(1, 3)],
            )
            .unwrap();

        assert_eq!(selects.len(), 2);
        for select in &selects {
            assert!(select.count() <= 2);
        }
    }

    #[test]
    fn test_groups_split_on_unit_and_scope() {
        let map = Datamap::new(
            vec![
                SchemaEntry::new(holding(1, 0), DataType::UInt16),
                SchemaEntry::new(input(1, 0), DataType::UInt16),
                SchemaEntry::new(holding(2, 0), DataType::UInt16),
            ],
            vec![],
        )
        .unwrap();

        let selects = map
            .select_all(Method::Read, &[holding(1, 0), input(1, 0), holding(2, 0)])
            .unwrap();

        assert_eq!(selects.len(), 3);
        for select in &selects {
            for entry in &select.entries {
                assert_eq!(entry.unit, select.unit);
                assert_eq!(entry.scope, select.scope);
            }
        }
    }

    #[test]
    fn test_selects_partition_input_keys() {
        let map = gap_map(true);
        let keys = [holding(1, 20), holding(1, 10), holding(1, 11)];
        let selects = map.select_all(Method::Read, &keys).unwrap();

        let mut seen: Vec<u32> = selects
            .iter()
            .flat_map(|s| s.entries.iter().map(|e| e.key))
            .collect();
        seen.sort_unstable();

        let mut expected = keys.to_vec();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        // Entries within each select are address-sorted.
        for select in &selects {
            let addrs: Vec<u16> = select.entries.iter().map(|e| e.address).collect();
            let mut sorted = addrs.clone();
            sorted.sort_unstable();
            assert_eq!(addrs, sorted);
        }
    }

    #[test]
    fn test_same_word_bits_share_a_group() {
        let map = Datamap::new(
            vec![
                SchemaEntry::new(holding_bit(1, 15, 2), DataType::Bit),
                SchemaEntry::new(holding_bit(1, 15, 3), DataType::Bit),
            ],
            vec![],
        )
        .unwrap();

        let selects = map
            .select_all(
                Method::Read,
                &[holding_bit(1, 15, 2), holding_bit(1, 15, 3)],
            )
            .unwrap();

        assert_eq!(selects.len(), 1);
        // Both bits resolve to one UInt16 word on the wire.
        let wire = selects[0].wire_map();
        assert_eq!(wire.len(), 1);
        assert_eq!(wire.get(&15), Some(&DataType::UInt16));
        assert_eq!(selects[0].count(), 1);
    }

    #[test]
    fn test_select_all_rejects_empty_and_unknown() {
        let map = gap_map(true);
        assert_eq!(
            map.select_all(Method::Read, &[]),
            Err(DbError::validation("Empty key set"))
        );
        let unknown = holding(9, 9);
        assert_eq!(
            map.select_all(Method::Read, &[unknown]),
            Err(DbError::UnknownKey { key: unknown })
        );
    }

    #[test]
    fn test_write_to_read_only_scope_rejected() {
        let map = Datamap::new(
            vec![SchemaEntry::new(input(1, 0), DataType::UInt16)],
            vec![],
        )
        .unwrap();
        assert!(map.select_all(Method::Write, &[input(1, 0)]).is_err());
    }

    #[test]
    fn test_select_one() {
        let map = gap_map(true);
        let select = map.select_one(Method::Read, holding(1, 10)).unwrap();
        assert_eq!(select.entries.len(), 1);
        assert_eq!(select.anchor(), 10);
    }

    #[test]
    fn test_unit_config_endianness_copied_into_select() {
        let map = Datamap::new(
            vec![SchemaEntry::new(holding(1, 0), DataType::UInt32)],
            vec![UnitConfig::new(1).with_big_endian(true).with_swap_words(true)],
        )
        .unwrap();

        let select = map.select_one(Method::Read, holding(1, 0)).unwrap();
        assert!(select.big_endian);
        assert!(select.swap_words);
    }

    #[test]
    fn test_max_gap() {
        let unit = UnitConfig::new(1)
            .with_max_request_size(32)
            .with_request_with_gaps(true);
        assert_eq!(unit.max_gap(Method::Read), 8);
        assert_eq!(unit.max_gap(Method::Write), 0);

        let small = UnitConfig::new(1)
            .with_max_request_size(2)
            .with_request_with_gaps(true);
        assert_eq!(small.max_gap(Method::Read), 0);

        let no_gaps = UnitConfig::new(1).with_max_request_size(32);
        assert_eq!(no_gaps.max_gap(Method::Read), 0);
    }
}
