//! Modbusdb Demo
//!
//! Demonstrates the modbusdb library features against an in-memory
//! simulated device:
//! - Register keys and the four address scopes
//! - Datamap declaration with scales and polling frequencies
//! - get/set/mget/mset with automatic request batching
//! - The watch scheduler and the event stream
//!
//! Usage: cargo run --bin demo

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use modbusdb::{
    create_register_key, DataType, Datamap, DbConfig, DbEvent, DbResult, Modbusdb, ModbusDriver,
    ReadResponse, SchemaEntry, Scope, UnitConfig,
};

/// In-memory device: a word store per (unit, register address) and a bit
/// store per (unit, coil address).
#[derive(Default)]
struct SimulatedDevice {
    registers: Mutex<HashMap<(u8, u16), u16>>,
    coils: Mutex<HashMap<(u8, u16), bool>>,
}

impl SimulatedDevice {
    fn preset(&self, unit: u8, address: u16, word: u16) {
        self.registers.lock().unwrap().insert((unit, address), word);
    }

    fn read_words(&self, unit: u8, address: u16, count: u16) -> Vec<u16> {
        let registers = self.registers.lock().unwrap();
        (0..count)
            .map(|i| *registers.get(&(unit, address + i)).unwrap_or(&0))
            .collect()
    }
}

#[async_trait::async_trait]
impl ModbusDriver for SimulatedDevice {
    async fn read_coils(&self, unit: u8, address: u16, count: u16) -> DbResult<ReadResponse> {
        let coils = self.coils.lock().unwrap();
        let bits = (0..count)
            .map(|i| *coils.get(&(unit, address + i)).unwrap_or(&false))
            .collect();
        Ok(ReadResponse::from_bits(bits))
    }

    async fn read_discrete_inputs(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse> {
        // The simulator mirrors coils into the discrete input space.
        self.read_coils(unit, address, count).await
    }

    async fn read_holding_registers(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse> {
        Ok(ReadResponse::from_words(self.read_words(unit, address, count)))
    }

    async fn read_input_registers(
        &self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> DbResult<ReadResponse> {
        Ok(ReadResponse::from_words(self.read_words(unit, address, count)))
    }

    async fn write_coil(&self, unit: u8, address: u16, on: bool) -> DbResult<()> {
        self.coils.lock().unwrap().insert((unit, address), on);
        Ok(())
    }

    async fn write_register(&self, unit: u8, address: u16, payload: &[u8]) -> DbResult<()> {
        self.write_registers(unit, address, payload).await
    }

    async fn write_coils(&self, unit: u8, address: u16, states: &[bool]) -> DbResult<()> {
        let mut coils = self.coils.lock().unwrap();
        for (i, &on) in states.iter().enumerate() {
            coils.insert((unit, address + i as u16), on);
        }
        Ok(())
    }

    async fn write_registers(&self, unit: u8, address: u16, payload: &[u8]) -> DbResult<()> {
        let mut registers = self.registers.lock().unwrap();
        for (i, chunk) in payload.chunks(2).enumerate() {
            let word = u16::from_be_bytes([chunk[0], chunk.get(1).copied().unwrap_or(0)]);
            registers.insert((unit, address + i as u16), word);
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Modbusdb Demo");
    println!("================");
    println!("Typed register database over a simulated Modbus device\n");

    let device = Arc::new(SimulatedDevice::default());

    // =========================================================================
    // Part 1: Keys and schema
    // =========================================================================
    println!("🔑 Part 1: Register Keys");
    println!("------------------------");

    let temperature = create_register_key(1, Scope::InternalRegister, 10, 0)?;
    let pressure = create_register_key(1, Scope::InternalRegister, 11, 0)?;
    let flow = create_register_key(1, Scope::InternalRegister, 20, 0)?;
    let alarm_bit = create_register_key(1, Scope::InternalRegister, 30, 2)?;
    let pump = create_register_key(1, Scope::InternalState, 5, 0)?;

    for (name, key) in [
        ("temperature", temperature),
        ("pressure", pressure),
        ("flow", flow),
        ("alarm_bit", alarm_bit),
        ("pump", pump),
    ] {
        println!("  {:<12} -> key {:#010x}", name, key);
    }

    let datamap = Datamap::new(
        vec![
            SchemaEntry::new(temperature, DataType::Int16)
                .with_scale(1)
                .with_freq(6),
            SchemaEntry::new(pressure, DataType::UInt16).with_freq(6),
            SchemaEntry::new(flow, DataType::Float),
            SchemaEntry::new(alarm_bit, DataType::Bit),
            SchemaEntry::new(pump, DataType::Bit),
        ],
        vec![UnitConfig::new(1)
            .with_max_request_size(32)
            .with_big_endian(true)
            .with_request_with_gaps(true)],
    )?;

    // =========================================================================
    // Part 2: get/set with scaling and bit addressing
    // =========================================================================
    println!("\n📦 Part 2: Reads and Writes");
    println!("---------------------------");

    device.preset(1, 10, 235); // 23.5 after scale 1
    device.preset(1, 30, 0b0100); // alarm bit 2 set

    let db = Modbusdb::with_config(
        device.clone(),
        datamap,
        DbConfig::new().with_timeout_secs(5),
    );

    let tx = db.get(temperature).await?;
    println!("  temperature = {:?}", tx.data().and_then(|d| d.get(&temperature)));

    let tx = db.get(alarm_bit).await?;
    println!("  alarm bit   = {:?}", tx.data().and_then(|d| d.get(&alarm_bit)));

    db.set(temperature, 42.5).await?;
    println!("  wrote temperature = 42.5 (stored as 425)");

    db.set(pump, 1.0).await?;
    println!("  pump switched on");

    // =========================================================================
    // Part 3: Batched multi-reads
    // =========================================================================
    println!("\n🧮 Part 3: Batched mget");
    println!("-----------------------");

    let result = db.mget(&[temperature, pressure, flow]).await?;
    println!(
        "  {} values over {} wire request(s) in {:?}",
        result.payload.len(),
        result.transactions.len(),
        result.total_time
    );
    for (key, value) in &result.payload {
        println!("    key {:#010x} = {}", key, value);
    }

    // =========================================================================
    // Part 4: Watching
    // =========================================================================
    println!("\n⏱️  Part 4: Watch Events");
    println!("------------------------");

    let mut events = db.subscribe();
    db.watch()?;
    println!("  watching (freq 6 entries poll 6 times per round)...");

    let mut seen = 0;
    while seen < 2 {
        match events.recv().await? {
            DbEvent::Tick { round, tick } => {
                println!("  tick {}/{}", round, tick);
                seen += 1;
            }
            DbEvent::Data(data) => println!("  data: {} value(s)", data.len()),
            _ => {}
        }
    }

    db.destroy()?;
    println!("\n✅ Demo complete");
    Ok(())
}
