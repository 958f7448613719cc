use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::thread;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::{error, info};

use gauge_registry as gauge;
use gauge_registry::{DecodeReport, DecodedEntry, MetricsHub, RegisterDescriptor, RegisterSchema};
use smbus_transport as smbus;
use smbus_transport::SmbusBus;

#[derive(Parser, Debug)]
#[command(
    name = "gauge",
    version,
    about = "SMBus gas-gauge register decoder",
    disable_help_subcommand = true
)]
struct Cli {
    /// Bus backend
    #[arg(long, value_enum, default_value_t = Backend::Mock, global = true)]
    backend: Backend,

    /// Serial port of the console bridge, or the mock bus name
    #[arg(long, default_value = "mock0", global = true)]
    device: String,

    /// Baud rate for the console bridge
    #[arg(long, default_value_t = 115_200, global = true)]
    baud: u32,

    /// 7-bit device address (e.g. 0x0B); defaults to the schema's address
    #[arg(long, global = true)]
    address: Option<String>,

    /// Register schema file (YAML/JSON); defaults to the built-in bq30z555 table
    #[arg(long, global = true)]
    schema: Option<String>,

    /// Emit JSON instead of text
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    json: bool,

    /// Print Prometheus metrics after the command
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Serial,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List interfaces of the selected backend
    BusList,
    /// Decode every register of the schema
    Show,
    /// Decode one register by name or command code (e.g. Voltage or 0x09)
    Read { register: String },
    /// Decode a Lifetime Data block
    Lifetime {
        /// Block index (1..=3)
        #[arg(default_value_t = 1)]
        block: u8,
    },
    /// Ad-hoc write-then-read transaction
    Raw {
        /// Bytes to write (0xNN or decimal)
        #[arg(long, num_args = 1.., required = true)]
        write: Vec<String>,
        /// Number of bytes to read (1..=256)
        #[arg(long)]
        read: usize,
        /// Repeat the transaction this many times
        #[arg(long, default_value_t = 1)]
        repeat: u32,
        /// Delay between repetitions in milliseconds
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,
    },
    /// Validate a schema file or every schema in a directory
    SchemaValidate {
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        dir: Option<String>,
    },
    /// Print the active schema as YAML (JSON with --json)
    SchemaDump {
        /// Print the JSON Schema of the file format instead
        #[arg(long, action = ArgAction::SetTrue)]
        json_schema: bool,
    },
}

/// Everything a bus command needs once the global flags are resolved.
struct Session {
    schema: RegisterSchema,
    address: u8,
    json: bool,
    hub: Option<MetricsHub>,
}

const MAX_RAW_READ: usize = 256;

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match &cli.command {
        Commands::BusList => bus_list(cli.backend),
        Commands::SchemaValidate { file, dir } => {
            schema_validate(file.as_deref(), dir.as_deref(), cli.json)
        }
        Commands::SchemaDump { json_schema: true } => {
            println!("{}", serde_json::to_string_pretty(&gauge::schema_json_schema()?)?);
            Ok(())
        }
        Commands::SchemaDump { json_schema: false } => {
            schema_dump(&load_active_schema(cli.schema.as_deref())?, cli.json)
        }
        command => {
            let session = Session::from_cli(&cli)?;
            let mut bus = open_bus(cli.backend, &cli.device, cli.baud)?;
            let res = match (&session.hub, command) {
                (Some(hub), cmd) => {
                    let mut metered = hub.wrap(bus);
                    run_bus_command(&session, &mut metered, cmd)
                }
                (None, cmd) => run_bus_command(&session, &mut bus, cmd),
            };
            if let Some(hub) = &session.hub {
                eprint!("{}", hub.encode_text());
            }
            res
        }
    }
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

impl Session {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let schema = load_active_schema(cli.schema.as_deref())?;
        let address = match cli.address.as_deref() {
            Some(s) => parse_address(s)?,
            None => schema.address,
        };
        let hub = if cli.metrics {
            let hub = MetricsHub::new().map_err(|e| anyhow!(e))?;
            hub.registers_loaded.set(schema.len() as i64);
            Some(hub)
        } else {
            None
        };
        Ok(Self {
            schema,
            address,
            json: cli.json,
            hub,
        })
    }
}

fn run_bus_command<B: SmbusBus + ?Sized>(
    session: &Session,
    bus: &mut B,
    command: &Commands,
) -> Result<()> {
    match command {
        Commands::Show => show(session, bus),
        Commands::Read { register } => read_register(session, bus, register),
        Commands::Lifetime { block } => lifetime(session, bus, *block),
        Commands::Raw {
            write,
            read,
            repeat,
            interval_ms,
        } => raw(session, bus, write, *read, *repeat, *interval_ms),
        Commands::BusList | Commands::SchemaValidate { .. } | Commands::SchemaDump { .. } => {
            Err(anyhow!("command does not use the bus"))
        }
    }
}

fn load_active_schema(path: Option<&str>) -> Result<RegisterSchema> {
    match path {
        Some(p) => gauge::load_schema_file(p),
        None => Ok(RegisterSchema::bq30z555()),
    }
}

fn open_bus(backend: Backend, device: &str, baud: u32) -> Result<Box<dyn SmbusBus>> {
    match backend {
        Backend::Mock => {
            let bus = smbus::MockBus::open(device)?;
            info!(device, "mock bus open");
            Ok(Box::new(bus))
        }
        Backend::Serial => {
            let bus = smbus::ConsoleBridgeBus::open_with(device, baud, Duration::from_millis(500))
                .with_context(|| format!("opening console bridge {device}"))?;
            info!(device, baud, "console bridge open");
            Ok(Box::new(bus))
        }
    }
}

fn bus_list(backend: Backend) -> Result<()> {
    let buses = match backend {
        Backend::Mock => smbus::MockBus::list()?,
        Backend::Serial => smbus::ConsoleBridgeBus::list()?,
    };
    for bus in buses {
        println!("{}\t{}", bus.name, bus.driver);
    }
    Ok(())
}

fn print_entries(session: &Session, entries: &[DecodedEntry<'_>]) -> Result<()> {
    if session.json {
        let report = DecodeReport::new(
            &session.schema,
            session.address,
            entries,
            Some(OffsetDateTime::now_utc()),
        );
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in entries {
            for line in gauge::format_lines(entry.descriptor, &entry.result) {
                println!("{line}");
            }
        }
    }
    Ok(())
}

fn show<B: SmbusBus + ?Sized>(session: &Session, bus: &mut B) -> Result<()> {
    let entries = gauge::decode_all(bus, session.address, &session.schema);
    if let Some(hub) = &session.hub {
        hub.record_entries(&entries);
    }
    print_entries(session, &entries)?;
    let failed = entries.iter().filter(|e| !e.is_ok()).count();
    if failed > 0 {
        info!(failed, total = entries.len(), "decode finished with failures");
    }
    Ok(())
}

fn find_register<'a>(schema: &'a RegisterSchema, key: &str) -> Result<&'a RegisterDescriptor> {
    let by_command = parse_byte(key)
        .ok()
        .and_then(|cmd| schema.find_by_command(cmd));
    by_command
        .or_else(|| schema.find_by_name(key))
        .ok_or_else(|| anyhow!("unknown register '{key}' in schema {}", schema.device))
}

fn read_register<B: SmbusBus + ?Sized>(session: &Session, bus: &mut B, key: &str) -> Result<()> {
    let descriptor = find_register(&session.schema, key)?;
    let result = gauge::decode_one(bus, session.address, descriptor);
    let entries = [DecodedEntry { descriptor, result }];
    if let Some(hub) = &session.hub {
        hub.record_entries(&entries);
    }
    print_entries(session, &entries)?;
    match &entries[0].result {
        Ok(_) => Ok(()),
        Err(e) => Err(anyhow!("reading {}: {e}", descriptor.name)),
    }
}

fn lifetime<B: SmbusBus + ?Sized>(session: &Session, bus: &mut B, block: u8) -> Result<()> {
    let descriptor = gauge::lifetime_descriptor(block)?;
    let value = gauge::decode_lifetime(bus, session.address, block)?;
    let entries = [DecodedEntry {
        descriptor: &descriptor,
        result: Ok(value),
    }];
    print_entries(session, &entries)
}

#[derive(Debug, Serialize)]
struct RawCycle {
    cycle: u32,
    ts: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn raw<B: SmbusBus + ?Sized>(
    session: &Session,
    bus: &mut B,
    write: &[String],
    read_len: usize,
    repeat: u32,
    interval_ms: u64,
) -> Result<()> {
    let bytes = parse_hex_bytes(write)?;
    if read_len == 0 || read_len > MAX_RAW_READ {
        return Err(anyhow!(
            "invalid number of bytes to read: {read_len} (must be 1..={MAX_RAW_READ})"
        ));
    }
    let repeat = repeat.max(1);
    let mut buf = vec![0u8; read_len];
    let mut failures = 0u32;
    for cycle in 1..=repeat {
        info!(
            cycle,
            repeat,
            address = session.address,
            write = %smbus::hex_bytes(&bytes),
            read = read_len,
            "i2c write-then-read"
        );
        let outcome = bus.write_then_read(session.address, &bytes, &mut buf);
        let ts = OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        let record = match outcome {
            Ok(()) => RawCycle {
                cycle,
                ts,
                data: Some(smbus::hex_bytes(&buf)),
                error: None,
            },
            Err(e) => {
                failures += 1;
                error!(cycle, address = session.address, error = %e, "write/read failed");
                RawCycle {
                    cycle,
                    ts,
                    data: None,
                    error: Some(e.to_string()),
                }
            }
        };
        print_raw_cycle(session.json, &record)?;
        if cycle < repeat && interval_ms > 0 {
            thread::sleep(Duration::from_millis(interval_ms));
        }
    }
    if failures > 0 {
        return Err(anyhow!(
            "{failures} of {repeat} transaction(s) to 0x{:02X} failed",
            session.address
        ));
    }
    Ok(())
}

fn print_raw_cycle(json: bool, record: &RawCycle) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    match (&record.data, &record.error) {
        (Some(data), _) => println!("Read data: {data}"),
        (None, Some(e)) => println!("cycle {}: error: {e}", record.cycle),
        (None, None) => {}
    }
    Ok(())
}

fn schema_validate(file: Option<&str>, dir: Option<&str>, json: bool) -> Result<()> {
    let schemas: Vec<RegisterSchema> = match (file, dir) {
        (Some(f), None) => vec![gauge::load_schema_file(f)?],
        (None, Some(d)) => {
            let reg = gauge::load_schemas_dir(d)?;
            let mut all: Vec<RegisterSchema> = reg.devices.into_values().collect();
            all.sort_by(|a, b| a.device.cmp(&b.device));
            all
        }
        (None, None) => vec![RegisterSchema::bq30z555()],
        (Some(_), Some(_)) => return Err(anyhow!("pass either --file or --dir, not both")),
    };
    // Loaded schemas are already validated; this covers the built-in table
    for schema in &schemas {
        schema.validate()?;
    }
    if json {
        let out: Vec<serde_json::Value> = schemas
            .iter()
            .map(|s| {
                serde_json::json!({
                    "device": s.device,
                    "address": format!("0x{:02X}", s.address),
                    "registers": s.len(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for s in &schemas {
            println!("OK: {} (0x{:02X}, {} registers)", s.device, s.address, s.len());
        }
    }
    Ok(())
}

fn schema_dump(schema: &RegisterSchema, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
    } else {
        print!("{}", gauge::schema_to_yaml(schema)?);
    }
    Ok(())
}

/// Parse a byte as `0xNN` hex or plain decimal.
fn parse_byte(s: &str) -> Result<u8> {
    let t = s.trim();
    let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => t.parse::<u8>(),
    };
    parsed.map_err(|e| anyhow!("invalid byte '{t}': {e}"))
}

fn parse_address(s: &str) -> Result<u8> {
    let addr = parse_byte(s)?;
    if addr > smbus::MAX_ADDRESS {
        return Err(anyhow!(
            "address 0x{addr:02X} is not a 7-bit address (max 0x{:02X})",
            smbus::MAX_ADDRESS
        ));
    }
    Ok(addr)
}

fn parse_hex_bytes(items: &[String]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(items.len());
    for s in items {
        out.push(parse_byte(s)?);
    }
    if out.is_empty() {
        return Err(anyhow!("at least one byte to write is required"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_byte_forms() {
        assert_eq!(parse_byte("0x0B").unwrap(), 0x0B);
        assert_eq!(parse_byte("0XFF").unwrap(), 0xFF);
        assert_eq!(parse_byte(" 9 ").unwrap(), 9);
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("zz").is_err());
    }

    #[test]
    fn test_parse_address_limits() {
        assert_eq!(parse_address("0x7F").unwrap(), 0x7F);
        assert!(parse_address("0x80").is_err());
    }

    #[test]
    fn test_parse_hex_bytes() {
        let items = vec!["0x44".to_string(), "0x00".to_string(), "2".to_string()];
        assert_eq!(parse_hex_bytes(&items).unwrap(), vec![0x44, 0x00, 0x02]);
        assert!(parse_hex_bytes(&[]).is_err());
    }

    #[test]
    fn test_find_register_by_name_or_code() {
        let schema = RegisterSchema::bq30z555();
        assert_eq!(find_register(&schema, "voltage").unwrap().command, 0x09);
        assert_eq!(find_register(&schema, "0x08").unwrap().name, "Temperature");
        assert!(find_register(&schema, "NoSuchThing").is_err());
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "gauge", "read", "Voltage", "--address", "0x0B", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert_eq!(cli.address.as_deref(), Some("0x0B"));
        assert!(matches!(cli.command, Commands::Read { .. }));
    }

    #[test]
    fn test_raw_against_mock() {
        let session = Session {
            schema: RegisterSchema::bq30z555(),
            address: 0x0B,
            json: false,
            hub: None,
        };
        let mut bus = smbus::MockBus::with_gauge_defaults(0x0B);
        raw(&session, &mut bus, &["0x09".to_string()], 2, 3, 0).unwrap();
        assert_eq!(bus.calls().len(), 3);
        assert!(raw(&session, &mut bus, &["0x09".to_string()], 0, 1, 0).is_err());
    }

    #[test]
    fn test_raw_failures_reported_after_all_cycles() {
        let session = Session {
            schema: RegisterSchema::bq30z555(),
            address: 0x0B,
            json: true,
            hub: None,
        };
        let mut bus = smbus::MockBus::with_gauge_defaults(0x0B);
        bus.fail_transaction(0, smbus::TransportError::Nack);
        let res = raw(&session, &mut bus, &["0x09".to_string()], 2, 2, 0);
        assert!(res.is_err());
        assert_eq!(bus.calls().len(), 2);
    }

    #[test]
    fn test_show_with_metrics_counts_decodes() {
        let hub = MetricsHub::new().unwrap();
        let session = Session {
            schema: RegisterSchema::bq30z555(),
            address: 0x0B,
            json: false,
            hub: Some(hub.clone()),
        };
        let mut inner = smbus::MockBus::with_gauge_defaults(0x0B);
        inner.fail_command(0x09, smbus::TransportError::Timeout);
        let mut bus = hub.wrap(inner);
        show(&session, &mut bus).unwrap();
        assert_eq!(hub.decode_errors.get(), 1);
        assert!(hub.bus.transactions.get() > 0);
    }
}
