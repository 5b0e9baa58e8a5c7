//! rid-monitor: CLI for replaying and live-watching Remote ID broadcast
//! captures.
//!
//! Capture format: one advertisement per line,
//! `MAC;RSSI;PHY;HEX[;TIMESTAMP]`, `#` comments and blank lines skipped.
//! PHY is `ble4`/`legacy` or `ble5`/`coded`. Lines without a timestamp
//! auto-increment by 0.1 s.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use rid_core::record::{DroneRecord, STALE_TIMEOUT};
use rid_core::registry::{IngestOutcome, Registry};
use rid_core::scan::Advertisement;
use rid_core::types::*;

#[derive(Parser)]
#[command(name = "rid-monitor", version, about = "Remote ID broadcast decoder and device monitor")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a capture file and print the resulting device table
    Decode {
        /// Capture file with one advertisement per line, or '-' for stdin
        file: PathBuf,

        /// Emit the final registry snapshot as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Live-ingest a capture with eviction sweep and periodic display
    Watch {
        /// Capture source, or '-' for stdin
        file: PathBuf,

        /// Seconds without a sighting before a device is evicted
        #[arg(long, env = "RID_STALE_SECS", default_value_t = STALE_TIMEOUT)]
        stale_secs: f64,

        /// Eviction sweep period in milliseconds
        #[arg(long, env = "RID_SWEEP_MS", default_value = "1000")]
        sweep_ms: u64,

        /// Display refresh period in milliseconds
        #[arg(long, env = "RID_REFRESH_MS", default_value = "2000")]
        refresh_ms: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { file, json } => cmd_decode(file, json),
        Commands::Watch {
            file,
            stale_secs,
            sweep_ms,
            refresh_ms,
        } => cmd_watch(file, stale_secs, sweep_ms, refresh_ms),
    }
}

// ---------------------------------------------------------------------------
// Capture line parsing
// ---------------------------------------------------------------------------

/// Parse one capture line into an advertisement envelope.
fn parse_line(line: &str, default_ts: f64) -> Result<Advertisement> {
    let fields: Vec<&str> = line.split(';').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(RidError::InvalidLine(line.into()));
    }
    let mac = mac_from_str(fields[0]).ok_or_else(|| RidError::InvalidMac(fields[0].into()))?;
    let rssi: i8 = fields[1]
        .parse()
        .map_err(|_| RidError::InvalidLine(line.into()))?;
    let phy: LinkPhy = fields[2].parse()?;
    let payload = hex_decode(fields[3]).ok_or_else(|| RidError::InvalidHex(fields[3].into()))?;
    let timestamp = fields
        .get(4)
        .and_then(|t| t.parse().ok())
        .unwrap_or(default_ts);

    Ok(Advertisement {
        mac,
        phy,
        rssi,
        payload,
        timestamp,
    })
}

fn open_reader(file: &PathBuf) -> Box<dyn BufRead + Send> {
    if file.to_str() == Some("-") {
        Box::new(io::BufReader::new(io::stdin()))
    } else {
        let f = std::fs::File::open(file).unwrap_or_else(|e| {
            eprintln!("Error opening {}: {e}", file.display());
            std::process::exit(1);
        });
        Box::new(io::BufReader::new(f))
    }
}

fn now_unix() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// decode: single-threaded replay
// ---------------------------------------------------------------------------

fn cmd_decode(file: PathBuf, json: bool) {
    let reader = open_reader(&file);
    let registry = Registry::new();

    let mut total_lines = 0u64;
    let mut not_remote_id = 0u64;
    let mut total_messages = 0u64;
    let mut timestamp = 0.0f64;

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let advert = match parse_line(line, timestamp) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("Skipping: {e}");
                continue;
            }
        };
        timestamp = advert.timestamp + 0.1;
        total_lines += 1;

        match registry.ingest(&advert) {
            IngestOutcome::Applied { messages } => total_messages += messages as u64,
            IngestOutcome::NotRemoteId => not_remote_id += 1,
            IngestOutcome::Contended => unreachable!("single-threaded replay"),
        }
    }

    let snapshot = registry
        .snapshot(Duration::from_millis(500))
        .unwrap_or_default();

    if json {
        for rec in &snapshot {
            match serde_json::to_string(rec) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("Error serializing record: {e}"),
            }
        }
        return;
    }

    println!();
    println!(
        "Advertisements: {total_lines} parsed, {} Remote ID, {not_remote_id} other",
        registry.ingested()
    );
    println!(
        "Messages: {total_messages} merged across {} devices",
        snapshot.len()
    );

    if !snapshot.is_empty() {
        println!();
        println!("{}", device_table(&snapshot, timestamp));
    }
}

// ---------------------------------------------------------------------------
// watch: producer + sweep + consumer
// ---------------------------------------------------------------------------

fn cmd_watch(file: PathBuf, stale_secs: f64, sweep_ms: u64, refresh_ms: u64) {
    let reader = open_reader(&file);
    let registry = Arc::new(Registry::new());
    let done = Arc::new(AtomicBool::new(false));

    // Producer: one advertisement per line, non-blocking ingest. A line
    // arriving while the sweep or display holds the lock is dropped, the
    // same policy a radio callback would use.
    let producer = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for line in reader.lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(_) => break,
                };
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Ok(advert) = parse_line(line, now_unix()) {
                    registry.ingest(&advert);
                }
            }
            done.store(true, Ordering::Relaxed);
        })
    };

    // Eviction sweep on its own cadence; skips a cycle on lock timeout.
    let sweeper = {
        let registry = Arc::clone(&registry);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(sweep_ms));
                let _ = registry.evict_stale(now_unix(), stale_secs, Duration::from_millis(100));
            }
        })
    };

    // Consumer: periodic snapshot + render on the main thread.
    while !done.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(refresh_ms));
        if let Some(snapshot) = registry.snapshot(Duration::from_millis(250)) {
            println!();
            println!(
                "Devices: {}  (ingested {}, dropped {})",
                snapshot.len(),
                registry.ingested(),
                registry.dropped()
            );
            if !snapshot.is_empty() {
                println!("{}", device_table(&snapshot, now_unix()));
            }
        }
    }

    if producer.join().is_err() {
        eprintln!("Producer thread panicked");
    }
    if sweeper.join().is_err() {
        eprintln!("Sweep thread panicked");
    }

    // Final view after the capture ends.
    if let Some(snapshot) = registry.snapshot(Duration::from_millis(500)) {
        println!();
        println!(
            "Capture ended: {} devices, {} ingested, {} dropped",
            snapshot.len(),
            registry.ingested(),
            registry.dropped()
        );
        if !snapshot.is_empty() {
            println!("{}", device_table(&snapshot, now_unix()));
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn device_table(records: &[DroneRecord], now: f64) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "MAC", "PHY", "RSSI", "Serial", "Type", "Status", "Lat", "Lon", "Alt (m)", "Operator",
        "Msgs", "Blocks", "Age (s)",
    ]);

    for rec in records {
        let tel = rec.telemetry.as_ref();
        table.add_row(vec![
            Cell::new(mac_to_string(&rec.key.mac)),
            Cell::new(rec.key.phy),
            Cell::new(format!("{} dBm", rec.rssi)),
            Cell::new(rec.serial.as_deref().unwrap_or("-")),
            Cell::new(
                rec.ua_type
                    .map(|t| t.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                tel.map(|t| t.status.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                tel.map(|t| format!("{:.6}", t.lat))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                tel.map(|t| format!("{:.6}", t.lon))
                    .unwrap_or("-".into()),
            ),
            Cell::new(
                tel.map(|t| t.alt_m.to_string())
                    .unwrap_or("-".into()),
            ),
            Cell::new(rec.operator_id.as_deref().unwrap_or("-")),
            Cell::new(rec.msg_count),
            Cell::new(rec.seen_types),
            Cell::new(format!("{:.1}", rec.age(now).max(0.0))),
        ]);
    }

    table
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
