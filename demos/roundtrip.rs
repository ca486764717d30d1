use std::time::Instant;

use anyhow::{ensure, Result};
use busio::{read_file, BusFile, Header, Record, RECORD_SIZE};
use clap::Parser;

/// Write a BUS file, read it back and verify the grouped records match
#[derive(Parser)]
struct Args {
    /// Number of records to write (in millions)
    #[clap(long, default_value_t = 10.0)]
    records: f64,
    /// Number of distinct barcodes
    #[clap(long, default_value_t = 100_000)]
    barcodes: u64,
    #[clap(long, default_value = "test_roundtrip.bus")]
    path: String,
    /// Keep the file after the test
    #[clap(long)]
    keep: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let num_records = (args.records * 1_000_000.0) as u64;

    println!("BUS Roundtrip Test");
    println!("==================");
    println!("Records: {}", num_records);
    println!(
        "File size: ~{:.2} GB\n",
        (num_records as usize * RECORD_SIZE) as f64 / 1_000_000_000.0
    );

    let header = Header::new(16, 12).with_text("roundtrip");
    let mut bus = BusFile::new(header);
    bus.extend((0..num_records).map(|i| {
        Record::new(
            i % args.barcodes,      // barcode
            (i * 31) % 1_000_000,   // umi
            (i % 4096) as u32,      // ec
            1,                      // count
            0,                      // flag
        )
    }));

    // ========== WRITE ==========
    println!("Writing...");
    let write_start = Instant::now();
    bus.write_path(&args.path)?;
    let write_duration = write_start.elapsed();
    report(num_records, write_duration.as_secs_f64());

    // ========== READ ==========
    println!("Reading...");
    let read_start = Instant::now();
    let parsed = read_file(&args.path)?;
    let read_duration = read_start.elapsed();
    report(parsed.n_entries as u64, read_duration.as_secs_f64());

    // ========== VERIFICATION ==========
    println!("Verification:");
    ensure!(parsed.header == bus.header, "Header mismatch");
    ensure!(
        parsed.n_entries as u64 == num_records,
        "Record count mismatch: wrote {}, read {}",
        num_records,
        parsed.n_entries
    );
    ensure!(
        parsed.records.iter().eq(bus.records.iter()),
        "Grouped records differ"
    );
    for advisory in parsed.advisories() {
        println!("  advisory: {}", advisory);
    }
    println!("  ✓ {} barcodes match\n", parsed.num_barcodes());

    if !args.keep {
        std::fs::remove_file(&args.path)?;
        println!("✓ Test complete - file cleaned up");
    }
    Ok(())
}

fn report(records: u64, secs: f64) {
    println!("  Duration: {:.2}s", secs);
    println!("  Rate: {:.2} M records/s", records as f64 / secs / 1_000_000.0);
    println!(
        "  Bandwidth: {:.2} GB/s\n",
        (records as usize * RECORD_SIZE) as f64 / secs / 1_000_000_000.0
    );
}
