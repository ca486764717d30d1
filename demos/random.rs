use std::time::Instant;

use anyhow::Result;
use busio::{BusFile, Entry, Header, RECORD_SIZE};
use clap::Parser;
use rand::{rngs::SmallRng, Rng, SeedableRng};

/// Generate a random BUS file
#[derive(Parser)]
struct Args {
    /// Output file path
    #[clap(required = true)]
    path: String,
    /// Number of records to generate (in millions)
    #[clap(long, default_value_t = 1.0)]
    records: f64,
    /// Number of distinct barcodes
    #[clap(long, default_value_t = 1_000)]
    barcodes: u64,
    /// Number of distinct equivalence classes
    #[clap(long, default_value_t = 10_000)]
    max_ec: u32,
    #[clap(long, default_value_t = 16)]
    bc_len: u32,
    #[clap(long, default_value_t = 12)]
    umi_len: u32,
    /// Sort the output by barcode then UMI
    #[clap(long)]
    sorted: bool,
    #[clap(long)]
    seed: Option<u64>,
}

/// Mask keeping the low `len` bases of a packed sequence.
fn base_mask(len: u32) -> u64 {
    if len as usize >= busio::MAX_BASES {
        u64::MAX
    } else {
        (1u64 << (2 * len)) - 1
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut rng = if let Some(seed) = args.seed {
        SmallRng::seed_from_u64(seed)
    } else {
        SmallRng::from_os_rng()
    };

    let bc_mask = base_mask(args.bc_len);
    let umi_mask = base_mask(args.umi_len);

    let mut bus = BusFile::new(Header::new(args.bc_len, args.umi_len));
    let num_records = (args.records * 1_000_000.0) as usize;
    for _ in 0..num_records {
        let barcode = rng.random_range(0..args.barcodes) & bc_mask;
        let entry = Entry::new(
            rng.random::<u64>() & umi_mask,
            rng.random_range(0..args.max_ec),
            rng.random_range(1..5),
            0,
        );
        bus.push_entry(barcode, entry);
    }

    let start = Instant::now();
    let sort_key = args.sorted.then_some(busio::SortKey::BarcodeUmi);
    bus.write_path_sorted(&args.path, sort_key)?;
    let elapsed = start.elapsed();

    let total_bytes = bus.header.size() + (num_records * RECORD_SIZE);

    eprintln!(
        "Finished writing {} records across {} barcodes",
        num_records,
        bus.num_barcodes()
    );
    eprintln!("Elapsed time: {:?}", elapsed);
    eprintln!(
        "Bandwidth: {:.2} GB/s",
        total_bytes as f64 / elapsed.as_secs_f64() / 1_000_000_000.0
    );

    Ok(())
}
