use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::Result;
use busio::{BusFile, MmapReader, ParallelProcessor, ParallelReader, Record};
use clap::Parser;

/// Sum record counts and group records by barcode across threads
#[derive(Parser)]
struct Args {
    /// Input BUS file (uncompressed)
    #[clap(required = true)]
    path: String,
    /// Number of threads (0 = all cores)
    #[clap(short = 'T', long, default_value_t = 0)]
    threads: usize,
    /// Also run the single-threaded parse and compare
    #[clap(long)]
    verify: bool,
}

#[derive(Clone, Default)]
pub struct Processor {
    local_count: [u64; 2],
    global_count: Arc<Mutex<[u64; 2]>>,
}
impl Processor {
    pub fn final_counts(&self) -> [u64; 2] {
        *self.global_count.lock().unwrap()
    }
}
impl ParallelProcessor for Processor {
    fn process_record(&mut self, record: Record) -> busio::Result<()> {
        self.local_count[0] += 1;
        self.local_count[1] += record.count as u64;
        Ok(())
    }
    fn on_batch_complete(&mut self) -> busio::Result<()> {
        let mut guard = self.global_count.lock().unwrap();
        guard[0] += self.local_count[0];
        guard[1] += self.local_count[1];
        self.local_count = [0; 2];
        Ok(())
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let reader = MmapReader::new(&args.path)?;
    println!(
        "Header: bc_len={} umi_len={} version={} text={}B",
        reader.header().bc_len,
        reader.header().umi_len,
        reader.header().version,
        reader.header().text.len()
    );

    let start = Instant::now();
    let processor = Processor::default();
    reader.process_parallel(processor.clone(), args.threads)?;
    let [records, counts] = processor.final_counts();
    println!(
        "Processed {} records ({} reads) in {:.2}s",
        records,
        counts,
        start.elapsed().as_secs_f64()
    );

    let start = Instant::now();
    let (grouped, n_entries) = reader.load_grouped(args.threads)?;
    println!(
        "Grouped {} records into {} barcodes in {:.2}s",
        n_entries,
        grouped.len(),
        start.elapsed().as_secs_f64()
    );

    if args.verify {
        let start = Instant::now();
        let sequential = BusFile::from_path(&args.path)?;
        println!(
            "Sequential parse in {:.2}s",
            start.elapsed().as_secs_f64()
        );
        anyhow::ensure!(
            sequential.records.iter().eq(grouped.iter()),
            "Parallel grouping differs from sequential parse"
        );
        println!("✓ Parallel and sequential grouping match");
    }

    Ok(())
}
