use crate::{Record, Result};

/// Per-thread record handler used by [`ParallelReader::process_parallel`].
///
/// This is implemented by the **processor** not by the **reader**.
/// Each worker thread receives its own clone; share results through
/// synchronized state flushed in [`ParallelProcessor::on_batch_complete`].
///
/// # Examples
///
/// Summing read counts per worker and merging them into a shared total:
///
/// ```rust,no_run
/// use busio::{MmapReader, ParallelProcessor, ParallelReader, Record};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Clone, Default)]
/// struct ReadCounter {
///     local: u64,
///     total: Arc<Mutex<u64>>,
/// }
/// impl ParallelProcessor for ReadCounter {
///     fn process_record(&mut self, record: Record) -> busio::Result<()> {
///         self.local += record.count as u64;
///         Ok(())
///     }
///     fn on_batch_complete(&mut self) -> busio::Result<()> {
///         *self.total.lock().unwrap() += std::mem::take(&mut self.local);
///         Ok(())
///     }
/// }
///
/// # fn main() -> busio::Result<()> {
/// let counter = ReadCounter::default();
/// MmapReader::new("output.bus")?.process_parallel(counter.clone(), 4)?;
/// println!("{} reads", counter.total.lock().unwrap());
/// # Ok(())
/// # }
/// ```
pub trait ParallelProcessor: Send + Clone {
    /// Process a single record
    fn process_record(&mut self, record: Record) -> Result<()>;

    /// Called after each contiguous batch of records on a worker
    fn on_batch_complete(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called once per worker with its thread index before processing starts
    fn set_tid(&mut self, _tid: usize) {}

    fn get_tid(&self) -> Option<usize> {
        None
    }
}

/// Readers that can split their records across worker threads.
///
/// Records are handed out in contiguous, record-aligned ranges; no ordering
/// is guaranteed across threads.
pub trait ParallelReader {
    fn process_parallel<P: ParallelProcessor + Clone + 'static>(
        &self,
        processor: P,
        num_threads: usize,
    ) -> Result<()>;
}
