use std::{fs::File, path::Path, sync::Arc, thread};

use memmap2::Mmap;

use crate::{
    parallel::{ParallelProcessor, ParallelReader},
    BusError, Header, Record, RecordMap, RECORD_SIZE,
};

/// Memory-mapped BUS reader for random access and parallel decoding.
///
/// The record section is validated on construction: it must be a whole number
/// of records. A file with an unrecognized magic tag opens with zero records.
#[derive(Clone)]
pub struct MmapReader {
    map: Arc<Mmap>,
    /// Header
    header: Header,
    /// Byte offset of the first record
    body_offset: usize,
    /// Number of records in the map
    len: usize,
}
#[allow(clippy::len_without_is_empty)]
impl MmapReader {
    pub fn new<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only; concurrent truncation of the file by
        // another process is outside what this reader guards against.
        let map = unsafe { Arc::new(Mmap::map(&file)?) };

        let header = Header::read_from(&mut &map[..])?;
        if !header.format.is_bus() {
            return Ok(Self {
                map,
                header,
                body_offset: 0,
                len: 0,
            });
        }

        let body_offset = header.size();
        let body_len = map.len() - body_offset;
        if body_len % RECORD_SIZE != 0 {
            let non_rem = body_len - body_len % RECORD_SIZE;
            return Err(BusError::TruncatedRecord {
                pos: non_rem,
                index: non_rem / RECORD_SIZE,
            });
        }
        let len = body_len / RECORD_SIZE;

        Ok(Self {
            map,
            header,
            body_offset,
            len,
        })
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Raw bytes of records `start..end`.
    fn body(&self, start: usize, end: usize) -> crate::Result<&[u8]> {
        if end > self.len {
            return Err(BusError::InvalidIndex {
                idx: end,
                max: self.len,
            });
        }
        if start > end {
            return Err(BusError::InvalidIndex {
                idx: start,
                max: end,
            });
        }
        let lpos = self.body_offset + start * RECORD_SIZE;
        let rpos = self.body_offset + end * RECORD_SIZE;
        Ok(&self.map[lpos..rpos])
    }

    pub fn get(&self, idx: usize) -> crate::Result<Record> {
        if idx >= self.len {
            return Err(BusError::InvalidIndex { idx, max: self.len });
        }
        self.body(idx, idx + 1).map(Record::from_bytes)
    }

    /// Iterates records `start..end`.
    pub fn records(
        &self,
        start: usize,
        end: usize,
    ) -> crate::Result<impl Iterator<Item = Record> + '_> {
        let body = self.body(start, end)?;
        Ok(body.chunks_exact(RECORD_SIZE).map(Record::from_bytes))
    }

    /// Groups all records by barcode using `num_threads` threads.
    ///
    /// The record section is split at record boundaries into one contiguous
    /// shard per thread. Shards are merged in file order, so the result is
    /// identical to a sequential parse: barcodes appear in order of first
    /// occurrence and each barcode's entries keep file order.
    ///
    /// `num_threads == 0` uses all available cores.
    pub fn load_grouped(&self, num_threads: usize) -> crate::Result<(RecordMap, usize)> {
        let num_threads = resolve_threads(num_threads).min(self.len.max(1));
        let per_thread = self.len.div_ceil(num_threads);

        let mut handles = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let start = (i * per_thread).min(self.len);
            let end = ((i + 1) * per_thread).min(self.len);
            let thread_reader = self.clone();
            handles.push(thread::spawn(move || -> crate::Result<RecordMap> {
                let mut shard = RecordMap::new();
                for record in thread_reader.records(start, end)? {
                    shard.entry(record.barcode).or_default().push(record.entry());
                }
                Ok(shard)
            }));
        }

        let mut merged = RecordMap::new();
        for handle in handles {
            let shard = handle
                .join()
                .unwrap_or_else(|e| std::panic::resume_unwind(e))?;
            for (barcode, entries) in shard {
                merged.entry(barcode).or_default().extend(entries);
            }
        }
        log::debug!(
            "Grouped {} records across {} barcodes with {} threads",
            self.len,
            merged.len(),
            num_threads
        );
        Ok((merged, self.len))
    }
}

fn resolve_threads(num_threads: usize) -> usize {
    if num_threads == 0 {
        num_cpus::get()
    } else {
        num_threads.min(num_cpus::get())
    }
}

pub const BATCH_SIZE: usize = 1024 * 1024;

impl ParallelReader for MmapReader {
    fn process_parallel<P: ParallelProcessor + Clone + 'static>(
        &self,
        processor: P,
        num_threads: usize,
    ) -> crate::Result<()> {
        let num_threads = resolve_threads(num_threads);
        let records_per_thread = self.len / num_threads;
        let remainder = self.len % num_threads; // for last thread

        let mut handles = Vec::with_capacity(num_threads);
        for i in 0..num_threads {
            let start = i * records_per_thread;
            let end = if i == num_threads - 1 {
                start + records_per_thread + remainder
            } else {
                start + records_per_thread
            };
            let thread_reader = self.clone();
            let mut thread_processor = processor.clone();
            thread_processor.set_tid(i);
            let thread_handle = thread::spawn(move || -> crate::Result<()> {
                let mut batch_start = start;
                while batch_start < end {
                    let batch_end = (batch_start + BATCH_SIZE).min(end);
                    for record in thread_reader.records(batch_start, batch_end)? {
                        thread_processor.process_record(record)?;
                    }
                    thread_processor.on_batch_complete()?;
                    batch_start = batch_end;
                }
                Ok(())
            });
            handles.push(thread_handle);
        }

        for handle in handles {
            handle
                .join()
                .unwrap_or_else(|e| std::panic::resume_unwind(e))?;
        }

        Ok(())
    }
}
