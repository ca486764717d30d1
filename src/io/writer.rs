//! Writer implementations for BUS files.
//!
//! This module provides buffered writing of uncompressed BUS files, either
//! record by record or from a grouped [`RecordMap`].

use std::{fs::File, io::Write, mem::ManuallyDrop, path::Path};

use crate::{Entry, Header, Record, RecordMap, SortKey, RECORD_SIZE};

const DEFAULT_BUFFER_RECORDS: usize = 32 * 1024;
pub type BoxedWriter = Box<dyn Write + Send>;

/// Buffered writer for BUS files.
///
/// The header is written immediately on construction; records are then
/// buffered to minimize system calls and always written with zero padding.
///
/// # Examples
///
/// ```rust
/// use busio::{Header, Record, Writer};
///
/// # fn main() -> busio::Result<()> {
/// let header = Header::new(16, 12);
/// let mut writer = Writer::new(Vec::new(), &header)?;
///
/// writer.write_record(&Record::new(0x1234, 0x5678, 42, 1, 0))?;
/// writer.finish()?;
///
/// let buffer = writer.into_inner();
/// assert_eq!(buffer.len(), 20 + 32); // header + one record
/// # Ok(())
/// # }
/// ```
pub struct Writer<W: Write> {
    /// Inner writer providing the data sink
    inner: W,

    /// Buffer for writing data in chunks
    buffer: Vec<u8>,

    /// Current position in buffer (in bytes)
    pos: usize,

    /// Number of records written so far
    records_written: u64,
}

impl<W: Write> Writer<W> {
    /// Creates a new writer and writes the header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be written or its text is larger
    /// than a `u32` length allows.
    pub fn new(inner: W, header: &Header) -> crate::Result<Self> {
        Self::with_capacity(inner, header, DEFAULT_BUFFER_RECORDS)
    }

    /// Creates a new writer whose buffer holds `records` records.
    pub fn with_capacity(mut inner: W, header: &Header, records: usize) -> crate::Result<Self> {
        header.write_to(&mut inner)?;
        let mut writer = Self::new_headless(inner);
        writer.buffer = vec![0u8; records.max(1) * RECORD_SIZE];
        Ok(writer)
    }

    /// Creates a new writer without writing a header.
    ///
    /// Useful for producing a bare record section.
    pub fn new_headless(inner: W) -> Self {
        Self {
            inner,
            buffer: vec![0u8; DEFAULT_BUFFER_RECORDS * RECORD_SIZE],
            pos: 0,
            records_written: 0,
        }
    }

    /// Returns the number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records_written
    }

    /// Writes any buffered bytes to the inner writer without flushing it.
    fn flush_buffer(&mut self) -> crate::Result<()> {
        if self.pos > 0 {
            self.inner.write_all(&self.buffer[..self.pos])?;
            self.pos = 0;
        }
        Ok(())
    }

    /// Writes a single record.
    pub fn write_record(&mut self, record: &Record) -> crate::Result<()> {
        if self.pos + RECORD_SIZE > self.buffer.len() {
            self.flush_buffer()?;
        }

        self.buffer[self.pos..self.pos + RECORD_SIZE].copy_from_slice(&record.to_bytes());
        self.pos += RECORD_SIZE;
        self.records_written += 1;

        Ok(())
    }

    /// Writes a slice of records in order.
    pub fn write_batch(&mut self, records: &[Record]) -> crate::Result<()> {
        records
            .iter()
            .try_for_each(|record| self.write_record(record))
    }

    /// Writes records from an iterator.
    pub fn write_iter<I>(&mut self, records: I) -> crate::Result<()>
    where
        I: IntoIterator<Item = Record>,
    {
        for record in records {
            self.write_record(&record)?;
        }
        Ok(())
    }

    /// Writes every entry of one barcode group.
    pub fn write_entries(&mut self, barcode: u64, entries: &[Entry]) -> crate::Result<()> {
        for entry in entries {
            self.write_record(&Record::from_entry(barcode, *entry))?;
        }
        Ok(())
    }

    /// Writes a grouped record map.
    ///
    /// Without a sort key, barcodes and entries are written in the map's
    /// stored order. See [`SortKey`] for the orderings it defines.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use busio::{BusFile, Header, Record, SortKey, Writer};
    /// use std::io::Cursor;
    ///
    /// # fn main() -> busio::Result<()> {
    /// let mut bus = BusFile::new(Header::new(16, 12));
    /// bus.push(Record::new(9, 1, 0, 1, 0));
    /// bus.push(Record::new(3, 1, 0, 1, 0));
    ///
    /// let mut writer = Writer::new(Vec::new(), &bus.header)?;
    /// writer.write_groups(&bus.records, Some(SortKey::Barcode))?;
    /// writer.finish()?;
    ///
    /// let sorted = BusFile::from_bytes(&mut Cursor::new(writer.into_inner()))?;
    /// assert_eq!(sorted.records.keys().copied().collect::<Vec<_>>(), vec![3, 9]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn write_groups(
        &mut self,
        records: &RecordMap,
        sort_key: Option<SortKey>,
    ) -> crate::Result<()> {
        let Some(sort_key) = sort_key else {
            for (&barcode, entries) in records {
                self.write_entries(barcode, entries)?;
            }
            return Ok(());
        };

        let mut barcodes: Vec<u64> = records.keys().copied().collect();
        barcodes.sort_unstable();
        for barcode in barcodes {
            let entries = &records[&barcode];
            match sort_key {
                SortKey::Barcode => self.write_entries(barcode, entries)?,
                SortKey::BarcodeUmi => {
                    let mut sorted = entries.clone();
                    sort_key.sort_entries(&mut sorted);
                    self.write_entries(barcode, &sorted)?;
                }
            }
        }
        Ok(())
    }

    /// Flushes all buffered records and the inner writer.
    ///
    /// Called on drop as well, but errors are only observable when called
    /// explicitly.
    pub fn finish(&mut self) -> crate::Result<()> {
        self.flush_buffer()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Consumes the writer and returns the underlying writer.
    ///
    /// Buffered records are not flushed; call [`Writer::finish`] first.
    pub fn into_inner(self) -> W {
        let mut this = ManuallyDrop::new(self);
        // SAFETY: `Drop` is suppressed by `ManuallyDrop` and `this` is not used
        // after this block, so `buffer` is dropped once and `inner` moved once.
        unsafe {
            std::ptr::drop_in_place(&mut this.buffer);
            std::ptr::read(&this.inner)
        }
    }
}

/// Automatically finishes the writer when dropped.
///
/// Errors during the automatic flush are ignored, so explicit calls to
/// `finish()` are recommended.
impl<W: Write> Drop for Writer<W> {
    fn drop(&mut self) {
        self.finish().ok();
    }
}

impl Writer<BoxedWriter> {
    /// Creates (or truncates) a file at `path` and writes the header.
    pub fn from_path<P: AsRef<Path>>(path: P, header: &Header) -> crate::Result<Self> {
        let file = File::create(path)?;
        Self::new(Box::new(file), header)
    }

    /// Creates a writer on standard output.
    pub fn from_stdout(header: &Header) -> crate::Result<Self> {
        Self::new(Box::new(std::io::stdout()), header)
    }

    /// Writes to the path if given, otherwise to standard output.
    pub fn from_optional_path<P: AsRef<Path>>(
        path: Option<P>,
        header: &Header,
    ) -> crate::Result<Self> {
        match path {
            Some(path) => Self::from_path(path, header),
            None => Self::from_stdout(header),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Reader, HEADER_PREFIX_SIZE};
    use std::io::Cursor;

    #[test]
    fn test_writer_creation() {
        let header = Header::new(16, 12).with_text("abcd");
        let writer = Writer::new(Vec::new(), &header).unwrap();
        assert_eq!(writer.records_written(), 0);

        let buffer = writer.into_inner();
        assert_eq!(buffer.len(), HEADER_PREFIX_SIZE + 4);
        assert_eq!(&buffer[..4], b"BUS\0");
    }

    #[test]
    fn test_writer_headless() {
        let mut writer = Writer::new_headless(Vec::new());
        writer.write_record(&Record::new(1, 2, 3, 1, 0)).unwrap();
        writer.finish().unwrap();

        assert_eq!(writer.into_inner().len(), RECORD_SIZE);
    }

    #[test]
    fn test_single_record_layout() {
        let header = Header::new(16, 12);
        let mut writer = Writer::new(Vec::new(), &header).unwrap();

        let record = Record {
            padding: 0xFFFF_FFFF,
            ..Record::new(5, 9, 2, 1, 0)
        };
        writer.write_record(&record).unwrap();
        writer.finish().unwrap();

        let buffer = writer.into_inner();
        let body = &buffer[HEADER_PREFIX_SIZE..];
        assert_eq!(body.len(), RECORD_SIZE);
        assert_eq!(&body[0..8], &5u64.to_le_bytes());
        assert_eq!(&body[8..16], &9u64.to_le_bytes());
        assert_eq!(&body[16..20], &2u32.to_le_bytes());
        assert_eq!(&body[20..24], &1u32.to_le_bytes());
        assert_eq!(&body[24..32], &[0u8; 8]);
    }

    #[test]
    fn test_buffer_flushing() {
        let header = Header::new(16, 12);
        let mut writer = Writer::with_capacity(Vec::new(), &header, 4).unwrap();

        for i in 0..4 {
            writer.write_record(&Record::new(i, 0, 0, 1, 0)).unwrap();
        }
        // buffer is full but not yet flushed
        assert_eq!(writer.inner.len(), HEADER_PREFIX_SIZE);

        writer.write_record(&Record::new(99, 0, 0, 1, 0)).unwrap();
        assert_eq!(writer.inner.len(), HEADER_PREFIX_SIZE + 4 * RECORD_SIZE);
    }

    #[test]
    fn test_records_written_counter() {
        let header = Header::new(16, 12);
        let mut writer = Writer::new(Vec::new(), &header).unwrap();

        writer.write_record(&Record::new(1, 2, 3, 1, 0)).unwrap();
        assert_eq!(writer.records_written(), 1);

        let batch = vec![Record::new(4, 5, 6, 1, 0), Record::new(7, 8, 9, 1, 0)];
        writer.write_batch(&batch).unwrap();
        assert_eq!(writer.records_written(), 3);

        writer
            .write_iter((10..15).map(|i| Record::new(i, i, 0, 1, 0)))
            .unwrap();
        assert_eq!(writer.records_written(), 8);

        writer
            .write_entries(3, &[Entry::new(1, 1, 1, 0), Entry::new(2, 2, 1, 0)])
            .unwrap();
        assert_eq!(writer.records_written(), 10);
    }

    #[test]
    fn test_write_groups_insertion_order() {
        let mut records = RecordMap::new();
        records.insert(9, vec![Entry::new(2, 0, 1, 0), Entry::new(1, 0, 1, 0)]);
        records.insert(4, vec![Entry::new(7, 3, 1, 0)]);

        let header = Header::new(16, 12);
        let mut writer = Writer::new(Vec::new(), &header).unwrap();
        writer.write_groups(&records, None).unwrap();
        writer.finish().unwrap();

        let reader = Reader::new(Cursor::new(writer.into_inner())).unwrap();
        let read: Vec<Record> = reader.collect::<crate::Result<_>>().unwrap();
        assert_eq!(
            read,
            vec![
                Record::new(9, 2, 0, 1, 0),
                Record::new(9, 1, 0, 1, 0),
                Record::new(4, 7, 3, 1, 0),
            ]
        );
    }

    #[test]
    fn test_drop_flushes() {
        let header = Header::new(16, 12);
        let mut sink = Vec::new();
        {
            let mut writer = Writer::new(&mut sink, &header).unwrap();
            writer.write_record(&Record::new(1, 2, 3, 1, 0)).unwrap();
        }
        assert_eq!(sink.len(), HEADER_PREFIX_SIZE + RECORD_SIZE);
    }

    #[test]
    fn test_writer_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bus");

        let header = Header::new(16, 12);
        let mut writer = Writer::from_path(&path, &header).unwrap();
        writer.write_record(&Record::new(1, 2, 3, 1, 0)).unwrap();
        writer.finish().unwrap();
        drop(writer);

        let size = std::fs::metadata(&path).unwrap().len() as usize;
        assert_eq!(size, HEADER_PREFIX_SIZE + RECORD_SIZE);
    }
}
