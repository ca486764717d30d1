//! Reader implementations for BUS files.
//!
//! This module provides streaming and bulk reading of uncompressed BUS files,
//! with support for transport compression and efficient buffering.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use crate::{BusError, Header, Record, RECORD_SIZE};

const DEFAULT_BUFFER_RECORDS: usize = 32 * 1024;
type BoxedReader = Box<dyn Read + Send>;

/// Number of leading bytes niffler inspects to detect transport compression.
#[cfg(feature = "niffler")]
const SNIFF_LEN: usize = 5;

/// Streaming reader for BUS files.
///
/// The `Reader` parses the header once during construction and then streams
/// records on demand through the `Iterator` interface.
///
/// # Buffering Strategy
///
/// - Default buffer holds exactly 32K records (1 MiB)
/// - Reads are performed in large chunks to reduce I/O overhead
/// - A final partial record is reported as [`BusError::TruncatedRecord`]
///   instead of being dropped
///
/// # Unrecognized formats
///
/// If the magic tag is not `"BUS\0"` the reader is still constructed so the
/// caller can inspect [`Reader::header`], but it yields no records.
///
/// # Examples
///
/// ```rust
/// use busio::{Header, Reader, Record, Writer};
/// use std::io::Cursor;
///
/// # fn main() -> busio::Result<()> {
/// let header = Header::new(16, 12);
/// let records = vec![Record::new(1, 2, 3, 1, 0), Record::new(4, 5, 6, 1, 0)];
///
/// let mut writer = Writer::new(Vec::new(), &header)?;
/// writer.write_batch(&records)?;
/// writer.finish()?;
///
/// let reader = Reader::new(Cursor::new(writer.into_inner()))?;
/// assert_eq!(reader.header().bc_len, 16);
///
/// let read: Vec<Record> = reader.collect::<busio::Result<_>>()?;
/// assert_eq!(read, records);
/// # Ok(())
/// # }
/// ```
pub struct Reader<R: Read> {
    /// Inner reader providing the data stream
    inner: R,

    /// Buffer for reading data in chunks
    buffer: Vec<u8>,

    /// Header from the BUS file
    header: Header,

    /// Current record position in the buffer (in records, not bytes)
    pos: usize,

    /// Maximum valid record position in the buffer (in records, not bytes)
    cap: usize,

    /// Number of body bytes read from the inner reader
    bytes_read: usize,

    /// Flag indicating end of stream (or a fatal error) has been reached
    eof: bool,
}
impl<R: Read> Reader<R> {
    /// Creates a new reader, parsing the header immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be read. An unrecognized magic
    /// tag is not an error.
    pub fn new(inner: R) -> crate::Result<Self> {
        Self::with_capacity(inner, DEFAULT_BUFFER_RECORDS)
    }

    /// Creates a new reader whose buffer holds `records` records.
    pub fn with_capacity(mut inner: R, records: usize) -> crate::Result<Self> {
        let header = Header::read_from(&mut inner)?;
        let eof = !header.format.is_bus();
        Ok(Self {
            inner,
            buffer: vec![0u8; records.max(1) * RECORD_SIZE],
            header,
            pos: 0,
            cap: 0,
            bytes_read: 0,
            eof,
        })
    }

    /// Creates a reader over a bare record section without a header.
    pub fn new_headless(inner: R) -> Self {
        Self {
            inner,
            buffer: vec![0u8; DEFAULT_BUFFER_RECORDS * RECORD_SIZE],
            header: Header::default(),
            pos: 0,
            cap: 0,
            bytes_read: 0,
            eof: false,
        }
    }

    /// Reads the next batch of records into the internal buffer.
    ///
    /// Returns `Ok(true)` if records were read, `Ok(false)` at end of stream.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An I/O error occurs while reading
    /// - The stream ends inside a record
    pub fn read_batch(&mut self) -> crate::Result<bool> {
        let mut read = 0;
        while read < self.buffer.len() {
            match self.inner.read(&mut self.buffer[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if read % RECORD_SIZE != 0 {
            let non_rem = read - read % RECORD_SIZE;
            return Err(BusError::TruncatedRecord {
                pos: self.bytes_read + non_rem,
                index: (self.bytes_read + non_rem) / RECORD_SIZE,
            });
        }
        self.pos = 0;
        self.cap = read / RECORD_SIZE;
        self.bytes_read += read;
        Ok(read > 0)
    }

    /// Returns the file header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of whole records pulled from the stream so far.
    pub fn records_read(&self) -> usize {
        self.bytes_read / RECORD_SIZE
    }
}

impl<R: Read> Iterator for Reader<R> {
    type Item = crate::Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.eof {
            return None;
        }

        if self.pos >= self.cap {
            match self.read_batch() {
                Ok(true) => {}
                Ok(false) => {
                    self.eof = true;
                    return None;
                }
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            }
        }
        let lpos = RECORD_SIZE * self.pos;
        let rpos = lpos + RECORD_SIZE;
        self.pos += 1;
        Some(Ok(Record::from_bytes(&self.buffer[lpos..rpos])))
    }
}

impl Reader<BoxedReader> {
    /// Creates a reader from a file path.
    ///
    /// With the `niffler` feature, gzip/zstd/bzip2 wrapped files are
    /// decompressed transparently. Plain BUS files are passed through.
    ///
    /// ```rust,no_run
    /// use busio::Reader;
    ///
    /// # fn main() -> busio::Result<()> {
    /// let reader = Reader::from_path("output.bus")?;
    /// for result in reader {
    ///     let record = result?;
    ///     println!("Barcode: {:#x}", record.barcode);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let rdr = File::open(path).map(BufReader::new)?;
        Self::new(transport_reader(Box::new(rdr))?)
    }

    /// Creates a reader from standard input.
    pub fn from_stdin() -> crate::Result<Self> {
        Self::new(transport_reader(Box::new(std::io::stdin()))?)
    }

    /// Reads from the path if given, otherwise from standard input.
    pub fn from_optional_path<P: AsRef<Path>>(path: Option<P>) -> crate::Result<Self> {
        match path {
            Some(path) => Self::from_path(path),
            None => Self::from_stdin(),
        }
    }
}

/// Wraps `rdr` in a transport decompressor if one is detected.
///
/// Streams shorter than the sniffed prefix cannot be compressed and are
/// passed through untouched, so a bare magic tag still reaches the header
/// parser.
#[cfg(feature = "niffler")]
fn transport_reader(mut rdr: BoxedReader) -> crate::Result<BoxedReader> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    rdr.by_ref()
        .take(SNIFF_LEN as u64)
        .read_to_end(&mut head)?;
    let short = head.len() < SNIFF_LEN;
    let rdr: BoxedReader = Box::new(std::io::Cursor::new(head).chain(rdr));
    if short {
        return Ok(rdr);
    }
    let (pt, _format) = niffler::send::get_reader(rdr)?;
    Ok(pt)
}

#[cfg(not(feature = "niffler"))]
fn transport_reader(rdr: BoxedReader) -> crate::Result<BoxedReader> {
    Ok(rdr)
}

/// Loads an entire BUS file into a flat vector of records.
///
/// Unlike [`crate::BusFile::from_path`] this keeps records ungrouped, in file
/// order. A file with an unrecognized format yields an empty vector.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the record section is not
/// a multiple of 32 bytes.
pub fn load_to_vec<P: AsRef<Path>>(path: P) -> crate::Result<(Header, Vec<Record>)> {
    let mut file = File::open(path).map(BufReader::new)?;
    let header = Header::read_from(&mut file)?;
    if !header.format.is_bus() {
        return Ok((header, Vec::new()));
    }

    let mut body = Vec::new();
    file.read_to_end(&mut body)?;
    if body.len() % RECORD_SIZE != 0 {
        let non_rem = body.len() - body.len() % RECORD_SIZE;
        return Err(BusError::TruncatedRecord {
            pos: non_rem,
            index: non_rem / RECORD_SIZE,
        });
    }
    let records = body
        .chunks_exact(RECORD_SIZE)
        .map(Record::from_bytes)
        .collect();
    Ok((header, records))
}
