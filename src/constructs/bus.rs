use std::{
    io::{Read, Write},
    path::Path,
};

use indexmap::IndexMap;

use crate::{Advisory, Entry, Header, Reader, Record, Writer};

/// Records grouped by barcode.
///
/// Barcodes iterate in order of first appearance and each barcode's entries
/// keep the order they were read or pushed in.
pub type RecordMap = IndexMap<u64, Vec<Entry>>;

/// Deterministic orderings for writing a [`RecordMap`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortKey {
    /// Barcodes ascending, entries of a barcode in stored order.
    Barcode,
    /// Barcodes ascending, then entries by `(umi, ec, flag, count)`.
    ///
    /// Entries equal on all four fields keep their stored order.
    BarcodeUmi,
}
impl SortKey {
    /// Orders the entries of a single barcode group in place.
    pub fn sort_entries(&self, entries: &mut [Entry]) {
        match self {
            Self::Barcode => {}
            Self::BarcodeUmi => entries.sort_by_key(|e| (e.umi, e.ec, e.flag, e.count)),
        }
    }
}

/// Groups a stream of records by barcode, returning the map and the number of
/// records consumed.
pub(crate) fn group_records<I>(records: I) -> crate::Result<(RecordMap, usize)>
where
    I: IntoIterator<Item = crate::Result<Record>>,
{
    let mut map = RecordMap::new();
    let mut n_entries = 0;
    for record in records {
        let record = record?;
        map.entry(record.barcode).or_default().push(record.entry());
        n_entries += 1;
    }
    Ok((map, n_entries))
}

/// Decoded contents of a BUS file.
///
/// Note that `PartialEq` on [`RecordMap`] ignores barcode order; compare
/// `records.iter()` when the order matters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusFile {
    pub header: Header,
    pub records: RecordMap,
    /// Number of records read or pushed
    pub n_entries: usize,
    /// Non-fatal diagnostics collected while parsing the header
    pub advisories: Vec<Advisory>,
}
impl BusFile {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    pub fn push(&mut self, record: Record) {
        self.push_entry(record.barcode, record.entry());
    }
    pub fn push_entry(&mut self, barcode: u64, entry: Entry) {
        self.records.entry(barcode).or_default().push(entry);
        self.n_entries += 1;
    }

    /// Total number of entries across all barcodes.
    pub fn len(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty)
    }
    pub fn num_barcodes(&self) -> usize {
        self.records.len()
    }
    pub fn get(&self, barcode: u64) -> Option<&[Entry]> {
        self.records.get(&barcode).map(Vec::as_slice)
    }
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Whether the header carried the `"BUS\0"` tag (and so the body was parsed).
    pub fn is_bus(&self) -> bool {
        self.header.format.is_bus()
    }

    /// Flattens the groups back into records, in stored order.
    pub fn iter_records(&self) -> impl Iterator<Item = Record> + '_ {
        self.records.iter().flat_map(|(&barcode, entries)| {
            entries
                .iter()
                .map(move |&entry| Record::from_entry(barcode, entry))
        })
    }
    pub fn into_records(self) -> Vec<Record> {
        self.iter_records().collect()
    }

    /// Builds a container from an already opened [`Reader`].
    ///
    /// If the header is not tagged `"BUS\0"` the body is left unread and the
    /// returned container has no records.
    pub fn from_reader<R: Read>(reader: Reader<R>) -> crate::Result<Self> {
        let header = reader.header().clone();
        let advisories = header.advisories();
        if !header.format.is_bus() {
            return Ok(Self {
                header,
                advisories,
                ..Self::default()
            });
        }
        let (records, n_entries) = group_records(reader)?;
        log::debug!(
            "Parsed {} records across {} barcodes",
            n_entries,
            records.len()
        );
        Ok(Self {
            header,
            records,
            n_entries,
            advisories,
        })
    }
    pub fn from_bytes<R: Read>(reader: &mut R) -> crate::Result<Self> {
        Self::from_reader(Reader::new(reader)?)
    }

    /// Reads a BUS file from disk.
    ///
    /// The file handle is closed before this returns, including on error.
    pub fn from_path<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Self::from_reader(Reader::from_path(path)?)
    }

    pub fn write_bytes<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        self.write_bytes_sorted(writer, None)
    }
    pub fn write_bytes_sorted<W: Write>(
        &self,
        writer: &mut W,
        sort_key: Option<SortKey>,
    ) -> crate::Result<()> {
        let mut writer = Writer::new(writer, &self.header)?;
        writer.write_groups(&self.records, sort_key)?;
        writer.finish()
    }

    /// Writes a BUS file to disk, truncating any existing file.
    pub fn write_path<P: AsRef<Path>>(&self, path: P) -> crate::Result<()> {
        self.write_path_sorted(path, None)
    }
    pub fn write_path_sorted<P: AsRef<Path>>(
        &self,
        path: P,
        sort_key: Option<SortKey>,
    ) -> crate::Result<()> {
        let mut writer = Writer::from_path(path, &self.header)?;
        writer.write_groups(&self.records, sort_key)?;
        writer.finish()
    }
}
impl Extend<Record> for BusFile {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.push(record);
        }
    }
}
