mod mmap;
mod reader;
mod writer;

use std::{
    io::{Read, Write},
    path::Path,
};

pub use mmap::MmapReader;
pub use reader::{load_to_vec, Reader};
pub use writer::{BoxedWriter, Writer};

use crate::{constructs::group_records, BusFile, Header, RecordMap, SortKey};

/// Parses a BUS header from the start of `reader`.
///
/// See [`Header::read_from`].
pub fn parse_header<R: Read>(reader: &mut R) -> crate::Result<Header> {
    Header::read_from(reader)
}

/// Writes `header` to `writer`. See [`Header::write_to`].
pub fn write_header<W: Write>(writer: &mut W, header: &Header) -> crate::Result<()> {
    header.write_to(writer)
}

/// Parses a record section until end of stream.
///
/// Returns the grouped records and the number of records read. The stream
/// must be positioned after the header.
pub fn parse_body<R: Read>(reader: &mut R) -> crate::Result<(RecordMap, usize)> {
    let (records, n_entries) = group_records(Reader::new_headless(reader))?;
    log::debug!(
        "Parsed {} records across {} barcodes",
        n_entries,
        records.len()
    );
    Ok((records, n_entries))
}

/// Writes a record section, returning the number of records written.
pub fn write_body<W: Write>(
    writer: &mut W,
    records: &RecordMap,
    sort_key: Option<SortKey>,
) -> crate::Result<u64> {
    let mut writer = Writer::new_headless(writer);
    writer.write_groups(records, sort_key)?;
    writer.finish()?;
    log::debug!("Wrote {} records", writer.records_written());
    Ok(writer.records_written())
}

/// Reads a BUS file into a [`BusFile`]. See [`BusFile::from_path`].
pub fn read_file<P: AsRef<Path>>(path: P) -> crate::Result<BusFile> {
    BusFile::from_path(path)
}

/// Writes a [`BusFile`] to disk. See [`BusFile::write_path`].
pub fn write_file<P: AsRef<Path>>(path: P, bus: &BusFile) -> crate::Result<()> {
    bus.write_path(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BusError, Entry, Format, Record, RECORD_SIZE};
    use std::io::Cursor;

    fn create_test_data() -> (Header, RecordMap) {
        let header = Header::new(16, 8).with_text("ec metadata");
        let mut records = RecordMap::new();
        records.insert(
            0x1234567890ABCDEF,
            vec![Entry::new(0xABCDEF12, 1, 2, 0), Entry::new(0x12, 4, 1, 0)],
        );
        records.insert(0xFEDCBA0987654321, vec![Entry::new(0x12345678, 2, 1, 1)]);
        (header, records)
    }

    #[test]
    fn test_write_and_parse_header() {
        let (header, _) = create_test_data();
        let mut buffer = Vec::new();
        write_header(&mut buffer, &header).unwrap();

        let parsed = parse_header(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(header, parsed);
    }

    #[test]
    fn test_write_and_parse_body() {
        let (_, records) = create_test_data();
        let mut buffer = Vec::new();
        let written = write_body(&mut buffer, &records, None).unwrap();
        assert_eq!(written, 3);
        assert_eq!(buffer.len(), 3 * RECORD_SIZE);

        let (parsed, n_entries) = parse_body(&mut Cursor::new(buffer)).unwrap();
        assert_eq!(n_entries, 3);
        assert!(parsed.iter().eq(records.iter()));
    }

    #[test]
    fn test_header_then_body_on_one_stream() {
        let (header, records) = create_test_data();
        let mut buffer = Vec::new();
        write_header(&mut buffer, &header).unwrap();
        write_body(&mut buffer, &records, Some(SortKey::Barcode)).unwrap();

        let mut cursor = Cursor::new(buffer);
        let parsed_header = parse_header(&mut cursor).unwrap();
        assert_eq!(parsed_header.format, Format::Bus);
        let (parsed, _) = parse_body(&mut cursor).unwrap();
        assert_eq!(parsed, records);
    }

    #[test]
    fn test_parse_body_truncated() {
        let mut buffer = Record::new(1, 2, 3, 4, 5).to_bytes().to_vec();
        buffer.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            parse_body(&mut Cursor::new(buffer)),
            Err(BusError::TruncatedRecord { pos: 32, index: 1 })
        ));
    }

    #[test]
    fn test_read_and_write_file() {
        let (header, records) = create_test_data();
        let bus = BusFile {
            header,
            records,
            n_entries: 3,
            advisories: Vec::new(),
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("collection.bus");
        write_file(&path, &bus).unwrap();
        let parsed = read_file(&path).unwrap();

        assert_eq!(parsed.header, bus.header);
        assert_eq!(parsed.n_entries, 3);
        assert!(parsed.records.iter().eq(bus.records.iter()));
    }

    #[test]
    fn test_read_file_bare_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tag_only.bin");
        std::fs::write(&path, b"XXXX").unwrap();

        let bus = read_file(&path).unwrap();
        assert_eq!(bus.header.format, Format::Unrecognized(*b"XXXX"));
        assert!(bus.records.is_empty());
        assert_eq!(bus.n_entries, 0);
    }

    #[test]
    fn test_large_dataset() {
        let header = Header::new(16, 8);
        let mut bus = BusFile::new(header);
        bus.extend((0..10_000).map(|i| Record::new(i % 97, i, (i % 11) as u32, 1, 0)));

        let mut buffer = Vec::new();
        bus.write_bytes(&mut buffer).unwrap();
        let parsed = BusFile::from_bytes(&mut Cursor::new(buffer)).unwrap();

        assert_eq!(parsed.n_entries, 10_000);
        assert_eq!(parsed.num_barcodes(), 97);
        assert!(parsed.records.iter().eq(bus.records.iter()));
    }
}
