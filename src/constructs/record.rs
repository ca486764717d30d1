use bytemuck::{Pod, Zeroable};

use crate::decode;

pub const RECORD_SIZE: usize = std::mem::size_of::<Record>();

/// 32-byte BUS record (little-endian on disk)
#[derive(Copy, Clone, Pod, Zeroable, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Record {
    pub barcode: u64, // 2-bit encoded cell barcode
    pub umi: u64,     // 2-bit encoded UMI
    pub ec: u32,      // equivalence class id
    pub count: u32,
    pub flag: u32,
    pub padding: u32, // zero on write, ignored on read
}
impl Record {
    pub fn new(barcode: u64, umi: u64, ec: u32, count: u32, flag: u32) -> Self {
        Self {
            barcode,
            umi,
            ec,
            count,
            flag,
            padding: 0,
        }
    }
    pub fn from_entry(barcode: u64, entry: Entry) -> Self {
        Self::new(barcode, entry.umi, entry.ec, entry.count, entry.flag)
    }

    /// The per-barcode portion of this record.
    pub fn entry(&self) -> Entry {
        Entry {
            umi: self.umi,
            ec: self.ec,
            count: self.count,
            flag: self.flag,
        }
    }

    /// Decodes a record from its on-disk representation.
    ///
    /// `bytes` need not be aligned. The padding word is dropped.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is not exactly [`RECORD_SIZE`] long. Slices from
    /// `chunks_exact(RECORD_SIZE)` always satisfy this.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let raw: Self = bytemuck::pod_read_unaligned(bytes);
        Self::new(
            u64::from_le(raw.barcode),
            u64::from_le(raw.umi),
            u32::from_le(raw.ec),
            u32::from_le(raw.count),
            u32::from_le(raw.flag),
        )
    }

    /// On-disk representation with zeroed padding.
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let wire = Self {
            barcode: self.barcode.to_le(),
            umi: self.umi.to_le(),
            ec: self.ec.to_le(),
            count: self.count.to_le(),
            flag: self.flag.to_le(),
            padding: 0,
        };
        bytemuck::cast(wire)
    }

    pub fn barcode_seq(&self, bc_len: u32) -> String {
        decode(self.barcode, bc_len as usize)
    }
    pub fn umi_seq(&self, umi_len: u32) -> String {
        decode(self.umi, umi_len as usize)
    }
}

/// A record stripped of its barcode, as stored in a barcode group.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Entry {
    pub umi: u64,
    pub ec: u32,
    pub count: u32,
    pub flag: u32,
}
impl Entry {
    pub fn new(umi: u64, ec: u32, count: u32, flag: u32) -> Self {
        Self {
            umi,
            ec,
            count,
            flag,
        }
    }
}
impl From<(u64, u32, u32, u32)> for Entry {
    fn from((umi, ec, count, flag): (u64, u32, u32, u32)) -> Self {
        Self::new(umi, ec, count, flag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode;

    #[test]
    fn test_record_size() {
        assert_eq!(RECORD_SIZE, 32);
    }

    #[test]
    fn test_record_layout() {
        let record = Record::new(5, 9, 2, 1, 0);
        let bytes = record.to_bytes();

        assert_eq!(&bytes[0..8], &5u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &9u64.to_le_bytes());
        assert_eq!(&bytes[16..20], &2u32.to_le_bytes());
        assert_eq!(&bytes[20..24], &1u32.to_le_bytes());
        assert_eq!(&bytes[24..28], &0u32.to_le_bytes());
        assert_eq!(&bytes[28..32], &[0u8; 4]);
    }

    #[test]
    fn test_padding_is_zeroed_and_ignored() {
        let record = Record {
            padding: 0xDEADBEEF,
            ..Record::new(1, 2, 3, 4, 5)
        };
        let bytes = record.to_bytes();
        assert_eq!(&bytes[28..32], &[0u8; 4]);

        let mut dirty = bytes;
        dirty[28..32].copy_from_slice(&[0xFF; 4]);
        let parsed = Record::from_bytes(&dirty);
        assert_eq!(parsed, Record::new(1, 2, 3, 4, 5));
    }

    #[test]
    fn test_unaligned_decode() {
        let record = Record::new(u64::MAX, 0x1234, 7, 8, 9);
        let mut buffer = vec![0u8; 1];
        buffer.extend_from_slice(&record.to_bytes());
        assert_eq!(Record::from_bytes(&buffer[1..]), record);
    }

    #[test]
    #[should_panic]
    fn test_from_bytes_wrong_length() {
        Record::from_bytes(&[0u8; RECORD_SIZE - 1]);
    }

    #[test]
    fn test_entry_split() {
        let record = Record::new(42, 9, 2, 1, 3);
        let entry = record.entry();
        assert_eq!(entry, Entry::new(9, 2, 1, 3));
        assert_eq!(Entry::from((9, 2, 1, 3)), entry);
        assert_eq!(Record::from_entry(42, entry), record);
    }

    #[test]
    fn test_sequence_helpers() {
        let barcode = encode("ACGTACGTACGTACGT", 16).unwrap();
        let umi = encode("TTTTGGGGCCCC", 12).unwrap();
        let record = Record::new(barcode, umi, 0, 1, 0);
        assert_eq!(record.barcode_seq(16), "ACGTACGTACGTACGT");
        assert_eq!(record.umi_seq(12), "TTTTGGGGCCCC");
    }
}
