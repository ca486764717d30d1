mod bus;
mod header;
mod record;

pub(crate) use bus::group_records;
pub use bus::{BusFile, RecordMap, SortKey};
pub use header::{Format, Header, HEADER_PREFIX_SIZE, MAGIC, VERSION};
pub use record::{Entry, Record, RECORD_SIZE};
