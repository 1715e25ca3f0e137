//! Output file naming.

use crate::utils::config::PARQUET_EXTENSION;

/// Table kinds written per record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Counters,
    FloatCounters,
    ReadSegments,
    WriteSegments,
}

impl TableKind {
    pub fn suffix(self) -> &'static str {
        match self {
            TableKind::Counters => "counters",
            TableKind::FloatCounters => "fcounters",
            TableKind::ReadSegments => "read_segments",
            TableKind::WriteSegments => "write_segments",
        }
    }
}

/// Build `<category>_<prefix>_<identity>_<kind>.parquet`
///
/// `category` is the module tag (`POSIX`, `DXTPOSIX`, ...), `prefix` the
/// generated job name and `identity` the record identity fields already
/// joined by underscores.
pub fn record_file_name(category: &str, prefix: &str, identity: &str, kind: TableKind) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        category,
        prefix,
        identity,
        kind.suffix(),
        PARQUET_EXTENSION
    )
}
