//! Shot record parsed from one CSV row, not yet persisted

use shotlog_common::db::ShotRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ShotCandidate {
    /// Row index in the parsed file (the header is row 0)
    pub row_index: usize,

    pub record: ShotRecord,

    /// Numeric columns whose text could not be parsed and were set to 0
    pub coerced_fields: Vec<&'static str>,
}
