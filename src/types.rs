use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A decoded record, not yet validated. CSV, XML and spreadsheet decoders
/// produce objects; JSON decoders produce whatever the element is.
pub type RawRecord = Value;

/// 1-based position of a record in its source.
pub type RecordIndex = u64;

/// A group of validated, transformed records in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    /// 0-based position of this batch in the run.
    pub index: usize,
    /// Source index of the first record in the batch.
    pub first_record_index: RecordIndex,
    pub records: Vec<RawRecord>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for Batch {
    type Item = RawRecord;
    type IntoIter = std::vec::IntoIter<RawRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
