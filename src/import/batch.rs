use crate::types::{Batch, RawRecord, RecordIndex};

/// Groups records into batches of at most `batch_size`, preserving order.
#[derive(Debug)]
pub struct BatchAccumulator {
    batch_size: usize,
    buffer: Vec<RawRecord>,
    first_index: RecordIndex,
    emitted: usize,
}

impl BatchAccumulator {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self { batch_size, buffer: Vec::new(), first_index: 0, emitted: 0 }
    }

    /// Append a record; returns the full batch once `batch_size` is reached.
    pub fn push(&mut self, record_index: RecordIndex, record: RawRecord) -> Option<Batch> {
        if self.buffer.is_empty() {
            self.first_index = record_index;
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size { self.take() } else { None }
    }

    /// Emit the trailing partial batch, if any.
    pub fn flush(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() { None } else { self.take() }
    }

    /// Drop buffered records without emitting them.
    pub fn discard(&mut self) -> usize {
        let n = self.buffer.len();
        self.buffer.clear();
        n
    }

    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn take(&mut self) -> Option<Batch> {
        let records = std::mem::take(&mut self.buffer);
        let batch = Batch { index: self.emitted, first_record_index: self.first_index, records };
        self.emitted += 1;
        Some(batch)
    }
}
