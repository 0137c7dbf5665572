// Record batching
//
// Accumulates enriched records into batches that fit a single PutRecordBatch
// call: at most 500 records and 4 MiB per call.

use crate::record::EnrichedRecord;

/// Hard per-call record ceiling of the delivery stream.
pub const MAX_BATCH_SIZE: usize = 500;

/// Per-call payload ceiling of the delivery stream.
pub const MAX_BATCH_BYTES: usize = 4 * 1024 * 1024;

/// Limits applied when sealing a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_records: usize,
    pub max_bytes: usize,
}

impl BatchLimits {
    /// Clamp user supplied limits into the range the sink accepts.
    pub fn new(max_records: usize, max_bytes: usize) -> Self {
        Self {
            max_records: max_records.clamp(1, MAX_BATCH_SIZE),
            max_bytes: max_bytes.clamp(1, MAX_BATCH_BYTES),
        }
    }
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_records: MAX_BATCH_SIZE,
            max_bytes: MAX_BATCH_BYTES,
        }
    }
}

/// Non-empty, ordered group of records submitted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    records: Vec<EnrichedRecord>,
    total_bytes: usize,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    pub fn records(&self) -> &[EnrichedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<EnrichedRecord> {
        self.records
    }
}

/// Stateful accumulator producing sealed batches.
#[derive(Debug)]
pub struct Batcher {
    limits: BatchLimits,
    open: Vec<EnrichedRecord>,
    open_bytes: usize,
}

impl Batcher {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            open: Vec::with_capacity(limits.max_records),
            open_bytes: 0,
        }
    }

    /// Number of records in the open batch.
    pub fn pending(&self) -> usize {
        self.open.len()
    }

    /// Append a record, returning the batch it sealed, if any.
    ///
    /// A record that would push the open batch past the byte limit seals the
    /// open batch first and then starts the next one. A record that alone
    /// exceeds the byte limit still forms its own batch.
    pub fn push(&mut self, record: EnrichedRecord) -> Option<Batch> {
        let overflows =
            !self.open.is_empty() && self.open_bytes + record.len() > self.limits.max_bytes;
        let sealed = if overflows { self.seal() } else { None };

        self.open_bytes += record.len();
        self.open.push(record);

        // A byte seal leaves one record open; with max_records == 1 the open
        // batch is always empty here, so both seals never fire on one push.
        if sealed.is_none() && self.open.len() >= self.limits.max_records {
            return self.seal();
        }
        sealed
    }

    /// Seal whatever is open. Call once at end of input.
    pub fn flush(&mut self) -> Option<Batch> {
        self.seal()
    }

    fn seal(&mut self) -> Option<Batch> {
        if self.open.is_empty() {
            return None;
        }
        let records = std::mem::replace(&mut self.open, Vec::with_capacity(self.limits.max_records));
        let total_bytes = std::mem::take(&mut self.open_bytes);
        Some(Batch {
            records,
            total_bytes,
        })
    }
}

impl Default for Batcher {
    fn default() -> Self {
        Self::new(BatchLimits::default())
    }
}

/// Lazy iterator of batches over a record iterator.
///
/// Finite, driven by the upstream iterator, and not restartable.
pub struct Batches<I> {
    records: I,
    batcher: Batcher,
    done: bool,
}

impl<I> Batches<I>
where
    I: Iterator<Item = EnrichedRecord>,
{
    pub fn new(records: I, limits: BatchLimits) -> Self {
        Self {
            records,
            batcher: Batcher::new(limits),
            done: false,
        }
    }
}

impl<I> Iterator for Batches<I>
where
    I: Iterator<Item = EnrichedRecord>,
{
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.done {
            return None;
        }
        for record in self.records.by_ref() {
            if let Some(batch) = self.batcher.push(record) {
                return Some(batch);
            }
        }
        self.done = true;
        self.batcher.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::UserAgentInfo;
    use crate::record::SourceIdentity;

    fn record(n: usize) -> EnrichedRecord {
        EnrichedRecord::new(
            &format!("line-{}", n),
            &UserAgentInfo::unknown(),
            &SourceIdentity::from_key("k"),
        )
    }

    fn records(n: usize) -> impl Iterator<Item = EnrichedRecord> {
        (0..n).map(record)
    }

    #[test]
    fn seals_at_record_limit() {
        let mut batcher = Batcher::default();
        for i in 0..MAX_BATCH_SIZE - 1 {
            assert!(batcher.push(record(i)).is_none());
        }
        let batch = batcher.push(record(MAX_BATCH_SIZE)).unwrap();
        assert_eq!(batch.len(), MAX_BATCH_SIZE);
        assert_eq!(batcher.pending(), 0);
        assert!(batcher.flush().is_none());
    }

    #[test]
    fn seven_hundred_fifty_records_make_two_batches() {
        let sizes: Vec<usize> = Batches::new(records(750), BatchLimits::default())
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![500, 250]);
    }

    #[test]
    fn batch_count_is_ceiling_and_order_is_kept() {
        for n in [0, 1, 499, 500, 501, 1000, 1234] {
            let batches: Vec<Batch> = Batches::new(records(n), BatchLimits::default()).collect();
            assert_eq!(batches.len(), n.div_ceil(MAX_BATCH_SIZE), "n = {}", n);
            assert!(batches.iter().all(|b| !b.is_empty() && b.len() <= MAX_BATCH_SIZE));

            let flattened: Vec<EnrichedRecord> =
                batches.into_iter().flat_map(Batch::into_records).collect();
            let expected: Vec<EnrichedRecord> = records(n).collect();
            assert_eq!(flattened, expected);
        }
    }

    #[test]
    fn byte_limit_seals_before_overflow() {
        let one = record(0).len();
        let limits = BatchLimits::new(MAX_BATCH_SIZE, one * 3);
        let batches: Vec<Batch> = Batches::new(records(7), limits).collect();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(sizes, vec![3, 3, 1]);
        assert!(batches.iter().all(|b| b.total_bytes() <= one * 3));
    }

    #[test]
    fn oversized_record_forms_its_own_batch() {
        let limits = BatchLimits::new(MAX_BATCH_SIZE, 4);
        let mut batcher = Batcher::new(limits);
        assert!(batcher.push(record(1)).is_none());
        let first = batcher.push(record(2)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(batcher.flush().unwrap().len(), 1);
    }

    #[test]
    fn single_record_batches() {
        let limits = BatchLimits::new(1, 4);
        let sizes: Vec<usize> = Batches::new(records(3), limits).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![1, 1, 1]);
    }

    #[test]
    fn limits_are_clamped() {
        let limits = BatchLimits::new(10_000, 0);
        assert_eq!(limits.max_records, MAX_BATCH_SIZE);
        assert_eq!(limits.max_bytes, 1);
    }

    #[test]
    fn exhausted_iterator_stays_exhausted() {
        let mut batches = Batches::new(records(2), BatchLimits::default());
        assert_eq!(batches.next().map(|b| b.len()), Some(2));
        assert!(batches.next().is_none());
        assert!(batches.next().is_none());
    }
}
