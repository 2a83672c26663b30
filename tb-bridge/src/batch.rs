//! Splitting caller input into wire batches.

use crate::error::{ClientError, Result};
use crate::protocol::{encode_all, Operation, Record};

/// One wire batch: same-kind records encoded back to back.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    /// Operation every record in the batch belongs to.
    pub operation: Operation,
    /// Position of the first record within the caller's input.
    pub offset: u32,
    /// Number of records in the batch.
    pub count: u32,
    /// Encoded records.
    pub payload: Vec<u8>,
}

/// Splits homogeneous input into batches no larger than `max_batch_size`
/// encoded bytes.
#[derive(Clone, Copy, Debug)]
pub struct BatchBuilder {
    max_batch_size: usize,
}

impl BatchBuilder {
    /// Create a builder for batches of at most `max_batch_size` bytes.
    pub fn new(max_batch_size: usize) -> Self {
        Self { max_batch_size }
    }

    /// Maximum encoded bytes per batch.
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// How many `R` records fit in one batch.
    pub fn records_per_batch<R: Record>(&self) -> usize {
        self.max_batch_size / R::SIZE
    }

    /// Split `records` into batches, preserving order.
    ///
    /// `N` records with `M` records per batch yield `ceil(N / M)` batches;
    /// every batch but the last is full.
    pub fn build<R: Record>(&self, operation: Operation, records: &[R]) -> Result<Vec<Batch>> {
        if operation.event_size() != Some(R::SIZE) {
            return Err(ClientError::Validation(format!(
                "{}-byte records cannot be sent as {}",
                R::SIZE,
                operation
            )));
        }
        if records.is_empty() {
            return Err(ClientError::EmptyBatch);
        }
        let per_batch = self.records_per_batch::<R>();
        if per_batch == 0 {
            return Err(ClientError::BatchTooLarge {
                size: R::SIZE,
                limit: self.max_batch_size,
            });
        }

        let batches = records
            .chunks(per_batch)
            .enumerate()
            .map(|(i, chunk)| Batch {
                operation,
                offset: (i * per_batch) as u32,
                count: chunk.len() as u32,
                payload: encode_all(chunk),
            })
            .collect();
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode_all, Account, Identifier};

    fn ids(n: u64) -> Vec<Identifier> {
        (1..=n).map(|i| Identifier::new(0, i)).collect()
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        // 4 identifiers per batch.
        let builder = BatchBuilder::new(64);
        for (n, expected) in [(1, 1), (4, 1), (5, 2), (8, 2), (9, 3), (100, 25)] {
            let batches = builder.build(Operation::LookupAccounts, &ids(n)).unwrap();
            assert_eq!(batches.len(), expected, "n = {}", n);
        }
    }

    #[test]
    fn test_batches_preserve_order() {
        let input = ids(11);
        let batches = BatchBuilder::new(64)
            .build(Operation::LookupTransfers, &input)
            .unwrap();

        let mut rebuilt = Vec::new();
        for batch in &batches {
            assert_eq!(batch.operation, Operation::LookupTransfers);
            assert_eq!(batch.offset as usize, rebuilt.len());
            let decoded: Vec<Identifier> = decode_all(&batch.payload).unwrap();
            assert_eq!(decoded.len(), batch.count as usize);
            assert!(batch.payload.len() <= 64);
            rebuilt.extend(decoded);
        }
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn test_empty_input() {
        let result = BatchBuilder::new(1024).build::<Account>(Operation::CreateAccounts, &[]);
        assert_eq!(result, Err(ClientError::EmptyBatch));
    }

    #[test]
    fn test_record_larger_than_batch() {
        let result = BatchBuilder::new(100).build(Operation::CreateAccounts, &[Account::default()]);
        assert_eq!(
            result,
            Err(ClientError::BatchTooLarge {
                size: 128,
                limit: 100
            })
        );
    }

    #[test]
    fn test_record_kind_must_match_operation() {
        let result = BatchBuilder::new(1024).build(Operation::CreateAccounts, &ids(1));
        assert!(matches!(result, Err(ClientError::Validation(_))));
    }

    #[test]
    fn test_records_per_batch() {
        let builder = BatchBuilder::new(1000);
        assert_eq!(builder.records_per_batch::<Account>(), 7);
        assert_eq!(builder.records_per_batch::<Identifier>(), 62);
    }
}
