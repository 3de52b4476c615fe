use serde::{Deserialize, Serialize};

/// A sized unit of result rows produced by an MPP computation.
///
/// The holder never looks inside a batch; it only needs the row count for admission control
/// and the memory footprint for budget accounting.
pub trait ResultBatch {
    fn num_rows(&self) -> usize;
    fn memory_usage(&self) -> i64;
}

/// Batch that carries only its size, used by the simulator and in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizedBatch {
    pub seq: u64,
    pub rows: usize,
    pub bytes: i64,
}

impl SizedBatch {
    pub fn new(seq: u64, rows: usize, bytes: i64) -> Self {
        Self { seq, rows, bytes }
    }
}

impl ResultBatch for SizedBatch {
    fn num_rows(&self) -> usize {
        self.rows
    }

    fn memory_usage(&self) -> i64 {
        self.bytes
    }
}

impl<B: ResultBatch + ?Sized> ResultBatch for Box<B> {
    fn num_rows(&self) -> usize {
        (**self).num_rows()
    }

    fn memory_usage(&self) -> i64 {
        (**self).memory_usage()
    }
}
