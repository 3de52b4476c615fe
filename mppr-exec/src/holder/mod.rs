use std::collections::VecDeque;
use std::sync::Arc;

use mppr_core::{MemTracker, ResultBatch};
use tracing::debug;

const HOLDER_LABEL: &str = "mpp-result-holder";

/// Whether the holder may still buffer results.
///
/// `Holding -> Committing` happens when an insert reaches capacity or on any pop;
/// only [`ResultHolder::reset`] goes back to `Holding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolderState {
    Holding,
    Committing,
}

impl HolderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            HolderState::Holding => "holding",
            HolderState::Committing => "committing",
        }
    }
}

/// Bounded FIFO of result batches kept back from the client while a retry is still possible.
///
/// Row capacity is the admission gate; memory is tracked but never used to reject. Dropping the
/// holder releases whatever it still has charged to the parent budget.
#[derive(Debug)]
pub struct ResultHolder<B> {
    capacity: u64,
    state: HolderState,
    cur_rows: u64,
    batches: VecDeque<B>,
    mem_tracker: Arc<MemTracker>,
    parent: Option<Arc<MemTracker>>,
}

impl<B: ResultBatch> ResultHolder<B> {
    pub fn new(capacity: u64, parent: Option<&Arc<MemTracker>>) -> Self {
        let mem_tracker = match parent {
            Some(p) => MemTracker::new_child(format!("{}/{HOLDER_LABEL}", p.label()), p),
            None => MemTracker::new(HOLDER_LABEL),
        };
        Self {
            capacity,
            state: HolderState::Holding,
            cur_rows: 0,
            batches: VecDeque::new(),
            mem_tracker,
            parent: parent.cloned(),
        }
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn state(&self) -> HolderState {
        self.state
    }

    pub fn can_hold(&self) -> bool {
        self.capacity > 0 && self.state == HolderState::Holding
    }

    /// Appends a batch. Callers check [`Self::can_hold`] first; the insert itself never fails.
    pub fn insert(&mut self, batch: B) {
        self.cur_rows += batch.num_rows() as u64;
        self.mem_tracker.consume(batch.memory_usage());
        self.batches.push_back(batch);

        if self.cur_rows >= self.capacity && self.state == HolderState::Holding {
            debug!(
                held_rows = self.cur_rows,
                capacity = self.capacity,
                "result holder reached capacity"
            );
            self.state = HolderState::Committing;
        }
    }

    pub fn held_batch_count(&self) -> usize {
        self.batches.len()
    }

    /// Rows inserted since the last reset. Pops do not lower it.
    pub fn held_row_count(&self) -> u64 {
        self.cur_rows
    }

    /// Removes the oldest batch. Any pop means results are flowing to the client, so the
    /// holder latches to `Committing` even below capacity.
    pub fn pop_front(&mut self) -> Option<B> {
        let batch = self.batches.pop_front()?;
        self.mem_tracker.consume(-batch.memory_usage());
        if self.state == HolderState::Holding {
            debug!(held_rows = self.cur_rows, "result holder started draining");
            self.state = HolderState::Committing;
        }
        Some(batch)
    }

    /// Drops every held batch and returns to `Holding`. Capacity is kept.
    pub fn reset(&mut self) {
        debug!(
            discarded_batches = self.batches.len(),
            discarded_rows = self.cur_rows,
            state = self.state.as_str(),
            "resetting result holder"
        );
        self.state = HolderState::Holding;
        self.cur_rows = 0;
        self.batches.clear();
        self.mem_tracker.detach();
        if let Some(parent) = &self.parent {
            self.mem_tracker.attach_to(parent);
        }
    }

    pub fn mem_tracker(&self) -> &Arc<MemTracker> {
        &self.mem_tracker
    }
}

impl<B> Drop for ResultHolder<B> {
    fn drop(&mut self) {
        self.mem_tracker.detach();
    }
}
