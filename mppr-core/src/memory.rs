use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Hierarchical memory accounting.
///
/// Usage consumed by a tracker is propagated to every ancestor, so a parent budget always
/// reflects the sum of its attached children. Trackers only account; they never reject.
pub struct MemTracker {
    label: String,
    bytes_consumed: AtomicI64,
    max_consumed: AtomicI64,
    parent: Mutex<Option<Arc<MemTracker>>>,
}

impl MemTracker {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            bytes_consumed: AtomicI64::new(0),
            max_consumed: AtomicI64::new(0),
            parent: Mutex::new(None),
        })
    }

    pub fn new_child(label: impl Into<String>, parent: &Arc<MemTracker>) -> Arc<Self> {
        let child = Self::new(label);
        child.attach_to(parent);
        child
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn bytes_consumed(&self) -> i64 {
        self.bytes_consumed.load(Ordering::Acquire)
    }

    /// Peak usage observed since creation. Not lowered by releases or detach.
    pub fn max_consumed(&self) -> i64 {
        self.max_consumed.load(Ordering::Acquire)
    }

    pub fn parent(&self) -> Option<Arc<MemTracker>> {
        self.lock_parent().clone()
    }

    /// Links this tracker under `parent`, charging the parent chain with the current usage.
    /// An existing link is dropped first.
    pub fn attach_to(&self, parent: &Arc<MemTracker>) {
        let previous = self.lock_parent().replace(parent.clone());
        let bytes = self.bytes_consumed();
        if let Some(previous) = previous {
            previous.consume(-bytes);
        }
        parent.consume(bytes);
    }

    /// Adjusts usage by `delta` bytes; negative values release.
    pub fn consume(&self, delta: i64) {
        if delta == 0 {
            return;
        }
        self.apply(delta);
        let mut next = self.parent();
        while let Some(tracker) = next {
            tracker.apply(delta);
            next = tracker.parent();
        }
    }

    /// Bulk-releases everything this tracker holds and unlinks it from its parent.
    pub fn detach(&self) {
        let parent = self.lock_parent().take();
        let bytes = self.bytes_consumed.swap(0, Ordering::AcqRel);
        if let Some(parent) = parent {
            parent.consume(-bytes);
        }
    }

    fn apply(&self, delta: i64) {
        let now = self.bytes_consumed.fetch_add(delta, Ordering::AcqRel) + delta;
        self.max_consumed.fetch_max(now, Ordering::AcqRel);
    }

    fn lock_parent(&self) -> MutexGuard<'_, Option<Arc<MemTracker>>> {
        self.parent.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for MemTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemTracker")
            .field("label", &self.label)
            .field("bytes_consumed", &self.bytes_consumed())
            .field("max_consumed", &self.max_consumed())
            .field("parent", &self.parent().map(|p| p.label.clone()))
            .finish()
    }
}
