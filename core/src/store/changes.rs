use std::sync::atomic::{AtomicBool, Ordering};

/// Edge-triggered dirty flag. Any number of marks between two reads collapse
/// into one `true`.
#[derive(Debug, Default)]
pub struct ChangeFlag {
    dirty: AtomicBool,
}

impl ChangeFlag {
    pub fn new() -> Self {
        Self {
            dirty: AtomicBool::new(false),
        }
    }

    pub fn mark(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Returns whether anything changed since the last call and resets the flag.
    pub fn take(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }
}
