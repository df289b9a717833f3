//! In-memory FIFO for best-effort work that failed and may be retried
//!
//! The buffer is unbounded and lives only in process memory: anything still
//! queued when the process exits is lost. Nothing that must happen for
//! correctness may be routed through it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct DeferredTaskBuffer<T> {
    queue: Mutex<VecDeque<T>>,
}

impl<T> Default for DeferredTaskBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> DeferredTaskBuffer<T> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, task: T) {
        self.queue().push_back(task);
    }

    /// Take everything queued so far, oldest first
    pub fn drain(&self) -> Vec<T> {
        self.queue().drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_is_fifo_and_empties() {
        let buffer = DeferredTaskBuffer::new();
        buffer.push("first");
        buffer.push("second");
        assert_eq!(buffer.len(), 2);

        assert_eq!(buffer.drain(), vec!["first", "second"]);
        assert!(buffer.is_empty());
        assert!(buffer.drain().is_empty());
    }
}
