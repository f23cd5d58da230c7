use crate::queue::{FifoQueue, QueueResult};
use std::collections::VecDeque;

/// In-process FIFO queue
///
/// Items may be live, non-serializable values; nothing survives a restart.
#[derive(Debug)]
pub struct MemoryQueue<T> {
    items: VecDeque<T>,
}

impl<T> MemoryQueue<T> {
    pub fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T> Default for MemoryQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FifoQueue for MemoryQueue<T> {
    type Item = T;

    fn push(&mut self, item: T) -> QueueResult<()> {
        self.items.push_back(item);
        Ok(())
    }

    fn pop(&mut self) -> QueueResult<Option<T>> {
        Ok(self.items.pop_front())
    }

    fn len(&self) -> usize {
        self.items.len()
    }

    fn close(&mut self) -> QueueResult<usize> {
        let remaining = self.items.len();
        self.items.clear();
        Ok(remaining)
    }
}
