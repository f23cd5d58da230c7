use crate::queue::{FifoQueue, QueueResult};
use std::collections::BTreeMap;

type QueueFactory<Q> = Box<dyn FnMut(i32) -> QueueResult<Q>>;

/// Priority queue made of one FIFO sub-queue per priority level
///
/// Pop always serves the lowest active priority level; within a level items
/// come out in insertion order. Sub-queues are created on first push through
/// the injected factory and closed as soon as they drain.
pub struct PriorityQueue<Q: FifoQueue> {
    queues: BTreeMap<i32, Q>,
    factory: QueueFactory<Q>,
    len: usize,
}

impl<Q: FifoQueue> std::fmt::Debug for PriorityQueue<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriorityQueue")
            .field("priorities", &self.priorities())
            .field("len", &self.len)
            .finish()
    }
}

impl<Q: FifoQueue> PriorityQueue<Q> {
    /// Creates an empty priority queue
    ///
    /// # Arguments
    ///
    /// * `factory` - Builds the sub-queue for a priority level
    pub fn new(factory: impl FnMut(i32) -> QueueResult<Q> + 'static) -> Self {
        Self {
            queues: BTreeMap::new(),
            factory: Box::new(factory),
            len: 0,
        }
    }

    /// Creates a priority queue with sub-queues pre-opened for `start_priorities`
    ///
    /// This is the resume path: levels recorded at the last close are reopened
    /// up front so their items are visible to `pop` without a prior push.
    /// Levels that turn out to be empty are closed again right away.
    pub fn with_start_priorities(
        factory: impl FnMut(i32) -> QueueResult<Q> + 'static,
        start_priorities: &[i32],
    ) -> QueueResult<Self> {
        let mut pq = Self::new(factory);

        for &priority in start_priorities {
            if pq.queues.contains_key(&priority) {
                continue;
            }
            let mut queue = (pq.factory)(priority)?;
            if queue.is_empty() {
                queue.close()?;
                continue;
            }
            pq.len += queue.len();
            pq.queues.insert(priority, queue);
        }

        Ok(pq)
    }

    /// Pushes an item onto the sub-queue for `priority`
    pub fn push(&mut self, item: Q::Item, priority: i32) -> QueueResult<()> {
        let queue = match self.queues.entry(priority) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => {
                entry.insert((self.factory)(priority)?)
            }
        };
        queue.push(item)?;
        self.len += 1;
        Ok(())
    }

    /// Pops the oldest item of the lowest active priority level
    pub fn pop(&mut self) -> QueueResult<Option<Q::Item>> {
        while let Some(mut entry) = self.queues.first_entry() {
            let item = entry.get_mut().pop()?;

            if entry.get().is_empty() {
                let priority = *entry.key();
                let mut drained = entry.remove();
                if let Err(e) = drained.close() {
                    tracing::warn!("Failed to close drained queue for priority {}: {}", priority, e);
                }
            }

            if let Some(item) = item {
                self.len -= 1;
                return Ok(Some(item));
            }
        }

        Ok(None)
    }

    /// Total number of items across all levels
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Currently open priority levels, ascending
    pub fn priorities(&self) -> Vec<i32> {
        self.queues.keys().copied().collect()
    }

    /// Number of items queued at each open level, ascending by priority
    pub fn level_sizes(&self) -> Vec<(i32, usize)> {
        self.queues.iter().map(|(p, q)| (*p, q.len())).collect()
    }

    /// Closes every sub-queue and returns the levels that still hold items
    ///
    /// All sub-queues are closed even if one fails; the first failure is
    /// returned in that case.
    pub fn close(&mut self) -> QueueResult<Vec<i32>> {
        let mut active = Vec::new();
        let mut first_error = None;

        for (priority, mut queue) in std::mem::take(&mut self.queues) {
            match queue.close() {
                Ok(0) => {}
                Ok(_) => active.push(priority),
                Err(e) => {
                    tracing::error!("Failed to close queue for priority {}: {}", priority, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        self.len = 0;

        match first_error {
            Some(e) => Err(e),
            None => Ok(active),
        }
    }
}
