//! Deduplicating node worklist shared by the dataflow solvers.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;

use crate::config::WorklistOrder;

/// Queue of dense node indices; a node is queued at most once at a time.
pub(crate) struct NodeWorklist {
    queue: VecDeque<usize>,
    // FixedBitSet for efficient worklist membership tracking
    queued: FixedBitSet,
    order: WorklistOrder,
}

impl NodeWorklist {
    pub(crate) fn new(capacity: usize, order: WorklistOrder) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            queued: FixedBitSet::with_capacity(capacity),
            order,
        }
    }

    pub(crate) fn push(&mut self, node: usize) {
        if !self.queued.contains(node) {
            self.queued.insert(node);
            self.queue.push_back(node);
        }
    }

    pub(crate) fn pop(&mut self) -> Option<usize> {
        let node = match self.order {
            WorklistOrder::Fifo => self.queue.pop_front(),
            WorklistOrder::Lifo => self.queue.pop_back(),
        }?;
        self.queued.set(node, false);
        Some(node)
    }
}
