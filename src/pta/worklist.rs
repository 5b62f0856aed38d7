//! Pending points-to propagations.

use std::collections::VecDeque;

use super::pointer::{PointerId, PointsToSet};
use crate::config::WorklistOrder;

/// Queue of `(pointer, objects)` entries awaiting propagation.
///
/// Entries are not merged: the same pointer may be queued several times,
/// each entry carrying the objects that triggered it.
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    entries: VecDeque<(PointerId, PointsToSet)>,
    order: WorklistOrder,
}

impl WorkList {
    pub fn new(order: WorklistOrder) -> Self {
        Self {
            entries: VecDeque::new(),
            order,
        }
    }

    /// The only way entries enter the queue.
    pub fn add_entry(&mut self, pointer: PointerId, pts: PointsToSet) {
        self.entries.push_back((pointer, pts));
    }

    pub fn pop(&mut self) -> Option<(PointerId, PointsToSet)> {
        match self.order {
            WorklistOrder::Fifo => self.entries.pop_front(),
            WorklistOrder::Lifo => self.entries.pop_back(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
