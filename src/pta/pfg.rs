//! Pointer flow graph.
//!
//! An edge `s -> t` means every object `s` may point to flows into `t`.
//! Pointers are interned; the graph also owns each pointer's points-to set.

use rustc_hash::{FxHashMap, FxHashSet};

use super::pointer::{Pointer, PointerId, PointsToSet};

#[derive(Debug, Clone, Default)]
pub struct PointerFlowGraph {
    pointers: Vec<Pointer>,
    index: FxHashMap<Pointer, PointerId>,
    successors: Vec<Vec<PointerId>>,
    edge_set: FxHashSet<(PointerId, PointerId)>,
    pts: Vec<PointsToSet>,
}

impl PointerFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical id of `pointer`, interning it on first sight.
    pub fn get_or_create(&mut self, pointer: Pointer) -> PointerId {
        if let Some(&id) = self.index.get(&pointer) {
            return id;
        }
        let id = PointerId(self.pointers.len());
        self.pointers.push(pointer);
        self.successors.push(Vec::new());
        self.pts.push(PointsToSet::new());
        self.index.insert(pointer, id);
        id
    }

    /// Id of `pointer` if it was ever interned.
    pub fn lookup(&self, pointer: &Pointer) -> Option<PointerId> {
        self.index.get(pointer).copied()
    }

    pub fn pointer(&self, id: PointerId) -> &Pointer {
        &self.pointers[id.0]
    }

    /// Add `source -> target`; returns `true` if the edge is new.
    pub fn add_edge(&mut self, source: PointerId, target: PointerId) -> bool {
        if !self.edge_set.insert((source, target)) {
            return false;
        }
        self.successors[source.0].push(target);
        true
    }

    pub fn has_edge(&self, source: PointerId, target: PointerId) -> bool {
        self.edge_set.contains(&(source, target))
    }

    pub fn successors(&self, id: PointerId) -> &[PointerId] {
        &self.successors[id.0]
    }

    pub fn points_to(&self, id: PointerId) -> &PointsToSet {
        &self.pts[id.0]
    }

    pub(crate) fn points_to_mut(&mut self, id: PointerId) -> &mut PointsToSet {
        &mut self.pts[id.0]
    }

    /// Interned pointers with their ids.
    pub fn pointers(&self) -> impl Iterator<Item = (PointerId, &Pointer)> {
        self.pointers.iter().enumerate().map(|(i, p)| (PointerId(i), p))
    }

    pub fn pointer_count(&self) -> usize {
        self.pointers.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_set.len()
    }
}
