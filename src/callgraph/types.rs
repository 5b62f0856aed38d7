//! Call graph data structures.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::ir::{MethodId, StmtRef};

/// Dispatch kind of a call site.
///
/// The kind selects how a callee is resolved; propagation along the
/// resulting call edge is identical for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Static method call; resolved from the declared reference.
    Static,
    /// Constructor, private or `super` call; resolved from the declared reference.
    Special,
    /// Virtual call; dispatched on the receiver's concrete class.
    Virtual,
    /// Interface call; dispatched on the receiver's concrete class.
    Interface,
    /// Dynamically linked call site; never resolved.
    Dynamic,
}

impl CallKind {
    /// Whether a call of this kind must carry a receiver. `None` means
    /// either shape is accepted.
    pub fn needs_receiver(self) -> Option<bool> {
        match self {
            CallKind::Static => Some(false),
            CallKind::Special | CallKind::Virtual | CallKind::Interface => Some(true),
            CallKind::Dynamic => None,
        }
    }
}

/// A resolved call: `call_site` may invoke `callee`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CallEdge {
    pub kind: CallKind,
    pub call_site: StmtRef,
    pub callee: MethodId,
}

impl CallEdge {
    #[inline]
    pub fn new(kind: CallKind, call_site: StmtRef, callee: MethodId) -> Self {
        Self {
            kind,
            call_site,
            callee,
        }
    }
}

/// Reachable methods plus call edges. Both only ever grow.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CallGraph {
    entry_methods: Vec<MethodId>,
    /// Reachable methods in discovery order.
    reachable: Vec<MethodId>,
    #[serde(skip)]
    reachable_set: FxHashSet<MethodId>,
    /// Edges in discovery order.
    edges: Vec<CallEdge>,
    #[serde(skip)]
    edge_set: FxHashSet<CallEdge>,
    #[serde(skip)]
    callees: FxHashMap<StmtRef, Vec<MethodId>>,
    #[serde(skip)]
    callers: FxHashMap<MethodId, Vec<StmtRef>>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry_method(&mut self, method: MethodId) {
        if !self.entry_methods.contains(&method) {
            self.entry_methods.push(method);
        }
    }

    pub fn entry_methods(&self) -> &[MethodId] {
        &self.entry_methods
    }

    /// Mark `method` reachable. Returns `true` if it was not reachable before.
    pub fn add_reachable_method(&mut self, method: MethodId) -> bool {
        if self.reachable_set.insert(method) {
            self.reachable.push(method);
            true
        } else {
            false
        }
    }

    /// Record a call edge. Returns `true` if the edge is new.
    pub fn add_edge(&mut self, edge: CallEdge) -> bool {
        if !self.edge_set.insert(edge) {
            return false;
        }
        self.edges.push(edge);
        self.callees.entry(edge.call_site).or_default().push(edge.callee);
        self.callers.entry(edge.callee).or_default().push(edge.call_site);
        true
    }

    #[inline]
    pub fn contains(&self, method: MethodId) -> bool {
        self.reachable_set.contains(&method)
    }

    pub fn reachable_methods(&self) -> &[MethodId] {
        &self.reachable
    }

    pub fn edges(&self) -> &[CallEdge] {
        &self.edges
    }

    pub fn has_edge(&self, edge: &CallEdge) -> bool {
        self.edge_set.contains(edge)
    }

    /// Methods `call_site` may invoke.
    pub fn callees_of(&self, call_site: StmtRef) -> &[MethodId] {
        self.callees.get(&call_site).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Call sites that may invoke `method`.
    pub fn callers_of(&self, method: MethodId) -> &[StmtRef] {
        self.callers.get(&method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn reachable_count(&self) -> usize {
        self.reachable.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}
