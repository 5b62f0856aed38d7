//! CFG type definitions.

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::ir::{Method, MethodId, Stmt};

/// Cached adjacency lists for O(1) successor/predecessor lookups.
///
/// Built lazily on first access to avoid overhead when not needed.
#[derive(Debug)]
pub struct AdjacencyCache {
    /// Node -> indices into `Cfg::edges` of outgoing edges
    out_edges: Vec<Vec<usize>>,
    /// Node -> indices into `Cfg::edges` of incoming edges
    in_edges: Vec<Vec<usize>>,
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

/// Node of a control flow graph.
///
/// Numbering is dense: the pseudo entry is `0`, statement `i` is `i + 1`
/// and the pseudo exit comes last. Node order therefore equals program order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

/// What a CFG node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entry,
    /// Statement at this program index.
    Stmt(usize),
    Exit,
}

/// Semantic type of a CFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Pseudo entry to the first statement
    Entry,
    /// Sequential flow to the next statement
    FallThrough,
    /// Unconditional jump
    Goto,
    /// Condition held
    IfTrue,
    /// Condition did not hold
    IfFalse,
    /// Switch selector matched this case value
    SwitchCase(i32),
    /// Switch selector matched no case
    SwitchDefault,
    /// Return statement to the pseudo exit
    Return,
}

impl EdgeKind {
    /// Get the default display label for this edge kind.
    pub fn label(&self) -> String {
        match self {
            EdgeKind::Entry => "entry".to_string(),
            EdgeKind::FallThrough => String::new(),
            EdgeKind::Goto => "goto".to_string(),
            EdgeKind::IfTrue => "true".to_string(),
            EdgeKind::IfFalse => "false".to_string(),
            EdgeKind::SwitchCase(v) => format!("case {v}"),
            EdgeKind::SwitchDefault => "default".to_string(),
            EdgeKind::Return => "return".to_string(),
        }
    }
}

/// An edge in the control flow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CfgEdge {
    #[serde(rename = "source_id")]
    pub from: NodeId,
    #[serde(rename = "target_id")]
    pub to: NodeId,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
}

impl CfgEdge {
    #[inline]
    pub fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }
}

/// Control flow graph of one method, one node per statement.
#[derive(Debug)]
pub struct Cfg<'p> {
    method: &'p Method,
    edges: Vec<CfgEdge>,
    adjacency_cache: OnceCell<AdjacencyCache>,
}

impl<'p> Cfg<'p> {
    pub(crate) fn from_parts(method: &'p Method, edges: Vec<CfgEdge>) -> Self {
        Self {
            method,
            edges,
            adjacency_cache: OnceCell::new(),
        }
    }

    /// Build adjacency cache from edges (called once, lazily).
    fn build_adjacency(&self) -> AdjacencyCache {
        let n = self.node_count();
        let mut cache = AdjacencyCache {
            out_edges: vec![Vec::new(); n],
            in_edges: vec![Vec::new(); n],
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
        };
        for (i, edge) in self.edges.iter().enumerate() {
            cache.out_edges[edge.from.0].push(i);
            cache.in_edges[edge.to.0].push(i);
            cache.successors[edge.from.0].push(edge.to);
            cache.predecessors[edge.to.0].push(edge.from);
        }
        cache
    }

    #[inline]
    fn adjacency(&self) -> &AdjacencyCache {
        self.adjacency_cache.get_or_init(|| self.build_adjacency())
    }

    #[inline]
    pub fn method(&self) -> &'p Method {
        self.method
    }

    #[inline]
    pub fn method_id(&self) -> MethodId {
        self.method.id
    }

    /// Number of nodes, pseudo entry and exit included.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.method.stmts.len() + 2
    }

    #[inline]
    pub fn entry(&self) -> NodeId {
        NodeId(0)
    }

    #[inline]
    pub fn exit(&self) -> NodeId {
        NodeId(self.method.stmts.len() + 1)
    }

    #[inline]
    pub fn is_entry(&self, node: NodeId) -> bool {
        node == self.entry()
    }

    #[inline]
    pub fn is_exit(&self, node: NodeId) -> bool {
        node == self.exit()
    }

    /// All nodes in program order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        (0..self.node_count()).map(NodeId)
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        if self.is_entry(node) {
            NodeKind::Entry
        } else if self.is_exit(node) {
            NodeKind::Exit
        } else {
            NodeKind::Stmt(node.0 - 1)
        }
    }

    /// Program index of the statement at `node`; `None` for entry/exit.
    #[inline]
    pub fn stmt_index(&self, node: NodeId) -> Option<usize> {
        match self.kind(node) {
            NodeKind::Stmt(i) => Some(i),
            NodeKind::Entry | NodeKind::Exit => None,
        }
    }

    /// Statement at `node`; `None` for entry/exit.
    #[inline]
    pub fn stmt(&self, node: NodeId) -> Option<&'p Stmt> {
        let method: &'p Method = self.method;
        self.stmt_index(node).map(|i| &method.stmts[i])
    }

    /// Node of the statement at program index `index`.
    #[inline]
    pub fn node_of(&self, index: usize) -> NodeId {
        NodeId(index + 1)
    }

    pub fn edges(&self) -> &[CfgEdge] {
        &self.edges
    }

    /// Get successors of a node (outgoing edges).
    pub fn successors(&self, node: NodeId) -> &[NodeId] {
        &self.adjacency().successors[node.0]
    }

    /// Get predecessors of a node (incoming edges).
    pub fn predecessors(&self, node: NodeId) -> &[NodeId] {
        &self.adjacency().predecessors[node.0]
    }

    pub fn out_edges(&self, node: NodeId) -> impl Iterator<Item = &CfgEdge> {
        self.adjacency().out_edges[node.0]
            .iter()
            .map(move |&i| &self.edges[i])
    }

    pub fn in_edges(&self, node: NodeId) -> impl Iterator<Item = &CfgEdge> {
        self.adjacency().in_edges[node.0]
            .iter()
            .map(move |&i| &self.edges[i])
    }
}
