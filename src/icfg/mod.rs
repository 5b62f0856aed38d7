//! Interprocedural control flow graph.
//!
//! Stitches together the CFGs of every reachable method of a call graph.
//! A call statement's intraprocedural out-edges become call-to-return
//! edges; each resolved callee adds a call edge to its entry and a return
//! edge from its exit back to every return site of the call.
//!
//! ```text
//!   caller:  ... -> [call] ==call-to-return==> [return site] -> ...
//!                     \\                        ^
//!                      call                  return
//!                        v                      |
//!   callee:            [entry] -> ... -> [exit]
//! ```
//!
//! Nodes are dense [`IcfgNode`] indices; each maps back to a method and its
//! local [`NodeId`].

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::callgraph::CallGraph;
use crate::cfg::{Cfg, CfgBuilder, EdgeKind, NodeId};
use crate::error::Result;
use crate::ir::{MethodId, Program, Stmt, StmtRef};

/// Node of an [`Icfg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IcfgNode(pub usize);

/// Kind of an ICFG edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcfgEdgeKind {
    /// Intraprocedural edge not leaving a call statement.
    Normal(EdgeKind),
    /// Call statement to its return site, bypassing the callee.
    CallToReturn { call_site: StmtRef },
    /// Call statement to the callee's entry.
    Call { call_site: StmtRef, callee: MethodId },
    /// Callee's exit to a return site of the call.
    Return { call_site: StmtRef, callee: MethodId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IcfgEdge {
    pub from: IcfgNode,
    pub to: IcfgNode,
    pub kind: IcfgEdgeKind,
}

/// Whole-program CFG over the methods of a call graph.
pub struct Icfg<'p> {
    program: &'p Program,
    cfgs: Vec<Cfg<'p>>,
    cfg_index: FxHashMap<MethodId, usize>,
    /// First ICFG node of each CFG.
    offsets: Vec<usize>,
    /// ICFG node -> (CFG index, local node)
    locals: Vec<(usize, NodeId)>,
    edges: Vec<IcfgEdge>,
    out_edges: Vec<Vec<usize>>,
    in_edges: Vec<Vec<usize>>,
}

impl<'p> Icfg<'p> {
    /// Build the ICFG of every non-abstract reachable method of `call_graph`.
    ///
    /// # Errors
    ///
    /// Propagates CFG construction failures.
    pub fn build(program: &'p Program, call_graph: &CallGraph) -> Result<Self> {
        let mut cfgs = Vec::new();
        let mut cfg_index = FxHashMap::default();
        let mut offsets = Vec::new();
        let mut locals = Vec::new();

        for &method in call_graph.reachable_methods() {
            if program.method(method).is_abstract {
                continue;
            }
            let cfg = CfgBuilder::for_method(program, method)?;
            cfg_index.insert(method, cfgs.len());
            offsets.push(locals.len());
            locals.extend(cfg.nodes().map(|node| (cfgs.len(), node)));
            cfgs.push(cfg);
        }

        let mut icfg = Self {
            program,
            cfgs,
            cfg_index,
            offsets,
            out_edges: vec![Vec::new(); locals.len()],
            in_edges: vec![Vec::new(); locals.len()],
            locals,
            edges: Vec::new(),
        };
        icfg.connect(call_graph);

        debug!(
            methods = icfg.cfgs.len(),
            nodes = icfg.node_count(),
            edges = icfg.edges.len(),
            "built ICFG"
        );
        Ok(icfg)
    }

    fn connect(&mut self, call_graph: &CallGraph) {
        let mut edges = Vec::new();
        for (ci, cfg) in self.cfgs.iter().enumerate() {
            let base = self.offsets[ci];
            let method = cfg.method_id();
            for edge in cfg.edges() {
                let kind = match (cfg.stmt(edge.from), cfg.stmt_index(edge.from)) {
                    (Some(Stmt::Invoke(_)), Some(index)) => IcfgEdgeKind::CallToReturn {
                        call_site: StmtRef::new(method, index),
                    },
                    _ => IcfgEdgeKind::Normal(edge.kind),
                };
                edges.push(IcfgEdge {
                    from: IcfgNode(base + edge.from.0),
                    to: IcfgNode(base + edge.to.0),
                    kind,
                });
            }

            for node in cfg.nodes() {
                let (Some(Stmt::Invoke(_)), Some(index)) = (cfg.stmt(node), cfg.stmt_index(node)) else {
                    continue;
                };
                let call_site = StmtRef::new(method, index);
                for &callee in call_graph.callees_of(call_site) {
                    let (Some(entry), Some(exit)) = (self.entry_of(callee), self.exit_of(callee)) else {
                        continue;
                    };
                    edges.push(IcfgEdge {
                        from: IcfgNode(base + node.0),
                        to: entry,
                        kind: IcfgEdgeKind::Call { call_site, callee },
                    });
                    for succ in cfg.successors(node) {
                        edges.push(IcfgEdge {
                            from: exit,
                            to: IcfgNode(base + succ.0),
                            kind: IcfgEdgeKind::Return { call_site, callee },
                        });
                    }
                }
            }
        }

        for (i, edge) in edges.iter().enumerate() {
            self.out_edges[edge.from.0].push(i);
            self.in_edges[edge.to.0].push(i);
        }
        self.edges = edges;
    }

    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Methods in the ICFG, in call-graph discovery order.
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.cfgs.iter().map(Cfg::method_id)
    }

    pub fn cfg(&self, method: MethodId) -> Option<&Cfg<'p>> {
        self.cfg_index.get(&method).map(|&ci| &self.cfgs[ci])
    }

    pub fn node_count(&self) -> usize {
        self.locals.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = IcfgNode> {
        (0..self.node_count()).map(IcfgNode)
    }

    /// ICFG node of a local CFG node.
    pub fn node(&self, method: MethodId, local: NodeId) -> Option<IcfgNode> {
        let ci = *self.cfg_index.get(&method)?;
        (local.0 < self.cfgs[ci].node_count()).then(|| IcfgNode(self.offsets[ci] + local.0))
    }

    /// ICFG node of the statement at `site`.
    pub fn stmt_node(&self, site: StmtRef) -> Option<IcfgNode> {
        let cfg = self.cfg(site.method)?;
        self.node(site.method, cfg.node_of(site.index))
    }

    pub fn entry_of(&self, method: MethodId) -> Option<IcfgNode> {
        let cfg = self.cfg(method)?;
        self.node(method, cfg.entry())
    }

    pub fn exit_of(&self, method: MethodId) -> Option<IcfgNode> {
        let cfg = self.cfg(method)?;
        self.node(method, cfg.exit())
    }

    pub fn method_of(&self, node: IcfgNode) -> MethodId {
        self.cfgs[self.locals[node.0].0].method_id()
    }

    /// Local CFG node of an ICFG node.
    pub fn local(&self, node: IcfgNode) -> NodeId {
        self.locals[node.0].1
    }

    /// Statement at `node`; `None` for entry/exit nodes.
    pub fn stmt(&self, node: IcfgNode) -> Option<&'p Stmt> {
        let (ci, local) = self.locals[node.0];
        self.cfgs[ci].stmt(local)
    }

    pub fn is_call(&self, node: IcfgNode) -> bool {
        matches!(self.stmt(node), Some(Stmt::Invoke(_)))
    }

    pub fn edges(&self) -> &[IcfgEdge] {
        &self.edges
    }

    pub fn out_edges(&self, node: IcfgNode) -> impl Iterator<Item = &IcfgEdge> {
        self.out_edges[node.0].iter().map(move |&i| &self.edges[i])
    }

    pub fn in_edges(&self, node: IcfgNode) -> impl Iterator<Item = &IcfgEdge> {
        self.in_edges[node.0].iter().map(move |&i| &self.edges[i])
    }

    pub fn successors(&self, node: IcfgNode) -> impl Iterator<Item = IcfgNode> + '_ {
        self.out_edges(node).map(|edge| edge.to)
    }

    pub fn predecessors(&self, node: IcfgNode) -> impl Iterator<Item = IcfgNode> + '_ {
        self.in_edges(node).map(|edge| edge.from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callgraph::build_cha;
    use crate::ir::{CallKind, Exp, Invoke, MethodRef, ProgramBuilder, Type};

    #[test]
    fn test_call_and_return_edges() {
        // main: 0: r = id(a)   1: return
        // id:   0: return p
        let mut b = ProgramBuilder::new();
        let c = b.add_class("C", None, &[]);
        let main = b.add_method(c, "void main()", true);
        let id = b.add_method(c, "int id(int)", true);
        let a = b.add_var(main, "a", Type::Int);
        let r = b.add_var(main, "r", Type::Int);
        let p = b.add_param(id, "p", Type::Int);
        b.push_stmt(main, Stmt::Assign { lhs: a, rhs: Exp::IntLiteral(4) });
        b.push_stmt(
            main,
            Stmt::Invoke(Invoke {
                kind: CallKind::Static,
                method_ref: MethodRef::new(c, "int id(int)"),
                receiver: None,
                args: vec![a],
                result: Some(r),
            }),
        );
        b.push_stmt(main, Stmt::Return { value: None });
        b.push_stmt(id, Stmt::Return { value: Some(p) });
        b.set_entry(main);
        let program = b.build().unwrap();
        let cg = build_cha(&program);
        let icfg = Icfg::build(&program, &cg).unwrap();

        assert_eq!(icfg.methods().count(), 2);
        let call = icfg.stmt_node(StmtRef::new(main, 1)).unwrap();
        assert!(icfg.is_call(call));

        let kinds: Vec<_> = icfg.out_edges(call).map(|e| e.kind).collect();
        assert!(kinds.iter().any(|k| matches!(k, IcfgEdgeKind::CallToReturn { .. })));
        assert!(kinds.iter().any(|k| matches!(k, IcfgEdgeKind::Call { callee, .. } if *callee == id)));

        let return_site = icfg.stmt_node(StmtRef::new(main, 2)).unwrap();
        let exit = icfg.exit_of(id).unwrap();
        assert!(icfg.predecessors(return_site).any(|n| n == exit));
        assert_eq!(icfg.method_of(exit), id);
        assert_eq!(icfg.local(exit), icfg.cfg(id).unwrap().exit());
    }
}
