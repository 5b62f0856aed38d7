//! Class hierarchy analysis (CHA) call graph construction.
//!
//! Starting from the entry method, every call site is resolved to all
//! concrete methods any subtype of the declared class could dispatch to.
//! Cheaper and less precise than the on-the-fly graph produced by pointer
//! analysis; useful as the skeleton of an ICFG.

use std::collections::VecDeque;

use tracing::debug;

use super::{CallEdge, CallGraph};
use crate::ir::{Program, StmtRef};

/// Build a CHA call graph rooted at the program's entry method.
///
/// Returns an empty graph when the program has no entry method.
pub fn build_cha(program: &Program) -> CallGraph {
    let mut graph = CallGraph::new();
    let Some(entry) = program.entry() else {
        debug!("no entry method; CHA call graph is empty");
        return graph;
    };
    graph.add_entry_method(entry);

    let mut worklist = VecDeque::from([entry]);
    while let Some(method) = worklist.pop_front() {
        if !graph.add_reachable_method(method) {
            continue;
        }
        for (index, stmt) in program.method(method).stmts.iter().enumerate() {
            let Some(invoke) = stmt.as_invoke() else {
                continue;
            };
            let call_site = StmtRef::new(method, index);
            for callee in program.resolve_cha(invoke) {
                graph.add_edge(CallEdge::new(invoke.kind, call_site, callee));
                worklist.push_back(callee);
            }
        }
    }

    debug!(
        reachable = graph.reachable_count(),
        edges = graph.edge_count(),
        "CHA call graph built"
    );
    graph
}
