//! Interprocedural worklist solver.
//!
//! Facts flow forward over an [`Icfg`]. Before a node's transfer, every
//! incoming edge's fact is computed from its source's out-fact through
//! [`InterDataflowAnalysis::transfer_edge`] and met into the node's
//! in-fact:
//!
//! ```text
//! IN[entry(main)] = OUT[entry(main)] = boundary
//! worklist = every node
//! while worklist not empty:
//!     n = pop
//!     for e in in_edges(n):  IN[n] ⊓= transfer_edge(e, OUT[source(e)])
//!     if transfer(n, IN[n], OUT[n]) changed OUT[n]:
//!         push succ(n)
//! ```

use tracing::{debug, warn};

use super::worklist::NodeWorklist;
use super::{DataflowResult, InterDataflowAnalysis};
use crate::config::AnalysisConfig;
use crate::icfg::{Icfg, IcfgNode};

/// Runs an [`InterDataflowAnalysis`] to fixpoint over an [`Icfg`].
pub struct InterSolver<'a, A> {
    analysis: &'a A,
    config: AnalysisConfig,
}

impl<'a, A: InterDataflowAnalysis> InterSolver<'a, A> {
    pub fn new(analysis: &'a A) -> Self {
        Self {
            analysis,
            config: AnalysisConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: &AnalysisConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Solve from the program's entry method. Without an entry method in
    /// the ICFG the result is empty.
    pub fn solve(&self, icfg: &Icfg<'_>) -> DataflowResult<IcfgNode, A::Fact> {
        let Some(entry) = icfg.program().entry().and_then(|main| icfg.entry_of(main)) else {
            warn!("no entry method in ICFG; skipping interprocedural analysis");
            return DataflowResult::new();
        };

        let n = icfg.node_count();
        let mut in_facts = Vec::with_capacity(n);
        let mut out_facts = Vec::with_capacity(n);
        for node in icfg.nodes() {
            let fact = if node == entry {
                self.analysis.new_boundary_fact(icfg, entry)
            } else {
                self.analysis.new_initial_fact()
            };
            in_facts.push(fact.clone());
            out_facts.push(fact);
        }

        let mut worklist = NodeWorklist::new(n, self.config.worklist_order);
        for node in icfg.nodes() {
            worklist.push(node.0);
        }

        let mut iterations = 0;
        while let Some(index) = worklist.pop() {
            iterations += 1;
            let node = IcfgNode(index);

            for edge in icfg.in_edges(node) {
                let fact = self.analysis.transfer_edge(icfg, edge, &out_facts[edge.from.0]);
                self.analysis.meet_into(&fact, &mut in_facts[index]);
            }
            let changed =
                self.analysis
                    .transfer_node(icfg, node, &in_facts[index], &mut out_facts[index]);
            if changed {
                for succ in icfg.successors(node) {
                    worklist.push(succ.0);
                }
            }
        }

        debug!(nodes = n, iterations, "interprocedural fixpoint reached");
        DataflowResult::from_dense(icfg.nodes(), in_facts, out_facts, iterations)
    }
}
