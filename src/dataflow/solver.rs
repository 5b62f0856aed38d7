//! Intraprocedural worklist solver.
//!
//! # Algorithm (forward)
//!
//! ```text
//! IN[entry] = OUT[entry] = boundary
//! IN[n] = OUT[n] = initial            for every other node
//! worklist = every node except entry
//! while worklist not empty:
//!     n = pop
//!     IN[n] = meet over OUT[p] for p in pred(n)
//!     if transfer(n, IN[n], OUT[n]) changed OUT[n]:
//!         push succ(n)
//! ```
//!
//! The backward variant swaps the roles of entry/exit, IN/OUT and
//! predecessors/successors. The fixpoint does not depend on the worklist
//! order; only the number of iterations does.

use tracing::debug;

use super::worklist::NodeWorklist;
use super::{DataflowAnalysis, DataflowResult, Direction};
use crate::cfg::{Cfg, NodeId};
use crate::config::AnalysisConfig;

/// Runs a [`DataflowAnalysis`] to fixpoint over one CFG.
pub struct Solver<'a, A> {
    analysis: &'a A,
    config: AnalysisConfig,
}

impl<'a, A: DataflowAnalysis> Solver<'a, A> {
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

    pub fn solve(&self, cfg: &Cfg<'_>) -> DataflowResult<NodeId, A::Fact> {
        let result = match self.analysis.direction() {
            Direction::Forward => self.solve_forward(cfg),
            Direction::Backward => self.solve_backward(cfg),
        };
        debug!(
            method = %cfg.method().subsignature,
            iterations = result.iterations(),
            "dataflow fixpoint reached"
        );
        result
    }

    fn solve_forward(&self, cfg: &Cfg<'_>) -> DataflowResult<NodeId, A::Fact> {
        let n = cfg.node_count();
        let entry = cfg.entry();
        let (mut in_facts, mut out_facts) = self.initialize(cfg, entry);

        let mut worklist = NodeWorklist::new(n, self.config.worklist_order);
        for node in cfg.nodes().filter(|&node| node != entry) {
            worklist.push(node.0);
        }

        let mut iterations = 0;
        while let Some(index) = worklist.pop() {
            iterations += 1;
            let node = NodeId(index);

            let mut in_fact = self.analysis.new_initial_fact();
            for pred in cfg.predecessors(node) {
                self.analysis.meet_into(&out_facts[pred.0], &mut in_fact);
            }
            let changed = self
                .analysis
                .transfer_node(cfg, node, &in_fact, &mut out_facts[index]);
            in_facts[index] = in_fact;

            if changed {
                for succ in cfg.successors(node) {
                    worklist.push(succ.0);
                }
            }
        }

        DataflowResult::from_dense(cfg.nodes(), in_facts, out_facts, iterations)
    }

    fn solve_backward(&self, cfg: &Cfg<'_>) -> DataflowResult<NodeId, A::Fact> {
        let n = cfg.node_count();
        let exit = cfg.exit();
        let (mut in_facts, mut out_facts) = self.initialize(cfg, exit);

        let mut worklist = NodeWorklist::new(n, self.config.worklist_order);
        for node in cfg.nodes().filter(|&node| node != exit) {
            worklist.push(node.0);
        }

        let mut iterations = 0;
        while let Some(index) = worklist.pop() {
            iterations += 1;
            let node = NodeId(index);

            let mut out_fact = self.analysis.new_initial_fact();
            for succ in cfg.successors(node) {
                self.analysis.meet_into(&in_facts[succ.0], &mut out_fact);
            }
            let changed = self
                .analysis
                .transfer_node(cfg, node, &out_fact, &mut in_facts[index]);
            out_facts[index] = out_fact;

            if changed {
                for pred in cfg.predecessors(node) {
                    worklist.push(pred.0);
                }
            }
        }

        DataflowResult::from_dense(cfg.nodes(), in_facts, out_facts, iterations)
    }

    /// Dense in/out vectors: `boundary_node` gets the boundary fact on both
    /// sides, every other node the initial fact.
    fn initialize(&self, cfg: &Cfg<'_>, boundary_node: NodeId) -> (Vec<A::Fact>, Vec<A::Fact>) {
        let n = cfg.node_count();
        let mut in_facts = Vec::with_capacity(n);
        let mut out_facts = Vec::with_capacity(n);
        for node in cfg.nodes() {
            let fact = if node == boundary_node {
                self.analysis.new_boundary_fact(cfg)
            } else {
                self.analysis.new_initial_fact()
            };
            in_facts.push(fact.clone());
            out_facts.push(fact);
        }
        (in_facts, out_facts)
    }
}
