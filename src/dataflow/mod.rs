//! Fixpoint dataflow analysis.
//!
//! An analysis plugs a lattice (meet, boundary/initial facts) and a transfer
//! function into a generic worklist solver, which iterates until no fact
//! changes.
//!
//! # Modules
//!
//! - [`solver`]: intraprocedural forward/backward worklist solver
//! - [`inter_solver`]: interprocedural solver over an [`crate::icfg::Icfg`]
//! - [`constant_propagation`]: Undef/Constant/NAC integer constants
//! - [`live_variables`]: backward liveness
//! - [`dead_code`]: unreachable and ineffectual statement detection
//! - [`inter_constant_propagation`]: constants across call/return edges
//!
//! # Example
//!
//! ```ignore
//! use brrr_flow::cfg::CfgBuilder;
//! use brrr_flow::config::AnalysisConfig;
//! use brrr_flow::dataflow::constant_propagation::analyze_constants;
//!
//! let cfg = CfgBuilder::for_method(&program, method)?;
//! let constants = analyze_constants(&program, &cfg, &AnalysisConfig::default());
//! let fact = constants.out_fact(cfg.exit()).unwrap();
//! println!("{fact}");
//! ```

pub mod constant_propagation;
pub mod dead_code;
pub mod inter_constant_propagation;
pub mod inter_solver;
pub mod live_variables;
pub mod solver;
mod worklist;

use std::fmt::Debug;
use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::cfg::{Cfg, NodeId};
use crate::icfg::{Icfg, IcfgEdge, IcfgNode};

pub use constant_propagation::{analyze_constants, ConstantPropagation, CpFact, Value};
pub use dead_code::{detect_dead_code, DeadCodeDetector, DeadCodeReport};
pub use inter_constant_propagation::{analyze_inter_constants, InterConstantPropagation};
pub use inter_solver::InterSolver;
pub use live_variables::{analyze_live_variables, LiveVariableAnalysis, LiveVars};
pub use solver::Solver;

/// Direction in which facts flow through a CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Entry to exit; merge over predecessors.
    Forward,
    /// Exit to entry; merge over successors.
    Backward,
}

/// An intraprocedural dataflow analysis.
///
/// Meet and transfer must be monotone over a lattice of finite height.
/// The solver does not detect violations; they show up as non-termination.
pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq + Debug;

    fn direction(&self) -> Direction;

    /// Fact at the boundary node: entry for forward, exit for backward.
    fn new_boundary_fact(&self, cfg: &Cfg<'_>) -> Self::Fact;

    /// Fact every other node starts from.
    fn new_initial_fact(&self) -> Self::Fact;

    /// Meet `fact` into `target` in place.
    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Apply the node's transfer function.
    ///
    /// `input` is the fact on the incoming side along the analysis direction
    /// (in-fact for forward, out-fact for backward) and `output` the fact on
    /// the other side. Returns `true` if `output` changed.
    fn transfer_node(
        &self,
        cfg: &Cfg<'_>,
        node: NodeId,
        input: &Self::Fact,
        output: &mut Self::Fact,
    ) -> bool;
}

/// An analysis over an interprocedural CFG. Facts flow forward only; call
/// and return linkage is expressed through [`Self::transfer_edge`].
pub trait InterDataflowAnalysis {
    type Fact: Clone + PartialEq + Debug;

    /// Fact at the entry node of the program's entry method.
    fn new_boundary_fact(&self, icfg: &Icfg<'_>, entry: IcfgNode) -> Self::Fact;

    fn new_initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Compute `out` from `in`; returns `true` if `out` changed.
    fn transfer_node(
        &self,
        icfg: &Icfg<'_>,
        node: IcfgNode,
        in_fact: &Self::Fact,
        out_fact: &mut Self::Fact,
    ) -> bool;

    /// Fact carried along `edge` given the out-fact of its source.
    fn transfer_edge(&self, icfg: &Icfg<'_>, edge: &IcfgEdge, source_out: &Self::Fact) -> Self::Fact;
}

/// In- and out-facts per node, as computed by a solver.
#[derive(Debug, Clone)]
pub struct DataflowResult<N, F> {
    in_facts: FxHashMap<N, F>,
    out_facts: FxHashMap<N, F>,
    /// Worklist pops until fixpoint.
    iterations: usize,
}

impl<N, F> Default for DataflowResult<N, F> {
    fn default() -> Self {
        Self {
            in_facts: FxHashMap::default(),
            out_facts: FxHashMap::default(),
            iterations: 0,
        }
    }
}

impl<N: Copy + Eq + Hash, F> DataflowResult<N, F> {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_dense(
        nodes: impl IntoIterator<Item = N>,
        in_facts: Vec<F>,
        out_facts: Vec<F>,
        iterations: usize,
    ) -> Self {
        let mut result = Self::new();
        for ((node, in_fact), out_fact) in nodes.into_iter().zip(in_facts).zip(out_facts) {
            result.in_facts.insert(node, in_fact);
            result.out_facts.insert(node, out_fact);
        }
        result.iterations = iterations;
        result
    }

    pub fn in_fact(&self, node: N) -> Option<&F> {
        self.in_facts.get(&node)
    }

    pub fn out_fact(&self, node: N) -> Option<&F> {
        self.out_facts.get(&node)
    }

    pub fn set_in_fact(&mut self, node: N, fact: F) {
        self.in_facts.insert(node, fact);
    }

    pub fn set_out_fact(&mut self, node: N, fact: F) {
        self.out_facts.insert(node, fact);
    }

    /// Number of nodes with a recorded fact.
    pub fn len(&self) -> usize {
        self.in_facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.in_facts.is_empty() && self.out_facts.is_empty()
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }
}

impl<N: Copy + Eq + Hash, F: PartialEq> DataflowResult<N, F> {
    /// Whether both results hold identical facts, ignoring iteration counts.
    pub fn same_facts(&self, other: &Self) -> bool {
        self.in_facts == other.in_facts && self.out_facts == other.out_facts
    }
}
