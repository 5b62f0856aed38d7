//! Live variable analysis.
//!
//! A variable is live at a program point if its current value may be read
//! along some path before being redefined.
//!
//! # Equations
//!
//! ```text
//! OUT[n] = ∪ IN[s] for s in succ(n)
//! IN[n]  = use[n] ∪ (OUT[n] - def[n])
//! ```
//!
//! Backward, may analysis: the boundary (exit) fact and the initial fact
//! are both the empty set and meet is union.

use rustc_hash::FxHashSet;

use super::solver::Solver;
use super::{DataflowAnalysis, DataflowResult, Direction};
use crate::cfg::{Cfg, NodeId};
use crate::config::AnalysisConfig;
use crate::ir::VarId;

/// Set of live variables.
pub type LiveVars = FxHashSet<VarId>;

/// Backward liveness over one method.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveVariableAnalysis;

impl DataflowAnalysis for LiveVariableAnalysis {
    type Fact = LiveVars;

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    fn new_boundary_fact(&self, _cfg: &Cfg<'_>) -> LiveVars {
        LiveVars::default()
    }

    fn new_initial_fact(&self) -> LiveVars {
        LiveVars::default()
    }

    fn meet_into(&self, fact: &LiveVars, target: &mut LiveVars) {
        target.extend(fact.iter().copied());
    }

    fn transfer_node(&self, cfg: &Cfg<'_>, node: NodeId, input: &LiveVars, output: &mut LiveVars) -> bool {
        let mut live = input.clone();
        if let Some(stmt) = cfg.stmt(node) {
            if let Some(def) = stmt.def() {
                live.remove(&def);
            }
            live.extend(stmt.uses());
        }
        if live == *output {
            return false;
        }
        *output = live;
        true
    }
}

/// Run liveness over one method's CFG.
pub fn analyze_live_variables(cfg: &Cfg<'_>, config: &AnalysisConfig) -> DataflowResult<NodeId, LiveVars> {
    Solver::new(&LiveVariableAnalysis).with_config(config).solve(cfg)
}
