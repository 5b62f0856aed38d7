//! Dead code detection.
//!
//! Combines two independent passes over one method:
//!
//! 1. **Unreachable code**: a traversal from the CFG entry that only follows
//!    branch edges feasible under constant propagation. `if (1 == 1)` never
//!    takes its false edge; a switch on a known constant only takes the
//!    matching case (or the default when no case matches).
//! 2. **Dead assignments**: `x = e` where `x` is not live afterwards and
//!    evaluating `e` cannot have an observable effect.
//!
//! Both passes report statements by program index.

use std::collections::BTreeSet;
use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::constant_propagation::{analyze_constants, evaluate_binary, CpFact, Value};
use super::live_variables::{analyze_live_variables, LiveVars};
use super::DataflowResult;
use crate::cfg::{Cfg, CfgBuilder, CfgEdge, EdgeKind, NodeId};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::ir::{Exp, MethodId, Program, Stmt};

/// Dead statements of one method.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadCodeReport {
    /// Subsignature of the analyzed method.
    pub method: String,
    /// Union of both partitions, sorted and deduplicated.
    pub dead: Vec<usize>,
    /// Statements no feasible path reaches.
    pub unreachable: Vec<usize>,
    /// Side-effect-free assignments to variables that are never read.
    pub dead_assignments: Vec<usize>,
}

impl DeadCodeReport {
    pub fn is_empty(&self) -> bool {
        self.dead.is_empty()
    }

    /// Whether the statement at program index `index` is dead.
    pub fn contains(&self, index: usize) -> bool {
        self.dead.binary_search(&index).is_ok()
    }

    /// Convert to JSON value.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "method": self.method,
            "dead": self.dead,
            "unreachable": self.unreachable,
            "dead_assignments": self.dead_assignments,
        })
    }
}

/// Consumes completed constant-propagation and liveness results for one CFG.
pub struct DeadCodeDetector<'a, 'p> {
    cfg: &'a Cfg<'p>,
    constants: &'a DataflowResult<NodeId, CpFact>,
    live_vars: &'a DataflowResult<NodeId, LiveVars>,
}

impl<'a, 'p> DeadCodeDetector<'a, 'p> {
    pub fn new(
        cfg: &'a Cfg<'p>,
        constants: &'a DataflowResult<NodeId, CpFact>,
        live_vars: &'a DataflowResult<NodeId, LiveVars>,
    ) -> Self {
        Self {
            cfg,
            constants,
            live_vars,
        }
    }

    pub fn detect(&self) -> DeadCodeReport {
        let unreachable = self.unreachable_stmts();
        let dead_assignments = self.dead_assignments();
        let dead: BTreeSet<usize> = unreachable.union(&dead_assignments).copied().collect();

        debug!(
            method = %self.cfg.method().subsignature,
            unreachable = unreachable.len(),
            dead_assignments = dead_assignments.len(),
            "dead code detected"
        );
        DeadCodeReport {
            method: self.cfg.method().subsignature.clone(),
            dead: dead.into_iter().collect(),
            unreachable: unreachable.into_iter().collect(),
            dead_assignments: dead_assignments.into_iter().collect(),
        }
    }

    /// Statements never visited by a traversal along feasible edges.
    fn unreachable_stmts(&self) -> BTreeSet<usize> {
        let cfg = self.cfg;
        let mut visited = FixedBitSet::with_capacity(cfg.node_count());
        let mut queue = VecDeque::new();
        visited.insert(cfg.entry().0);
        queue.push_back(cfg.entry());

        let empty = CpFact::new();
        while let Some(node) = queue.pop_front() {
            let fact = self.constants.in_fact(node).unwrap_or(&empty);
            for edge in cfg.out_edges(node) {
                if !visited.contains(edge.to.0) && self.is_feasible(node, edge, fact) {
                    visited.insert(edge.to.0);
                    queue.push_back(edge.to);
                }
            }
        }

        cfg.nodes()
            .filter(|node| !visited.contains(node.0))
            .filter_map(|node| cfg.stmt_index(node))
            .collect()
    }

    fn is_feasible(&self, node: NodeId, edge: &CfgEdge, fact: &CpFact) -> bool {
        match (self.cfg.stmt(node), edge.kind) {
            (Some(Stmt::If { condition, .. }), EdgeKind::IfTrue) => {
                match evaluate_binary(condition, fact) {
                    Value::Constant(c) => c == 1,
                    _ => true,
                }
            }
            (Some(Stmt::If { condition, .. }), EdgeKind::IfFalse) => {
                match evaluate_binary(condition, fact) {
                    Value::Constant(c) => c == 0,
                    _ => true,
                }
            }
            (Some(Stmt::Switch { var, .. }), EdgeKind::SwitchCase(value)) => {
                match fact.get(*var) {
                    Value::Constant(c) => c == value,
                    _ => true,
                }
            }
            (Some(Stmt::Switch { var, cases, .. }), EdgeKind::SwitchDefault) => {
                match fact.get(*var) {
                    Value::Constant(c) => cases.iter().all(|(value, _)| *value != c),
                    _ => true,
                }
            }
            _ => true,
        }
    }

    /// Assignments whose target is dead after the statement and whose
    /// right-hand side is free of side effects.
    fn dead_assignments(&self) -> BTreeSet<usize> {
        let cfg = self.cfg;
        let mut dead = BTreeSet::new();
        for node in cfg.nodes() {
            let Some(Stmt::Assign { lhs, rhs }) = cfg.stmt(node) else {
                continue;
            };
            let Some(live_out) = self.live_vars.out_fact(node) else {
                continue;
            };
            if !live_out.contains(lhs) && has_no_side_effect(rhs) {
                if let Some(index) = cfg.stmt_index(node) {
                    dead.insert(index);
                }
            }
        }
        dead
    }
}

/// Whether evaluating `exp` can neither touch the heap nor fault.
///
/// Allocation touches the heap; casts, field and array accesses (array
/// length included) may throw; integer division and remainder may divide
/// by zero.
pub fn has_no_side_effect(exp: &Exp) -> bool {
    match exp {
        Exp::New(_)
        | Exp::Cast { .. }
        | Exp::InstanceField { .. }
        | Exp::StaticField(_)
        | Exp::ArrayAccess { .. }
        | Exp::ArrayLength(_) => false,
        Exp::Binary(binary) => !binary.op.is_division(),
        Exp::Var(_) | Exp::IntLiteral(_) | Exp::NullLiteral | Exp::StringLiteral(_) => true,
    }
}

/// Build the CFG of `method`, run constant propagation and liveness over
/// it and report its dead code.
///
/// # Errors
///
/// Propagates CFG construction failures.
pub fn detect_dead_code(
    program: &Program,
    method: MethodId,
    config: &AnalysisConfig,
) -> Result<DeadCodeReport> {
    let cfg = CfgBuilder::for_method(program, method)?;
    let constants = analyze_constants(program, &cfg, config);
    let live_vars = analyze_live_variables(&cfg, config);
    Ok(DeadCodeDetector::new(&cfg, &constants, &live_vars).detect())
}
