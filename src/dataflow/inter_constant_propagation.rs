//! Interprocedural constant propagation.
//!
//! Reuses the intraprocedural lattice and statement transfer. Values cross
//! method boundaries only through call and return edges:
//!
//! | Edge             | Fact carried                                            |
//! |------------------|---------------------------------------------------------|
//! | normal           | source out-fact                                         |
//! | call-to-return   | source out-fact without the call's result variable      |
//! |                  | (result is NAC when the site has no resolved callee)    |
//! | call             | callee parameters bound to the argument values          |
//! | return           | result variable bound to the meet of the return values  |
//!
//! Call nodes themselves are identity: the result variable is defined by the
//! return edge, not by the call statement.

use super::constant_propagation::{ConstantPropagation, CpFact, Value};
use super::inter_solver::InterSolver;
use super::{DataflowResult, InterDataflowAnalysis};
use crate::callgraph::CallGraph;
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::icfg::{Icfg, IcfgEdge, IcfgEdgeKind, IcfgNode};
use crate::ir::Program;

pub struct InterConstantPropagation<'p> {
    program: &'p Program,
    intra: ConstantPropagation<'p>,
}

impl<'p> InterConstantPropagation<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            intra: ConstantPropagation::new(program),
        }
    }
}

impl InterDataflowAnalysis for InterConstantPropagation<'_> {
    type Fact = CpFact;

    fn new_boundary_fact(&self, icfg: &Icfg<'_>, entry: IcfgNode) -> CpFact {
        self.intra
            .boundary_for(self.program.method(icfg.method_of(entry)))
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        ConstantPropagation::meet_facts(fact, target);
    }

    fn transfer_node(&self, icfg: &Icfg<'_>, node: IcfgNode, in_fact: &CpFact, out_fact: &mut CpFact) -> bool {
        if icfg.is_call(node) {
            out_fact.copy_from(in_fact)
        } else {
            self.intra.transfer_stmt(icfg.stmt(node), in_fact, out_fact)
        }
    }

    fn transfer_edge(&self, icfg: &Icfg<'_>, edge: &IcfgEdge, source_out: &CpFact) -> CpFact {
        match edge.kind {
            IcfgEdgeKind::Normal(_) => source_out.clone(),
            IcfgEdgeKind::CallToReturn { call_site } => {
                let mut fact = source_out.clone();
                if let Some(result) = self.program.stmt(call_site).def() {
                    // without a callee no return edge will ever define the result
                    let resolved = icfg
                        .out_edges(edge.from)
                        .any(|e| matches!(e.kind, IcfgEdgeKind::Call { .. }));
                    if resolved || !self.intra.can_hold_int(result) {
                        fact.remove(result);
                    } else {
                        fact.update(result, Value::Nac);
                    }
                }
                fact
            }
            IcfgEdgeKind::Call { call_site, callee } => {
                let mut fact = CpFact::new();
                let Some(invoke) = self.program.stmt(call_site).as_invoke() else {
                    return fact;
                };
                let params = &self.program.method(callee).params;
                for (&arg, &param) in invoke.args.iter().zip(params) {
                    if self.intra.can_hold_int(param) {
                        fact.update(param, source_out.get(arg));
                    }
                }
                fact
            }
            IcfgEdgeKind::Return { call_site, callee } => {
                let mut fact = CpFact::new();
                let result = self.program.stmt(call_site).def();
                if let Some(result) = result.filter(|&r| self.intra.can_hold_int(r)) {
                    let value = self
                        .program
                        .method(callee)
                        .return_vars
                        .iter()
                        .fold(Value::Undef, |acc, &ret| acc.meet(source_out.get(ret)));
                    fact.update(result, value);
                }
                fact
            }
        }
    }
}

/// Build the ICFG of `call_graph` and run interprocedural constant
/// propagation from the program's entry method.
///
/// # Errors
///
/// Propagates CFG construction failures.
pub fn analyze_inter_constants<'p>(
    program: &'p Program,
    call_graph: &CallGraph,
    config: &AnalysisConfig,
) -> Result<(Icfg<'p>, DataflowResult<IcfgNode, CpFact>)> {
    let icfg = Icfg::build(program, call_graph)?;
    let analysis = InterConstantPropagation::new(program);
    let result = InterSolver::new(&analysis).with_config(config).solve(&icfg);
    Ok((icfg, result))
}
