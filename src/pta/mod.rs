//! Context-insensitive, flow-insensitive pointer analysis.
//!
//! Computes, for every variable, static field, instance field and array
//! pointer, the set of abstract heap objects it may reference, while
//! discovering the call graph on the fly: a virtual call is resolved only
//! against the objects its receiver is actually found to point to.
//!
//! # Modules
//!
//! - [`heap`]: abstract objects and the heap model
//! - [`pointer`]: pointer kinds and points-to sets
//! - [`pfg`]: the pointer flow graph
//! - [`worklist`]: pending propagations
//! - [`solver`]: the fixpoint solver
//!
//! # Example
//!
//! ```ignore
//! use brrr_flow::config::AnalysisConfig;
//! use brrr_flow::pta;
//!
//! let result = pta::analyze(&program, &AnalysisConfig::default());
//! for edge in result.call_graph().edges() {
//!     println!("{:?} -> {:?}", edge.call_site, edge.callee);
//! }
//! ```

pub mod heap;
pub mod pfg;
pub mod pointer;
pub mod solver;
pub mod worklist;

pub use heap::{AllocationSiteHeap, HeapModel, Obj, ObjId};
pub use pfg::PointerFlowGraph;
pub use pointer::{Pointer, PointerId, PointsToSet};
pub use solver::Solver;
pub use worklist::WorkList;

use crate::callgraph::CallGraph;
use crate::config::AnalysisConfig;
use crate::ir::{Program, VarId};

/// Points-to sets and call graph at fixpoint.
#[derive(Debug, Clone)]
pub struct PointerAnalysisResult {
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    objects: Vec<Obj>,
}

impl PointerAnalysisResult {
    pub(crate) fn new(pfg: PointerFlowGraph, call_graph: CallGraph, objects: Vec<Obj>) -> Self {
        Self {
            pfg,
            call_graph,
            objects,
        }
    }

    /// Points-to set of `pointer`; `None` if the analysis never saw it.
    pub fn points_to(&self, pointer: &Pointer) -> Option<&PointsToSet> {
        self.pfg.lookup(pointer).map(|id| self.pfg.points_to(id))
    }

    /// Objects `var` may point to, in id order. Empty for unseen variables.
    pub fn var_points_to(&self, var: VarId) -> Vec<ObjId> {
        self.points_to(&Pointer::Var(var))
            .map(|pts| pts.iter().collect())
            .unwrap_or_default()
    }

    /// Whether two variables may reference a common object.
    pub fn may_alias(&self, a: VarId, b: VarId) -> bool {
        match (self.points_to(&Pointer::Var(a)), self.points_to(&Pointer::Var(b))) {
            (Some(pa), Some(pb)) => pa.iter().any(|obj| pb.contains(obj)),
            _ => false,
        }
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn objects(&self) -> &[Obj] {
        &self.objects
    }

    pub fn obj(&self, id: ObjId) -> &Obj {
        &self.objects[id.0]
    }

    /// Convert to JSON value. Pointers with empty sets are omitted.
    pub fn to_json(&self) -> serde_json::Value {
        let points_to: Vec<serde_json::Value> = self
            .pfg
            .pointers()
            .filter(|(id, _)| !self.pfg.points_to(*id).is_empty())
            .map(|(id, pointer)| {
                let objs: Vec<ObjId> = self.pfg.points_to(id).iter().collect();
                serde_json::json!({ "pointer": pointer, "objects": objs })
            })
            .collect();
        serde_json::json!({
            "objects": self.objects,
            "points_to": points_to,
            "call_graph": self.call_graph,
        })
    }
}

/// Run the pointer analysis from the program's entry method with one
/// abstract object per allocation site.
pub fn analyze(program: &Program, config: &AnalysisConfig) -> PointerAnalysisResult {
    Solver::new(program, config).solve()
}
