//! Andersen-style pointer analysis with on-the-fly call graph construction.
//!
//! # Algorithm
//!
//! ```text
//! add_reachable(entry)
//! while worklist not empty:
//!     (p, pts) = pop
//!     delta = propagate(p, pts)
//!     if p is a variable x:
//!         for o in delta:
//!             wire x.f / x[i] loads and stores through o.f / o[*]
//!             process_call(x, o)
//! ```
//!
//! A method's statements are scanned once, when it becomes reachable.
//! Copies, static field accesses and static calls become PFG edges right
//! away; allocations seed the worklist. Instance field and array accesses,
//! as well as instance calls, depend on what the base variable points to
//! and are handled as objects arrive.
//!
//! Points-to sets, PFG edges, reachable methods and call edges only grow,
//! and all are bounded by the program size, so the worklist drains.

use tracing::{debug, trace, warn};

use super::heap::{AllocationSiteHeap, HeapModel, ObjId};
use super::pfg::PointerFlowGraph;
use super::pointer::{Pointer, PointerId, PointsToSet};
use super::worklist::WorkList;
use super::PointerAnalysisResult;
use crate::callgraph::{CallEdge, CallGraph, CallKind};
use crate::config::AnalysisConfig;
use crate::ir::{Exp, Invoke, MethodId, Program, Stmt, StmtRef, VarId};

/// Whole-program pointer analysis state for one run.
pub struct Solver<'p, H = AllocationSiteHeap> {
    program: &'p Program,
    heap: H,
    pfg: PointerFlowGraph,
    call_graph: CallGraph,
    worklist: WorkList,
    initialized: bool,
}

impl<'p> Solver<'p, AllocationSiteHeap> {
    /// Solver over the allocation-site heap abstraction.
    pub fn new(program: &'p Program, config: &AnalysisConfig) -> Self {
        Self::with_heap(program, AllocationSiteHeap::new(program), config)
    }
}

impl<'p, H: HeapModel> Solver<'p, H> {
    pub fn with_heap(program: &'p Program, heap: H, config: &AnalysisConfig) -> Self {
        Self {
            program,
            heap,
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: WorkList::new(config.worklist_order),
            initialized: false,
        }
    }

    /// Make the entry method reachable. Idempotent; a program without an
    /// entry method leaves everything empty.
    pub fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        self.initialized = true;
        match self.program.entry() {
            Some(entry) => {
                self.call_graph.add_entry_method(entry);
                self.add_reachable(entry);
            }
            None => debug!("no entry method; pointer analysis is empty"),
        }
    }

    /// Process one worklist entry. Returns `false` once the worklist is
    /// empty.
    pub fn step(&mut self) -> bool {
        self.initialize();
        let Some((pointer, pts)) = self.worklist.pop() else {
            return false;
        };
        let delta = self.propagate(pointer, &pts);
        if let Pointer::Var(var) = *self.pfg.pointer(pointer) {
            for obj in delta.iter() {
                self.process_instance_access(var, obj);
                self.process_call(var, obj);
            }
        }
        true
    }

    /// Run to fixpoint.
    pub fn solve(mut self) -> PointerAnalysisResult {
        self.initialize();
        let mut steps = 0usize;
        while self.step() {
            steps += 1;
        }
        debug!(
            steps,
            pointers = self.pfg.pointer_count(),
            pfg_edges = self.pfg.edge_count(),
            reachable = self.call_graph.reachable_count(),
            call_edges = self.call_graph.edge_count(),
            "pointer analysis finished"
        );
        self.into_result()
    }

    pub fn into_result(self) -> PointerAnalysisResult {
        PointerAnalysisResult::new(self.pfg, self.call_graph, self.heap.objects().to_vec())
    }

    pub fn call_graph(&self) -> &CallGraph {
        &self.call_graph
    }

    pub fn pointer_flow_graph(&self) -> &PointerFlowGraph {
        &self.pfg
    }

    pub fn heap(&self) -> &H {
        &self.heap
    }

    pub fn pending(&self) -> usize {
        self.worklist.len()
    }

    // =========================================================================
    // Reachability
    // =========================================================================

    fn add_reachable(&mut self, method: MethodId) {
        if !self.call_graph.add_reachable_method(method) {
            return;
        }
        trace!(method = %self.program.method(method).subsignature, "method reachable");

        let program = self.program;
        for (index, stmt) in program.method(method).stmts.iter().enumerate() {
            let site = StmtRef::new(method, index);
            match stmt {
                Stmt::Assign { lhs, rhs } => match rhs {
                    Exp::Var(source) | Exp::Cast { operand: source, .. } => {
                        self.add_pfg_edge(Pointer::Var(*source), Pointer::Var(*lhs));
                    }
                    Exp::New(_) => {
                        if let Some(obj) = self.heap.obj_at(site) {
                            let target = self.pfg.get_or_create(Pointer::Var(*lhs));
                            self.worklist.add_entry(target, PointsToSet::singleton(obj));
                        }
                    }
                    Exp::StaticField(field) => {
                        self.add_pfg_edge(Pointer::StaticField(*field), Pointer::Var(*lhs));
                    }
                    _ => {}
                },
                Stmt::StoreField {
                    base: None,
                    field,
                    value,
                } => {
                    self.add_pfg_edge(Pointer::Var(*value), Pointer::StaticField(*field));
                }
                Stmt::Invoke(invoke) if invoke.kind == CallKind::Static => {
                    let Some(callee) = program.resolve_callee(None, invoke) else {
                        trace!(site = ?site, "unresolved static call");
                        continue;
                    };
                    if self.call_graph.add_edge(CallEdge::new(CallKind::Static, site, callee)) {
                        self.add_reachable(callee);
                        self.connect_call(invoke, callee);
                    }
                }
                _ => {}
            }
        }
    }

    // =========================================================================
    // Propagation
    // =========================================================================

    /// Add `source -> target` and push `source`'s current objects along it.
    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
        let source = self.pfg.get_or_create(source);
        let target = self.pfg.get_or_create(target);
        if self.pfg.add_edge(source, target) {
            let pts = self.pfg.points_to(source);
            if !pts.is_empty() {
                self.worklist.add_entry(target, pts.clone());
            }
        }
    }

    /// Merge `pts` into `pointer`'s set and forward the new objects to its
    /// successors. Returns the new objects.
    fn propagate(&mut self, pointer: PointerId, pts: &PointsToSet) -> PointsToSet {
        let delta = pts.difference(self.pfg.points_to(pointer));
        if delta.is_empty() {
            return delta;
        }
        self.pfg.points_to_mut(pointer).union_with(&delta);
        for &succ in self.pfg.successors(pointer) {
            self.worklist.add_entry(succ, delta.clone());
        }
        delta
    }

    /// Wire the field and array accesses on `var` in reachable methods
    /// through the corresponding pointers of `obj`.
    fn process_instance_access(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        let related = program.related_stmts(var);
        let reachable = |site: &&StmtRef| self.call_graph.contains(site.method);

        let stores: Vec<StmtRef> = related.store_fields.iter().filter(reachable).copied().collect();
        let loads: Vec<StmtRef> = related.load_fields.iter().filter(reachable).copied().collect();
        let array_stores: Vec<StmtRef> = related.store_arrays.iter().filter(reachable).copied().collect();
        let array_loads: Vec<StmtRef> = related.load_arrays.iter().filter(reachable).copied().collect();

        for site in stores {
            if let Stmt::StoreField { field, value, .. } = program.stmt(site) {
                self.add_pfg_edge(Pointer::Var(*value), Pointer::InstanceField(obj, *field));
            }
        }
        for site in loads {
            if let Stmt::Assign {
                lhs,
                rhs: Exp::InstanceField { field, .. },
            } = program.stmt(site)
            {
                self.add_pfg_edge(Pointer::InstanceField(obj, *field), Pointer::Var(*lhs));
            }
        }
        for site in array_stores {
            if let Stmt::StoreArray { value, .. } = program.stmt(site) {
                self.add_pfg_edge(Pointer::Var(*value), Pointer::ArrayIndex(obj));
            }
        }
        for site in array_loads {
            if let Stmt::Assign { lhs, .. } = program.stmt(site) {
                self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(*lhs));
            }
        }
    }

    /// Resolve every reachable call on receiver `var` against `obj`.
    ///
    /// Newly discovered callees are buffered and made reachable only after
    /// the scan, so the reachable set is not extended mid-iteration.
    fn process_call(&mut self, var: VarId, obj: ObjId) {
        let program = self.program;
        let mut discovered = Vec::new();

        for &site in &program.related_stmts(var).invokes {
            if !self.call_graph.contains(site.method) {
                continue;
            }
            let Some(invoke) = program.stmt(site).as_invoke() else {
                continue;
            };
            let receiver_type = &self.heap.obj(obj).ty;
            let Some(callee) = program.resolve_callee(Some(receiver_type), invoke) else {
                trace!(site = ?site, kind = ?invoke.kind, "unresolved call");
                continue;
            };

            if let Some(this) = program.method(callee).this {
                let this = self.pfg.get_or_create(Pointer::Var(this));
                self.worklist.add_entry(this, PointsToSet::singleton(obj));
            }
            if self.call_graph.add_edge(CallEdge::new(invoke.kind, site, callee)) {
                self.connect_call(invoke, callee);
                discovered.push(callee);
            }
        }

        for callee in discovered {
            self.add_reachable(callee);
        }
    }

    /// Arguments flow into parameters; return values flow into the result.
    fn connect_call(&mut self, invoke: &Invoke, callee: MethodId) {
        let program = self.program;
        let callee = program.method(callee);
        if invoke.args.len() != callee.params.len() {
            warn!(
                callee = %callee.subsignature,
                args = invoke.args.len(),
                params = callee.params.len(),
                "argument count does not match parameter count"
            );
        }
        for (&arg, &param) in invoke.args.iter().zip(&callee.params) {
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
        }
        if let Some(result) = invoke.result {
            for &ret in &callee.return_vars {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(result));
            }
        }
    }
}
