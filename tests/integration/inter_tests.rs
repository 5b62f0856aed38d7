//! Interprocedural analysis integration tests.

use brrr_flow::callgraph::build_cha;
use brrr_flow::dataflow::{analyze_inter_constants, Value};
use brrr_flow::icfg::{Icfg, IcfgEdgeKind};
use brrr_flow::ir::{
    BinaryExp, BinaryOp, CallKind, ClassId, Exp, Invoke, MethodId, MethodRef, Program,
    ProgramBuilder, Stmt, StmtRef, Type, VarId,
};
use brrr_flow::{pta, AnalysisConfig, WorklistOrder};

fn static_call(class: ClassId, subsignature: &str, args: Vec<VarId>, result: Option<VarId>) -> Stmt {
    Stmt::Invoke(Invoke {
        kind: CallKind::Static,
        method_ref: MethodRef::new(class, subsignature),
        receiver: None,
        args,
        result,
    })
}

/// ```text
/// main:  a = 3; b = 4
///        s = add(a, b)      // 7
///        t = inc(s)         // 8
///        return
/// add:   r = x + y; return r
/// inc:   one = 1; r = v + one; return r
/// ```
fn calls() -> (Program, MethodId) {
    let mut b = ProgramBuilder::new();
    let c = b.add_class("Calls", None, &[]);
    let main = b.add_method(c, "void main()", true);
    let add = b.add_method(c, "int add(int,int)", true);
    let inc = b.add_method(c, "int inc(int)", true);

    let a = b.add_var(main, "a", Type::Int);
    let bv = b.add_var(main, "b", Type::Int);
    let s = b.add_var(main, "s", Type::Int);
    let t = b.add_var(main, "t", Type::Int);
    b.push_stmt(main, Stmt::Assign { lhs: a, rhs: Exp::IntLiteral(3) });
    b.push_stmt(main, Stmt::Assign { lhs: bv, rhs: Exp::IntLiteral(4) });
    b.push_stmt(main, static_call(c, "int add(int,int)", vec![a, bv], Some(s)));
    b.push_stmt(main, static_call(c, "int inc(int)", vec![s], Some(t)));
    b.push_stmt(main, Stmt::Return { value: None });

    let x = b.add_param(add, "x", Type::Int);
    let y = b.add_param(add, "y", Type::Int);
    let r = b.add_var(add, "r", Type::Int);
    b.push_stmt(
        add,
        Stmt::Assign {
            lhs: r,
            rhs: Exp::Binary(BinaryExp::new(BinaryOp::Add, x, y)),
        },
    );
    b.push_stmt(add, Stmt::Return { value: Some(r) });

    let v = b.add_param(inc, "v", Type::Int);
    let one = b.add_var(inc, "one", Type::Int);
    let r = b.add_var(inc, "r", Type::Int);
    b.push_stmt(inc, Stmt::Assign { lhs: one, rhs: Exp::IntLiteral(1) });
    b.push_stmt(
        inc,
        Stmt::Assign {
            lhs: r,
            rhs: Exp::Binary(BinaryExp::new(BinaryOp::Add, v, one)),
        },
    );
    b.push_stmt(inc, Stmt::Return { value: Some(r) });

    b.set_entry(main);
    (b.build().unwrap(), main)
}

#[test]
fn test_constants_flow_through_calls() {
    crate::init_tracing();
    let (program, main) = calls();
    let cg = build_cha(&program);
    let (icfg, result) = analyze_inter_constants(&program, &cg, &AnalysisConfig::default()).unwrap();

    let exit = icfg.exit_of(main).unwrap();
    let fact = result.in_fact(exit).unwrap();
    assert_eq!(fact.get(program.find_var(main, "s").unwrap()), Value::Constant(7));
    assert_eq!(fact.get(program.find_var(main, "t").unwrap()), Value::Constant(8));

    // a and b bypass the callee through the call-to-return edge
    assert_eq!(fact.get(program.find_var(main, "a").unwrap()), Value::Constant(3));
}

#[test]
fn test_call_edge_passes_only_arguments() {
    let (program, main) = calls();
    let cg = build_cha(&program);
    let (icfg, result) = analyze_inter_constants(&program, &cg, &AnalysisConfig::default()).unwrap();

    let add = program.find_method("Calls", "add").unwrap();
    let entry = result.out_fact(icfg.entry_of(add).unwrap()).unwrap();
    assert_eq!(entry.get(program.find_var(add, "x").unwrap()), Value::Constant(3));
    assert_eq!(entry.get(program.find_var(main, "a").unwrap()), Value::Undef);
    assert_eq!(entry.len(), 2);
}

#[test]
fn test_inter_order_independent() {
    let (program, _) = calls();
    let cg = build_cha(&program);
    let fifo_config = AnalysisConfig::new().with_worklist_order(WorklistOrder::Fifo);
    let lifo_config = AnalysisConfig::new().with_worklist_order(WorklistOrder::Lifo);
    let (_, fifo) = analyze_inter_constants(&program, &cg, &fifo_config).unwrap();
    let (_, lifo) = analyze_inter_constants(&program, &cg, &lifo_config).unwrap();
    assert!(fifo.same_facts(&lifo));
}

#[test]
fn test_icfg_over_pointer_analysis_call_graph() {
    // main: o = new B; o.m()     where A.m and B.m both exist
    let mut b = ProgramBuilder::new();
    let class_a = b.add_class("A", None, &[]);
    let class_b = b.add_class("B", Some(class_a), &[]);
    let a_m = b.add_method(class_a, "void m()", false);
    let b_m = b.add_method(class_b, "void m()", false);
    let main = b.add_method(class_a, "void main()", true);
    let o = b.add_var(main, "o", Type::Class(class_a));
    b.push_stmt(main, Stmt::Assign { lhs: o, rhs: Exp::New(Type::Class(class_b)) });
    b.push_stmt(
        main,
        Stmt::Invoke(Invoke {
            kind: CallKind::Virtual,
            method_ref: MethodRef::new(class_a, "void m()"),
            receiver: Some(o),
            args: Vec::new(),
            result: None,
        }),
    );
    b.set_entry(main);
    let program = b.build().unwrap();

    let cha_icfg = Icfg::build(&program, &build_cha(&program)).unwrap();
    assert!(cha_icfg.cfg(a_m).is_some());

    let result = pta::analyze(&program, &AnalysisConfig::default());
    let icfg = Icfg::build(&program, result.call_graph()).unwrap();
    assert!(icfg.cfg(a_m).is_none());
    assert!(icfg.cfg(b_m).is_some());

    let call = icfg.stmt_node(StmtRef::new(main, 1)).unwrap();
    let callees: Vec<_> = icfg
        .out_edges(call)
        .filter_map(|e| match e.kind {
            IcfgEdgeKind::Call { callee, .. } => Some(callee),
            _ => None,
        })
        .collect();
    assert_eq!(callees, vec![b_m]);
}
