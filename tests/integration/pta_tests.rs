//! Pointer analysis integration tests.

use brrr_flow::callgraph::{build_cha, CallKind};
use brrr_flow::ir::{
    ClassId, Exp, FieldId, Invoke, MethodId, MethodRef, Program, ProgramBuilder, Stmt, StmtRef,
    Type, VarId,
};
use brrr_flow::pta::{self, ObjId, Pointer, PointerAnalysisResult, Solver};
use brrr_flow::{AnalysisConfig, WorklistOrder};

fn obj_at(result: &PointerAnalysisResult, site: StmtRef) -> ObjId {
    result
        .objects()
        .iter()
        .find(|o| o.site == site)
        .map(|o| o.id)
        .unwrap()
}

fn invoke(
    kind: CallKind,
    class: ClassId,
    subsig: &str,
    receiver: Option<VarId>,
    args: Vec<VarId>,
    result: Option<VarId>,
) -> Stmt {
    Stmt::Invoke(Invoke {
        kind,
        method_ref: MethodRef::new(class, subsig),
        receiver,
        args,
        result,
    })
}

/// Shapes with two implementations of `self`, a container storing a shape
/// in a field, an array, a static field and a static factory.
///
/// ```text
/// interface Shape { Shape self(); }
/// class Circle implements Shape { Shape self() { return this; } }
/// class Square implements Shape { Shape self() { return this; } }
/// class Box { Shape item; }
///
/// static Shape make() { s = new Circle; return s; }
///
/// main:
///  0: c = make()
///  1: q = new Square
///  2: box = new Box
///  3: box.item = q
///  4: r = box.item
///  5: x = r.self()          // interface call, only Square.self
///  6: arr = new Shape[]
///  7: arr[i] = c
///  8: e = arr[i]
///  9: Holder.shared = e
/// 10: g = Holder.shared
/// 11: h = (Shape) g
/// 12: return
/// ```
struct Shapes {
    program: Program,
    main: MethodId,
    circle_self: MethodId,
    square_self: MethodId,
    make: MethodId,
    item: FieldId,
}

fn shapes() -> Shapes {
    let mut b = ProgramBuilder::new();
    let shape = b.add_interface("Shape", &[]);
    let circle = b.add_class("Circle", None, &[shape]);
    let square = b.add_class("Square", None, &[shape]);
    let boxed = b.add_class("Box", None, &[]);
    let holder = b.add_class("Holder", None, &[]);
    let item = b.add_field(boxed, "item", Type::Class(shape), false);
    let shared = b.add_field(holder, "shared", Type::Class(shape), true);

    b.add_abstract_method(shape, "Shape self()");
    let circle_self = b.add_method(circle, "Shape self()", false);
    let square_self = b.add_method(square, "Shape self()", false);
    for m in [circle_self, square_self] {
        let this = b.this_var(m).unwrap();
        b.push_stmt(m, Stmt::Return { value: Some(this) });
    }

    let make = b.add_method(holder, "Shape make()", true);
    let s = b.add_var(make, "s", Type::Class(shape));
    b.push_stmt(make, Stmt::Assign { lhs: s, rhs: Exp::New(Type::Class(circle)) });
    b.push_stmt(make, Stmt::Return { value: Some(s) });

    let main = b.add_method(holder, "void main()", true);
    let shape_ty = Type::Class(shape);
    let c = b.add_var(main, "c", shape_ty.clone());
    let q = b.add_var(main, "q", shape_ty.clone());
    let bx = b.add_var(main, "box", Type::Class(boxed));
    let r = b.add_var(main, "r", shape_ty.clone());
    let x = b.add_var(main, "x", shape_ty.clone());
    let arr = b.add_var(main, "arr", Type::Array(Box::new(shape_ty.clone())));
    let i = b.add_var(main, "i", Type::Int);
    let e = b.add_var(main, "e", shape_ty.clone());
    let g = b.add_var(main, "g", shape_ty.clone());
    let h = b.add_var(main, "h", shape_ty.clone());

    b.push_stmt(main, invoke(CallKind::Static, holder, "Shape make()", None, vec![], Some(c)));
    b.push_stmt(main, Stmt::Assign { lhs: q, rhs: Exp::New(Type::Class(square)) });
    b.push_stmt(main, Stmt::Assign { lhs: bx, rhs: Exp::New(Type::Class(boxed)) });
    b.push_stmt(main, Stmt::StoreField { base: Some(bx), field: item, value: q });
    b.push_stmt(main, Stmt::Assign { lhs: r, rhs: Exp::InstanceField { base: bx, field: item } });
    b.push_stmt(main, invoke(CallKind::Interface, shape, "Shape self()", Some(r), vec![], Some(x)));
    b.push_stmt(main, Stmt::Assign { lhs: arr, rhs: Exp::New(Type::Array(Box::new(shape_ty.clone()))) });
    b.push_stmt(main, Stmt::StoreArray { base: arr, index: i, value: c });
    b.push_stmt(main, Stmt::Assign { lhs: e, rhs: Exp::ArrayAccess { base: arr, index: i } });
    b.push_stmt(main, Stmt::StoreField { base: None, field: shared, value: e });
    b.push_stmt(main, Stmt::Assign { lhs: g, rhs: Exp::StaticField(shared) });
    b.push_stmt(main, Stmt::Assign { lhs: h, rhs: Exp::Cast { ty: shape_ty, operand: g } });
    b.push_stmt(main, Stmt::Return { value: None });
    b.set_entry(main);

    Shapes {
        program: b.build().unwrap(),
        main,
        circle_self,
        square_self,
        make,
        item,
    }
}

fn var(shapes: &Shapes, name: &str) -> VarId {
    shapes.program.find_var(shapes.main, name).unwrap()
}

// =============================================================================
// Points-to Tests
// =============================================================================

#[test]
fn test_field_array_and_static_flow() {
    crate::init_tracing();
    let shapes = shapes();
    let result = pta::analyze(&shapes.program, &AnalysisConfig::default());

    let circle = obj_at(&result, StmtRef::new(shapes.make, 0));
    let square = obj_at(&result, StmtRef::new(shapes.main, 1));
    let boxed = obj_at(&result, StmtRef::new(shapes.main, 2));

    assert_eq!(result.var_points_to(var(&shapes, "c")), vec![circle]);
    assert_eq!(result.var_points_to(var(&shapes, "r")), vec![square]);
    assert_eq!(
        result
            .points_to(&Pointer::InstanceField(boxed, shapes.item))
            .map(|pts| pts.iter().collect::<Vec<_>>()),
        Some(vec![square])
    );
    assert_eq!(result.var_points_to(var(&shapes, "e")), vec![circle]);
    assert_eq!(result.var_points_to(var(&shapes, "g")), vec![circle]);
    assert_eq!(result.var_points_to(var(&shapes, "h")), vec![circle]);
}

#[test]
fn test_on_the_fly_dispatch_is_more_precise_than_cha() {
    let shapes = shapes();
    let result = pta::analyze(&shapes.program, &AnalysisConfig::default());
    let call_site = StmtRef::new(shapes.main, 5);

    assert_eq!(result.call_graph().callees_of(call_site), &[shapes.square_self]);
    assert!(!result.call_graph().contains(shapes.circle_self));

    let cha = build_cha(&shapes.program);
    let mut cha_callees = cha.callees_of(call_site).to_vec();
    cha_callees.sort();
    assert_eq!(cha_callees, {
        let mut expected = vec![shapes.circle_self, shapes.square_self];
        expected.sort();
        expected
    });

    // self() returns its receiver
    let square = obj_at(&result, StmtRef::new(shapes.main, 1));
    assert_eq!(result.var_points_to(var(&shapes, "x")), vec![square]);
}

#[test]
fn test_results_are_order_independent() {
    let shapes = shapes();
    let fifo = pta::analyze(
        &shapes.program,
        &AnalysisConfig::new().with_worklist_order(WorklistOrder::Fifo),
    );
    let lifo = pta::analyze(
        &shapes.program,
        &AnalysisConfig::new().with_worklist_order(WorklistOrder::Lifo),
    );

    for v in 0..shapes.program.var_count() {
        assert_eq!(fifo.var_points_to(VarId(v)), lifo.var_points_to(VarId(v)));
    }
    let mut fifo_edges = fifo.call_graph().edges().to_vec();
    let mut lifo_edges = lifo.call_graph().edges().to_vec();
    fifo_edges.sort();
    lifo_edges.sort();
    assert_eq!(fifo_edges, lifo_edges);
}

#[test]
fn test_reachability_grows_monotonically() {
    crate::init_tracing();
    let shapes = shapes();
    let mut solver = Solver::new(&shapes.program, &AnalysisConfig::default());
    solver.initialize();
    assert!(solver.call_graph().contains(shapes.make));

    let mut previous_reachable = solver.call_graph().reachable_methods().to_vec();
    let mut previous_edges = solver.call_graph().edges().to_vec();
    while solver.step() {
        let reachable = solver.call_graph().reachable_methods();
        let edges = solver.call_graph().edges();
        assert!(reachable.starts_with(&previous_reachable));
        assert!(edges.starts_with(&previous_edges));
        previous_reachable = reachable.to_vec();
        previous_edges = edges.to_vec();
    }
    assert_eq!(solver.pending(), 0);
    assert!(solver.call_graph().contains(shapes.square_self));
}

#[test]
fn test_dynamic_call_is_skipped() {
    let mut b = ProgramBuilder::new();
    let c = b.add_class("C", None, &[]);
    let target = b.add_method(c, "void run()", false);
    let main = b.add_method(c, "void main()", true);
    let o = b.add_var(main, "o", Type::Class(c));
    b.push_stmt(main, Stmt::Assign { lhs: o, rhs: Exp::New(Type::Class(c)) });
    b.push_stmt(main, invoke(CallKind::Dynamic, c, "void run()", Some(o), vec![], None));
    b.set_entry(main);
    let program = b.build().unwrap();

    let result = pta::analyze(&program, &AnalysisConfig::default());
    assert_eq!(result.call_graph().edge_count(), 0);
    assert!(!result.call_graph().contains(target));
}

#[test]
fn test_recursive_calls_terminate() {
    // static A next(A p) { t = next(p); return p; }
    let mut b = ProgramBuilder::new();
    let c = b.add_class("A", None, &[]);
    let next = b.add_method(c, "A next(A)", true);
    let p = b.add_param(next, "p", Type::Class(c));
    let t = b.add_var(next, "t", Type::Class(c));
    b.push_stmt(next, invoke(CallKind::Static, c, "A next(A)", None, vec![p], Some(t)));
    b.push_stmt(next, Stmt::Return { value: Some(p) });
    let main = b.add_method(c, "void main()", true);
    let a = b.add_var(main, "a", Type::Class(c));
    let r = b.add_var(main, "r", Type::Class(c));
    b.push_stmt(main, Stmt::Assign { lhs: a, rhs: Exp::New(Type::Class(c)) });
    b.push_stmt(main, invoke(CallKind::Static, c, "A next(A)", None, vec![a], Some(r)));
    b.set_entry(main);
    let program = b.build().unwrap();

    let result = pta::analyze(&program, &AnalysisConfig::default());
    let obj = obj_at(&result, StmtRef::new(main, 0));
    assert_eq!(result.var_points_to(r), vec![obj]);
    assert_eq!(result.var_points_to(t), vec![obj]);
    assert_eq!(result.call_graph().edge_count(), 2);
}
