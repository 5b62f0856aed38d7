//! Intraprocedural dataflow integration tests.

use brrr_flow::cfg::CfgBuilder;
use brrr_flow::dataflow::{
    analyze_constants, analyze_live_variables, detect_dead_code, DeadCodeDetector, Value,
};
use brrr_flow::ir::{BinaryExp, BinaryOp, Exp, MethodId, Program, ProgramBuilder, Stmt, Type};
use brrr_flow::{AnalysisConfig, WorklistOrder};

fn orders() -> [AnalysisConfig; 2] {
    [
        AnalysisConfig::new().with_worklist_order(WorklistOrder::Fifo),
        AnalysisConfig::new().with_worklist_order(WorklistOrder::Lifo),
    ]
}

fn binary(op: BinaryOp, lhs: brrr_flow::ir::VarId, rhs: brrr_flow::ir::VarId) -> Exp {
    Exp::Binary(BinaryExp::new(op, lhs, rhs))
}

/// Nested loops with a conditional increment:
///
/// ```text
///  0: i = 0
///  1: k = 7
///  2: one = 1
///  3: if i >= n goto 10
///  4: j = 0
///  5: if j >= n goto 8
///  6: j = j + one
///  7: goto 5
///  8: i = i + one
///  9: goto 3
/// 10: return k
/// ```
fn nested_loops() -> (Program, MethodId) {
    let mut b = ProgramBuilder::new();
    let c = b.add_class("Loops", None, &[]);
    let m = b.add_method(c, "int run(int)", true);
    let n = b.add_param(m, "n", Type::Int);
    let i = b.add_var(m, "i", Type::Int);
    let j = b.add_var(m, "j", Type::Int);
    let k = b.add_var(m, "k", Type::Int);
    let one = b.add_var(m, "one", Type::Int);
    b.push_stmt(m, Stmt::Assign { lhs: i, rhs: Exp::IntLiteral(0) });
    b.push_stmt(m, Stmt::Assign { lhs: k, rhs: Exp::IntLiteral(7) });
    b.push_stmt(m, Stmt::Assign { lhs: one, rhs: Exp::IntLiteral(1) });
    b.push_stmt(
        m,
        Stmt::If {
            condition: BinaryExp::new(BinaryOp::Ge, i, n),
            target: 10,
        },
    );
    b.push_stmt(m, Stmt::Assign { lhs: j, rhs: Exp::IntLiteral(0) });
    b.push_stmt(
        m,
        Stmt::If {
            condition: BinaryExp::new(BinaryOp::Ge, j, n),
            target: 8,
        },
    );
    b.push_stmt(m, Stmt::Assign { lhs: j, rhs: binary(BinaryOp::Add, j, one) });
    b.push_stmt(m, Stmt::Goto { target: 5 });
    b.push_stmt(m, Stmt::Assign { lhs: i, rhs: binary(BinaryOp::Add, i, one) });
    b.push_stmt(m, Stmt::Goto { target: 3 });
    b.push_stmt(m, Stmt::Return { value: Some(k) });
    (b.build().unwrap(), m)
}

// =============================================================================
// Constant Propagation Tests
// =============================================================================

#[test]
fn test_constant_sum() {
    let mut b = ProgramBuilder::new();
    let c = b.add_class("C", None, &[]);
    let m = b.add_method(c, "void m()", true);
    let x = b.add_var(m, "x", Type::Int);
    let y = b.add_var(m, "y", Type::Int);
    let z = b.add_var(m, "z", Type::Int);
    b.push_stmt(m, Stmt::Assign { lhs: x, rhs: Exp::IntLiteral(1) });
    b.push_stmt(m, Stmt::Assign { lhs: y, rhs: Exp::IntLiteral(2) });
    b.push_stmt(m, Stmt::Assign { lhs: z, rhs: binary(BinaryOp::Add, x, y) });
    let program = b.build().unwrap();
    let cfg = CfgBuilder::for_method(&program, m).unwrap();

    let result = analyze_constants(&program, &cfg, &AnalysisConfig::default());
    let out = result.out_fact(cfg.node_of(2)).unwrap();
    assert_eq!(out.get(x), Value::Constant(1));
    assert_eq!(out.get(y), Value::Constant(2));
    assert_eq!(out.get(z), Value::Constant(3));
}

#[test]
fn test_division_by_zero_is_undef() {
    let mut b = ProgramBuilder::new();
    let c = b.add_class("C", None, &[]);
    let m = b.add_method(c, "void m()", true);
    let x = b.add_var(m, "x", Type::Int);
    let ten = b.add_var(m, "ten", Type::Int);
    let y = b.add_var(m, "y", Type::Int);
    b.push_stmt(m, Stmt::Assign { lhs: x, rhs: Exp::IntLiteral(0) });
    b.push_stmt(m, Stmt::Assign { lhs: ten, rhs: Exp::IntLiteral(10) });
    b.push_stmt(m, Stmt::Assign { lhs: y, rhs: binary(BinaryOp::Div, ten, x) });
    let program = b.build().unwrap();
    let cfg = CfgBuilder::for_method(&program, m).unwrap();

    let result = analyze_constants(&program, &cfg, &AnalysisConfig::default());
    let out = result.out_fact(cfg.exit()).unwrap();
    assert_eq!(out.get(y), Value::Undef, "10 / 0 must be UNDEF, not NAC");
}

#[test]
fn test_loop_constants_are_order_independent() {
    let (program, m) = nested_loops();
    let cfg = CfgBuilder::for_method(&program, m).unwrap();
    let [fifo, lifo] = orders().map(|config| analyze_constants(&program, &cfg, &config));

    assert!(fifo.same_facts(&lifo));
    let exit = fifo.out_fact(cfg.exit()).unwrap();
    assert_eq!(exit.get(program.find_var(m, "k").unwrap()), Value::Constant(7));
    assert_eq!(exit.get(program.find_var(m, "i").unwrap()), Value::Nac);
}

// =============================================================================
// Liveness Tests
// =============================================================================

#[test]
fn test_liveness_is_order_independent() {
    let (program, m) = nested_loops();
    let cfg = CfgBuilder::for_method(&program, m).unwrap();
    let [fifo, lifo] = orders().map(|config| analyze_live_variables(&cfg, &config));

    assert!(fifo.same_facts(&lifo));
    let k = program.find_var(m, "k").unwrap();
    let j = program.find_var(m, "j").unwrap();
    // k is read only at the return but stays live through both loops
    assert!(fifo.out_fact(cfg.node_of(6)).unwrap().contains(&k));
    assert!(!fifo.in_fact(cfg.node_of(4)).unwrap().contains(&j));
}

// =============================================================================
// Dead Code Tests
// =============================================================================

#[test]
fn test_constant_branch_unreachable() {
    crate::init_tracing();
    // if (1 == 1) { a = 1; } else { a = 2; } use(a)
    //
    // 0: one = 1
    // 1: if one == one goto 4
    // 2: a = 2
    // 3: goto 5
    // 4: a = 1
    // 5: return a
    let mut b = ProgramBuilder::new();
    let c = b.add_class("C", None, &[]);
    let m = b.add_method(c, "int m()", true);
    let one = b.add_var(m, "one", Type::Int);
    let a = b.add_var(m, "a", Type::Int);
    b.push_stmt(m, Stmt::Assign { lhs: one, rhs: Exp::IntLiteral(1) });
    b.push_stmt(
        m,
        Stmt::If {
            condition: BinaryExp::new(BinaryOp::Eq, one, one),
            target: 4,
        },
    );
    b.push_stmt(m, Stmt::Assign { lhs: a, rhs: Exp::IntLiteral(2) });
    b.push_stmt(m, Stmt::Goto { target: 5 });
    b.push_stmt(m, Stmt::Assign { lhs: a, rhs: Exp::IntLiteral(1) });
    b.push_stmt(m, Stmt::Return { value: Some(a) });
    let program = b.build().unwrap();

    let report = detect_dead_code(&program, m, &AnalysisConfig::default()).unwrap();
    assert!(report.contains(2), "else branch assignment is unreachable");
    assert!(!report.contains(4), "then branch assignment is reachable");
}

#[test]
fn test_dead_assignment_kinds() {
    // 0: one = 1
    // 1: two = 2
    // 2: x = one + two      dead
    // 3: o = new T          allocation: kept
    // 4: t = (T) o          cast: kept
    // 5: return
    let mut b = ProgramBuilder::new();
    let t = b.add_class("T", None, &[]);
    let m = b.add_method(t, "void m()", true);
    let one = b.add_var(m, "one", Type::Int);
    let two = b.add_var(m, "two", Type::Int);
    let x = b.add_var(m, "x", Type::Int);
    let o = b.add_var(m, "o", Type::Class(t));
    let cast = b.add_var(m, "t", Type::Class(t));
    b.push_stmt(m, Stmt::Assign { lhs: one, rhs: Exp::IntLiteral(1) });
    b.push_stmt(m, Stmt::Assign { lhs: two, rhs: Exp::IntLiteral(2) });
    b.push_stmt(m, Stmt::Assign { lhs: x, rhs: binary(BinaryOp::Add, one, two) });
    b.push_stmt(m, Stmt::Assign { lhs: o, rhs: Exp::New(Type::Class(t)) });
    b.push_stmt(
        m,
        Stmt::Assign {
            lhs: cast,
            rhs: Exp::Cast {
                ty: Type::Class(t),
                operand: o,
            },
        },
    );
    b.push_stmt(m, Stmt::Return { value: None });
    let program = b.build().unwrap();

    let report = detect_dead_code(&program, m, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.dead_assignments, vec![2]);
    assert_eq!(report.dead, vec![2]);
}

#[test]
fn test_unreachable_and_dead_union_is_sorted() {
    // 0: zero = 0
    // 1: if zero != zero goto 4
    // 2: x = zero           dead assignment
    // 3: return
    // 4: y = zero           unreachable
    // 5: return
    let mut b = ProgramBuilder::new();
    let c = b.add_class("C", None, &[]);
    let m = b.add_method(c, "void m()", true);
    let zero = b.add_var(m, "zero", Type::Int);
    let x = b.add_var(m, "x", Type::Int);
    let y = b.add_var(m, "y", Type::Int);
    b.push_stmt(m, Stmt::Assign { lhs: zero, rhs: Exp::IntLiteral(0) });
    b.push_stmt(
        m,
        Stmt::If {
            condition: BinaryExp::new(BinaryOp::Ne, zero, zero),
            target: 4,
        },
    );
    b.push_stmt(m, Stmt::Assign { lhs: x, rhs: Exp::Var(zero) });
    b.push_stmt(m, Stmt::Return { value: None });
    b.push_stmt(m, Stmt::Assign { lhs: y, rhs: Exp::Var(zero) });
    b.push_stmt(m, Stmt::Return { value: None });
    let program = b.build().unwrap();

    let cfg = CfgBuilder::for_method(&program, m).unwrap();
    let constants = analyze_constants(&program, &cfg, &AnalysisConfig::default());
    let live = analyze_live_variables(&cfg, &AnalysisConfig::default());
    let report = DeadCodeDetector::new(&cfg, &constants, &live).detect();

    assert_eq!(report.unreachable, vec![4, 5]);
    // y = zero is also a dead assignment; the union deduplicates it
    assert_eq!(report.dead_assignments, vec![2, 4]);
    assert_eq!(report.dead, vec![2, 4, 5]);
    assert_eq!(report.method, "void m()");
}
