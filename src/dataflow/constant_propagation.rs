//! Constant propagation over 32-bit integer variables.
//!
//! Forward analysis on the flat lattice
//!
//! ```text
//!            Undef
//!      ... -1  0  1  2 ...
//!             NAC
//! ```
//!
//! `Undef` is the identity of meet and `NAC` (not a constant) absorbs
//! everything. Two different constants meet to `NAC`.
//!
//! Only variables whose declared type can hold an `int` (`boolean`, `byte`,
//! `short`, `char`, `int`) are tracked. Arithmetic follows two's complement
//! 32-bit semantics: overflow wraps and shift distances are masked to their
//! low five bits.
//!
//! # Example
//!
//! ```text
//! x = 1
//! y = 2
//! z = x + y        // z = 3
//! if p > 0 goto L  // p is a parameter: NAC
//! w = z / 0        // w = UNDEF (division by constant zero)
//! ```

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::solver::Solver;
use super::{DataflowAnalysis, DataflowResult, Direction};
use crate::cfg::{Cfg, NodeId};
use crate::config::AnalysisConfig;
use crate::ir::{BinaryExp, BinaryOp, Exp, Method, Program, Stmt, VarId};

// =============================================================================
// Lattice
// =============================================================================

/// Abstract value of an integer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// No definition seen yet.
    #[default]
    Undef,
    Constant(i32),
    /// Not a constant.
    Nac,
}

impl Value {
    #[inline]
    pub fn is_undef(self) -> bool {
        matches!(self, Value::Undef)
    }

    #[inline]
    pub fn is_constant(self) -> bool {
        matches!(self, Value::Constant(_))
    }

    #[inline]
    pub fn is_nac(self) -> bool {
        matches!(self, Value::Nac)
    }

    #[inline]
    pub fn as_constant(self) -> Option<i32> {
        match self {
            Value::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Lattice meet.
    ///
    /// - `NAC ⊓ v = NAC`
    /// - `Undef ⊓ v = v`
    /// - `c ⊓ c = c`
    /// - `c1 ⊓ c2 = NAC` when `c1 != c2`
    #[must_use]
    pub fn meet(self, other: Value) -> Value {
        match (self, other) {
            (Value::Nac, _) | (_, Value::Nac) => Value::Nac,
            (Value::Undef, v) | (v, Value::Undef) => v,
            (Value::Constant(a), Value::Constant(b)) if a == b => Value::Constant(a),
            (Value::Constant(_), Value::Constant(_)) => Value::Nac,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undef => write!(f, "UNDEF"),
            Value::Constant(c) => write!(f, "{c}"),
            Value::Nac => write!(f, "NAC"),
        }
    }
}

/// Map from variable to [`Value`]. Absent variables are `Undef`; the map
/// never stores `Undef` explicitly, so structural equality is lattice
/// equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpFact {
    values: FxHashMap<VarId, Value>,
}

impl CpFact {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `var`, `Undef` if never bound.
    #[inline]
    pub fn get(&self, var: VarId) -> Value {
        self.values.get(&var).copied().unwrap_or(Value::Undef)
    }

    /// Bind `var` to `value`; binding `Undef` removes the entry.
    /// Returns `true` if the fact changed.
    pub fn update(&mut self, var: VarId, value: Value) -> bool {
        if value.is_undef() {
            self.values.remove(&var).is_some()
        } else {
            self.values.insert(var, value) != Some(value)
        }
    }

    pub fn remove(&mut self, var: VarId) -> bool {
        self.values.remove(&var).is_some()
    }

    /// Replace the contents with `other`; returns `true` if anything changed.
    pub fn copy_from(&mut self, other: &CpFact) -> bool {
        if self == other {
            return false;
        }
        self.values.clone_from(&other.values);
        true
    }

    /// Bound variables and their values, in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, Value)> + '_ {
        self.values.iter().map(|(var, value)| (*var, *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for CpFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by_key(|(var, _)| *var);
        write!(f, "{{")?;
        for (i, (var, value)) in entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "v{}={}", var.0, value)?;
        }
        write!(f, "}}")
    }
}

// =============================================================================
// Analysis
// =============================================================================

/// Intraprocedural constant propagation.
pub struct ConstantPropagation<'p> {
    program: &'p Program,
}

impl<'p> ConstantPropagation<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self { program }
    }

    /// Whether values of `var` are tracked.
    #[inline]
    pub fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.can_hold_int()
    }

    /// Entry fact of `method`: every int-like parameter is `NAC`.
    pub fn boundary_for(&self, method: &Method) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &method.params {
            if self.can_hold_int(param) {
                fact.update(param, Value::Nac);
            }
        }
        fact
    }

    /// Pointwise meet of `fact` into `target`.
    pub fn meet_facts(fact: &CpFact, target: &mut CpFact) {
        for (var, value) in fact.iter() {
            let met = value.meet(target.get(var));
            target.update(var, met);
        }
    }

    /// Transfer for a single statement; `None` stands for entry/exit nodes,
    /// which act as identity.
    pub(crate) fn transfer_stmt(&self, stmt: Option<&Stmt>, input: &CpFact, output: &mut CpFact) -> bool {
        let mut fact = input.clone();
        match stmt {
            Some(Stmt::Assign { lhs, rhs }) if self.can_hold_int(*lhs) => {
                let value = evaluate(rhs, input);
                fact.update(*lhs, value);
            }
            Some(Stmt::Invoke(invoke)) => {
                if let Some(result) = invoke.result.filter(|&r| self.can_hold_int(r)) {
                    fact.update(result, Value::Nac);
                }
            }
            _ => {}
        }
        output.copy_from(&fact)
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CpFact;

    fn direction(&self) -> Direction {
        Direction::Forward
    }

    fn new_boundary_fact(&self, cfg: &Cfg<'_>) -> CpFact {
        self.boundary_for(cfg.method())
    }

    fn new_initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        Self::meet_facts(fact, target);
    }

    fn transfer_node(&self, cfg: &Cfg<'_>, node: NodeId, input: &CpFact, output: &mut CpFact) -> bool {
        self.transfer_stmt(cfg.stmt(node), input, output)
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Abstract value of `exp` under `fact`.
///
/// Variables and integer literals evaluate directly, binary expressions are
/// folded and everything else (field/array loads, casts, allocations,
/// strings, `null`) is `NAC`.
pub fn evaluate(exp: &Exp, fact: &CpFact) -> Value {
    match exp {
        Exp::Var(var) => fact.get(*var),
        Exp::IntLiteral(i) => Value::Constant(*i),
        Exp::Binary(binary) => evaluate_binary(binary, fact),
        _ => Value::Nac,
    }
}

/// Fold a binary expression.
///
/// A `NAC` operand makes the result `NAC`, except that `NAC / 0` and
/// `NAC % 0` are `Undef`. Otherwise an `Undef` operand makes the result
/// `Undef`.
pub fn evaluate_binary(exp: &BinaryExp, fact: &CpFact) -> Value {
    let lhs = fact.get(exp.lhs);
    let rhs = fact.get(exp.rhs);

    if lhs.is_nac() || rhs.is_nac() {
        if lhs.is_nac() && rhs == Value::Constant(0) && exp.op.is_division() {
            return Value::Undef;
        }
        return Value::Nac;
    }
    match (lhs, rhs) {
        (Value::Constant(a), Value::Constant(b)) => fold(exp.op, a, b),
        _ => Value::Undef,
    }
}

fn fold(op: BinaryOp, a: i32, b: i32) -> Value {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => return Value::Undef,
        BinaryOp::Div => a.wrapping_div(b),
        BinaryOp::Rem => a.wrapping_rem(b),
        BinaryOp::Eq => i32::from(a == b),
        BinaryOp::Ne => i32::from(a != b),
        BinaryOp::Lt => i32::from(a < b),
        BinaryOp::Gt => i32::from(a > b),
        BinaryOp::Le => i32::from(a <= b),
        BinaryOp::Ge => i32::from(a >= b),
        // wrapping_sh* masks the distance to the low five bits
        BinaryOp::Shl => a.wrapping_shl(b as u32),
        BinaryOp::Shr => a.wrapping_shr(b as u32),
        BinaryOp::Ushr => (a as u32).wrapping_shr(b as u32) as i32,
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
    };
    Value::Constant(value)
}

/// Run constant propagation over one method's CFG.
pub fn analyze_constants(
    program: &Program,
    cfg: &Cfg<'_>,
    config: &AnalysisConfig,
) -> DataflowResult<NodeId, CpFact> {
    let analysis = ConstantPropagation::new(program);
    Solver::new(&analysis).with_config(config).solve(cfg)
}
