//! Three-address program representation consumed by every analysis.
//!
//! A [`Program`] is the immutable "world": classes, methods, variables,
//! fields and the designated entry method. It is built once through
//! [`ProgramBuilder`] and then shared by reference with every solver.
//!
//! # Modules
//!
//! - [`builder`]: incremental construction and validation
//! - [`hierarchy`]: subtype indices, method dispatch and callee resolution

pub mod builder;
pub mod hierarchy;

pub use builder::ProgramBuilder;
pub use hierarchy::ClassHierarchy;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

pub use crate::callgraph::CallKind;

// =============================================================================
// Identifiers
// =============================================================================

/// Dense identifier of a method in a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub usize);

/// Dense identifier of a variable. Variables are scoped to one method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub usize);

/// Dense identifier of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub usize);

/// Dense identifier of a class or interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub usize);

/// A statement, addressed by its method and its program index in that method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtRef {
    pub method: MethodId,
    pub index: usize,
}

impl StmtRef {
    #[inline]
    pub fn new(method: MethodId, index: usize) -> Self {
        Self { method, index }
    }
}

// =============================================================================
// Types
// =============================================================================

/// Static type of a variable, field or allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
    Void,
    Null,
    Class(ClassId),
    Array(Box<Type>),
}

impl Type {
    /// Whether values of this type fit the integer constant lattice.
    #[must_use]
    pub fn can_hold_int(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Byte | Type::Short | Type::Char | Type::Int
        )
    }

    /// Whether this is a reference type (class, array or null).
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Class(_) | Type::Array(_) | Type::Null)
    }
}

// =============================================================================
// Expressions
// =============================================================================

/// Binary operators of the three-address IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Condition
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    // Shift
    Shl,
    Shr,
    Ushr,
    // Bitwise
    And,
    Or,
    Xor,
}

impl BinaryOp {
    /// Division and remainder may fault on a zero divisor.
    #[inline]
    #[must_use]
    pub fn is_division(self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }

    #[inline]
    #[must_use]
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    /// Source-level spelling of the operator.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }
}

/// `lhs op rhs` over two variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BinaryExp {
    pub op: BinaryOp,
    pub lhs: VarId,
    pub rhs: VarId,
}

impl BinaryExp {
    #[inline]
    pub fn new(op: BinaryOp, lhs: VarId, rhs: VarId) -> Self {
        Self { op, lhs, rhs }
    }
}

/// Right-hand side of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exp {
    /// Plain variable (`x = y` is a copy).
    Var(VarId),
    IntLiteral(i32),
    NullLiteral,
    StringLiteral(String),
    Binary(BinaryExp),
    /// Object or array allocation; each occurrence is one allocation site.
    New(Type),
    Cast { ty: Type, operand: VarId },
    InstanceField { base: VarId, field: FieldId },
    StaticField(FieldId),
    ArrayAccess { base: VarId, index: VarId },
    ArrayLength(VarId),
}

impl Exp {
    /// Variables read when evaluating this expression.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Exp::Var(v) | Exp::ArrayLength(v) => vec![*v],
            Exp::Binary(b) => vec![b.lhs, b.rhs],
            Exp::Cast { operand, .. } => vec![*operand],
            Exp::InstanceField { base, .. } => vec![*base],
            Exp::ArrayAccess { base, index } => vec![*base, *index],
            Exp::IntLiteral(_)
            | Exp::NullLiteral
            | Exp::StringLiteral(_)
            | Exp::New(_)
            | Exp::StaticField(_) => Vec::new(),
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

/// Reference to a method through its declaring class and subsignature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodRef {
    pub class: ClassId,
    pub subsignature: String,
}

impl MethodRef {
    pub fn new(class: ClassId, subsignature: impl Into<String>) -> Self {
        Self {
            class,
            subsignature: subsignature.into(),
        }
    }
}

/// A call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: CallKind,
    pub method_ref: MethodRef,
    /// Receiver variable; `None` for static calls.
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    /// Variable receiving the return value, if the result is used.
    pub result: Option<VarId>,
}

/// Statement of the three-address IR.
///
/// Jump targets are program indices within the same method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    Nop,
    /// `lhs = rhs`
    Assign { lhs: VarId, rhs: Exp },
    /// `base.field = value`, or `Class.field = value` when `base` is `None`.
    StoreField {
        base: Option<VarId>,
        field: FieldId,
        value: VarId,
    },
    /// `base[index] = value`
    StoreArray {
        base: VarId,
        index: VarId,
        value: VarId,
    },
    Invoke(Invoke),
    /// `if (condition) goto target`
    If { condition: BinaryExp, target: usize },
    Goto { target: usize },
    Switch {
        var: VarId,
        cases: Vec<(i32, usize)>,
        default: usize,
    },
    Return { value: Option<VarId> },
}

impl Stmt {
    /// Variable defined by this statement, if any.
    pub fn def(&self) -> Option<VarId> {
        match self {
            Stmt::Assign { lhs, .. } => Some(*lhs),
            Stmt::Invoke(invoke) => invoke.result,
            _ => None,
        }
    }

    /// Variables read by this statement.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Stmt::Nop | Stmt::Goto { .. } | Stmt::Return { value: None } => Vec::new(),
            Stmt::Assign { rhs, .. } => rhs.uses(),
            Stmt::StoreField { base, value, .. } => base.iter().copied().chain([*value]).collect(),
            Stmt::StoreArray { base, index, value } => vec![*base, *index, *value],
            Stmt::Invoke(invoke) => invoke
                .receiver
                .iter()
                .chain(invoke.args.iter())
                .copied()
                .collect(),
            Stmt::If { condition, .. } => vec![condition.lhs, condition.rhs],
            Stmt::Switch { var, .. } => vec![*var],
            Stmt::Return { value: Some(v) } => vec![*v],
        }
    }

    /// Jump targets named by this statement.
    pub fn jump_targets(&self) -> Vec<usize> {
        match self {
            Stmt::If { target, .. } | Stmt::Goto { target } => vec![*target],
            Stmt::Switch { cases, default, .. } => {
                cases.iter().map(|(_, t)| *t).chain([*default]).collect()
            }
            _ => Vec::new(),
        }
    }

    #[inline]
    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            Stmt::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }
}

// =============================================================================
// Program entities
// =============================================================================

/// A local variable (parameters, `this` and temporaries included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Var {
    pub id: VarId,
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    pub class: ClassId,
    pub ty: Type,
    pub is_static: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub id: ClassId,
    pub name: String,
    pub superclass: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub is_abstract: bool,
    /// Declared methods keyed by subsignature.
    pub methods: FxHashMap<String, MethodId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub id: MethodId,
    pub name: String,
    pub class: ClassId,
    /// Name plus parameter types, e.g. `int foo(int,A)`; the dispatch key.
    pub subsignature: String,
    pub is_static: bool,
    pub is_abstract: bool,
    pub params: Vec<VarId>,
    pub this: Option<VarId>,
    pub stmts: Vec<Stmt>,
    /// Variables returned by `return v` statements, in program order.
    pub return_vars: Vec<VarId>,
}

/// Statements that use a variable as a field/array base or call receiver.
///
/// Pointer analysis needs these when the variable's points-to set grows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarRelatedStmts {
    pub load_fields: Vec<StmtRef>,
    pub store_fields: Vec<StmtRef>,
    pub load_arrays: Vec<StmtRef>,
    pub store_arrays: Vec<StmtRef>,
    pub invokes: Vec<StmtRef>,
}

/// The immutable program world shared by all analyses.
#[derive(Debug, Clone)]
pub struct Program {
    pub(crate) classes: Vec<Class>,
    pub(crate) methods: Vec<Method>,
    pub(crate) vars: Vec<Var>,
    pub(crate) fields: Vec<Field>,
    pub(crate) entry: Option<MethodId>,
    pub(crate) related: Vec<VarRelatedStmts>,
    pub(crate) hierarchy: ClassHierarchy,
}

impl Program {
    /// The designated entry method (e.g. `main`), if any.
    #[inline]
    pub fn entry(&self) -> Option<MethodId> {
        self.entry
    }

    #[inline]
    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    #[inline]
    pub fn var(&self, id: VarId) -> &Var {
        &self.vars[id.0]
    }

    #[inline]
    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0]
    }

    #[inline]
    pub fn stmt(&self, at: StmtRef) -> &Stmt {
        &self.methods[at.method.0].stmts[at.index]
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter()
    }

    pub fn classes(&self) -> impl Iterator<Item = &Class> {
        self.classes.iter()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// Field/array/invoke statements that use `var` as base or receiver.
    #[inline]
    pub fn related_stmts(&self, var: VarId) -> &VarRelatedStmts {
        &self.related[var.0]
    }

    #[inline]
    pub fn hierarchy(&self) -> &ClassHierarchy {
        &self.hierarchy
    }

    /// Find a method by `Class.name` (first match on simple name).
    pub fn find_method(&self, class_name: &str, method_name: &str) -> Option<MethodId> {
        self.methods
            .iter()
            .find(|m| m.name == method_name && self.class(m.class).name == class_name)
            .map(|m| m.id)
    }

    /// Find a variable of `method` by name.
    pub fn find_var(&self, method: MethodId, name: &str) -> Option<VarId> {
        self.vars
            .iter()
            .find(|v| v.method == method && v.name == name)
            .map(|v| v.id)
    }
}
