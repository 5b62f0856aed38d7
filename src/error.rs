//! Central error types for brrr-flow.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic
//! `Display` and `From` implementations.
//!
//! Only IR construction and configuration loading are fallible. The solvers
//! themselves always run to a fixpoint and return plain values.

use thiserror::Error;

use crate::ir::{CallKind, ClassId, FieldId, MethodId, VarId};

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A jump (goto/if/switch) points outside the method body.
    #[error("Jump target {target} out of range in method {method} ({len} statements)")]
    JumpOutOfRange {
        method: String,
        target: usize,
        len: usize,
    },

    /// A statement references a variable that was never declared.
    #[error("Unknown variable {0:?}")]
    UnknownVar(VarId),

    /// A statement references a field that was never declared.
    #[error("Unknown field {0:?}")]
    UnknownField(FieldId),

    /// A type or method reference names a class that was never declared.
    #[error("Unknown class {0:?}")]
    UnknownClass(ClassId),

    /// An entry point or body refers to a method that was never declared.
    #[error("Unknown method {0:?}")]
    UnknownMethod(MethodId),

    /// Two methods of the same class share a subsignature.
    #[error("Duplicate method {subsignature} in class {class}")]
    DuplicateMethod { class: String, subsignature: String },

    /// A variable is used in a method other than the one declaring it.
    #[error("Variable {var:?} belongs to {owner:?} but is used in {method:?}")]
    ForeignVar {
        var: VarId,
        owner: MethodId,
        method: MethodId,
    },

    /// A static call with a receiver, or an instance call without one.
    #[error("{kind:?} call at {method}:{index} has a mismatched receiver")]
    ReceiverMismatch {
        method: String,
        index: usize,
        kind: CallKind,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Convenience type alias for Results using FlowError.
pub type Result<T> = std::result::Result<T, FlowError>;
