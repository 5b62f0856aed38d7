//! CFG construction from a method body.
//!
//! Every statement becomes one node. Edges follow the statement kinds:
//!
//! | Statement | Edges                                               |
//! |-----------|-----------------------------------------------------|
//! | `goto`    | target (`Goto`)                                     |
//! | `if`      | target (`IfTrue`), next statement (`IfFalse`)       |
//! | `switch`  | each case target (`SwitchCase`), default target     |
//! | `return`  | pseudo exit (`Return`)                              |
//! | otherwise | next statement, or the exit after the last one      |

use tracing::trace;

use super::types::{Cfg, CfgEdge, EdgeKind, NodeId};
use crate::error::{FlowError, Result};
use crate::ir::{Method, MethodId, Program, Stmt};

/// Builds [`Cfg`]s.
pub struct CfgBuilder;

impl CfgBuilder {
    /// Build the CFG of a method in a program.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::UnknownMethod`] for an id outside the program.
    pub fn for_method(program: &Program, method: MethodId) -> Result<Cfg<'_>> {
        if method.0 >= program.method_count() {
            return Err(FlowError::UnknownMethod(method));
        }
        Self::build(program.method(method))
    }

    /// Build the CFG of `method`.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::JumpOutOfRange`] when a jump target lies outside
    /// the method body.
    pub fn build(method: &Method) -> Result<Cfg<'_>> {
        let len = method.stmts.len();
        let exit = NodeId(len + 1);
        let node = |index: usize| -> Result<NodeId> {
            if index >= len {
                return Err(FlowError::JumpOutOfRange {
                    method: method.subsignature.clone(),
                    target: index,
                    len,
                });
            }
            Ok(NodeId(index + 1))
        };
        let next = |index: usize| -> NodeId {
            if index + 1 < len {
                NodeId(index + 2)
            } else {
                exit
            }
        };

        let mut edges = Vec::with_capacity(len + 1);
        let first = if len == 0 { exit } else { NodeId(1) };
        edges.push(CfgEdge::new(NodeId(0), first, EdgeKind::Entry));

        for (index, stmt) in method.stmts.iter().enumerate() {
            let from = NodeId(index + 1);
            match stmt {
                Stmt::Goto { target } => {
                    edges.push(CfgEdge::new(from, node(*target)?, EdgeKind::Goto));
                }
                Stmt::If { target, .. } => {
                    edges.push(CfgEdge::new(from, node(*target)?, EdgeKind::IfTrue));
                    edges.push(CfgEdge::new(from, next(index), EdgeKind::IfFalse));
                }
                Stmt::Switch { cases, default, .. } => {
                    for (value, target) in cases {
                        edges.push(CfgEdge::new(
                            from,
                            node(*target)?,
                            EdgeKind::SwitchCase(*value),
                        ));
                    }
                    edges.push(CfgEdge::new(from, node(*default)?, EdgeKind::SwitchDefault));
                }
                Stmt::Return { .. } => {
                    edges.push(CfgEdge::new(from, exit, EdgeKind::Return));
                }
                Stmt::Nop
                | Stmt::Assign { .. }
                | Stmt::StoreField { .. }
                | Stmt::StoreArray { .. }
                | Stmt::Invoke(_) => {
                    edges.push(CfgEdge::new(from, next(index), EdgeKind::FallThrough));
                }
            }
        }

        trace!(
            method = %method.subsignature,
            nodes = len + 2,
            edges = edges.len(),
            "built CFG"
        );
        Ok(Cfg::from_parts(method, edges))
    }
}
