//! Whole-program call graphs.
//!
//! # Components
//!
//! - [`types`] - Call kinds, call edges and the monotone [`CallGraph`]
//! - [`cha`] - Class hierarchy analysis call graph construction
//!
//! The on-the-fly call graph discovered together with points-to sets lives in
//! [`crate::pta`]; both produce the same [`CallGraph`] type so either can feed
//! an [`crate::icfg::Icfg`].

pub mod cha;
pub mod types;

pub use cha::build_cha;
pub use types::{CallEdge, CallGraph, CallKind};
