//! Control flow graph extraction.
//!
//! Builds per-method CFGs from the three-address IR: one node per statement
//! plus a pseudo entry and exit, with classified edges.
//!
//! # Modules
//!
//! - [`types`]: Core CFG data structures (nodes, edges, graph)
//! - [`builder`]: CFG construction from a method body
//!
//! # Example
//!
//! ```ignore
//! use brrr_flow::cfg::CfgBuilder;
//!
//! let cfg = CfgBuilder::for_method(&program, method)?;
//! for node in cfg.nodes() {
//!     println!("{:?} -> {:?}", node, cfg.successors(node));
//! }
//! ```

pub mod builder;
pub mod types;

pub use builder::CfgBuilder;
pub use types::{Cfg, CfgEdge, EdgeKind, NodeId, NodeKind};
