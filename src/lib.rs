//! brrr-flow: fixpoint program analyses over a three-address IR.
//!
//! - [`dataflow`]: generic intra- and interprocedural worklist solvers with
//!   constant propagation, liveness and dead code detection on top
//! - [`pta`]: Andersen-style pointer analysis building its call graph on
//!   the fly
//! - [`ir`], [`cfg`], [`callgraph`], [`icfg`]: the program model and the
//!   graphs the analyses run over
//!
//! # Example
//!
//! ```ignore
//! use brrr_flow::config::AnalysisConfig;
//! use brrr_flow::dataflow::detect_dead_code;
//!
//! let program = builder.build()?;
//! let main = program.entry().unwrap();
//! let report = detect_dead_code(&program, main, &AnalysisConfig::default())?;
//! println!("{}", report.to_json());
//! ```

pub mod callgraph;
pub mod cfg;
pub mod config;
pub mod dataflow;
pub mod error;
pub mod icfg;
pub mod ir;
pub mod pta;

pub use config::{AnalysisConfig, WorklistOrder};
pub use error::{FlowError, Result};
