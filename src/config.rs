//! Solver configuration.
//!
//! Every solver in the crate takes an [`AnalysisConfig`] by reference. The
//! configuration only influences scheduling; the computed fixpoint is the
//! same for every setting.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Order in which pending worklist items are popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorklistOrder {
    /// First in, first out (breadth-first flavoured).
    #[default]
    Fifo,
    /// Last in, first out (depth-first flavoured).
    Lifo,
}

/// Configuration shared by the dataflow solvers and the pointer analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Worklist pop order.
    pub worklist_order: WorklistOrder,
}

impl AnalysisConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the worklist pop order.
    #[must_use]
    pub fn with_worklist_order(mut self, order: WorklistOrder) -> Self {
        self.worklist_order = order;
        self
    }

    /// Parse a configuration from JSON. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::FlowError::Serde`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
