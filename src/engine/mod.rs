//! Execution engine contract.
//!
//! An engine evaluates one complete unit, then answers follow-up expressions
//! against the declarations that unit established. Instances are never
//! shared or reused: every grading run asks an [`EngineFactory`] for a fresh
//! one, so declarations from one run cannot be observed by another.
pub mod go;
mod process;

use thiserror::Error;

/// Result of the first (full unit) evaluation.
#[derive(Debug)]
pub struct UnitEvaluation {
    /// Side-effect output, stdout and stderr interleaved in one stream.
    pub output: String,
    pub error: Option<EngineError>,
}

impl UnitEvaluation {
    pub fn ok(output: String) -> Self {
        Self {
            output,
            error: None,
        }
    }

    pub fn failed(output: String, error: EngineError) -> Self {
        Self {
            output,
            error: Some(error),
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    #[error("{0}")]
    Compile(String),
    #[error("build timed out after {seconds}s")]
    BuildTimeout { seconds: f64 },
    #[error("{0}")]
    Runtime(String),
    #[error("run timed out after {seconds}s")]
    RunTimeout { seconds: f64 },
    #[error("no unit has been evaluated on this engine")]
    NotReady,
    #[error("engine already evaluated a unit")]
    AlreadyEvaluated,
    #[error("engine i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// True when the unit compiled and the failure happened while it ran.
    pub fn compiled(&self) -> bool {
        matches!(self, Self::Runtime(_) | Self::RunTimeout { .. })
    }
}

pub trait ExecutionEngine {
    /// Compile and run a complete unit once, capturing its output.
    fn evaluate_unit(&mut self, unit: &str) -> UnitEvaluation;

    /// Evaluate `expr` against the unit evaluated earlier on this instance
    /// and return its textual value.
    fn evaluate_expr(&mut self, expr: &str) -> Result<String, EngineError>;
}

/// Hands out fresh engine instances; one per execution attempt.
pub trait EngineFactory: Sync {
    type Engine: ExecutionEngine;

    fn spawn(&self) -> Result<Self::Engine, EngineError>;
}
