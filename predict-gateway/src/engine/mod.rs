//! Prediction engine.
//!
//! This module holds the dispatch pipeline: procedure code resolution,
//! field normalization, worker process execution and output interpretation.
//! Execution sits behind the `ModelExecutor` trait so the pipeline can be
//! driven by something other than a real process.

mod interpret;
mod normalize;
mod pipeline;
mod process;
mod registry;

pub use interpret::{interpret, Classification, OutputProtocol, PredictionOutcome};
pub use normalize::{normalize, NormalizedRequest};
pub use pipeline::Pipeline;
pub use process::ProcessInvoker;
pub use registry::ServiceRegistry;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Captured output of one worker run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}

impl InvocationResult {
    /// A run succeeded only if it exited with 0 and wrote nothing to stderr.
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && self.stderr.is_empty()
    }

    /// Turn a failed run into `Error::ProcessExecution`.
    ///
    /// Any stderr output fails the run, even with exit code 0.
    pub fn into_success(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::ProcessExecution {
                exit_code: self.exit_code,
                stderr: self.stderr,
            })
        }
    }
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Normalizing,
    Invoking,
    Interpreting,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolving => "resolving",
            Self::Normalizing => "normalizing",
            Self::Invoking => "invoking",
            Self::Interpreting => "interpreting",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runs a named model against a normalized payload.
///
/// Implementations must only return `Ok` for successful runs
/// (see [`InvocationResult::is_success`]).
#[async_trait]
pub trait ModelExecutor: Send + Sync {
    /// Short identifier used in logs (e.g., "process").
    fn executor_type(&self) -> &'static str;

    async fn execute(&self, model_id: &str, payload: &NormalizedRequest)
        -> Result<InvocationResult>;
}
