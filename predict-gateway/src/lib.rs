//! Prediction gateway - resolves procedure codes to models and runs each
//! prediction in its own worker process.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod state;

pub use config::{Config, WorkerConfig};
pub use engine::{
    Classification, InvocationResult, ModelExecutor, OutputProtocol, Pipeline,
    PredictionOutcome, ProcessInvoker, ServiceRegistry,
};
pub use error::{Error, Result};
pub use state::AppState;
