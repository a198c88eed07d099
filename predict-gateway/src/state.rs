//! Shared application state.

use std::sync::Arc;

use crate::config::Config;
use crate::engine::{ModelExecutor, Pipeline, ProcessInvoker, ServiceRegistry};

/// Shared application state passed to all handlers.
pub struct AppState {
    pub config: Config,
    pub pipeline: Pipeline,
}

impl AppState {
    pub fn new(config: Config, executor: Arc<dyn ModelExecutor>) -> Self {
        let registry = Arc::new(ServiceRegistry::from_entries(&config.services));
        let pipeline = Pipeline::new(registry, executor, config.worker.protocol);
        Self { config, pipeline }
    }

    /// State backed by real worker processes, as configured.
    pub fn from_config(config: Config) -> Self {
        let invoker = Arc::new(ProcessInvoker::new(config.worker.clone()));
        Self::new(config, invoker)
    }
}
