//! Prediction pipeline: resolve, normalize, invoke, interpret.

use std::sync::Arc;

use predict_common::PredictionRequest;
use tracing::Instrument;

use super::{
    interpret, normalize, ModelExecutor, OutputProtocol, PredictionOutcome, ServiceRegistry, Stage,
};
use crate::error::Result;

/// Runs one prediction request through every stage in order.
///
/// The first failing stage ends the run; no stage is retried.
pub struct Pipeline {
    registry: Arc<ServiceRegistry>,
    executor: Arc<dyn ModelExecutor>,
    protocol: OutputProtocol,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        executor: Arc<dyn ModelExecutor>,
        protocol: OutputProtocol,
    ) -> Self {
        Self {
            registry,
            executor,
            protocol,
        }
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub async fn run(&self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        let invocation_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "prediction",
            id = %invocation_id,
            cpt_code = %request.cpt_code,
        );

        async {
            let result = self.run_stages(request).await;
            match &result {
                Ok(outcome) => tracing::info!(
                    prediction = ?outcome.code,
                    "Prediction done: {}",
                    outcome.message
                ),
                Err(e) => tracing::warn!(stage = %e.stage(), "Prediction failed: {}", e),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, request: &PredictionRequest) -> Result<PredictionOutcome> {
        tracing::debug!(stage = %Stage::Resolving);
        let model_id = self.registry.resolve(&request.cpt_code)?;

        tracing::debug!(stage = %Stage::Normalizing, model = %model_id);
        let normalized = normalize(request)?;

        tracing::debug!(
            stage = %Stage::Invoking,
            model = %model_id,
            executor = self.executor.executor_type()
        );
        let result = self.executor.execute(model_id, &normalized).await?;

        tracing::debug!(stage = %Stage::Interpreting, model = %model_id);
        let outcome = interpret(&result, self.protocol);
        if outcome.is_unknown() {
            tracing::warn!(
                model = %model_id,
                output = %result.stdout.trim(),
                "Worker output has no classification marker"
            );
        }

        Ok(outcome)
    }
}
