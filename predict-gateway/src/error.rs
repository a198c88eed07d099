//! Error types for the prediction gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use predict_common::ErrorResponse;

use crate::engine::Stage;

/// Error types for prediction requests.
///
/// Every variant is fatal for the request it belongs to. Worker output without a
/// classification marker is not an error; it becomes an unknown outcome.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid CPT code. No matching service found for '{0}'")]
    UnknownProcedureCode(String),

    #[error("Unrecognized sex value '{0}', expected 'male' or 'female'")]
    UnrecognizedSex(String),

    #[error("Failed to start worker process: {0}")]
    ProcessSpawn(String),

    #[error("{}", execution_message(.exit_code, .stderr))]
    ProcessExecution {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Worker process timed out after {0}s")]
    Timeout(u64),

    #[error("All {0} worker slots are busy, try again later")]
    Saturated(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Worker stderr wins over the exit code when both are available.
fn execution_message(exit_code: &Option<i32>, stderr: &str) -> String {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_string();
    }
    match exit_code {
        Some(code) => format!("Worker process exited with code {}", code),
        None => "Worker process was terminated by a signal".to_string(),
    }
}

impl Error {
    /// Pipeline stage the error originates from.
    pub fn stage(&self) -> Stage {
        match self {
            Error::UnknownProcedureCode(_) => Stage::Resolving,
            Error::InvalidRequest(_) | Error::UnrecognizedSex(_) => Stage::Normalizing,
            Error::ProcessSpawn(_)
            | Error::ProcessExecution { .. }
            | Error::Timeout(_)
            | Error::Saturated(_)
            | Error::Internal(_) => Stage::Invoking,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidRequest(_)
            | Error::UnknownProcedureCode(_)
            | Error::UnrecognizedSex(_) => StatusCode::BAD_REQUEST,
            Error::ProcessSpawn(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::ProcessExecution { .. } => StatusCode::BAD_GATEWAY,
            Error::Saturated(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
