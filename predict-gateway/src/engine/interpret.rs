//! Worker output interpretation.

use predict_common::PredictResponse;
use serde::Deserialize;

use super::InvocationResult;

const POSITIVE_MARKER: &str = "[1]";
const NEGATIVE_MARKER: &str = "[0]";
const TAG_PREFIX: &str = "prediction=";

const POSITIVE_MESSAGE: &str = "Positive (1) - High Risk";
const NEGATIVE_MESSAGE: &str = "Negative (0) - Low Risk";
const UNKNOWN_MESSAGE: &str = "Unexpected Output";

/// How worker stdout encodes the classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputProtocol {
    /// Legacy: stdout contains `[1]` or `[0]` anywhere. `[1]` is checked first,
    /// and a marker inside a larger token still matches.
    #[default]
    Markers,
    /// The last non-empty stdout line is exactly `prediction=1` or `prediction=0`.
    Tagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Positive,
    Negative,
    Unknown,
}

/// Typed result of one prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionOutcome {
    pub classification: Classification,
    pub code: Option<u8>,
    pub message: String,
    /// Trimmed worker stdout, only for `Classification::Unknown`.
    pub output: Option<String>,
}

impl PredictionOutcome {
    pub fn positive() -> Self {
        Self {
            classification: Classification::Positive,
            code: Some(1),
            message: POSITIVE_MESSAGE.to_string(),
            output: None,
        }
    }

    pub fn negative() -> Self {
        Self {
            classification: Classification::Negative,
            code: Some(0),
            message: NEGATIVE_MESSAGE.to_string(),
            output: None,
        }
    }

    pub fn unknown(output: &str) -> Self {
        Self {
            classification: Classification::Unknown,
            code: None,
            message: UNKNOWN_MESSAGE.to_string(),
            output: Some(output.trim().to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.classification == Classification::Unknown
    }
}

impl From<PredictionOutcome> for PredictResponse {
    fn from(outcome: PredictionOutcome) -> Self {
        Self {
            prediction: outcome.code,
            message: outcome.message,
            output: outcome.output,
        }
    }
}

/// Classify the stdout of a successful worker run.
pub fn interpret(result: &InvocationResult, protocol: OutputProtocol) -> PredictionOutcome {
    match protocol {
        OutputProtocol::Markers => interpret_markers(&result.stdout),
        OutputProtocol::Tagged => interpret_tagged(&result.stdout),
    }
}

fn interpret_markers(stdout: &str) -> PredictionOutcome {
    if stdout.contains(POSITIVE_MARKER) {
        PredictionOutcome::positive()
    } else if stdout.contains(NEGATIVE_MARKER) {
        PredictionOutcome::negative()
    } else {
        PredictionOutcome::unknown(stdout)
    }
}

fn interpret_tagged(stdout: &str) -> PredictionOutcome {
    let last_line = stdout.lines().map(str::trim).rev().find(|l| !l.is_empty());

    match last_line.and_then(|line| line.strip_prefix(TAG_PREFIX)) {
        Some("1") => PredictionOutcome::positive(),
        Some("0") => PredictionOutcome::negative(),
        _ => PredictionOutcome::unknown(stdout),
    }
}
