//! Response bodies returned by the gateway.

use serde::{Deserialize, Serialize};

/// Successful prediction response.
///
/// `prediction` is always present and serializes as `null` when the worker
/// output carried no classification marker; `output` is only set in that case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: Option<u8>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Error body for every failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// One entry of the procedure code registry, as listed by `GET /api/services`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub code: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServicesResponse {
    pub services: Vec<ServiceEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_response_omits_output() {
        let resp = PredictResponse {
            prediction: Some(1),
            message: "Positive (1) - High Risk".to_string(),
            output: None,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"prediction":1,"message":"Positive (1) - High Risk"}"#);
    }

    #[test]
    fn test_unknown_response_serializes_null_prediction() {
        let resp = PredictResponse {
            prediction: None,
            message: "Unexpected Output".to_string(),
            output: Some("done".to_string()),
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""prediction":null"#));
        assert!(json.contains(r#""output":"done""#));
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_string(&ErrorResponse::new("boom")).unwrap();
        assert_eq!(json, r#"{"error":"boom"}"#);
    }
}
