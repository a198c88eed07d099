//! Request normalization into the worker encoding.

use predict_common::PredictionRequest;
use serde::Serialize;

use crate::error::{Error, Result};

const SEX_MALE: &str = "male";
const SEX_FEMALE: &str = "female";

/// Request in the encoding the worker expects: sex as 1 (male) or 0 (female).
///
/// Serializes with the same field names as [`PredictionRequest`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRequest {
    #[serde(rename = "CPT_code")]
    pub cpt_code: String,
    pub age: f64,
    pub frw: f64,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: f64,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: f64,
    #[serde(rename = "cholesterolLevel")]
    pub cholesterol_level: f64,
    #[serde(rename = "cigaretteConsumption")]
    pub cigarette_consumption: f64,
    pub sex: u8,
}

impl NormalizedRequest {
    /// Single JSON string passed to the worker as its last argument.
    pub fn to_payload(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("Failed to serialize payload: {}", e)))
    }
}

/// Encode the categorical fields of a request.
///
/// Labels other than "male" and "female" are rejected.
pub fn normalize(request: &PredictionRequest) -> Result<NormalizedRequest> {
    let sex = match request.sex.as_str() {
        SEX_MALE => 1,
        SEX_FEMALE => 0,
        other => return Err(Error::UnrecognizedSex(other.to_string())),
    };

    Ok(NormalizedRequest {
        cpt_code: request.cpt_code.clone(),
        age: request.age,
        frw: request.frw,
        systolic_bp: request.systolic_bp,
        diastolic_bp: request.diastolic_bp,
        cholesterol_level: request.cholesterol_level,
        cigarette_consumption: request.cigarette_consumption,
        sex,
    })
}
