//! Prediction request payload as posted by the form.

use serde::{Deserialize, Serialize};

/// Clinical feature payload tagged with the procedure code selecting the model.
///
/// Field names follow the JSON contract of `POST /api/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Procedure (CPT) code, e.g. "81210".
    #[serde(rename = "CPT_code")]
    pub cpt_code: String,
    pub age: f64,
    /// Framingham risk worsening score.
    pub frw: f64,
    #[serde(rename = "systolicBP")]
    pub systolic_bp: f64,
    #[serde(rename = "diastolicBP")]
    pub diastolic_bp: f64,
    #[serde(rename = "cholesterolLevel")]
    pub cholesterol_level: f64,
    #[serde(rename = "cigaretteConsumption")]
    pub cigarette_consumption: f64,
    /// Categorical label, "male" or "female".
    pub sex: String,
}
