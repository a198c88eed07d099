//! Prediction Gateway Common Types
//!
//! Wire types shared by the gateway and its clients.

pub mod request;
pub mod response;

pub use request::PredictionRequest;
pub use response::{ErrorResponse, PredictResponse, ServiceEntry, ServicesResponse};
