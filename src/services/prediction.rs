//! Client for the external copper-recovery prediction service.
//!
//! The upstream is a small model-serving API: a JSON POST of ten numeric
//! process parameters returning a single recovery figure. We treat it as
//! opaque and surface any failure as one error variant.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("prediction service unreachable: {0}")]
    Upstream(String),
}

/// The ten process parameters the upstream model expects. Field names
/// follow the upstream API contract exactly.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct BioleachInput {
    #[serde(rename = "C1R1")]
    pub c1r1: f64,
    #[serde(rename = "C1G1")]
    pub c1g1: f64,
    #[serde(rename = "C1B1")]
    pub c1b1: f64,
    #[serde(rename = "PH1")]
    pub ph1: f64,
    #[serde(rename = "Fe_plus2")]
    pub fe_plus2: f64,
    #[serde(rename = "Fe_plus3")]
    pub fe_plus3: f64,
    pub acid_conc: f64,
    pub pulp_density: f64,
    pub temp: f64,
    pub time: f64,
}

#[derive(Deserialize, Debug)]
struct UpstreamResponse {
    #[serde(rename = "Copper_Recovery")]
    copper_recovery: f64,
}

/// Thin reqwest wrapper around the prediction endpoint.
#[derive(Clone)]
pub struct PredictionClient {
    http: reqwest::Client,
    url: String,
}

impl PredictionClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
        }
    }

    /// POST the input and return the predicted copper recovery figure.
    pub async fn predict(&self, input: &BioleachInput) -> Result<f64, PredictionError> {
        let response = self
            .http
            .post(&self.url)
            .json(input)
            .send()
            .await
            .map_err(|err| PredictionError::Upstream(err.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|err| PredictionError::Upstream(err.to_string()))?;
        let body: UpstreamResponse = response
            .json()
            .await
            .map_err(|err| PredictionError::Upstream(err.to_string()))?;
        Ok(body.copper_recovery)
    }
}
