//! Handlers for the experimental capabilities: object detection and the
//! copper-recovery prediction proxy. Both are thin adapters over seams
//! that degrade gracefully when nothing real is wired behind them.

use crate::{errors::AppError, services::prediction::BioleachInput, state::AppState};
use axum::{Json, extract::State, response::IntoResponse};
use base64::{Engine as _, engine::general_purpose};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    /// Base64-encoded image, with or without a `data:image/...;base64,`
    /// prefix (browsers send canvas data URLs).
    pub image: String,
}

/// POST `/api/detect` — run the detector over a submitted image.
///
/// With no model configured this returns zero detections and echoes the
/// image back unannotated.
pub async fn detect(
    State(state): State<AppState>,
    Json(req): Json<DetectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let encoded = req
        .image
        .rsplit_once("base64,")
        .map(|(_, data)| data)
        .unwrap_or(req.image.as_str());
    let bytes = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|err| AppError::bad_request(format!("invalid image encoding: {}", err)))?;

    let objects = state.detector.detect(&bytes).await;
    Ok(Json(json!({
        "image": req.image,
        "objects": objects,
    })))
}

/// POST `/api/predict` — proxy the ten process parameters to the
/// configured prediction endpoint.
pub async fn predict(
    State(state): State<AppState>,
    Json(input): Json<BioleachInput>,
) -> Result<impl IntoResponse, AppError> {
    let copper_recovery = state.predictor.predict(&input).await?;
    Ok(Json(json!({ "copper_recovery": copper_recovery })))
}

#[cfg(test)]
mod tests {
    #[test]
    fn data_url_prefix_is_stripped() {
        let raw = "data:image/png;base64,aGVsbG8=";
        let encoded = raw
            .rsplit_once("base64,")
            .map(|(_, data)| data)
            .unwrap_or(raw);
        assert_eq!(encoded, "aGVsbG8=");
    }
}
