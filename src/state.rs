//! Shared application state handed to every handler.

use crate::providers::detector::Detector;
use crate::services::auth_gate::AuthGate;
use crate::services::document_service::DocumentService;
use crate::services::prediction::PredictionClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentService>,
    pub gate: Arc<AuthGate>,
    pub detector: Arc<dyn Detector>,
    pub predictor: PredictionClient,
}
