//! Object-detection capability seam.

use crate::models::detection::Detection;
use async_trait::async_trait;

/// Detects objects in an image. Implementations may call a model-serving
/// sidecar or run inference locally; the handler only needs the list.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detect objects in raw image bytes. An empty vector means "no
    /// detections", which is also the degraded answer when no model is
    /// available.
    async fn detect(&self, image: &[u8]) -> Vec<Detection>;
}

/// Default detector: no model loaded, never detects anything.
pub struct NullDetector;

#[async_trait]
impl Detector for NullDetector {
    async fn detect(&self, _image: &[u8]) -> Vec<Detection> {
        Vec::new()
    }
}
