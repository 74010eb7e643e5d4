//! Defines routes for the document hub API.
//!
//! ## Structure
//! - **Document endpoints**
//!   - `GET    /api/documents` — list entries (supports ?category=)
//!   - `POST   /api/documents` — multipart upload (admin)
//!   - `DELETE /api/documents/{id}` — remove entry (admin, idempotent)
//!   - `GET    /api/documents/{id}/content` — stream the payload
//!
//! - **Auth endpoints**
//!   - `POST /api/auth/login` — email/password sign-in
//!   - `POST /api/auth/google` — interactive provider flow
//!   - `POST /api/auth/logout`
//!   - `GET  /api/auth/session` — poll + snapshot
//!   - `POST /api/auth/connectivity` — host online/offline toggle
//!
//! - **Capability endpoints**
//!   - `POST /api/detect` — object detection (degrades to no detections)
//!   - `POST /api/predict` — copper-recovery prediction proxy

use crate::{
    handlers::{
        auth_handlers::{connectivity, login, login_google, logout, session},
        capability_handlers::{detect, predict},
        document_handlers::{delete_document, download_document, list_documents, upload_document},
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all API routes.
///
/// The router carries shared state (`AppState`) to all handlers.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // document catalog
        .route(
            "/api/documents",
            get(list_documents).post(upload_document),
        )
        .route("/api/documents/{id}", axum::routing::delete(delete_document))
        .route("/api/documents/{id}/content", get(download_document))
        // auth
        .route("/api/auth/login", post(login))
        .route("/api/auth/google", post(login_google))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/session", get(session))
        .route("/api/auth/connectivity", post(connectivity))
        // capabilities
        .route("/api/detect", post(detect))
        .route("/api/predict", post(predict))
}
