//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the catalog DB and disk I/O

use crate::state::AppState;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON
/// body. This endpoint should be cheap and never perform I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Runs the document service's readiness checks (SQLite round-trip plus a
/// scratch write under the storage directory). Returns JSON describing
/// each check: HTTP 200 when all pass, HTTP 503 otherwise — including
/// when the catalog degraded to unavailable at startup.
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    let report = state.documents.readiness().await;

    let mut checks = HashMap::new();
    checks.insert(
        "sqlite",
        CheckStatus {
            ok: report.sqlite.is_ok(),
            error: report.sqlite.as_ref().err().cloned(),
        },
    );
    checks.insert(
        "disk",
        CheckStatus {
            ok: report.disk.is_ok(),
            error: report.disk.as_ref().err().cloned(),
        },
    );

    let overall_ok = report.ok();
    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}
