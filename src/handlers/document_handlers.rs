//! HTTP handlers for the document catalog.
//! Uploads arrive as multipart forms; downloads stream from disk without
//! buffering. Catalog semantics live in `DocumentService`.

use crate::{
    errors::AppError,
    models::document::{Category, NewDocument},
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use std::io;
use tokio_util::io::ReaderStream;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
}

/// GET `/api/documents` — list catalog entries in insertion order,
/// optionally filtered by `?category=`.
pub async fn list_documents(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let documents = match q.category.as_deref() {
        Some(raw) => {
            let category: Category = raw.parse().map_err(AppError::bad_request)?;
            state.documents.documents_in(category)
        }
        None => state.documents.documents(),
    };
    Ok(Json(json!({ "documents": documents })))
}

/// POST `/api/documents` — multipart upload (title, description,
/// category, file). Admin-only; enforced by the service.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut title: Option<String> = None;
    let mut description: Option<String> = None;
    let mut category: Option<String> = None;
    let mut file: Option<Bytes> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("title") => {
                title = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::bad_request(err.to_string()))?,
                )
            }
            Some("description") => {
                description = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::bad_request(err.to_string()))?,
                )
            }
            Some("category") => {
                category = Some(
                    field
                        .text()
                        .await
                        .map_err(|err| AppError::bad_request(err.to_string()))?,
                )
            }
            Some("file") => {
                file = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|err| AppError::bad_request(err.to_string()))?,
                )
            }
            _ => {}
        }
    }

    let title = title.ok_or_else(|| AppError::bad_request("missing field `title`"))?;
    let category: Category = category
        .ok_or_else(|| AppError::bad_request("missing field `category`"))?
        .parse()
        .map_err(AppError::bad_request)?;
    let file = file.ok_or_else(|| AppError::bad_request("missing field `file`"))?;

    let new_doc = NewDocument {
        id: None,
        title,
        description: description.filter(|d| !d.is_empty()),
        category,
    };
    let payload = futures::stream::once(async move { Ok::<Bytes, io::Error>(file) });

    let created = state.documents.add_document(new_doc, payload).await?;
    match created {
        Some(record) => Ok((StatusCode::CREATED, Json(json!({ "document": record })))),
        // Store unavailable: accepted-but-dropped per the degrade policy.
        None => Ok((StatusCode::OK, Json(json!({ "document": null })))),
    }
}

/// DELETE `/api/documents/{id}` — admin-only, idempotent.
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.documents.remove_document(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET `/api/documents/{id}/content` — stream the payload bytes.
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (record, file) = state
        .documents
        .open_payload(&id)
        .await
        .ok_or_else(|| AppError::not_found(format!("document `{}` not found", id)))?;

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/pdf"),
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&record.size_bytes.max(0).to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("0")),
    );
    if let Ok(value) = HeaderValue::from_str(&format!(
        "inline; filename=\"{}.pdf\"",
        disposition_filename(&record.title)
    )) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// Download filename from a document title: header-unsafe characters are
/// replaced and an all-unsafe title falls back to a generic name.
fn disposition_filename(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}
