//! Represents a catalog entry — one uploaded compliance document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// Regulatory category a document belongs to. Closed, two-value set.
#[derive(Serialize, Deserialize, sqlx::Type, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[sqlx(rename_all = "kebab-case")]
pub enum Category {
    EWaste,
    Battery,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::EWaste => "e-waste",
            Category::Battery => "battery",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "e-waste" => Ok(Category::EWaste),
            "battery" => Ok(Category::Battery),
            other => Err(format!("unknown category `{}`", other)),
        }
    }
}

/// Metadata for a single stored document.
///
/// The record describes the uploaded file; payload bytes live on disk
/// next to the SQLite catalog, keyed by `id`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct DocumentRecord {
    /// Opaque unique identifier, assigned at creation and never reused.
    pub id: String,

    /// Non-empty display title.
    pub title: String,

    /// Optional free-form description.
    pub description: Option<String>,

    /// Regulatory category (`e-waste` or `battery`).
    pub category: Category,

    /// When the document was added. Immutable after creation.
    pub date_added: DateTime<Utc>,

    /// Payload size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload, computed while streaming the upload.
    pub checksum: Option<String>,
}

/// Caller-supplied fields for a new document.
///
/// `id` is optional; when absent the service assigns a time-based one.
#[derive(Deserialize, Clone, Debug)]
pub struct NewDocument {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
}
