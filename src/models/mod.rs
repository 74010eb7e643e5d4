//! Core data models for the compliance document hub.
//!
//! These entities represent catalog entries, sessions, and detection
//! results. Catalog records map cleanly to the SQLite table via
//! `sqlx::FromRow` and serialize naturally as JSON via `serde`.

pub mod detection;
pub mod document;
pub mod session;
