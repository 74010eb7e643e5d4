//! HTTP handlers, split by concern: documents, auth, health, and the
//! detection/prediction capabilities.

pub mod auth_handlers;
pub mod capability_handlers;
pub mod document_handlers;
pub mod health_handlers;
