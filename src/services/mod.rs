//! Service layer: durable blob catalog, in-memory document catalog,
//! session/authorization gate, and the chemistry-prediction client.

pub mod auth_gate;
pub mod blob_store;
pub mod document_service;
pub mod prediction;
