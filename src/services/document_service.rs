//! src/services/document_service.rs
//!
//! DocumentService — bridges the durable blob catalog and the HTTP
//! surface. Owns the in-memory mirror of catalog metadata (the single
//! source of truth for listing) and mints ephemeral payload handles.
//!
//! Failure policy: durable-store problems are absorbed here. A store that
//! failed to open leaves the service in a degraded state where mutations
//! are logged no-ops and reads return empty results; nothing is raised to
//! the presentation layer. Authorization failures, by contrast, do
//! surface: mutations require an admin session at this boundary.
//!
//! Payload access comes in two flavors: the HTTP surface streams
//! downloads through `open_payload`, while `resolve_payload` mints
//! [`PayloadHandle`]s for in-process consumers (e.g. an embedded viewer)
//! that need an independently-releasable filesystem reference instead of
//! a one-shot stream.

use crate::models::document::{Category, DocumentRecord, NewDocument};
use crate::services::auth_gate::AuthGate;
use crate::services::blob_store::BlobStore;
use bytes::Bytes;
use chrono::Utc;
use futures::Stream;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum DocError {
    #[error("admin role required")]
    Forbidden,
    #[error("title must not be empty")]
    EmptyTitle,
}

pub type DocResult<T> = Result<T, DocError>;

/// An ephemeral, independently-releasable reference to one payload.
///
/// Each handle owns a fresh materialized copy of the payload; multiple
/// handles for the same document do not interfere. Consumers call
/// [`release`](PayloadHandle::release) when done; dropping an unreleased
/// handle removes the copy best-effort.
#[derive(Debug)]
pub struct PayloadHandle {
    path: PathBuf,
    released: bool,
}

impl PayloadHandle {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    /// Filesystem path the payload can be read from until release.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Explicitly release the handle, removing its payload copy.
    pub async fn release(mut self) {
        self.released = true;
        if let Err(err) = tokio::fs::remove_file(&self.path).await {
            if err.kind() != io::ErrorKind::NotFound {
                warn!("releasing payload handle {}: {}", self.path.display(), err);
            }
        }
    }
}

impl Drop for PayloadHandle {
    fn drop(&mut self) {
        if !self.released {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

/// Where the durable store lives. Held until `initialize` opens it.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub storage_dir: PathBuf,
}

/// Document catalog service.
///
/// `initialize` is single-flight; concurrent callers await the same open
/// and load. The mirror is append-ordered and never re-sorted: removal
/// preserves the relative order of the survivors, and category filtering
/// preserves insertion order.
pub struct DocumentService {
    cfg: StoreConfig,
    gate: Arc<AuthGate>,
    store: OnceCell<Option<BlobStore>>,
    mirror: RwLock<Vec<DocumentRecord>>,
}

impl DocumentService {
    pub fn new(cfg: StoreConfig, gate: Arc<AuthGate>) -> Self {
        Self {
            cfg,
            gate,
            store: OnceCell::new(),
            mirror: RwLock::new(Vec::new()),
        }
    }

    /// Open the durable store and load the mirror. Runs exactly once per
    /// process; subsequent and concurrent calls share the first outcome.
    /// On failure the service degrades: the error is logged here, once,
    /// and every later operation becomes a best-effort no-op.
    pub async fn initialize(&self) {
        self.store
            .get_or_init(|| async {
                match BlobStore::open(&self.cfg.database_url, &self.cfg.storage_dir).await {
                    Ok(store) => match store.get_all().await {
                        Ok(records) => {
                            *self.mirror.write().expect("mirror lock poisoned") = records;
                            Some(store)
                        }
                        Err(err) => {
                            error!("loading document catalog failed: {}", err);
                            None
                        }
                    },
                    Err(err) => {
                        error!("opening document store failed: {}", err);
                        None
                    }
                }
            })
            .await;
    }

    fn store(&self) -> Option<&BlobStore> {
        self.store.get().and_then(|s| s.as_ref())
    }

    /// True when the durable store opened successfully.
    pub fn is_available(&self) -> bool {
        self.store().is_some()
    }

    fn require_admin(&self) -> DocResult<()> {
        if self.gate.snapshot().is_admin() {
            Ok(())
        } else {
            Err(DocError::Forbidden)
        }
    }

    /// Add a document: persist metadata + payload, then append to the
    /// mirror. Requires an admin session. When the store is unavailable or
    /// the write fails, the operation is a logged no-op returning
    /// `Ok(None)` rather than an error.
    pub async fn add_document<S>(&self, new_doc: NewDocument, payload: S) -> DocResult<Option<DocumentRecord>>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.require_admin()?;
        if new_doc.title.trim().is_empty() {
            return Err(DocError::EmptyTitle);
        }

        let Some(store) = self.store() else {
            warn!("add_document ignored: document store unavailable");
            return Ok(None);
        };

        let id = new_doc
            .id
            .unwrap_or_else(|| Utc::now().timestamp_millis().to_string());

        let record = match store
            .put(
                &id,
                &new_doc.title,
                new_doc.description.as_deref(),
                new_doc.category,
                Utc::now(),
                payload,
            )
            .await
        {
            Ok(record) => record,
            Err(err) => {
                warn!("add_document({}) failed: {}", id, err);
                return Ok(None);
            }
        };

        let mut mirror = self.mirror.write().expect("mirror lock poisoned");
        if let Some(existing) = mirror.iter_mut().find(|doc| doc.id == record.id) {
            // Upsert: replace in place, keep the original position.
            *existing = record.clone();
        } else {
            mirror.push(record.clone());
        }
        Ok(Some(record))
    }

    /// Remove a document from the durable store and the mirror. Requires
    /// an admin session. Unknown ids and store failures are benign.
    pub async fn remove_document(&self, id: &str) -> DocResult<()> {
        self.require_admin()?;

        let Some(store) = self.store() else {
            warn!("remove_document ignored: document store unavailable");
            return Ok(());
        };

        if let Err(err) = store.delete(id).await {
            warn!("remove_document({}) failed: {}", id, err);
            return Ok(());
        }

        self.mirror
            .write()
            .expect("mirror lock poisoned")
            .retain(|doc| doc.id != id);
        Ok(())
    }

    /// Snapshot of the mirror in insertion order.
    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.mirror.read().expect("mirror lock poisoned").clone()
    }

    /// Mirror entries of one category, insertion order preserved.
    pub fn documents_in(&self, category: Category) -> Vec<DocumentRecord> {
        self.mirror
            .read()
            .expect("mirror lock poisoned")
            .iter()
            .filter(|doc| doc.category == category)
            .cloned()
            .collect()
    }

    /// Mint a new ephemeral handle for a payload. Each call materializes a
    /// fresh copy from durable state; handles are never shared or reused.
    /// `None` when the id is unknown or the store is unavailable.
    pub async fn resolve_payload(&self, id: &str) -> Option<PayloadHandle> {
        let store = self.store()?;
        match store.materialize(id).await {
            Ok(path) => Some(PayloadHandle::new(path)),
            Err(err) => {
                warn!("resolve_payload({}): {}", id, err);
                None
            }
        }
    }

    /// Record plus opened payload file for streaming a download.
    pub async fn open_payload(&self, id: &str) -> Option<(DocumentRecord, tokio::fs::File)> {
        let store = self.store()?;
        match store.open_payload(id).await {
            Ok(pair) => Some(pair),
            Err(err) => {
                warn!("open_payload({}): {}", id, err);
                None
            }
        }
    }

    /// Readiness probe: SQLite round-trip and a scratch write under the
    /// storage directory.
    pub async fn readiness(&self) -> ReadinessReport {
        let Some(store) = self.store() else {
            return ReadinessReport {
                sqlite: Err("store unavailable".to_string()),
                disk: Err("store unavailable".to_string()),
            };
        };

        let sqlite = match sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&store.db)
            .await
        {
            Ok(1) => Ok(()),
            Ok(v) => Err(format!("unexpected result: {}", v)),
            Err(e) => Err(format!("error: {}", e)),
        };

        let probe = store
            .base_path
            .join(format!(".readyz-{}", uuid::Uuid::new_v4()));
        let disk = match tokio::fs::write(&probe, b"readyz").await {
            Ok(_) => {
                let read_back = tokio::fs::read(&probe).await;
                let _ = tokio::fs::remove_file(&probe).await;
                match read_back {
                    Ok(bytes) if bytes == b"readyz" => Ok(()),
                    Ok(_) => Err("file content mismatch".to_string()),
                    Err(e) => Err(format!("could not read probe file: {}", e)),
                }
            }
            Err(e) => Err(format!("could not write probe file: {}", e)),
        };

        ReadinessReport { sqlite, disk }
    }
}

/// Outcome of the readiness checks; `Err` carries the failure reason.
pub struct ReadinessReport {
    pub sqlite: Result<(), String>,
    pub disk: Result<(), String>,
}

impl ReadinessReport {
    pub fn ok(&self) -> bool {
        self.sqlite.is_ok() && self.disk.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_gate::{
        AuthError, AuthGate, AuthResult, IdentityProvider, LocalAdmin, RoleEntry, RoleStore,
    };
    use async_trait::async_trait;
    use futures::stream;
    use tempfile::TempDir;

    struct NoProvider;

    #[async_trait]
    impl IdentityProvider for NoProvider {
        async fn current_identity(&self) -> AuthResult<Option<crate::models::session::Identity>> {
            Ok(None)
        }
        async fn sign_in_interactive(&self) -> AuthResult<crate::models::session::Identity> {
            Err(AuthError::Provider("not configured".into()))
        }
        async fn sign_in_with_password(
            &self,
            _email: &str,
            _password: &str,
        ) -> AuthResult<crate::models::session::Identity> {
            Err(AuthError::InvalidCredentials)
        }
        async fn sign_out(&self) -> AuthResult<()> {
            Ok(())
        }
    }

    struct NoRoles;

    #[async_trait]
    impl RoleStore for NoRoles {
        async fn role_exists(&self, _uid: &str) -> AuthResult<bool> {
            Ok(false)
        }
        async fn put_role(&self, _uid: &str, _entry: RoleEntry) -> AuthResult<()> {
            Ok(())
        }
        async fn enable_network(&self) -> AuthResult<()> {
            Ok(())
        }
        async fn disable_network(&self) -> AuthResult<()> {
            Ok(())
        }
    }

    fn admin_gate() -> Arc<AuthGate> {
        Arc::new(AuthGate::new(
            Arc::new(NoProvider),
            Arc::new(NoRoles),
            vec![],
            Some(LocalAdmin {
                email: "admin@example.com".into(),
                password: "Admin@123".into(),
            }),
        ))
    }

    async fn service_with(gate: Arc<AuthGate>) -> (TempDir, DocumentService) {
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            database_url: format!("sqlite://{}", tmp.path().join("meta.db").display()),
            storage_dir: tmp.path().join("blobs"),
        };
        let service = DocumentService::new(cfg, gate);
        service.initialize().await;
        assert!(service.is_available());
        (tmp, service)
    }

    async fn signed_in_admin_service() -> (TempDir, DocumentService) {
        let gate = admin_gate();
        gate.sign_in_with_password("admin@example.com", "Admin@123")
            .await
            .unwrap();
        service_with(gate).await
    }

    fn doc(id: &str, title: &str, category: Category) -> NewDocument {
        NewDocument {
            id: Some(id.to_string()),
            title: title.to_string(),
            description: None,
            category,
        }
    }

    fn payload(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Send {
        stream::once(async move { Ok(Bytes::from_static(bytes)) })
    }

    #[tokio::test]
    async fn distinct_ids_stay_unique() {
        let (_tmp, service) = signed_in_admin_service().await;
        for id in ["a", "b", "c"] {
            service
                .add_document(doc(id, "T", Category::EWaste), payload(b"p"))
                .await
                .unwrap();
        }
        let docs = service.documents();
        assert_eq!(docs.len(), 3);
        let mut ids: Vec<_> = docs.iter().map(|d| d.id.clone()).collect();
        ids.dedup();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (_tmp, service) = signed_in_admin_service().await;
        service
            .add_document(doc("x", "T", Category::Battery), payload(b"p"))
            .await
            .unwrap();

        service.remove_document("x").await.unwrap();
        let after_first = service.documents();
        service.remove_document("x").await.unwrap();
        let after_second = service.documents();

        assert!(after_first.is_empty());
        assert_eq!(after_first.len(), after_second.len());
    }

    #[tokio::test]
    async fn resolved_handle_round_trips_payload() {
        let (_tmp, service) = signed_in_admin_service().await;
        service
            .add_document(doc("x", "T", Category::Battery), payload(b"payload bytes"))
            .await
            .unwrap();

        let handle = service.resolve_payload("x").await.unwrap();
        let bytes = tokio::fs::read(handle.path()).await.unwrap();
        assert_eq!(bytes, b"payload bytes");

        let path = handle.path().to_path_buf();
        handle.release().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn independent_handles_release_independently() {
        let (_tmp, service) = signed_in_admin_service().await;
        service
            .add_document(doc("x", "T", Category::EWaste), payload(b"p"))
            .await
            .unwrap();

        let first = service.resolve_payload("x").await.unwrap();
        let second = service.resolve_payload("x").await.unwrap();
        assert_ne!(first.path(), second.path());

        first.release().await;
        assert_eq!(tokio::fs::read(second.path()).await.unwrap(), b"p");
        second.release().await;
    }

    #[tokio::test]
    async fn category_filter_preserves_insertion_order() {
        let (_tmp, service) = signed_in_admin_service().await;
        let inserts = [
            ("1", Category::EWaste),
            ("2", Category::Battery),
            ("3", Category::EWaste),
            ("4", Category::Battery),
            ("5", Category::EWaste),
        ];
        for (id, category) in inserts {
            service
                .add_document(doc(id, "T", category), payload(b"p"))
                .await
                .unwrap();
        }

        let ewaste = service.documents_in(Category::EWaste);
        let ids: Vec<_> = ewaste.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "5"]);
        assert!(ewaste.iter().all(|d| d.category == Category::EWaste));
    }

    #[tokio::test]
    async fn mutations_require_admin() {
        let gate = admin_gate();
        let (_tmp, service) = service_with(gate.clone()).await;

        let err = service
            .add_document(doc("x", "T", Category::EWaste), payload(b"p"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocError::Forbidden));
        assert!(matches!(
            service.remove_document("x").await.unwrap_err(),
            DocError::Forbidden
        ));

        gate.sign_in_with_password("admin@example.com", "Admin@123")
            .await
            .unwrap();
        service
            .add_document(doc("x", "T", Category::EWaste), payload(b"p"))
            .await
            .unwrap();
        assert_eq!(service.documents().len(), 1);
    }

    #[tokio::test]
    async fn initialize_reloads_existing_catalog() {
        let gate = admin_gate();
        gate.sign_in_with_password("admin@example.com", "Admin@123")
            .await
            .unwrap();
        let tmp = TempDir::new().unwrap();
        let cfg = StoreConfig {
            database_url: format!("sqlite://{}", tmp.path().join("meta.db").display()),
            storage_dir: tmp.path().join("blobs"),
        };

        {
            let service = DocumentService::new(cfg.clone(), gate.clone());
            service.initialize().await;
            service
                .add_document(doc("persisted", "Kept", Category::Battery), payload(b"p"))
                .await
                .unwrap();
        }

        let service = DocumentService::new(cfg, gate);
        service.initialize().await;
        let docs = service.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "persisted");
        assert_eq!(docs[0].title, "Kept");
    }

    #[tokio::test]
    async fn unavailable_store_degrades_to_no_ops() {
        let gate = admin_gate();
        gate.sign_in_with_password("admin@example.com", "Admin@123")
            .await
            .unwrap();
        let tmp = TempDir::new().unwrap();
        // A directory where the database file should be makes open fail.
        let bogus = tmp.path().join("meta.db");
        std::fs::create_dir_all(&bogus).unwrap();
        let cfg = StoreConfig {
            database_url: format!("sqlite://{}", bogus.display()),
            storage_dir: tmp.path().join("blobs"),
        };

        let service = DocumentService::new(cfg, gate);
        service.initialize().await;
        assert!(!service.is_available());

        let added = service
            .add_document(doc("x", "T", Category::EWaste), payload(b"p"))
            .await
            .unwrap();
        assert!(added.is_none());
        service.remove_document("x").await.unwrap();
        assert!(service.documents().is_empty());
        assert!(service.resolve_payload("x").await.is_none());
    }

    #[tokio::test]
    async fn scenario_add_one_ewaste_document() {
        let (_tmp, service) = signed_in_admin_service().await;
        service
            .add_document(
                NewDocument {
                    id: None,
                    title: "Disposal Guide".into(),
                    description: Some("collection points".into()),
                    category: Category::EWaste,
                },
                payload(b"%PDF"),
            )
            .await
            .unwrap();

        let docs = service.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Disposal Guide");
        assert_eq!(docs[0].category, Category::EWaste);
    }

    #[tokio::test]
    async fn scenario_remove_battery_document() {
        let (_tmp, service) = signed_in_admin_service().await;
        service
            .add_document(doc("bat", "Battery Rules", Category::Battery), payload(b"p"))
            .await
            .unwrap();
        service
            .add_document(doc("ew", "E-Waste Rules", Category::EWaste), payload(b"p"))
            .await
            .unwrap();

        service.remove_document("bat").await.unwrap();
        let docs = service.documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].category, Category::EWaste);
    }
}
