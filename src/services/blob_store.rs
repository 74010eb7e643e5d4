//! src/services/blob_store.rs
//!
//! BlobStore — the durable catalog beneath the document service. SQLite
//! holds one metadata row per document; payload bytes live on local disk
//! sharded beneath `base_path/{shard}/{shard}/{id}`. This file does not
//! know about sessions or authorization; it persists and retrieves.

use crate::models::document::{Category, DocumentRecord};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document `{0}` not found")]
    NotFound(String),
    #[error("invalid document id")]
    InvalidId,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

const MAX_ID_LEN: usize = 128;

/// Subdirectory under `base_path` for ephemeral payload copies minted by
/// `materialize`. Cleared of individual files when handles are released.
const HANDLES_DIR: &str = ".handles";

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    category    TEXT NOT NULL,
    date_added  TEXT NOT NULL,
    size_bytes  INTEGER NOT NULL,
    checksum    TEXT
)
"#;

/// BlobStore provides the durable half of the document catalog:
/// - Put a record (streams payload bytes to disk, upserts metadata)
/// - Get one / all records
/// - Delete a record (row and payload file, idempotent)
/// - Open or materialize a payload for reading
///
/// The surface is intentionally small; ordering of `get_all` is
/// unspecified and callers must not rely on it for display.
#[derive(Clone)]
pub struct BlobStore {
    /// SQLite connection pool for metadata rows.
    pub db: SqlitePool,

    /// Root directory for payload files.
    pub base_path: PathBuf,
}

impl BlobStore {
    /// Open (or create) the store at `database_url` with payloads under
    /// `base_path`. Creates directories and the `documents` table on first
    /// use; schema version 1, no migrations.
    pub async fn open(database_url: &str, base_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(HANDLES_DIR)).await?;

        // SQLx will not create the database file's parent directory.
        let db_path = database_url
            .trim_start_matches("sqlite://")
            .trim_start_matches("file:");
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }
        if !db_path.is_empty() && !database_url.contains(":memory:") {
            // Touch the file so the pool can open it read-write.
            let _ = std::fs::OpenOptions::new()
                .create(true)
                .write(true)
                .open(db_path);
        }

        let db = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query(CREATE_TABLE_SQL).execute(&db).await?;

        Ok(Self { db, base_path })
    }

    /// Reject ids that could escape the shard tree.
    fn ensure_id_safe(&self, id: &str) -> StoreResult<()> {
        if id.is_empty() || id.len() > MAX_ID_LEN {
            return Err(StoreError::InvalidId);
        }
        if id.starts_with('/') || id.contains("..") {
            return Err(StoreError::InvalidId);
        }
        if id
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'/' || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidId);
        }
        Ok(())
    }

    /// Two-level shard identifiers for a document id.
    ///
    /// MD5(id), first two bytes as lowercase hex. Keeps directory fan-out
    /// bounded when many documents accumulate.
    fn shards(id: &str) -> (String, String) {
        let digest = md5::compute(id);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Physical payload path for a document id.
    fn payload_path(&self, id: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::shards(id);
        let mut path = self.base_path.clone();
        path.push(shard_a);
        path.push(shard_b);
        path.push(id);
        path
    }

    fn handles_dir(&self) -> PathBuf {
        self.base_path.join(HANDLES_DIR)
    }

    /// Stream-upload a payload and upsert its metadata row.
    ///
    /// - Writes bytes incrementally to a temporary file.
    /// - Computes MD5 and size while streaming.
    /// - fsyncs and atomically renames into the shard tree.
    /// - Upserts the row keyed by id (overwrite semantics).
    ///
    /// Cleans up the temp file on any error.
    pub async fn put<S>(
        &self,
        id: &str,
        title: &str,
        description: Option<&str>,
        category: Category,
        date_added: DateTime<Utc>,
        stream: S,
    ) -> StoreResult<DocumentRecord>
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        self.ensure_id_safe(id)?;

        let file_path = self.payload_path(id);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::other("payload path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StoreError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let checksum = format!("{:x}", digest.compute());

        let insert_result = sqlx::query_as::<_, DocumentRecord>(
            r#"
            INSERT INTO documents (
                id, title, description, category, date_added, size_bytes, checksum
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                category = excluded.category,
                date_added = excluded.date_added,
                size_bytes = excluded.size_bytes,
                checksum = excluded.checksum
            RETURNING id, title, description, category, date_added, size_bytes, checksum
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(category)
        .bind(date_added)
        .bind(size_bytes)
        .bind(&checksum)
        .fetch_one(&self.db)
        .await;

        match insert_result {
            Ok(record) => Ok(record),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(StoreError::Sqlx(err))
            }
        }
    }

    /// Fetch one record; `Ok(None)` for an unknown id.
    pub async fn get(&self, id: &str) -> StoreResult<Option<DocumentRecord>> {
        self.ensure_id_safe(id)?;
        let record = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, title, description, category, date_added, size_bytes, checksum
             FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(record)
    }

    /// All records. Row order is unspecified; the in-memory mirror owns
    /// display ordering.
    pub async fn get_all(&self) -> StoreResult<Vec<DocumentRecord>> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, title, description, category, date_added, size_bytes, checksum
             FROM documents",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(records)
    }

    /// Delete the row and payload file for `id`. Idempotent: an unknown id
    /// is a no-op, a missing payload file is ignored. Prunes empty shard
    /// directories afterwards.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.ensure_id_safe(id)?;
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;

        let file_path = self.payload_path(id);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed payload file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("payload {} already missing", file_path.display());
            }
            Err(err) => return Err(StoreError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }

        Ok(())
    }

    /// Fetch a record and an opened payload file ready for streaming out.
    ///
    /// Returns `NotFound` when either the row or the physical file is
    /// missing.
    pub async fn open_payload(&self, id: &str) -> StoreResult<(DocumentRecord, File)> {
        let record = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let file_path = self.payload_path(id);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                StoreError::NotFound(id.to_string())
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok((record, file))
    }

    /// Materialize a fresh, independent copy of the payload under the
    /// handles directory. Each call yields a new path; the caller owns its
    /// lifetime. Hard-links when the filesystem allows, copies otherwise.
    pub async fn materialize(&self, id: &str) -> StoreResult<PathBuf> {
        let record = self
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        let source = self.payload_path(&record.id);
        let target = self.handles_dir().join(format!("{}-{}", Uuid::new_v4(), record.id));
        if let Err(err) = fs::hard_link(&source, &target).await {
            match err.kind() {
                ErrorKind::NotFound => return Err(StoreError::NotFound(id.to_string())),
                _ => {
                    fs::copy(&source, &target).await.map_err(|err| {
                        if err.kind() == ErrorKind::NotFound {
                            StoreError::NotFound(id.to_string())
                        } else {
                            StoreError::Io(err)
                        }
                    })?;
                }
            }
        }
        Ok(target)
    }

    /// Recursively remove empty shard directories up to the base path.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use tempfile::TempDir;

    fn payload_stream(bytes: &'static [u8]) -> impl Stream<Item = io::Result<Bytes>> + Send {
        stream::once(async move { Ok(Bytes::from_static(bytes)) })
    }

    async fn open_temp_store() -> (TempDir, BlobStore) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("meta.db");
        let url = format!("sqlite://{}", db_path.display());
        let store = BlobStore::open(&url, tmp.path().join("blobs"))
            .await
            .unwrap();
        (tmp, store)
    }

    #[tokio::test]
    async fn put_then_get_round_trips_metadata_and_payload() {
        let (_tmp, store) = open_temp_store().await;
        let record = store
            .put(
                "1700000000000",
                "Disposal Guide",
                Some("annual e-waste rules"),
                Category::EWaste,
                Utc::now(),
                payload_stream(b"%PDF-1.4 fake"),
            )
            .await
            .unwrap();
        assert_eq!(record.id, "1700000000000");
        assert_eq!(record.size_bytes, 13);
        assert_eq!(record.category, Category::EWaste);

        let fetched = store.get("1700000000000").await.unwrap().unwrap();
        assert_eq!(fetched.title, "Disposal Guide");
        assert_eq!(fetched.checksum, record.checksum);

        let (_meta, _file) = store.open_payload("1700000000000").await.unwrap();
        let path = store.payload_path("1700000000000");
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"%PDF-1.4 fake");
    }

    #[tokio::test]
    async fn get_missing_is_none_not_error() {
        let (_tmp, store) = open_temp_store().await;
        assert!(store.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn put_same_id_overwrites() {
        let (_tmp, store) = open_temp_store().await;
        let now = Utc::now();
        store
            .put("x", "First", None, Category::Battery, now, payload_stream(b"one"))
            .await
            .unwrap();
        store
            .put("x", "Second", None, Category::Battery, now, payload_stream(b"two"))
            .await
            .unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Second");
        assert_eq!(all[0].size_bytes, 3);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_tmp, store) = open_temp_store().await;
        store
            .put("x", "T", None, Category::EWaste, Utc::now(), payload_stream(b"p"))
            .await
            .unwrap();
        store.delete("x").await.unwrap();
        store.delete("x").await.unwrap();
        assert!(store.get("x").await.unwrap().is_none());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn materialize_yields_independent_copies() {
        let (_tmp, store) = open_temp_store().await;
        store
            .put("x", "T", None, Category::EWaste, Utc::now(), payload_stream(b"bytes"))
            .await
            .unwrap();

        let a = store.materialize("x").await.unwrap();
        let b = store.materialize("x").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(tokio::fs::read(&a).await.unwrap(), b"bytes");

        tokio::fs::remove_file(&a).await.unwrap();
        // Releasing one copy leaves the other readable.
        assert_eq!(tokio::fs::read(&b).await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn rejects_path_traversal_ids() {
        let (_tmp, store) = open_temp_store().await;
        let err = store.get("../escape").await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidId));
    }
}
