//! Storage — object store and key-value store seams plus the `StorageGateway`
//! façade the analysis pipeline talks to.
//!
//! The gateway never caches and never retries: every call is one attempt and
//! its failure is handed back to the caller unchanged.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::resume::ResumeRecord;

pub mod codec;
#[cfg(test)]
pub mod memory;
pub mod redis_kv;
pub mod s3;

use codec::{record_key, CodecError};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of '{0}' was rejected by the object store")]
    Upload(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("key-value store error: {0}")]
    KeyValue(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Location of an object accepted by the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvItem {
    pub key: String,
    /// Only populated when values were requested.
    pub value: Option<String>,
}

/// Blob storage. `None` from `upload`/`read` is a normal outcome the caller must check.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<Option<StoredObject>, StorageError>;

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError>;

    #[allow(dead_code)]
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StorageError>;
}

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Keys matching a glob pattern such as `resume:*`.
    async fn list(&self, pattern: &str, return_values: bool) -> Result<Vec<KvItem>, StorageError>;

    /// Deletes every key.
    #[allow(dead_code)]
    async fn flush(&self) -> Result<(), StorageError>;
}

/// Thin façade over the object store and the key-value store.
#[derive(Clone)]
pub struct StorageGateway {
    objects: Arc<dyn ObjectStore>,
    kv: Arc<dyn KeyValueStore>,
}

impl StorageGateway {
    pub fn new(objects: Arc<dyn ObjectStore>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self { objects, kv }
    }

    /// Uploads a blob and returns the path it can be read back from.
    pub async fn put_blob(&self, bytes: Bytes, suggested_name: &str) -> Result<String, StorageError> {
        let content_type = mime_guess::from_path(suggested_name).first_or_octet_stream();
        let size = bytes.len();
        let stored = self
            .objects
            .upload(suggested_name, bytes, content_type.essence_str())
            .await?
            .ok_or_else(|| StorageError::Upload(suggested_name.to_string()))?;
        debug!("Stored {} ({} bytes) at {}", suggested_name, size, stored.path);
        Ok(stored.path)
    }

    pub async fn read_blob(&self, path: &str) -> Result<Bytes, StorageError> {
        self.objects
            .read(path)
            .await?
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    pub async fn list_blobs(&self, directory: &str) -> Result<Vec<DirectoryEntry>, StorageError> {
        self.objects.list_directory(directory).await
    }

    pub async fn put_record(&self, record: &ResumeRecord) -> Result<(), StorageError> {
        let encoded = codec::encode(record)?;
        self.kv.set(&record_key(record.id), &encoded).await
    }

    pub async fn get_record(&self, id: Uuid) -> Result<Option<ResumeRecord>, StorageError> {
        match self.kv.get(&record_key(id)).await? {
            Some(raw) => Ok(Some(codec::decode(&raw)?)),
            None => Ok(None),
        }
    }

    /// Every record whose key starts with `prefix`.
    pub async fn list_records(&self, prefix: &str) -> Result<Vec<ResumeRecord>, StorageError> {
        let items = self.kv.list(&format!("{prefix}*"), true).await?;
        items
            .iter()
            .filter(|item| item.key.starts_with(prefix))
            .filter_map(|item| item.value.as_deref())
            .map(|raw| codec::decode(raw).map_err(StorageError::from))
            .collect()
    }
}
