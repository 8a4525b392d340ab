use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use super::{DirectoryEntry, ObjectStore, StorageError, StoredObject};

/// Prefix every uploaded object lives under.
pub const UPLOAD_PREFIX: &str = "uploads/";

/// Object store backed by S3 (MinIO locally).
#[derive(Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<Option<StoredObject>, StorageError> {
        let key = object_key(Uuid::new_v4(), name);
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 upload failed: {e}")))?;

        info!("Uploaded s3://{}/{}", self.bucket, key);
        Ok(Some(StoredObject { path: key }))
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|se| se.is_no_such_key())
                    .unwrap_or(false)
                {
                    return Ok(None);
                }
                return Err(StorageError::ObjectStore(format!("S3 read failed: {err}")));
            }
        };

        let body = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 body read failed: {e}")))?;
        Ok(Some(body.into_bytes()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::ObjectStore(format!("S3 delete failed: {e}")))?;
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StorageError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(path)
            .into_paginator()
            .send();

        let mut entries = Vec::new();
        while let Some(page) = pages.next().await {
            let page =
                page.map_err(|e| StorageError::ObjectStore(format!("S3 list failed: {e}")))?;
            for object in page.contents() {
                let Some(key) = object.key() else {
                    continue;
                };
                entries.push(DirectoryEntry {
                    id: object
                        .e_tag()
                        .map(|tag| tag.trim_matches('"').to_string())
                        .unwrap_or_else(|| key.to_string()),
                    name: key.rsplit('/').next().unwrap_or(key).to_string(),
                    path: key.to_string(),
                });
            }
        }
        Ok(entries)
    }
}

/// `uploads/<uuid>/<name>`, with anything outside `[A-Za-z0-9._-]` in the name replaced.
fn object_key(id: Uuid, name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let sanitized = if sanitized.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        sanitized
    };
    format!("{UPLOAD_PREFIX}{id}/{sanitized}")
}
