//! In-process object and key-value stores used by the test suite.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use super::{DirectoryEntry, KeyValueStore, KvItem, ObjectStore, StorageError, StoredObject};

#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<BTreeMap<String, (Bytes, String)>>,
    reject_uploads: AtomicBool,
    fail_after_uploads: Mutex<Option<usize>>,
    uploads: AtomicUsize,
}

impl InMemoryObjectStore {
    /// Every later upload returns `None`.
    pub fn reject_uploads(&self) {
        self.reject_uploads.store(true, Ordering::SeqCst);
    }

    /// Accept `count` uploads, then fail with a transport error.
    pub fn fail_after(&self, count: usize) {
        *self.fail_after_uploads.lock().unwrap() = Some(count);
    }

    pub fn content_type_of(&self, path: &str) -> Option<String> {
        self.objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(_, content_type)| content_type.clone())
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        name: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<Option<StoredObject>, StorageError> {
        if self.reject_uploads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let attempt = self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_after_uploads.lock().unwrap() {
            if attempt >= limit {
                return Err(StorageError::ObjectStore("connection reset".to_string()));
            }
        }
        let path = format!("uploads/{}/{}", Uuid::new_v4(), name);
        self.objects
            .lock()
            .unwrap()
            .insert(path.clone(), (bytes, content_type.to_string()));
        Ok(Some(StoredObject { path }))
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(path)
            .map(|(bytes, _)| bytes.clone()))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects.lock().unwrap().remove(path);
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<DirectoryEntry>, StorageError> {
        Ok(self
            .objects
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(path))
            .map(|key| DirectoryEntry {
                id: key.clone(),
                name: key.rsplit('/').next().unwrap_or(key).to_string(),
                path: key.clone(),
            })
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryKvStore {
    entries: Mutex<BTreeMap<String, String>>,
    fail_writes_after: Mutex<Option<usize>>,
    writes: AtomicUsize,
}

impl InMemoryKvStore {
    /// Accept `count` writes, then fail every later `set`.
    pub fn fail_writes_after(&self, count: usize) {
        *self.fail_writes_after.lock().unwrap() = Some(count);
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.lock().unwrap().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let attempt = self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = *self.fail_writes_after.lock().unwrap() {
            if attempt >= limit {
                return Err(StorageError::KeyValue("READONLY replica".to_string()));
            }
        }
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn list(&self, pattern: &str, return_values: bool) -> Result<Vec<KvItem>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| glob_match(pattern, key))
            .map(|(key, value)| KvItem {
                key: key.clone(),
                value: return_values.then(|| value.clone()),
            })
            .collect())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.entries.lock().unwrap().clear();
        Ok(())
    }
}

/// `*`-only glob, enough for the `prefix*` patterns the gateway issues.
fn glob_match(pattern: &str, key: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or_default();
    let Some(mut rest) = key.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(index) => rest = &rest[index + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_prefix_pattern() {
        assert!(glob_match("resume:*", "resume:1234"));
        assert!(glob_match("resume:*", "resume:"));
        assert!(!glob_match("resume:*", "session:1"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
        assert!(glob_match("a*c*e", "abcde"));
    }

    #[tokio::test]
    async fn test_flush_removes_every_key() {
        let kv = InMemoryKvStore::default();
        kv.set("resume:1", "{}").await.unwrap();
        kv.set("other", "x").await.unwrap();
        kv.flush().await.unwrap();
        assert!(kv.list("*", false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_without_values() {
        let kv = InMemoryKvStore::default();
        kv.set("resume:1", "{}").await.unwrap();
        let items = kv.list("resume:*", false).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].value, None);
    }

    #[tokio::test]
    async fn test_delete_and_list_directory() {
        let store = InMemoryObjectStore::default();
        let stored = store
            .upload("cv.pdf", Bytes::from_static(b"pdf"), "application/pdf")
            .await
            .unwrap()
            .unwrap();
        let listed = store.list_directory("uploads/").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "cv.pdf");

        store.delete(&stored.path).await.unwrap();
        assert_eq!(store.len(), 0);
        assert_eq!(store.read(&stored.path).await.unwrap(), None);
    }
}
