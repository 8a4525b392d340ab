use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use super::{KeyValueStore, KvItem, StorageError};

/// Key-value store backed by Redis. Every call shares one multiplexed connection.
#[derive(Clone)]
pub struct RedisKvStore {
    conn: MultiplexedConnection,
}

impl RedisKvStore {
    pub async fn connect(client: &redis::Client) -> Result<Self, StorageError> {
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(kv_error)?;
        Ok(Self { conn })
    }

    fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

fn kv_error(e: redis::RedisError) -> StorageError {
    StorageError::KeyValue(e.to_string())
}

#[async_trait]
impl KeyValueStore for RedisKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.connection();
        conn.get(key).await.map_err(kv_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.connection();
        conn.set::<_, _, ()>(key, value).await.map_err(kv_error)
    }

    async fn list(&self, pattern: &str, return_values: bool) -> Result<Vec<KvItem>, StorageError> {
        let mut conn = self.connection();

        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = conn
                .scan_match::<_, String>(pattern)
                .await
                .map_err(kv_error)?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        // SCAN may return a key more than once
        keys.sort();
        keys.dedup();

        let mut items = Vec::with_capacity(keys.len());
        for key in keys {
            let value = if return_values {
                let value: Option<String> = conn.get(&key).await.map_err(kv_error)?;
                // Deleted between SCAN and GET
                if value.is_none() {
                    continue;
                }
                value
            } else {
                None
            };
            items.push(KvItem { key, value });
        }
        Ok(items)
    }

    async fn flush(&self) -> Result<(), StorageError> {
        let mut conn = self.connection();
        redis::cmd("FLUSHDB")
            .query_async::<_, ()>(&mut conn)
            .await
            .map_err(kv_error)
    }
}
