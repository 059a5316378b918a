// src/services/history_store.rs
use crate::errors::{LensError, PersistenceError};
use crate::models::HistoryItem;
use async_trait::async_trait;
use log::warn;
use redis::{AsyncCommands, Client, Script};
use serde_json;
use tokio::sync::RwLock;

/// Bumped whenever the stored `HistoryItem` layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;
const NAMESPACE: &str = "gourmet_lens";

/// Durable record of completed runs.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fails with `Duplicate` when the id is already stored.
    async fn save(&self, item: &HistoryItem) -> Result<(), LensError>;

    /// Newest first; items with equal timestamps keep their insertion order.
    async fn list_all(&self) -> Result<Vec<HistoryItem>, LensError>;

    /// Fails with `NotFound` when the id is unknown.
    async fn get_by_id(&self, id: &str) -> Result<HistoryItem, LensError>;

    /// Fails with `NotFound` and changes nothing when the id is unknown.
    async fn delete_by_id(&self, id: &str) -> Result<(), LensError>;
}

fn newest_first(items: &mut [HistoryItem]) {
    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

fn storage(e: impl std::fmt::Display) -> LensError {
    PersistenceError::Storage(e.to_string()).into()
}

// Item and index entry are written together or not at all.
const SAVE_SCRIPT: &str = r#"
if redis.call('SET', KEYS[1], ARGV[1], 'NX') then
    redis.call('RPUSH', KEYS[2], ARGV[2])
    return 1
end
return 0
"#;

const DELETE_SCRIPT: &str = r#"
if redis.call('DEL', KEYS[1]) == 0 then
    return 0
end
redis.call('LREM', KEYS[2], 0, ARGV[1])
return 1
"#;

pub struct RedisHistoryStore {
    client: Client,
    prefix: String,
    save_script: Script,
    delete_script: Script,
}

impl RedisHistoryStore {
    pub async fn new(redis_url: &str) -> Result<Self, LensError> {
        Self::connect(redis_url, format!("{}:v{}", NAMESPACE, SCHEMA_VERSION)).await
    }

    async fn connect(redis_url: &str, prefix: String) -> Result<Self, LensError> {
        let client = Client::open(redis_url).map_err(storage)?;

        // Test connection
        let mut conn = client.get_async_connection().await.map_err(storage)?;

        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .map_err(storage)?;

        Ok(Self::with_client(client, prefix))
    }

    fn with_client(client: Client, prefix: String) -> Self {
        Self {
            client,
            prefix,
            save_script: Script::new(SAVE_SCRIPT),
            delete_script: Script::new(DELETE_SCRIPT),
        }
    }

    fn item_key(&self, id: &str) -> String {
        format!("{}:history:{}", self.prefix, id)
    }

    fn index_key(&self) -> String {
        format!("{}:history_index", self.prefix)
    }
}

#[async_trait]
impl HistoryStore for RedisHistoryStore {
    async fn save(&self, item: &HistoryItem) -> Result<(), LensError> {
        let mut conn = self.client.get_async_connection().await.map_err(storage)?;

        let value =
            serde_json::to_string(item).map_err(|e| LensError::Serialization(e.to_string()))?;

        let created: i64 = self
            .save_script
            .key(self.item_key(&item.id))
            .key(self.index_key())
            .arg(value)
            .arg(&item.id)
            .invoke_async(&mut conn)
            .await
            .map_err(storage)?;
        if created == 0 {
            return Err(PersistenceError::Duplicate(item.id.clone()).into());
        }

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<HistoryItem>, LensError> {
        let mut conn = self.client.get_async_connection().await.map_err(storage)?;

        let ids: Vec<String> = conn
            .lrange(self.index_key(), 0, -1)
            .await
            .map_err(storage)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let keys: Vec<String> = ids.iter().map(|id| self.item_key(id)).collect();
        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(storage)?;

        let mut items = Vec::with_capacity(values.len());
        for (id, value) in ids.iter().zip(values) {
            match value {
                Some(json) => items.push(
                    serde_json::from_str::<HistoryItem>(&json)
                        .map_err(|e| LensError::Serialization(e.to_string()))?,
                ),
                None => warn!("History index references missing item {}", id),
            }
        }

        newest_first(&mut items);
        Ok(items)
    }

    async fn get_by_id(&self, id: &str) -> Result<HistoryItem, LensError> {
        let mut conn = self.client.get_async_connection().await.map_err(storage)?;

        let value: Option<String> = conn.get(self.item_key(id)).await.map_err(storage)?;
        let json = value.ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;

        serde_json::from_str(&json).map_err(|e| LensError::Serialization(e.to_string()))
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), LensError> {
        let mut conn = self.client.get_async_connection().await.map_err(storage)?;

        let removed: i64 = self
            .delete_script
            .key(self.item_key(id))
            .key(self.index_key())
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(storage)?;
        if removed == 0 {
            return Err(PersistenceError::NotFound(id.to_string()).into());
        }

        Ok(())
    }
}

/// Process-local store; contents are lost on exit.
#[derive(Default)]
pub struct MemoryHistoryStore {
    items: RwLock<Vec<HistoryItem>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn save(&self, item: &HistoryItem) -> Result<(), LensError> {
        let mut items = self.items.write().await;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(PersistenceError::Duplicate(item.id.clone()).into());
        }
        items.push(item.clone());
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<HistoryItem>, LensError> {
        let mut items = self.items.read().await.clone();
        newest_first(&mut items);
        Ok(items)
    }

    async fn get_by_id(&self, id: &str) -> Result<HistoryItem, LensError> {
        self.items
            .read()
            .await
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()).into())
    }

    async fn delete_by_id(&self, id: &str) -> Result<(), LensError> {
        let mut items = self.items.write().await;
        let position = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| PersistenceError::NotFound(id.to_string()))?;
        items.remove(position);
        Ok(())
    }
}
