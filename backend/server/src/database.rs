//! # Store
//!
//! Key-value storage for interactions.
//!
//! ## Layout
//!
//! - One table per edit and interaction kind: `likes:{editId}`, `comments:{editId}`, `ratings:{editId}`
//! - A table is a Redis hash, row id to JSON text
//! - Likes and ratings are keyed by user id, so each user has at most one row per edit
//! - Comments are keyed by their generated id
//!
//! ## Atomicity
//!
//! Every mutation touches a single row. Toggling is a Lua script so a double click never
//! leaves both a like and its removal half applied. Nothing reads a whole table, edits it,
//! and writes it back.
//!
//! ## Backends
//!
//! - Redis when `REDIS_URL` is set
//! - Process memory otherwise, also used by tests
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use redis::{
    AsyncCommands, Client, RedisError, Script,
    aio::{ConnectionManager, ConnectionManagerConfig},
};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const TOGGLE_SCRIPT: &str = r"
if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then
    redis.call('HDEL', KEYS[1], ARGV[1])
    return 0
end
redis.call('HSET', KEYS[1], ARGV[1], ARGV[2])
return 1
";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Redis: {0}")]
    Redis(#[from] RedisError),

    #[error("Encoding row: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Corrupt row in {table}: {source}")]
    Corrupt {
        table: String,
        source: serde_json::Error,
    },
}

pub async fn init_redis(redis_url: &str) -> Result<ConnectionManager, RedisError> {
    let config = ConnectionManagerConfig::new()
        .set_number_of_retries(1)
        .set_connection_timeout(Duration::from_millis(100));

    let client = Client::open(redis_url)?;

    client.get_connection_manager_with_config(config).await
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl Store {
    pub fn memory() -> Self {
        Store::Memory(MemoryStore::default())
    }

    pub async fn redis(redis_url: &str) -> Result<Self, StoreError> {
        Ok(Store::Redis(RedisStore::new(init_redis(redis_url).await?)))
    }

    /// All rows of `table`, in no particular order.
    pub async fn rows(&self, table: &str) -> Result<Vec<(String, String)>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.rows(table).await),
            Store::Redis(store) => store.rows(table).await,
        }
    }

    pub async fn get(&self, table: &str, row: &str) -> Result<Option<String>, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.get(table, row).await),
            Store::Redis(store) => store.get(table, row).await,
        }
    }

    /// Insert or overwrite.
    pub async fn put(&self, table: &str, row: &str, value: &str) -> Result<(), StoreError> {
        debug!("put {table}/{row}");

        match self {
            Store::Memory(store) => {
                store.put(table, row, value).await;
                Ok(())
            }
            Store::Redis(store) => store.put(table, row, value).await,
        }
    }

    /// Returns `false` and leaves the row untouched when it already exists.
    pub async fn insert(&self, table: &str, row: &str, value: &str) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.insert(table, row, value).await),
            Store::Redis(store) => store.insert(table, row, value).await,
        }
    }

    /// Returns whether a row was removed.
    pub async fn remove(&self, table: &str, row: &str) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.remove(table, row).await),
            Store::Redis(store) => store.remove(table, row).await,
        }
    }

    /// Removes the row if present, inserts `value` otherwise. Returns whether the row exists
    /// afterwards.
    pub async fn toggle(&self, table: &str, row: &str, value: &str) -> Result<bool, StoreError> {
        match self {
            Store::Memory(store) => Ok(store.toggle(table, row, value).await),
            Store::Redis(store) => store.toggle(table, row, value).await,
        }
    }

    /// Names of non-empty tables starting with `prefix`, sorted.
    pub async fn tables(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut tables = match self {
            Store::Memory(store) => store.tables(prefix).await,
            Store::Redis(store) => store.tables(prefix).await?,
        };
        tables.sort();

        Ok(tables)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<String, BTreeMap<String, String>>>>,
}

impl MemoryStore {
    async fn rows(&self, table: &str) -> Vec<(String, String)> {
        self.tables
            .read()
            .await
            .get(table)
            .map(|rows| rows.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    async fn get(&self, table: &str, row: &str) -> Option<String> {
        self.tables.read().await.get(table)?.get(row).cloned()
    }

    async fn put(&self, table: &str, row: &str, value: &str) {
        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .insert(row.to_string(), value.to_string());
    }

    async fn insert(&self, table: &str, row: &str, value: &str) -> bool {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.contains_key(row) {
            return false;
        }
        rows.insert(row.to_string(), value.to_string());

        true
    }

    async fn remove(&self, table: &str, row: &str) -> bool {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return false;
        };

        let removed = rows.remove(row).is_some();
        if rows.is_empty() {
            tables.remove(table);
        }

        removed
    }

    async fn toggle(&self, table: &str, row: &str, value: &str) -> bool {
        let mut tables = self.tables.write().await;
        let rows = tables.entry(table.to_string()).or_default();

        if rows.remove(row).is_some() {
            if rows.is_empty() {
                tables.remove(table);
            }
            return false;
        }
        rows.insert(row.to_string(), value.to_string());

        true
    }

    async fn tables(&self, prefix: &str) -> Vec<String> {
        self.tables
            .read()
            .await
            .iter()
            .filter(|(name, rows)| name.starts_with(prefix) && !rows.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    toggle: Arc<Script>,
}

impl RedisStore {
    pub fn new(connection: ConnectionManager) -> Self {
        Self {
            connection,
            toggle: Arc::new(Script::new(TOGGLE_SCRIPT)),
        }
    }

    async fn rows(&self, table: &str) -> Result<Vec<(String, String)>, StoreError> {
        let mut connection = self.connection.clone();
        let rows: HashMap<String, String> = connection.hgetall(table).await?;

        Ok(rows.into_iter().collect())
    }

    async fn get(&self, table: &str, row: &str) -> Result<Option<String>, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hget(table, row).await?)
    }

    async fn put(&self, table: &str, row: &str, value: &str) -> Result<(), StoreError> {
        let mut connection = self.connection.clone();
        let _: () = connection.hset(table, row, value).await?;

        Ok(())
    }

    async fn insert(&self, table: &str, row: &str, value: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();

        Ok(connection.hset_nx(table, row, value).await?)
    }

    async fn remove(&self, table: &str, row: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let removed: i64 = connection.hdel(table, row).await?;

        Ok(removed > 0)
    }

    async fn toggle(&self, table: &str, row: &str, value: &str) -> Result<bool, StoreError> {
        let mut connection = self.connection.clone();
        let present: i64 = self
            .toggle
            .key(table)
            .arg(row)
            .arg(value)
            .invoke_async(&mut connection)
            .await?;

        Ok(present == 1)
    }

    async fn tables(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut connection = self.connection.clone();
        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(format!("{prefix}*"))
            .query_async(&mut connection)
            .await?;

        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_does_not_overwrite() {
        let store = Store::memory();

        assert!(store.insert("likes:1", "alice", "first").await.unwrap());
        assert!(!store.insert("likes:1", "alice", "second").await.unwrap());
        assert_eq!(
            store.get("likes:1", "alice").await.unwrap().as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn put_overwrites() {
        let store = Store::memory();

        store.put("ratings:1", "alice", "3").await.unwrap();
        store.put("ratings:1", "alice", "5").await.unwrap();

        assert_eq!(
            store.rows("ratings:1").await.unwrap(),
            [("alice".to_string(), "5".to_string())]
        );
    }

    #[tokio::test]
    async fn toggle_flips_presence() {
        let store = Store::memory();

        assert!(store.toggle("likes:2", "bob", "t").await.unwrap());
        assert!(!store.toggle("likes:2", "bob", "t").await.unwrap());
        assert!(store.rows("likes:2").await.unwrap().is_empty());
        assert!(store.tables("likes:").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn concurrent_toggles_never_lose_a_row() {
        let store = Store::memory();

        let handles: Vec<_> = (0..32)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .toggle("likes:3", &format!("user-{i}"), "t")
                        .await
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap());
        }
        assert_eq!(store.rows("likes:3").await.unwrap().len(), 32);
    }

    #[tokio::test]
    async fn remove_reports_missing_rows() {
        let store = Store::memory();
        store.put("comments:1", "c1", "{}").await.unwrap();

        assert!(!store.remove("comments:1", "c2").await.unwrap());
        assert!(store.remove("comments:1", "c1").await.unwrap());
        assert!(!store.remove("comments:9", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn tables_filter_by_prefix() {
        let store = Store::memory();
        store.put("likes:2", "a", "t").await.unwrap();
        store.put("likes:10", "a", "t").await.unwrap();
        store.put("ratings:2", "a", "4").await.unwrap();

        assert_eq!(store.tables("likes:").await.unwrap(), ["likes:10", "likes:2"]);
        assert_eq!(store.tables("ratings:").await.unwrap(), ["ratings:2"]);
    }

    #[tokio::test]
    async fn init_redis_fails_fast_without_server() {
        assert!(init_redis("not a url").await.is_err());
        assert!(init_redis("redis://127.0.0.1:1/").await.is_err());
    }
}
