//! Redis-backed [`ItemStore`].
//!
//! Layout, with `:` and `%` percent-escaped inside components:
//! - items are hashes at `<table>:item:<partition>:<sort>`;
//! - index entries are sorted sets at
//!   `<table>:index:<index>:<partition>:<sort>` whose members are item keys,
//!   all scored 0 so reads come back in lexicographic key order.
//!
//! Writes run as one Lua script so condition checks, stale index cleanup, and
//! the writes themselves are atomic. Each item hash carries a hidden field
//! listing the index keys it was added to; the script reads it to remove stale
//! entries on overwrite, and reads strip it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bb8_redis::redis::{self, RedisError};
use serde::Serialize;
use tracing::debug;

use super::item_store::{
    IndexEntry, IndexQuery, Item, ItemKey, ItemStore, ItemStoreError, ItemWrite, TableSchema,
    WriteCondition,
};
use crate::outbound::{PoolError, RedisPool};

const INDEX_KEYS_FIELD: &str = "__index_keys";
const CONDITION_FAILED: &str = "CONDITION_FAILED";

const WRITE_SCRIPT: &str = r#"
local writes = cjson.decode(ARGV[1])
for _, write in ipairs(writes) do
  if write.if_absent and redis.call('EXISTS', write.key) == 1 then
    return redis.error_reply('CONDITION_FAILED ' .. write.key)
  end
end
for _, write in ipairs(writes) do
  local previous = redis.call('HGET', write.key, ARGV[2])
  if previous then
    for _, index_key in ipairs(cjson.decode(previous)) do
      redis.call('ZREM', index_key, write.key)
    end
  end
  redis.call('DEL', write.key)
  redis.call('HSET', write.key, unpack(write.fields))
  for _, index_key in ipairs(write.index_keys) do
    redis.call('ZADD', index_key, 0, write.key)
  end
end
return #writes
"#;

#[derive(Debug, Serialize)]
struct ScriptWrite {
    key: String,
    if_absent: bool,
    fields: Vec<String>,
    index_keys: Vec<String>,
}

/// [`ItemStore`] over a pooled Redis connection.
#[derive(Clone)]
pub struct RedisItemStore {
    pool: RedisPool,
    schema: TableSchema,
}

impl RedisItemStore {
    /// Create a store for `schema` using connections from `pool`.
    pub fn new(pool: RedisPool, schema: TableSchema) -> Self {
        Self { pool, schema }
    }

    fn item_key(&self, key: &ItemKey) -> String {
        format!(
            "{}:item:{}:{}",
            escape(&self.schema.name),
            escape(&key.partition),
            escape(&key.sort)
        )
    }

    fn index_key(&self, entry: &IndexEntry) -> String {
        format!(
            "{}:index:{}:{}:{}",
            escape(&self.schema.name),
            escape(&entry.index),
            escape(&entry.partition),
            escape(&entry.sort)
        )
    }

    fn encode_writes(&self, writes: Vec<ItemWrite>) -> Result<String, ItemStoreError> {
        let mut seen = HashSet::with_capacity(writes.len());
        let mut encoded = Vec::with_capacity(writes.len());
        for write in writes {
            let item_key = self.schema.key_of(&write.item)?;
            if !seen.insert(item_key.clone()) {
                return Err(ItemStoreError::command(format!(
                    "transaction writes {item_key} more than once"
                )));
            }
            let key = self.item_key(&item_key);
            let index_keys: Vec<String> = self
                .schema
                .index_entries(&write.item)
                .iter()
                .map(|entry| self.index_key(entry))
                .collect();
            let hidden = serde_json::to_string(&index_keys)
                .map_err(|err| ItemStoreError::command(err.to_string()))?;

            let mut fields = Vec::with_capacity(write.item.len() * 2 + 2);
            for (name, value) in write.item.attributes() {
                fields.push(name.to_owned());
                fields.push(value.to_owned());
            }
            fields.push(INDEX_KEYS_FIELD.to_owned());
            fields.push(hidden);

            encoded.push(ScriptWrite {
                key,
                if_absent: write.condition == WriteCondition::IfAbsent,
                fields,
                index_keys,
            });
        }
        serde_json::to_string(&encoded).map_err(|err| ItemStoreError::command(err.to_string()))
    }

    async fn run_writes(&self, writes: Vec<ItemWrite>) -> Result<(), ItemStoreError> {
        let count = writes.len();
        let payload = self.encode_writes(writes)?;
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let written: i64 = redis::cmd("EVAL")
            .arg(WRITE_SCRIPT)
            .arg(0)
            .arg(payload)
            .arg(INDEX_KEYS_FIELD)
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        debug!(table = %self.schema.name, requested = count, written, "item write applied");
        Ok(())
    }
}

#[async_trait]
impl ItemStore for RedisItemStore {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn put(&self, write: ItemWrite) -> Result<(), ItemStoreError> {
        self.run_writes(vec![write]).await
    }

    async fn transact_put(&self, writes: Vec<ItemWrite>) -> Result<(), ItemStoreError> {
        if writes.is_empty() {
            return Ok(());
        }
        self.run_writes(writes).await
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, ItemStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(self.item_key(key))
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(decode_item(fields))
    }

    async fn query_index(
        &self,
        query: &IndexQuery,
        limit: usize,
    ) -> Result<Vec<Item>, ItemStoreError> {
        self.schema.require_index(&query.index)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let index_key = self.index_key(&IndexEntry {
            index: query.index.clone(),
            partition: query.partition.clone(),
            sort: query.sort.clone(),
        });

        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let item_keys: Vec<String> = redis::cmd("ZRANGE")
            .arg(&index_key)
            .arg(0)
            .arg(limit.saturating_sub(1))
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        if item_keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut pipe = redis::pipe();
        for item_key in &item_keys {
            pipe.cmd("HGETALL").arg(item_key);
        }
        let rows: Vec<HashMap<String, String>> = pipe
            .query_async(&mut *conn)
            .await
            .map_err(map_redis_error)?;
        Ok(rows.into_iter().filter_map(decode_item).collect())
    }
}

fn decode_item(mut fields: HashMap<String, String>) -> Option<Item> {
    fields.remove(INDEX_KEYS_FIELD);
    if fields.is_empty() {
        return None;
    }
    Some(fields.into_iter().collect())
}

fn escape(component: &str) -> String {
    component.replace('%', "%25").replace(':', "%3A")
}

fn map_pool_error(error: PoolError) -> ItemStoreError {
    ItemStoreError::connection(error.message())
}

fn map_redis_error(error: RedisError) -> ItemStoreError {
    if error.code() == Some(CONDITION_FAILED) {
        let key = error.detail().unwrap_or_default().trim();
        return ItemStoreError::condition_failed(key);
    }
    if error.is_io_error()
        || error.is_connection_refusal()
        || error.is_connection_dropped()
        || error.is_timeout()
    {
        return ItemStoreError::connection(error.to_string());
    }
    ItemStoreError::command(error.to_string())
}
