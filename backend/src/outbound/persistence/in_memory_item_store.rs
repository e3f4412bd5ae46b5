//! Process-local item store used when no Redis URL is configured and in
//! tests.
//!
//! Data lives for the lifetime of the process. Index maintenance mirrors the
//! Redis adapter: an overwrite drops the previous item's index entries before
//! adding the new ones.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::item_store::{
    IndexEntry, IndexQuery, Item, ItemKey, ItemStore, ItemStoreError, ItemWrite, TableSchema,
    WriteCondition,
};

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<ItemKey, Item>,
    index: BTreeMap<IndexEntry, BTreeSet<ItemKey>>,
}

impl Tables {
    fn check(&self, key: &ItemKey, condition: WriteCondition) -> Result<(), ItemStoreError> {
        match condition {
            WriteCondition::IfAbsent if self.items.contains_key(key) => {
                Err(ItemStoreError::condition_failed(key.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn apply(&mut self, schema: &TableSchema, key: ItemKey, item: Item) {
        if let Some(previous) = self.items.get(&key) {
            for entry in schema.index_entries(previous) {
                if let Some(keys) = self.index.get_mut(&entry) {
                    keys.remove(&key);
                    if keys.is_empty() {
                        self.index.remove(&entry);
                    }
                }
            }
        }
        for entry in schema.index_entries(&item) {
            self.index.entry(entry).or_default().insert(key.clone());
        }
        self.items.insert(key, item);
    }
}

/// In-memory [`ItemStore`].
#[derive(Debug)]
pub struct InMemoryItemStore {
    schema: TableSchema,
    tables: RwLock<Tables>,
}

impl InMemoryItemStore {
    /// Create an empty store for `schema`.
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of stored items, including guard records.
    pub async fn len(&self) -> usize {
        self.tables.read().await.items.len()
    }

    /// Whether the store holds no items.
    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.items.is_empty()
    }
}

#[async_trait]
impl ItemStore for InMemoryItemStore {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn put(&self, write: ItemWrite) -> Result<(), ItemStoreError> {
        let key = self.schema.key_of(&write.item)?;
        let mut tables = self.tables.write().await;
        tables.check(&key, write.condition)?;
        tables.apply(&self.schema, key, write.item);
        Ok(())
    }

    async fn transact_put(&self, writes: Vec<ItemWrite>) -> Result<(), ItemStoreError> {
        let mut seen = HashSet::with_capacity(writes.len());
        let mut keyed = Vec::with_capacity(writes.len());
        for write in writes {
            let key = self.schema.key_of(&write.item)?;
            if !seen.insert(key.clone()) {
                return Err(ItemStoreError::command(format!(
                    "transaction writes {key} more than once"
                )));
            }
            keyed.push((key, write));
        }

        let mut tables = self.tables.write().await;
        for (key, write) in &keyed {
            tables.check(key, write.condition)?;
        }
        for (key, write) in keyed {
            tables.apply(&self.schema, key, write.item);
        }
        Ok(())
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, ItemStoreError> {
        Ok(self.tables.read().await.items.get(key).cloned())
    }

    async fn query_index(
        &self,
        query: &IndexQuery,
        limit: usize,
    ) -> Result<Vec<Item>, ItemStoreError> {
        self.schema.require_index(&query.index)?;
        let entry = IndexEntry {
            index: query.index.clone(),
            partition: query.partition.clone(),
            sort: query.sort.clone(),
        };
        let tables = self.tables.read().await;
        let Some(keys) = tables.index.get(&entry) else {
            return Ok(Vec::new());
        };
        Ok(keys
            .iter()
            .filter_map(|key| tables.items.get(key).cloned())
            .take(limit)
            .collect())
    }
}
