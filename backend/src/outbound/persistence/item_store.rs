//! Key-value item store abstraction for single-table layouts.
//!
//! An item is a flat map of string attributes. Every table has a composite
//! primary key (partition + sort attribute) and any number of secondary
//! indexes, each keyed by another pair of attributes. Stores maintain index
//! entries on every write, including removing entries that an overwrite made
//! stale.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::domain::ports::define_port_error;

define_port_error! {
    /// Errors raised by item store implementations.
    pub enum ItemStoreError {
        /// The store could not be reached.
        Connection { message: String } => "item store connection failed: {message}",
        /// The store rejected or failed a command.
        Command { message: String } => "item store command failed: {message}",
        /// A conditional write found an existing item.
        ConditionFailed { key: String } => "conditional write failed for {key}",
        /// An item lacks one of the table's key attributes.
        MissingKeyAttribute { attribute: String } => "item is missing key attribute `{attribute}`",
        /// The requested secondary index is not part of the table schema.
        UnknownIndex { index: String } => "unknown secondary index `{index}`",
    }
}

/// Flat string attribute map stored under one primary key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    attributes: BTreeMap<String, String>,
}

impl Item {
    /// Create an empty item.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Read an attribute.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Iterate over attributes in name order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Whether the item carries no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl FromIterator<(String, String)> for Item {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            attributes: iter.into_iter().collect(),
        }
    }
}

/// Composite primary key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    /// Partition key value.
    pub partition: String,
    /// Sort key value.
    pub sort: String,
}

impl ItemKey {
    /// Build a key from its two components.
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// Secondary index definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    /// Index name used in queries.
    pub name: String,
    /// Attribute holding the index partition value.
    pub partition_attribute: String,
    /// Attribute holding the index sort value.
    pub sort_attribute: String,
}

/// Position of one item inside one secondary index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexEntry {
    /// Index name.
    pub index: String,
    /// Index partition value.
    pub partition: String,
    /// Index sort value.
    pub sort: String,
}

/// Table definition: name, primary key attributes, and secondary indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Table identifier.
    pub name: String,
    /// Attribute holding the partition key.
    pub partition_attribute: String,
    /// Attribute holding the sort key.
    pub sort_attribute: String,
    /// Secondary indexes maintained on write.
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// Table keyed by `PK`/`SK` with no secondary indexes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_attribute: "PK".to_owned(),
            sort_attribute: "SK".to_owned(),
            indexes: Vec::new(),
        }
    }

    /// Add a secondary index.
    #[must_use]
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        partition_attribute: impl Into<String>,
        sort_attribute: impl Into<String>,
    ) -> Self {
        self.indexes.push(IndexSchema {
            name: name.into(),
            partition_attribute: partition_attribute.into(),
            sort_attribute: sort_attribute.into(),
        });
        self
    }

    /// Extract the primary key of `item`.
    ///
    /// # Errors
    /// Returns [`ItemStoreError::MissingKeyAttribute`] when either key
    /// attribute is absent.
    pub fn key_of(&self, item: &Item) -> Result<ItemKey, ItemStoreError> {
        let attribute = |name: &str| {
            item.get(name)
                .map(str::to_owned)
                .ok_or_else(|| ItemStoreError::missing_key_attribute(name))
        };
        Ok(ItemKey {
            partition: attribute(&self.partition_attribute)?,
            sort: attribute(&self.sort_attribute)?,
        })
    }

    /// Index entries `item` participates in.
    ///
    /// Items lacking either attribute of an index are simply absent from it.
    pub fn index_entries(&self, item: &Item) -> Vec<IndexEntry> {
        self.indexes
            .iter()
            .filter_map(|index| {
                let partition = item.get(&index.partition_attribute)?;
                let sort = item.get(&index.sort_attribute)?;
                Some(IndexEntry {
                    index: index.name.clone(),
                    partition: partition.to_owned(),
                    sort: sort.to_owned(),
                })
            })
            .collect()
    }

    /// Check that `index` is defined on this table.
    ///
    /// # Errors
    /// Returns [`ItemStoreError::UnknownIndex`] otherwise.
    pub fn require_index(&self, index: &str) -> Result<&IndexSchema, ItemStoreError> {
        self.indexes
            .iter()
            .find(|candidate| candidate.name == index)
            .ok_or_else(|| ItemStoreError::unknown_index(index))
    }
}

/// Precondition attached to a write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteCondition {
    /// Overwrite whatever is stored under the key.
    #[default]
    Always,
    /// Fail with [`ItemStoreError::ConditionFailed`] when the key exists.
    IfAbsent,
}

/// One item write with its precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWrite {
    /// Item to store; must carry both key attributes.
    pub item: Item,
    /// Precondition checked before writing.
    pub condition: WriteCondition,
}

impl ItemWrite {
    /// Unconditional write.
    pub fn put(item: Item) -> Self {
        Self {
            item,
            condition: WriteCondition::Always,
        }
    }

    /// Write that fails if the key already exists.
    pub fn put_if_absent(item: Item) -> Self {
        Self {
            item,
            condition: WriteCondition::IfAbsent,
        }
    }
}

/// Exact-match lookup on a secondary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexQuery {
    /// Index name.
    pub index: String,
    /// Required index partition value.
    pub partition: String,
    /// Required index sort value.
    pub sort: String,
}

/// Key-value store holding one single-table layout.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Schema this store was built for.
    fn schema(&self) -> &TableSchema;

    /// Store one item.
    async fn put(&self, write: ItemWrite) -> Result<(), ItemStoreError>;

    /// Store several items atomically.
    ///
    /// Every condition is checked before anything is written; if one fails,
    /// nothing is written.
    async fn transact_put(&self, writes: Vec<ItemWrite>) -> Result<(), ItemStoreError>;

    /// Point lookup by primary key.
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, ItemStoreError>;

    /// Items matching `query`, ordered by primary key, at most `limit`.
    async fn query_index(
        &self,
        query: &IndexQuery,
        limit: usize,
    ) -> Result<Vec<Item>, ItemStoreError>;
}
