//! Single-table persistence adapters.
//!
//! Users are stored in one key-value table through the [`ItemStore`]
//! abstraction, which has an in-memory and a Redis implementation.
//!
//! - **Thin adapters**: [`SingleTableUserRepository`] only translates between
//!   items and domain types; the record layout lives in `models.rs`.
//! - **Index maintenance** belongs to the stores, so the repository never
//!   touches index entries directly.
//! - **Strongly typed errors**: store failures are mapped to
//!   `UserPersistenceError` before reaching the domain.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use user_service::outbound::persistence::{
//!     InMemoryItemStore, SingleTableUserRepository, users_table,
//! };
//!
//! let store = Arc::new(InMemoryItemStore::new(users_table("users")));
//! let _repo = SingleTableUserRepository::new(store);
//! ```

mod in_memory_item_store;
mod item_store;
mod models;
mod redis_item_store;
mod single_table_user_repository;

pub use in_memory_item_store::InMemoryItemStore;
#[cfg(test)]
pub use item_store::MockItemStore;
pub use item_store::{
    IndexEntry, IndexQuery, IndexSchema, Item, ItemKey, ItemStore, ItemStoreError, ItemWrite,
    TableSchema, WriteCondition,
};
pub use models::users_table;
pub use redis_item_store::RedisItemStore;
pub use single_table_user_repository::SingleTableUserRepository;
