//! `UserRepository` adapter over the single-table item store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{UserPersistenceError, UserRepository};
use crate::domain::{EmailAddress, User, UserId};

use super::item_store::{Item, ItemStore, ItemStoreError, ItemWrite};
use super::models::{email_guard_item, email_query, user_from_item, user_item, user_key};

/// User repository storing records in one table with an email index.
#[derive(Clone)]
pub struct SingleTableUserRepository {
    store: Arc<dyn ItemStore>,
}

impl SingleTableUserRepository {
    /// Create a repository over `store`.
    ///
    /// The store must have been built with
    /// [`users_table`](super::users_table) so the email index exists.
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    fn decode(&self, item: &Item) -> Result<User, UserPersistenceError> {
        user_from_item(item).map_err(|err| {
            warn!(table = %self.store.schema().name, error = %err, "malformed user record");
            UserPersistenceError::malformed_record(err.to_string())
        })
    }
}

fn map_store_error(error: ItemStoreError) -> UserPersistenceError {
    match error {
        ItemStoreError::Connection { message } => UserPersistenceError::connection(message),
        other => UserPersistenceError::query(other.to_string()),
    }
}

#[async_trait]
impl UserRepository for SingleTableUserRepository {
    async fn create(&self, user: &User) -> Result<(), UserPersistenceError> {
        self.store
            .put(ItemWrite::put(user_item(user)))
            .await
            .map_err(map_store_error)
    }

    async fn create_unique(&self, user: &User) -> Result<(), UserPersistenceError> {
        let writes = vec![
            ItemWrite::put(user_item(user)),
            ItemWrite::put_if_absent(email_guard_item(user)),
        ];
        self.store
            .transact_put(writes)
            .await
            .map_err(|error| match error {
                ItemStoreError::ConditionFailed { .. } => {
                    UserPersistenceError::email_taken(user.email().as_ref())
                }
                other => map_store_error(other),
            })
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserPersistenceError> {
        let item = self
            .store
            .get(&user_key(id))
            .await
            .map_err(map_store_error)?;
        item.map(|item| self.decode(&item)).transpose()
    }

    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<User>, UserPersistenceError> {
        let items = self
            .store
            .query_index(&email_query(email), 1)
            .await
            .map_err(map_store_error)?;
        items
            .first()
            .map(|item| self.decode(item))
            .transpose()
    }
}
