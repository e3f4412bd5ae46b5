//! Single-table record layout for users and email guards.
//!
//! User records live at (`<id>`, `USER#`) and carry the denormalised
//! `GSI1SK = EMAIL#<email>` attribute, so the `GSI1SK` index keyed by
//! (`SK`, `GSI1SK`) answers lookups by email. Guard records live at
//! (`EMAIL#<email>`, `EMAIL#`) and exist only to make email ownership a
//! conditional write.

use crate::domain::{EmailAddress, User, UserId, UserName, UserValidationError};

use super::item_store::{IndexQuery, Item, ItemKey, TableSchema};

pub(crate) const PARTITION_KEY: &str = "PK";
pub(crate) const SORT_KEY: &str = "SK";
pub(crate) const EMAIL_INDEX: &str = "GSI1SK";
pub(crate) const USER_SORT_KEY: &str = "USER#";
pub(crate) const EMAIL_PREFIX: &str = "EMAIL#";

const NAME: &str = "name";
const EMAIL: &str = "email";
const USER_ID: &str = "user_id";

/// Schema of the users table.
pub fn users_table(name: impl Into<String>) -> TableSchema {
    TableSchema::new(name).with_index(EMAIL_INDEX, SORT_KEY, EMAIL_INDEX)
}

fn email_sort_value(email: &EmailAddress) -> String {
    format!("{EMAIL_PREFIX}{email}")
}

pub(crate) fn user_key(id: &UserId) -> ItemKey {
    ItemKey::new(id.as_ref(), USER_SORT_KEY)
}

pub(crate) fn email_query(email: &EmailAddress) -> IndexQuery {
    IndexQuery {
        index: EMAIL_INDEX.to_owned(),
        partition: USER_SORT_KEY.to_owned(),
        sort: email_sort_value(email),
    }
}

pub(crate) fn user_item(user: &User) -> Item {
    Item::new()
        .with(PARTITION_KEY, user.id().as_ref())
        .with(SORT_KEY, USER_SORT_KEY)
        .with(NAME, user.name().as_ref())
        .with(EMAIL, user.email().as_ref())
        .with(EMAIL_INDEX, email_sort_value(user.email()))
}

pub(crate) fn email_guard_item(user: &User) -> Item {
    Item::new()
        .with(PARTITION_KEY, email_sort_value(user.email()))
        .with(SORT_KEY, EMAIL_PREFIX)
        .with(USER_ID, user.id().as_ref())
}

/// Reasons a stored item cannot be read back as a user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum RecordError {
    #[error("attribute `{0}` is missing")]
    Missing(&'static str),
    #[error("attribute `{attribute}` is invalid: {reason}")]
    Invalid {
        attribute: &'static str,
        reason: String,
    },
}

pub(crate) fn user_from_item(item: &Item) -> Result<User, RecordError> {
    let attribute = |name: &'static str| item.get(name).ok_or(RecordError::Missing(name));
    let invalid = |attribute: &'static str| {
        move |err: UserValidationError| RecordError::Invalid {
            attribute,
            reason: err.to_string(),
        }
    };

    let id = UserId::new(attribute(PARTITION_KEY)?).map_err(invalid(PARTITION_KEY))?;
    let name = UserName::new(attribute(NAME)?).map_err(invalid(NAME))?;
    let email = EmailAddress::new(attribute(EMAIL)?).map_err(invalid(EMAIL))?;
    Ok(User::new(id, name, email))
}
