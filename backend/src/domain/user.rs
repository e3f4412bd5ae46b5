//! User data model.
//!
//! Validation is limited to presence: identifiers must be UUIDs because the
//! service generates them, while names and emails only need to be non-blank.

use std::fmt;

use uuid::Uuid;

/// Validation errors returned by the user value constructors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserValidationError {
    EmptyId,
    InvalidId,
    EmptyName,
    EmptyEmail,
}

impl UserValidationError {
    /// Field the error refers to, using the wire naming.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::EmptyId | Self::InvalidId => "id",
            Self::EmptyName => "name",
            Self::EmptyEmail => "email",
        }
    }

    /// Machine-readable reason code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::EmptyId => "empty_id",
            Self::InvalidId => "invalid_id",
            Self::EmptyName => "missing_name",
            Self::EmptyEmail => "missing_email",
        }
    }
}

impl fmt::Display for UserValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyId => write!(f, "user id must not be empty"),
            Self::InvalidId => write!(f, "user id must be a valid UUID"),
            Self::EmptyName => write!(f, "name must not be empty"),
            Self::EmptyEmail => write!(f, "email must not be empty"),
        }
    }
}

impl std::error::Error for UserValidationError {}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(Uuid, String);

impl UserId {
    /// Validate and construct a [`UserId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(UserValidationError::InvalidId);
        }

        let parsed = Uuid::parse_str(id).map_err(|_| UserValidationError::InvalidId)?;
        Ok(Self(parsed, id.to_owned()))
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        let uuid = Uuid::new_v4();
        Self(uuid, uuid.to_string())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

macro_rules! non_blank_text {
    ($(#[$meta:meta])* $name:ident, $empty:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(String);

        impl $name {
            /// Validate and construct the value from owned input.
            pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(UserValidationError::$empty);
                }
                Ok(Self(value))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_ref())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

non_blank_text!(
    /// Display name for the user.
    UserName,
    EmptyName
);

non_blank_text!(
    /// Email address; unique across users and used as the secondary lookup key.
    ///
    /// Stored exactly as submitted. No format validation is applied.
    EmailAddress,
    EmptyEmail
);

/// Registration input: the fields a client supplies for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Display name.
    pub name: UserName,
    /// Email address to register.
    pub email: EmailAddress,
}

impl NewUser {
    /// Build a registration request from optional raw parts.
    ///
    /// Missing and blank values are both rejected; `name` is checked first.
    pub fn try_from_parts(
        name: Option<String>,
        email: Option<String>,
    ) -> Result<Self, UserValidationError> {
        let name = UserName::new(name.unwrap_or_default())?;
        let email = EmailAddress::new(email.unwrap_or_default())?;
        Ok(Self { name, email })
    }
}

/// Registered user.
///
/// ## Invariants
/// - `id` is a valid UUID string and never changes.
/// - `name` and `email` are non-empty once trimmed of whitespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: UserName,
    email: EmailAddress,
}

impl User {
    /// Build a new [`User`] from validated components.
    pub fn new(id: UserId, name: UserName, email: EmailAddress) -> Self {
        Self { id, name, email }
    }

    /// Fallible constructor from raw strings.
    pub fn try_from_strings(
        id: impl AsRef<str>,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<Self, UserValidationError> {
        Ok(Self::new(
            UserId::new(id)?,
            UserName::new(name)?,
            EmailAddress::new(email)?,
        ))
    }

    /// Stable user identifier.
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &UserName {
        &self.name
    }

    /// Registered email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }
}
