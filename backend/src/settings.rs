//! Service configuration loaded via OrthoConfig.
//!
//! Every value may come from the command line or from a `USERS_`-prefixed
//! environment variable. Unset values take the declared defaults; names are
//! checked and the enumerated settings parsed on access so a typo is reported
//! with the accepted spellings.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{EmailUniqueness, EventFormat, UnknownEmailUniqueness, UnknownEventFormat};

const DEFAULT_TABLE_NAME: &str = "users";
const DEFAULT_STREAM_NAME: &str = "user-events";
const DEFAULT_BIND_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_EVENT_FORMAT: &str = "tagged";
const DEFAULT_EMAIL_UNIQUENESS: &str = "guarded";

/// Raised when configuration cannot be loaded or holds an invalid value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// Sources could not be read or merged.
    #[error("failed to load configuration: {message}")]
    Load { message: String },
    /// `USERS_EVENT_FORMAT` is not recognised.
    #[error(transparent)]
    EventFormat(#[from] UnknownEventFormat),
    /// `USERS_EMAIL_UNIQUENESS` is not recognised.
    #[error(transparent)]
    EmailUniqueness(#[from] UnknownEmailUniqueness),
    /// A name that must be non-empty is blank.
    #[error("`{setting}` must not be blank")]
    Blank { setting: &'static str },
}

/// Runtime settings for the user service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "USERS")]
pub struct ServiceSettings {
    /// Store table identifier.
    #[ortho_config(default = DEFAULT_TABLE_NAME.to_owned())]
    pub table_name: String,
    /// Event stream identifier.
    #[ortho_config(default = DEFAULT_STREAM_NAME.to_owned())]
    pub stream_name: String,
    /// Listen port.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Listen host.
    #[ortho_config(default = DEFAULT_BIND_HOST.to_owned())]
    pub bind_host: String,
    /// Redis URL shared by the store and the stream; unset selects the
    /// in-memory adapters.
    pub redis_url: Option<String>,
    /// `tagged` or `envelope`.
    #[ortho_config(default = DEFAULT_EVENT_FORMAT.to_owned())]
    pub event_format: String,
    /// `guarded` or `check-then-write`.
    #[ortho_config(default = DEFAULT_EMAIL_UNIQUENESS.to_owned())]
    pub email_uniqueness: String,
}

fn non_blank<'a>(value: &'a str, setting: &'static str) -> Result<&'a str, SettingsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::Blank { setting });
    }
    Ok(trimmed)
}

impl ServiceSettings {
    /// Load settings from the process arguments and environment.
    ///
    /// # Errors
    /// Returns [`SettingsError::Load`] when a source cannot be parsed.
    pub fn load_from_process() -> Result<Self, SettingsError> {
        Self::load_from_iter(std::env::args_os()).map_err(|err| SettingsError::Load {
            message: err.to_string(),
        })
    }

    /// Store table identifier, defaulting to `users`.
    ///
    /// # Errors
    /// Returns [`SettingsError::Blank`] when set to whitespace.
    pub fn table_name(&self) -> Result<&str, SettingsError> {
        non_blank(&self.table_name, "table_name")
    }

    /// Stream identifier, defaulting to `user-events`.
    ///
    /// # Errors
    /// Returns [`SettingsError::Blank`] when set to whitespace.
    pub fn stream_name(&self) -> Result<&str, SettingsError> {
        non_blank(&self.stream_name, "stream_name")
    }

    /// Listen host, defaulting to all interfaces.
    ///
    /// # Errors
    /// Returns [`SettingsError::Blank`] when set to whitespace.
    pub fn bind_host(&self) -> Result<&str, SettingsError> {
        non_blank(&self.bind_host, "bind_host")
    }

    /// Listen port, defaulting to 8080.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redis URL, if one is configured and non-blank.
    pub fn redis_url(&self) -> Option<&str> {
        self.redis_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Event wire format, defaulting to `tagged`.
    ///
    /// # Errors
    /// Returns [`SettingsError::EventFormat`] for unknown names.
    pub fn event_format(&self) -> Result<EventFormat, SettingsError> {
        self.event_format
            .parse::<EventFormat>()
            .map_err(SettingsError::from)
    }

    /// Email uniqueness strategy, defaulting to `guarded`.
    ///
    /// # Errors
    /// Returns [`SettingsError::EmailUniqueness`] for unknown names.
    pub fn email_uniqueness(&self) -> Result<EmailUniqueness, SettingsError> {
        self.email_uniqueness
            .parse::<EmailUniqueness>()
            .map_err(SettingsError::from)
    }
}

#[cfg(test)]
mod tests {
    //! Configuration loading against the environment.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 7] = [
        "USERS_TABLE_NAME",
        "USERS_STREAM_NAME",
        "USERS_PORT",
        "USERS_BIND_HOST",
        "USERS_REDIS_URL",
        "USERS_EVENT_FORMAT",
        "USERS_EMAIL_UNIQUENESS",
    ];

    fn load_from_empty_args() -> ServiceSettings {
        ServiceSettings::load_from_iter([OsString::from("user-service")])
            .expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));

        let settings = load_from_empty_args();
        assert_eq!(settings.table_name(), Ok("users"));
        assert_eq!(settings.stream_name(), Ok("user-events"));
        assert_eq!(settings.bind_host(), Ok("0.0.0.0"));
        assert_eq!(settings.port(), 8080);
        assert_eq!(settings.redis_url(), None);
        assert_eq!(settings.event_format(), Ok(EventFormat::Tagged));
        assert_eq!(settings.email_uniqueness(), Ok(EmailUniqueness::Guarded));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("USERS_TABLE_NAME", Some("people".to_owned())),
            ("USERS_STREAM_NAME", Some("people-events".to_owned())),
            ("USERS_PORT", Some("9090".to_owned())),
            ("USERS_BIND_HOST", Some("127.0.0.1".to_owned())),
            ("USERS_REDIS_URL", Some("redis://cache:6379".to_owned())),
            ("USERS_EVENT_FORMAT", Some("envelope".to_owned())),
            ("USERS_EMAIL_UNIQUENESS", Some("check-then-write".to_owned())),
        ]);

        let settings = load_from_empty_args();
        assert_eq!(settings.table_name(), Ok("people"));
        assert_eq!(settings.stream_name(), Ok("people-events"));
        assert_eq!(settings.port(), 9090);
        assert_eq!(settings.bind_host(), Ok("127.0.0.1"));
        assert_eq!(settings.redis_url(), Some("redis://cache:6379"));
        assert_eq!(settings.event_format(), Ok(EventFormat::Envelope));
        assert_eq!(
            settings.email_uniqueness(),
            Ok(EmailUniqueness::CheckThenWrite)
        );
    }

    #[rstest]
    fn invalid_values_are_reported_on_access() {
        let settings = ServiceSettings {
            table_name: "   ".to_owned(),
            stream_name: "user-events".to_owned(),
            port: 8080,
            bind_host: "0.0.0.0".to_owned(),
            redis_url: Some(" ".to_owned()),
            event_format: "protobuf".to_owned(),
            email_uniqueness: "hope".to_owned(),
        };

        assert_eq!(
            settings.table_name(),
            Err(SettingsError::Blank {
                setting: "table_name"
            })
        );
        assert_eq!(settings.redis_url(), None);
        assert!(matches!(
            settings.event_format(),
            Err(SettingsError::EventFormat(_))
        ));
        assert!(matches!(
            settings.email_uniqueness(),
            Err(SettingsError::EmailUniqueness(_))
        ));
    }
}
