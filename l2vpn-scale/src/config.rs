//! Session credentials loaded from the environment.

use std::fmt;

use log::debug;
use secrecy::{ExposeSecret, SecretString};

use crate::error::ConfigError;

/// Environment variable holding the device login name.
pub const USERNAME_VAR: &str = "username";

/// Environment variable holding the device login password.
pub const PASSWORD_VAR: &str = "password";

/// Username/password pair used to log into the lab devices.
///
/// Built once at startup and handed to the connector; nothing reads the
/// environment after that.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Create credentials directly.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Load credentials from the process environment, reading `.env` first
    /// if one exists in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(ConfigError::Dotenv(e.to_string())),
        }

        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    ///
    /// Unset and empty values are both treated as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |var: &'static str| {
            lookup(var)
                .filter(|value| !value.is_empty())
                .ok_or(ConfigError::MissingCredential { var })
        };

        let username = fetch(USERNAME_VAR)?;
        let password = fetch(PASSWORD_VAR)?;

        Ok(Self::new(username, password))
    }

    /// The login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The login password.
    pub fn password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |var| {
            pairs
                .iter()
                .find(|(k, _)| *k == var)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_from_lookup() {
        let creds =
            Credentials::from_lookup(lookup(&[("username", "lab"), ("password", "s3cret")]))
                .unwrap();
        assert_eq!(creds.username(), "lab");
        assert_eq!(creds.password(), "s3cret");
    }

    #[test]
    fn test_missing_username() {
        let err = Credentials::from_lookup(lookup(&[("password", "s3cret")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential { var: "username" }
        ));
    }

    #[test]
    fn test_empty_password_is_missing() {
        let err =
            Credentials::from_lookup(lookup(&[("username", "lab"), ("password", "")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredential { var: "password" }
        ));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("lab", "s3cret");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("lab"));
        assert!(!debug.contains("s3cret"));
    }
}
