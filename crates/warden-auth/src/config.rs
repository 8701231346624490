//! Authentication configuration.
//!
//! This module provides the configuration consumed by the auth core: the
//! ordered list of signing secrets, token and session lifetimes, the refresh
//! rotation policy, and the identity backend selection.

use std::collections::HashMap;
use std::time::Duration;

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Serialize};

/// Root authentication configuration.
///
/// # Example (TOML)
///
/// ```toml
/// [auth]
/// issuer = "https://data.example.com"
/// secret_keys = ["NEW_SECRET", "OLD_SECRET"]
/// access_token_max_age = "15m"
/// session_max_age = "7d"
///
/// [auth.authenticator]
/// provider = "dictionary"
/// users = { alice = "secret1", bob = "secret2" }
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Issuer value placed in the `iss` claim of every token.
    pub issuer: String,

    /// Signing secrets, newest first.
    /// The first secret signs new tokens; every secret is accepted for verification.
    pub secret_keys: Vec<String>,

    /// Access token lifetime.
    /// Also bounds how long an access token stays usable after its session is revoked.
    #[serde(with = "humantime_serde")]
    pub access_token_max_age: Duration,

    /// Session lifetime, measured from the initial login.
    #[serde(with = "humantime_serde")]
    pub session_max_age: Duration,

    /// Optional refresh token lifetime. Always capped by the session expiry.
    #[serde(default, with = "humantime_serde")]
    pub refresh_token_max_age: Option<Duration>,

    /// Make refresh tokens single-use.
    /// When enabled, each refresh consumes the presented refresh token and
    /// returns a new one.
    pub refresh_token_rotation: bool,

    /// Identities allowed to revoke sessions they do not own.
    pub admins: Vec<String>,

    /// Identity verification backend.
    pub authenticator: AuthenticatorConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            issuer: "warden".to_string(),
            secret_keys: Vec::new(),
            access_token_max_age: Duration::from_secs(15 * 60), // 15 minutes
            session_max_age: Duration::from_secs(7 * 24 * 3600), // 7 days
            refresh_token_max_age: None,
            refresh_token_rotation: false,
            admins: Vec::new(),
            authenticator: AuthenticatorConfig::default(),
        }
    }
}

/// Identity backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "provider", rename_all = "snake_case")]
pub enum AuthenticatorConfig {
    /// Fixed username → password table.
    Dictionary {
        /// Plaintext passwords keyed by username.
        #[serde(default)]
        users: HashMap<String, String>,
    },
    /// Username → Argon2 PHC hash table.
    Argon2 {
        /// PHC-formatted password hashes keyed by username.
        #[serde(default)]
        users: HashMap<String, String>,
    },
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self::Dictionary {
            users: HashMap::new(),
        }
    }
}

/// Longest accepted lifetime for sessions and tokens (100 years).
pub const MAX_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),
}

impl AuthConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if no secret keys are configured, and
    /// `ConfigError::InvalidValue` if:
    /// - The issuer is empty
    /// - A secret key is empty or listed twice
    /// - A lifetime is zero or longer than [`MAX_LIFETIME`]
    /// - An Argon2 user entry is not a valid PHC hash
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::InvalidValue(
                "issuer cannot be empty".to_string(),
            ));
        }

        if self.secret_keys.is_empty() {
            return Err(ConfigError::Missing("secret_keys".to_string()));
        }

        for (position, secret) in self.secret_keys.iter().enumerate() {
            if secret.is_empty() {
                return Err(ConfigError::InvalidValue(format!(
                    "secret_keys[{position}] cannot be empty"
                )));
            }
            if self.secret_keys[..position].contains(secret) {
                return Err(ConfigError::InvalidValue(format!(
                    "secret_keys[{position}] duplicates an earlier secret"
                )));
            }
        }

        let lifetimes = [
            ("access_token_max_age", Some(self.access_token_max_age)),
            ("session_max_age", Some(self.session_max_age)),
            ("refresh_token_max_age", self.refresh_token_max_age),
        ];
        for (name, lifetime) in lifetimes {
            if lifetime.is_some_and(|age| age > MAX_LIFETIME) {
                return Err(ConfigError::InvalidValue(format!(
                    "{name} must not exceed 100 years"
                )));
            }
        }

        if self.access_token_max_age.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_max_age must be > 0".to_string(),
            ));
        }

        if self.session_max_age.is_zero() {
            return Err(ConfigError::InvalidValue(
                "session_max_age must be > 0".to_string(),
            ));
        }

        if self.refresh_token_max_age.is_some_and(|age| age.is_zero()) {
            return Err(ConfigError::InvalidValue(
                "refresh_token_max_age must be > 0".to_string(),
            ));
        }

        if let AuthenticatorConfig::Argon2 { users } = &self.authenticator {
            for (username, hash) in users {
                if PasswordHash::new(hash).is_err() {
                    return Err(ConfigError::InvalidValue(format!(
                        "password hash for user '{username}' is not a valid PHC string"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AuthConfig {
        AuthConfig {
            secret_keys: vec!["SECRET".to_string()],
            ..AuthConfig::default()
        }
    }

    #[test]
    fn test_default_config() {
        let config = AuthConfig::default();
        assert_eq!(config.issuer, "warden");
        assert!(!config.refresh_token_rotation);
        assert_eq!(config.access_token_max_age, Duration::from_secs(900));
        assert_eq!(config.session_max_age, Duration::from_secs(604_800));
        assert!(config.refresh_token_max_age.is_none());
    }

    #[test]
    fn test_default_config_requires_secrets() {
        let err = AuthConfig::default().validate().unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
        assert!(err.to_string().contains("secret_keys"));
    }

    #[test]
    fn test_valid_config_validates() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_empty_issuer_fails_validation() {
        let mut config = valid_config();
        config.issuer = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("issuer"));
    }

    #[test]
    fn test_empty_and_duplicate_secrets_fail_validation() {
        let mut config = valid_config();
        config.secret_keys = vec!["A".to_string(), String::new()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("secret_keys[1]"));

        config.secret_keys = vec!["A".to_string(), "A".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn test_zero_lifetimes_fail_validation() {
        let mut config = valid_config();
        config.access_token_max_age = Duration::ZERO;
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("access_token_max_age")
        );

        let mut config = valid_config();
        config.session_max_age = Duration::ZERO;
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("session_max_age")
        );

        let mut config = valid_config();
        config.refresh_token_max_age = Some(Duration::ZERO);
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("refresh_token_max_age")
        );
    }

    #[test]
    fn test_out_of_range_lifetimes_fail_validation() {
        let json = r#"{"secret_keys": ["SECRET"], "session_max_age": "400000y"}"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("session_max_age"));

        let mut config = valid_config();
        config.refresh_token_max_age = Some(MAX_LIFETIME + Duration::from_secs(1));
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("refresh_token_max_age")
        );

        let mut config = valid_config();
        config.access_token_max_age = MAX_LIFETIME;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_argon2_hash_fails_validation() {
        let mut config = valid_config();
        config.authenticator = AuthenticatorConfig::Argon2 {
            users: HashMap::from([("alice".to_string(), "not-a-hash".to_string())]),
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("alice"));
    }

    #[test]
    fn test_humantime_durations_deserialize() {
        let json = r#"{
            "secret_keys": ["NEW", "OLD"],
            "access_token_max_age": "1s",
            "session_max_age": "2h",
            "refresh_token_max_age": "30m",
            "authenticator": {"provider": "dictionary", "users": {"alice": "secret1"}}
        }"#;
        let config: AuthConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.secret_keys, vec!["NEW", "OLD"]);
        assert_eq!(config.access_token_max_age, Duration::from_secs(1));
        assert_eq!(config.session_max_age, Duration::from_secs(7200));
        assert_eq!(config.refresh_token_max_age, Some(Duration::from_secs(1800)));
        assert!(matches!(
            config.authenticator,
            AuthenticatorConfig::Dictionary { ref users } if users.len() == 1
        ));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue("test error".to_string());
        assert_eq!(err.to_string(), "Invalid configuration value: test error");

        let err = ConfigError::Missing("secret_keys".to_string());
        assert_eq!(err.to_string(), "Missing required configuration: secret_keys");
    }
}
