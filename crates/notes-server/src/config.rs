//! Configuration loading and management

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Upper bound for any configured lifetime (one year)
pub const MAX_LIFETIME_SECS: i64 = 365 * 24 * 60 * 60;

/// Tunable lifetimes, optionally loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Session token configuration
    #[serde(default)]
    pub tokens: TokenConfig,

    /// One-time passcode configuration
    #[serde(default)]
    pub otp: OtpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Session token and cookie lifetime in seconds (default: 1 hour)
    #[serde(default = "default_session_lifetime")]
    pub session_lifetime_secs: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            session_lifetime_secs: default_session_lifetime(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// How long an emailed code stays valid, in seconds (default: 10 minutes)
    #[serde(default = "default_otp_lifetime")]
    pub lifetime_secs: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            lifetime_secs: default_otp_lifetime(),
        }
    }
}

fn default_session_lifetime() -> u64 {
    3600 // 1 hour
}

fn default_otp_lifetime() -> u64 {
    10 * 60 // 10 minutes
}

impl Config {
    /// Load tunables from `path`, or use defaults when no file is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            tracing::info!("No config file given, using default lifetimes");
            return Ok(Config::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        config.validate()?;
        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Reject lifetimes that are zero or above [`MAX_LIFETIME_SECS`]
    pub fn validate(&self) -> Result<()> {
        for (field, secs) in [
            ("tokens.session_lifetime_secs", self.tokens.session_lifetime_secs),
            ("otp.lifetime_secs", self.otp.lifetime_secs),
        ] {
            if secs == 0 || secs > MAX_LIFETIME_SECS as u64 {
                bail!(
                    "{} must be between 1 and {} seconds, got {}",
                    field,
                    MAX_LIFETIME_SECS,
                    secs
                );
            }
        }
        Ok(())
    }
}

/// SMTP relay settings
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `Notes <notes@example.com>`
    pub from: String,
}

/// Google OAuth client settings
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Cookie and redirect settings for browser sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Mark the `token` cookie `Secure`
    pub cookie_secure: bool,
    /// Front-end origin, used for CORS and the post-login redirect
    pub frontend_url: url::Url,
}

impl SessionConfig {
    /// Where the browser lands after a successful Google login
    pub fn welcome_url(&self) -> Result<url::Url> {
        self.frontend_url
            .join("welcome")
            .context("Failed to build welcome URL")
    }

    /// The front-end origin as sent in the `Origin` header
    pub fn origin(&self) -> String {
        self.frontend_url.origin().ascii_serialization()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.tokens.session_lifetime_secs, 3600);
        assert_eq!(config.otp.lifetime_secs, 600);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "otp": {{ "lifetime_secs": 120 }} }}"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.otp.lifetime_secs, 120);
        assert_eq!(config.tokens.session_lifetime_secs, 3600);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Config::load(Some(&dir.path().join("missing.json"))).is_err());
    }

    #[test]
    fn test_out_of_range_lifetimes_rejected() {
        for body in [
            r#"{ "otp": { "lifetime_secs": 0 } }"#.to_string(),
            format!(r#"{{ "tokens": {{ "session_lifetime_secs": {} }} }}"#, u64::MAX),
            format!(
                r#"{{ "otp": {{ "lifetime_secs": {} }} }}"#,
                MAX_LIFETIME_SECS as u64 + 1
            ),
        ] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{}", body).unwrap();
            assert!(Config::load(Some(file.path())).is_err(), "{}", body);
        }
    }

    #[test]
    fn test_welcome_url_and_origin() {
        let session = SessionConfig {
            cookie_secure: true,
            frontend_url: "https://notes.example.com/".parse().unwrap(),
        };
        assert_eq!(
            session.welcome_url().unwrap().as_str(),
            "https://notes.example.com/welcome"
        );
        assert_eq!(session.origin(), "https://notes.example.com");
    }
}
