//! Third-party sign-in.
//!
//! - `GoogleOAuth` - Authorization Code flow with PKCE against Google
//! - `PendingStates` - CSRF state + PKCE verifier held between redirect and callback

mod google;
mod pending;

pub use google::GoogleOAuth;
pub use pending::PendingStates;

use async_trait::async_trait;
use thiserror::Error;

/// Identity returned by the provider after a successful sign-in
#[derive(Debug, Clone, PartialEq)]
pub struct OAuthProfile {
    /// Provider's stable account id
    pub provider_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    /// The provider has not verified the account's email address
    #[error("OAuth account email is not verified")]
    UnverifiedEmail,

    #[error("OAuth provider error: {0:#}")]
    Provider(#[from] anyhow::Error),
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Start a sign-in and return the URL to redirect the browser to
    async fn authorize_url(&self) -> anyhow::Result<String>;

    /// Finish a sign-in from the callback's `code` and `state`
    async fn exchange_code(&self, code: &str, state: &str) -> Result<OAuthProfile, OAuthError>;
}
