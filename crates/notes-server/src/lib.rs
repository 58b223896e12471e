//! Note-taking backend with email OTP and Google sign-in.
//!
//! Provides:
//! - Signup and login by emailed one-time passcode
//! - Google OAuth sign-in (Authorization Code + PKCE)
//! - HS256 session tokens via `Authorization: Bearer` or an HTTP-only cookie
//! - Per-user note listing, creation and deletion
//!
//! The library exposes every layer so the binary and the integration tests
//! assemble the same `AppState`.

pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mailer;
pub mod notes;
pub mod oauth;
pub mod storage;

use std::sync::Arc;

use crate::config::SessionConfig;
use crate::credentials::CredentialService;
use crate::notes::NoteService;
use crate::oauth::OAuthProvider;

pub use api::router;
pub use error::ApiError;

/// Shared application state
pub struct AppState {
    pub credentials: CredentialService,
    pub notes: NoteService,
    pub oauth: Arc<dyn OAuthProvider>,
    pub session: SessionConfig,
}
