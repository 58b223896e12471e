//! Credential service: one-time passcodes, OAuth identities and session tokens.
//!
//! Flow: `Unauthenticated -> OtpRequested -> Verified`. A verified request gets
//! a signed session token; there is no server-side session to revoke, so a
//! token stays valid until it expires.

mod otp;
mod token;

pub use otp::{generate_otp, OtpPurpose};
pub use token::{Claims, TokenSigner};

use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{Duration, Utc};

use crate::error::{ApiError, Result};
use crate::mailer::Mailer;
use crate::oauth::OAuthProfile;
use crate::storage::{NewUser, User, UserStore};

/// How an OAuth profile was matched to a stored user.
///
/// Email is checked before provider id.
#[derive(Debug, Clone, PartialEq)]
pub enum IdentityMatch {
    FoundByEmail(User),
    FoundByProvider(User),
    NotFound,
}

pub struct CredentialService {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    tokens: TokenSigner,
    otp_lifetime_secs: u64,
}

fn validate_email(email: &str) -> Result<&str> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::BadRequest("Invalid email address".to_string()));
    }
    Ok(email)
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        tokens: TokenSigner,
        otp_lifetime_secs: u64,
    ) -> Self {
        Self {
            users,
            mailer,
            tokens,
            otp_lifetime_secs,
        }
    }

    pub fn session_lifetime_secs(&self) -> u64 {
        self.tokens.lifetime_secs()
    }

    fn otp_expiry(&self) -> Result<chrono::DateTime<Utc>> {
        i64::try_from(self.otp_lifetime_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
            .ok_or_else(|| {
                ApiError::Internal(anyhow!(
                    "OTP lifetime out of range: {}s",
                    self.otp_lifetime_secs
                ))
            })
    }

    /// Register a new email and send it a signup code
    pub async fn request_signup_otp(
        &self,
        name: Option<String>,
        date_of_birth: Option<String>,
        email: &str,
    ) -> Result<()> {
        let email = validate_email(email)?;

        if self.users.find_by_email(email).await?.is_some() {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }

        let otp = generate_otp();
        let otp_expires = self.otp_expiry()?;
        // A concurrent signup for the same email surfaces as Duplicate -> Conflict
        self.users
            .create(NewUser {
                email: email.to_string(),
                name,
                date_of_birth,
                otp: Some(otp.clone()),
                otp_expires: Some(otp_expires),
                ..Default::default()
            })
            .await?;

        self.send_otp(email, &otp, OtpPurpose::Signup).await
    }

    /// Send a fresh login code to a registered email
    pub async fn request_login_otp(&self, email: &str) -> Result<()> {
        let email = validate_email(email)?;

        let otp = generate_otp();
        if !self.users.set_otp(email, &otp, self.otp_expiry()?).await? {
            return Err(ApiError::NotFound("Email not registered".to_string()));
        }

        self.send_otp(email, &otp, OtpPurpose::Login).await
    }

    async fn send_otp(&self, email: &str, otp: &str, purpose: OtpPurpose) -> Result<()> {
        self.mailer
            .send(purpose.email(email, otp, self.otp_lifetime_secs))
            .await
            .with_context(|| format!("Failed to send {} OTP", purpose))?;

        tracing::info!("Sent {} OTP to {}", purpose, email);
        Ok(())
    }

    /// Check a code and, if it matches, clear it and issue a session token
    pub async fn verify_otp(&self, email: &str, otp: &str, purpose: OtpPurpose) -> Result<String> {
        let email = email.trim();
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidOrExpiredOtp)?;

        let (Some(stored), Some(expires)) = (user.otp.as_deref(), user.otp_expires) else {
            return Err(ApiError::InvalidOrExpiredOtp);
        };
        if Utc::now() > expires {
            return Err(ApiError::InvalidOrExpiredOtp);
        }
        if stored != otp {
            return Err(ApiError::IncorrectOtp);
        }

        // Only the request that actually clears the code gets a token
        if !self.users.clear_otp(email, otp).await? {
            return Err(ApiError::InvalidOrExpiredOtp);
        }

        let token = self.issue_for(&user, user.name.as_deref())?;
        tracing::info!("Verified {} OTP for {}", purpose, email);
        Ok(token)
    }

    /// Match an OAuth profile to a stored user, email first
    pub async fn lookup_oauth_identity(&self, profile: &OAuthProfile) -> Result<IdentityMatch> {
        if let Some(user) = self.users.find_by_email(&profile.email).await? {
            return Ok(IdentityMatch::FoundByEmail(user));
        }
        if let Some(user) = self.users.find_by_google_id(&profile.provider_id).await? {
            return Ok(IdentityMatch::FoundByProvider(user));
        }
        Ok(IdentityMatch::NotFound)
    }

    /// Find or create the user behind an OAuth profile and issue a token.
    ///
    /// The token carries the provider's display name.
    pub async fn issue_token_for_oauth_profile(&self, profile: &OAuthProfile) -> Result<String> {
        let user = match self.lookup_oauth_identity(profile).await? {
            IdentityMatch::FoundByEmail(user) | IdentityMatch::FoundByProvider(user) => user,
            IdentityMatch::NotFound => {
                let user = self
                    .users
                    .create(NewUser {
                        email: profile.email.clone(),
                        name: profile.display_name.clone(),
                        google_id: Some(profile.provider_id.clone()),
                        ..Default::default()
                    })
                    .await?;
                tracing::info!("Created user {} from Google sign-in", user.email);
                user
            }
        };

        self.issue_for(&user, profile.display_name.as_deref())
    }

    fn issue_for(&self, user: &User, name: Option<&str>) -> Result<String> {
        self.tokens
            .issue(&user.email, &user.id, name)
            .context("Failed to sign session token")
            .map_err(ApiError::Internal)
    }

    /// Verify a presented token. Missing -> `Unauthorized`, invalid -> `Forbidden`.
    pub fn verify_token(&self, token: Option<&str>) -> Result<Claims> {
        let token = token.ok_or(ApiError::Unauthorized)?;
        self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Rejected session token: {}", e);
            ApiError::Forbidden
        })
    }
}
