//! Signed session tokens (HS256 JWT)

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::MAX_LIFETIME_SECS;

/// Claims carried by a session token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub email: String,
    /// User id
    pub id: String,
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies session tokens with one shared secret
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenSigner {
    /// Fails on an empty secret or a lifetime above [`MAX_LIFETIME_SECS`]
    pub fn new(secret: &[u8], lifetime_secs: u64) -> anyhow::Result<Self> {
        if secret.is_empty() {
            bail!("Token signing secret must not be empty");
        }
        let lifetime = i64::try_from(lifetime_secs)
            .ok()
            .filter(|secs| *secs <= MAX_LIFETIME_SECS)
            .and_then(Duration::try_seconds)
            .with_context(|| format!("Session lifetime out of range: {}s", lifetime_secs))?;

        let mut validation = Validation::default();
        validation.leeway = 0;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            lifetime,
        })
    }

    pub fn lifetime_secs(&self) -> u64 {
        self.lifetime.num_seconds() as u64
    }

    /// Sign a token valid from now for the configured lifetime
    pub fn issue(
        &self,
        email: &str,
        id: &str,
        name: Option<&str>,
    ) -> jsonwebtoken::errors::Result<String> {
        self.issue_at(email, id, name, Utc::now())
    }

    pub fn issue_at(
        &self,
        email: &str,
        id: &str,
        name: Option<&str>,
        now: DateTime<Utc>,
    ) -> jsonwebtoken::errors::Result<String> {
        let claims = Claims {
            email: email.to_string(),
            id: id.to_string(),
            name: name.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding)
    }

    /// Check signature and expiry and return the claims
    pub fn verify(&self, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}
