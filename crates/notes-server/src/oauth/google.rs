//! Google OAuth 2.0 sign-in.
//!
//! 1. [`authorize_url`](GoogleOAuth::authorize_url) builds an authorization URL
//!    for the `openid`, `email` and `profile` scopes with a random PKCE challenge,
//!    and remembers the CSRF state + verifier in [`PendingStates`].
//! 2. [`exchange_code`](GoogleOAuth::exchange_code) consumes that state, trades
//!    the code + verifier for an access token and reads the userinfo profile.

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use super::{OAuthError, OAuthProfile, OAuthProvider, PendingStates};
use crate::config::GoogleConfig;

const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google user info from API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    verified_email: bool,
    name: Option<String>,
}

impl GoogleUser {
    /// Accounts are matched by email, so only a verified one is accepted
    fn into_profile(self) -> Result<OAuthProfile, OAuthError> {
        let email = self
            .email
            .ok_or_else(|| anyhow!("Google account {} has no email", self.id))?;
        if !self.verified_email {
            return Err(OAuthError::UnverifiedEmail);
        }

        Ok(OAuthProfile {
            provider_id: self.id,
            email,
            display_name: self.name,
        })
    }
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google OAuth handler.
pub struct GoogleOAuth {
    client: ConfiguredClient,
    http: reqwest::Client,
    pending: PendingStates,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(AuthUrl::new(AUTH_URL.to_string())?)
            .set_token_uri(TokenUrl::new(TOKEN_URL.to_string())?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_url.clone())
                    .with_context(|| format!("Invalid redirect URL: {}", config.redirect_url))?,
            );

        // Token endpoint must not follow redirects
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            http,
            pending: PendingStates::default(),
        })
    }

    async fn fetch_user(&self, access_token: &str) -> anyhow::Result<GoogleUser> {
        self.http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .context("Failed to decode Google userinfo")
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    async fn authorize_url(&self) -> anyhow::Result<String> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        self.pending
            .insert(csrf_state.secret().clone(), pkce_verifier.secret().clone())?;

        Ok(auth_url.to_string())
    }

    async fn exchange_code(&self, code: &str, state: &str) -> Result<OAuthProfile, OAuthError> {
        let pkce_verifier = self
            .pending
            .consume(state)
            .ok_or(OAuthError::InvalidState)?;

        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&self.http)
            .await
            .map_err(|e| anyhow!("Token exchange failed: {}", e))?;

        let user = self
            .fetch_user(token_result.access_token().secret())
            .await?;
        user.into_profile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GoogleConfig {
        GoogleConfig {
            client_id: "client-123".to_string(),
            client_secret: "shh".to_string(),
            redirect_url: "http://localhost:5000/auth/google/callback".to_string(),
        }
    }

    #[tokio::test]
    async fn test_authorize_url_carries_pkce_and_state() {
        let google = GoogleOAuth::new(&config()).unwrap();
        let url = url::Url::parse(&google.authorize_url().await.unwrap()).unwrap();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params.get("client_id").map(String::as_str), Some("client-123"));
        assert_eq!(params.get("code_challenge_method").map(String::as_str), Some("S256"));
        assert_eq!(params.get("scope").map(String::as_str), Some("openid email profile"));

        let state = params.get("state").unwrap();
        assert_eq!(google.pending.len(), 1);
        assert!(google.pending.consume(state).is_some());
    }

    #[tokio::test]
    async fn test_exchange_with_unknown_state() {
        let google = GoogleOAuth::new(&config()).unwrap();
        let err = google.exchange_code("code", "forged").await.unwrap_err();
        assert!(matches!(err, OAuthError::InvalidState));
    }

    fn google_user(verified_email: bool) -> GoogleUser {
        serde_json::from_value(serde_json::json!({
            "id": "1234",
            "email": "g@x.com",
            "verified_email": verified_email,
            "name": "Grace",
        }))
        .unwrap()
    }

    #[test]
    fn test_verified_userinfo_becomes_profile() {
        let profile = google_user(true).into_profile().unwrap();
        assert_eq!(profile.provider_id, "1234");
        assert_eq!(profile.email, "g@x.com");
        assert_eq!(profile.display_name.as_deref(), Some("Grace"));
    }

    #[test]
    fn test_unverified_email_rejected() {
        assert!(matches!(
            google_user(false).into_profile(),
            Err(OAuthError::UnverifiedEmail)
        ));

        // Missing flag counts as unverified
        let user: GoogleUser =
            serde_json::from_value(serde_json::json!({ "id": "1", "email": "g@x.com" })).unwrap();
        assert!(matches!(user.into_profile(), Err(OAuthError::UnverifiedEmail)));
    }

    #[test]
    fn test_invalid_redirect_url() {
        let mut config = config();
        config.redirect_url = "not a url".to_string();
        assert!(GoogleOAuth::new(&config).is_err());
    }
}
