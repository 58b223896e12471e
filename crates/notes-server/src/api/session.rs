//! Session token transport: bearer header, `token` cookie and the request guard

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use cookie::{Cookie, SameSite};

use crate::config::SessionConfig;
use crate::credentials::Claims;
use crate::error::ApiError;
use crate::AppState;

pub const TOKEN_COOKIE_NAME: &str = "token";

/// Verified claims of the caller.
///
/// Extracting this runs token verification before the handler body, so note
/// handlers only ever act for the user named in the token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = bearer_token(&parts.headers).or_else(|| {
            jar.get(TOKEN_COOKIE_NAME)
                .map(|c| c.value())
                .filter(|v| !v.is_empty())
        });

        let claims = state.credentials.verify_token(token)?;
        Ok(AuthUser(claims))
    }
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn same_site(session: &SessionConfig) -> SameSite {
    // Browsers drop SameSite=None cookies that are not Secure
    if session.cookie_secure {
        SameSite::None
    } else {
        SameSite::Lax
    }
}

/// HTTP-only cookie carrying a freshly issued token
pub fn session_cookie(token: String, session: &SessionConfig, lifetime_secs: u64) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .secure(session.cookie_secure)
        .same_site(same_site(session))
        .max_age(time::Duration::seconds(lifetime_secs as i64))
        .build()
}

/// Cookie that makes the browser drop the session cookie
pub fn removal_cookie(session: &SessionConfig) -> Cookie<'static> {
    Cookie::build((TOKEN_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(session.cookie_secure)
        .same_site(same_site(session))
        .max_age(time::Duration::ZERO)
        .build()
}
