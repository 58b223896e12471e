//! Authentication endpoints
//!
//! - `POST /api/get-otp` / `POST /api/signup` - register by emailed code
//! - `POST /api/login-otp` / `POST /api/login` - log in by emailed code
//! - `GET /auth/google` / `GET /auth/google/callback` - Google sign-in
//! - `POST /api/logout` - drop the session cookie

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::header,
    response::{IntoResponse, Redirect},
    Json,
};
use serde::{Deserialize, Serialize};

use super::session::{removal_cookie, session_cookie};
use super::MessageResponse;
use crate::credentials::OtpPurpose;
use crate::error::{ApiError, Result};
use crate::oauth::OAuthError;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupOtpRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

/// Body returned when a code is accepted
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user denied access
    pub error: Option<String>,
}

/// Handler for `POST /api/get-otp`
pub async fn get_otp(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<SignupOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;
    state
        .credentials
        .request_signup_otp(req.name, req.date_of_birth, &req.email)
        .await?;
    Ok(Json(MessageResponse::new("OTP sent successfully")))
}

/// Handler for `POST /api/signup`
pub async fn signup(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(req) = payload?;
    let token = state
        .credentials
        .verify_otp(&req.email, &req.otp, OtpPurpose::Signup)
        .await?;

    Ok(Json(TokenResponse {
        message: "Signup successful".to_string(),
        token,
    }))
}

/// Handler for `POST /api/login-otp`
pub async fn login_otp(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<LoginOtpRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(req) = payload?;
    state.credentials.request_login_otp(&req.email).await?;
    Ok(Json(MessageResponse::new("OTP sent successfully")))
}

/// Handler for `POST /api/login`. Returns the token and also sets it as a cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(req) = payload?;
    let token = state
        .credentials
        .verify_otp(&req.email, &req.otp, OtpPurpose::Login)
        .await?;

    let cookie = session_cookie(
        token.clone(),
        &state.session,
        state.credentials.session_lifetime_secs(),
    );

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(TokenResponse {
            message: "Login successful".to_string(),
            token,
        }),
    ))
}

/// Handler for `GET /auth/google`
pub async fn google_auth(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let url = state.oauth.authorize_url().await?;
    Ok(Redirect::to(&url))
}

/// Handler for `GET /auth/google/callback`
pub async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    let failed = || ApiError::OAuthFailed("Google authentication failed".to_string());

    if let Some(error) = &query.error {
        tracing::info!("Google sign-in was not completed: {}", error);
        return Err(failed());
    }
    let (Some(code), Some(csrf_state)) = (&query.code, &query.state) else {
        return Err(failed());
    };

    let profile = match state.oauth.exchange_code(code, csrf_state).await {
        Ok(profile) => profile,
        Err(OAuthError::InvalidState) => {
            tracing::info!("Google callback with unknown or expired state");
            return Err(failed());
        }
        Err(OAuthError::UnverifiedEmail) => {
            tracing::info!("Google sign-in refused: email not verified");
            return Err(failed());
        }
        Err(OAuthError::Provider(e)) => return Err(ApiError::Internal(e)),
    };

    let token = state
        .credentials
        .issue_token_for_oauth_profile(&profile)
        .await?;
    let cookie = session_cookie(
        token,
        &state.session,
        state.credentials.session_lifetime_secs(),
    );
    let welcome = state.session.welcome_url()?;

    tracing::info!("User {} signed in with Google", profile.email);

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to(welcome.as_str()),
    ))
}

/// Handler for `POST /api/logout`.
///
/// Only clears the cookie; an already issued token stays valid until it expires.
pub async fn logout(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let cookie = removal_cookie(&state.session);
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Json(MessageResponse::new("Logged out successfully")),
    )
}
