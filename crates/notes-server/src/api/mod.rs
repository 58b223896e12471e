//! HTTP routes

pub mod auth;
pub mod notes;
pub mod session;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SessionConfig;
use crate::AppState;

pub use session::{AuthUser, TOKEN_COOKIE_NAME};

/// `{ "message": ... }` success body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

async fn index() -> &'static str {
    "Note-Taking App Backend"
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Result<Router> {
    let cors = cors_layer(&state.session)?;

    let app = Router::new()
        .route("/", get(index))
        // Email OTP
        .route("/api/get-otp", post(auth::get_otp))
        .route("/api/signup", post(auth::signup))
        .route("/api/login-otp", post(auth::login_otp))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        // Google sign-in
        .route("/auth/google", get(auth::google_auth))
        .route("/auth/google/callback", get(auth::google_callback))
        // Notes (token required)
        .route("/api/notes", get(notes::list_notes).post(notes::add_note))
        .route("/api/notes/{id}", delete(notes::delete_note))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

/// Allow the front end to call the API with cookies
fn cors_layer(session: &SessionConfig) -> Result<CorsLayer> {
    let origin: HeaderValue = session.origin().parse()?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]))
}
