//! Shared harness for the HTTP tests: in-memory store, recording mailer and a
//! scripted OAuth provider wired into the real router.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use notes_server::config::SessionConfig;
use notes_server::credentials::{CredentialService, TokenSigner};
use notes_server::mailer::MemoryMailer;
use notes_server::notes::NoteService;
use notes_server::oauth::{OAuthError, OAuthProfile, OAuthProvider};
use notes_server::storage::MemoryStore;
use notes_server::AppState;

pub const SECRET: &[u8] = b"integration-test-secret";

/// OAuth provider that accepts one known state and returns a fixed profile
pub struct FakeOAuth {
    pub profile: Mutex<Option<OAuthProfile>>,
    pub fail_exchange: bool,
    pub unverified_email: bool,
}

pub const FAKE_STATE: &str = "known-state";

impl FakeOAuth {
    pub fn new(profile: OAuthProfile) -> Self {
        Self {
            profile: Mutex::new(Some(profile)),
            fail_exchange: false,
            unverified_email: false,
        }
    }
}

#[async_trait]
impl OAuthProvider for FakeOAuth {
    async fn authorize_url(&self) -> anyhow::Result<String> {
        Ok(format!(
            "https://accounts.example.com/auth?state={}",
            FAKE_STATE
        ))
    }

    async fn exchange_code(&self, _code: &str, state: &str) -> Result<OAuthProfile, OAuthError> {
        if self.fail_exchange {
            return Err(OAuthError::Provider(anyhow::anyhow!("token endpoint down")));
        }
        if state != FAKE_STATE {
            return Err(OAuthError::InvalidState);
        }
        if self.unverified_email {
            return Err(OAuthError::UnverifiedEmail);
        }
        self.profile
            .lock()
            .unwrap()
            .clone()
            .ok_or(OAuthError::InvalidState)
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<MemoryMailer>,
}

pub fn google_profile() -> OAuthProfile {
    OAuthProfile {
        provider_id: "google-123".to_string(),
        email: "g@x.com".to_string(),
        display_name: Some("Grace Hopper".to_string()),
    }
}

pub fn test_app() -> TestApp {
    test_app_with(MemoryMailer::new(), FakeOAuth::new(google_profile()))
}

pub fn test_app_with(mailer: MemoryMailer, oauth: FakeOAuth) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(mailer);

    let state = Arc::new(AppState {
        credentials: CredentialService::new(
            store.clone(),
            mailer.clone(),
            TokenSigner::new(SECRET, 3600).unwrap(),
            600,
        ),
        notes: NoteService::new(store.clone(), store.clone()),
        oauth: Arc::new(oauth),
        session: SessionConfig {
            cookie_secure: true,
            frontend_url: "http://localhost:5173".parse().unwrap(),
        },
    });

    TestApp {
        router: notes_server::router(state).unwrap(),
        store,
        mailer,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// The `Set-Cookie` header value, if any
    pub fn set_cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body), &[]).await
    }

    /// Request with `Authorization: Bearer <token>`
    pub async fn authed(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let bearer = format!("Bearer {}", token);
        self.request(method, uri, body, &[("authorization", bearer.as_str())])
            .await
    }

    /// Run the signup flow and return the issued token
    pub async fn sign_up(&self, name: &str, dob: &str, email: &str) -> String {
        let res = self
            .post(
                "/api/get-otp",
                serde_json::json!({ "name": name, "dateOfBirth": dob, "email": email }),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "get-otp failed: {}", res.body);

        let otp = self.mailer.last_code_for(email).expect("no OTP emailed");
        let res = self
            .post("/api/signup", serde_json::json!({ "email": email, "otp": otp }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "signup failed: {}", res.body);
        res.body["token"].as_str().unwrap().to_string()
    }
}
