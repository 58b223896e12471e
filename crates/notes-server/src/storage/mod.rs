//! Identity and note storage abstraction.
//!
//! Implementations:
//! - `MemoryStore` - In-process maps, for tests and local runs
//! - `MongoStore` - MongoDB collections `users` and `notes`

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A registered user
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub google_id: Option<String>,
    /// Pending one-time passcode, cleared once verified
    pub otp: Option<String>,
    pub otp_expires: Option<DateTime<Utc>>,
}

/// Fields for a user that has not been stored yet
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
    pub date_of_birth: Option<String>,
    pub google_id: Option<String>,
    pub otp: Option<String>,
    pub otp_expires: Option<DateTime<Utc>>,
}

/// A plain-text note owned by a user
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// Stable generated identifier
    pub id: String,
    pub user_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Insert a user. Fails with `Duplicate` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Overwrite the pending OTP. Returns false if no user has this email.
    async fn set_otp(&self, email: &str, otp: &str, expires: DateTime<Utc>) -> Result<bool>;

    /// Clear the pending OTP only if it still equals `otp`.
    ///
    /// Returns false when another request consumed or replaced it first.
    async fn clear_otp(&self, email: &str, otp: &str) -> Result<bool>;
}

#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn insert_note(
        &self,
        user_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Note>;

    /// All notes of a user, most recent first
    async fn notes_for_user(&self, user_id: &str) -> Result<Vec<Note>>;

    /// Delete a note owned by `user_id`. Returns false if nothing matched.
    async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool>;
}
