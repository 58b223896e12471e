//! In-process store backed by maps behind `RwLock`s

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{NewUser, Note, NoteStore, Result, StoreError, User, UserStore};

/// Store that keeps users and notes in memory.
///
/// Mirrors the uniqueness rule of the MongoDB store: one user per email.
#[derive(Default)]
pub struct MemoryStore {
    /// Maps user id -> user
    users: RwLock<HashMap<String, User>>,
    /// Notes in insertion order
    notes: RwLock<Vec<Note>>,
}

fn poisoned() -> StoreError {
    StoreError::Backend("store lock poisoned".to_string())
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub fn user_count(&self) -> usize {
        self.users.read().map(|u| u.len()).unwrap_or(0)
    }

    /// Number of stored notes across all users
    pub fn note_count(&self) -> usize {
        self.notes.read().map(|n| n.len()).unwrap_or(0)
    }

    /// Replace a stored user wholesale, matched by id
    pub fn put_user(&self, user: User) -> Result<()> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        users.insert(user.id.clone(), user);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let users = self.users.read().map_err(|_| poisoned())?;
        Ok(users.get(id).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        if users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(user.email));
        }

        let stored = User {
            id: new_id(),
            email: user.email,
            name: user.name,
            date_of_birth: user.date_of_birth,
            google_id: user.google_id,
            otp: user.otp,
            otp_expires: user.otp_expires,
        };
        users.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn set_otp(&self, email: &str, otp: &str, expires: DateTime<Utc>) -> Result<bool> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        match users.values_mut().find(|u| u.email == email) {
            Some(user) => {
                user.otp = Some(otp.to_string());
                user.otp_expires = Some(expires);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn clear_otp(&self, email: &str, otp: &str) -> Result<bool> {
        let mut users = self.users.write().map_err(|_| poisoned())?;
        match users
            .values_mut()
            .find(|u| u.email == email && u.otp.as_deref() == Some(otp))
        {
            Some(user) => {
                user.otp = None;
                user.otp_expires = None;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn insert_note(
        &self,
        user_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Note> {
        let note = Note {
            id: new_id(),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at,
        };
        self.notes
            .write()
            .map_err(|_| poisoned())?
            .push(note.clone());
        Ok(note)
    }

    async fn notes_for_user(&self, user_id: &str) -> Result<Vec<Note>> {
        let notes = self.notes.read().map_err(|_| poisoned())?;
        // Newest insertion first, then a stable sort keeps that order for equal timestamps
        let mut owned: Vec<Note> = notes
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let mut notes = self.notes.write().map_err(|_| poisoned())?;
        let before = notes.len();
        notes.retain(|n| !(n.id == note_id && n.user_id == user_id));
        Ok(notes.len() != before)
    }
}
