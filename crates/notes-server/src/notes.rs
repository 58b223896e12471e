//! Per-user note access.
//!
//! Clients address notes by position in the most-recent-first listing. A
//! delete re-reads that listing and removes the note at the position by its
//! stable id, so two clients working from different snapshots can still
//! remove a note other than the one they saw.

use std::sync::Arc;

use chrono::Utc;

use crate::error::{ApiError, Result};
use crate::storage::{NoteStore, UserStore};

/// Name shown when the user record has none
const FALLBACK_NAME: &str = "User";

/// A user's notes together with the name to greet them by
#[derive(Debug, Clone, PartialEq)]
pub struct NoteListing {
    pub notes: Vec<String>,
    pub name: String,
}

pub struct NoteService {
    notes: Arc<dyn NoteStore>,
    users: Arc<dyn UserStore>,
}

impl NoteService {
    pub fn new(notes: Arc<dyn NoteStore>, users: Arc<dyn UserStore>) -> Self {
        Self { notes, users }
    }

    pub async fn list_notes(&self, user_id: &str) -> Result<NoteListing> {
        let notes = self.notes.notes_for_user(user_id).await?;
        let name = self
            .users
            .find_by_id(user_id)
            .await?
            .and_then(|u| u.name)
            .unwrap_or_else(|| FALLBACK_NAME.to_string());

        Ok(NoteListing {
            notes: notes.into_iter().map(|n| n.content).collect(),
            name,
        })
    }

    pub async fn add_note(&self, user_id: &str, content: Option<&str>) -> Result<()> {
        let content = match content {
            Some(c) if !c.is_empty() => c,
            _ => {
                return Err(ApiError::BadRequest(
                    "Content is required and must be a string".to_string(),
                ))
            }
        };

        let note = self.notes.insert_note(user_id, content, Utc::now()).await?;
        tracing::debug!("Added note {} for user {}", note.id, user_id);
        Ok(())
    }

    pub async fn delete_note(&self, user_id: &str, index: usize) -> Result<()> {
        let notes = self.notes.notes_for_user(user_id).await?;
        let note = notes
            .get(index)
            .ok_or_else(|| ApiError::BadRequest("Invalid note index".to_string()))?;

        if !self.notes.delete_note(user_id, &note.id).await? {
            // Removed by a concurrent request between the read and the delete
            return Err(ApiError::BadRequest("Invalid note index".to_string()));
        }
        tracing::debug!("Deleted note {} for user {}", note.id, user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, NewUser};

    async fn service_with_user() -> (NoteService, Arc<MemoryStore>, String) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create(NewUser {
                email: "a@x.com".into(),
                name: Some("Alice".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        let service = NoteService::new(store.clone(), store.clone());
        (service, store, user.id)
    }

    #[tokio::test]
    async fn test_add_then_list_most_recent_first() {
        let (service, _, user_id) = service_with_user().await;
        service.add_note(&user_id, Some("first")).await.unwrap();
        service.add_note(&user_id, Some("second")).await.unwrap();

        let listing = service.list_notes(&user_id).await.unwrap();
        assert_eq!(listing.notes, vec!["second", "first"]);
        assert_eq!(listing.name, "Alice");
    }

    #[tokio::test]
    async fn test_empty_or_missing_content_rejected() {
        let (service, store, user_id) = service_with_user().await;

        for content in [Some(""), None] {
            let err = service.add_note(&user_id, content).await.unwrap_err();
            assert!(matches!(err, ApiError::BadRequest(_)));
        }
        assert_eq!(store.note_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_index_zero_removes_most_recent() {
        let (service, _, user_id) = service_with_user().await;
        service.add_note(&user_id, Some("older")).await.unwrap();
        service.add_note(&user_id, Some("newer")).await.unwrap();

        service.delete_note(&user_id, 0).await.unwrap();

        let listing = service.list_notes(&user_id).await.unwrap();
        assert_eq!(listing.notes, vec!["older"]);
    }

    #[tokio::test]
    async fn test_delete_out_of_range_leaves_notes() {
        let (service, store, user_id) = service_with_user().await;
        service.add_note(&user_id, Some("only")).await.unwrap();

        let err = service.delete_note(&user_id, 1).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert_eq!(store.note_count(), 1);
    }

    #[tokio::test]
    async fn test_users_do_not_see_each_others_notes() {
        let (service, _, user_id) = service_with_user().await;
        service.add_note(&user_id, Some("private")).await.unwrap();

        let listing = service.list_notes("someone-else").await.unwrap();
        assert!(listing.notes.is_empty());
        assert_eq!(listing.name, "User");

        assert!(service.delete_note("someone-else", 0).await.is_err());
    }
}
