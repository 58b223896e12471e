//! MongoDB-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, DateTime as BsonDateTime};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};

use super::{NewUser, Note, NoteStore, Result, StoreError, User, UserStore};

/// MongoDB error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    google_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    otp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    otp_expires: Option<BsonDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NoteDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<ObjectId>,
    user_id: String,
    content: String,
    created_at: BsonDateTime,
}

fn to_bson_time(t: DateTime<Utc>) -> BsonDateTime {
    BsonDateTime::from_millis(t.timestamp_millis())
}

fn from_bson_time(t: BsonDateTime) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(t.timestamp_millis()).unwrap_or_default()
}

impl UserDocument {
    fn into_user(self) -> Result<User> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Backend("user document without _id".to_string()))?;
        Ok(User {
            id: id.to_hex(),
            email: self.email,
            name: self.name,
            date_of_birth: self.date_of_birth,
            google_id: self.google_id,
            otp: self.otp,
            otp_expires: self.otp_expires.map(from_bson_time),
        })
    }
}

impl NoteDocument {
    fn into_note(self) -> Result<Note> {
        let id = self
            .id
            .ok_or_else(|| StoreError::Backend("note document without _id".to_string()))?;
        Ok(Note {
            id: id.to_hex(),
            user_id: self.user_id,
            content: self.content,
            created_at: from_bson_time(self.created_at),
        })
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Store over the `users` and `notes` collections of one database
pub struct MongoStore {
    users: Collection<UserDocument>,
    notes: Collection<NoteDocument>,
}

impl MongoStore {
    /// Connect and make sure the indexes the store relies on exist
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(database);

        let store = Self {
            users: db.collection("users"),
            notes: db.collection("notes"),
        };
        store.ensure_indexes().await?;

        tracing::info!("Connected to MongoDB database {}", database);
        Ok(store)
    }

    async fn ensure_indexes(&self) -> Result<()> {
        let unique_email = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.users.create_index(unique_email).await?;

        let by_owner = IndexModel::builder()
            .keys(doc! { "userId": 1, "createdAt": -1 })
            .build();
        self.notes.create_index(by_owner).await?;

        Ok(())
    }
}

#[async_trait]
impl UserStore for MongoStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn find_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        self.users
            .find_one(doc! { "googleId": google_id })
            .await?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        let Ok(oid) = ObjectId::parse_str(id) else {
            return Ok(None);
        };
        self.users
            .find_one(doc! { "_id": oid })
            .await?
            .map(UserDocument::into_user)
            .transpose()
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        let mut document = UserDocument {
            id: None,
            email: user.email,
            name: user.name,
            date_of_birth: user.date_of_birth,
            google_id: user.google_id,
            otp: user.otp,
            otp_expires: user.otp_expires.map(to_bson_time),
        };

        let inserted = match self.users.insert_one(&document).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => return Err(StoreError::Duplicate(document.email)),
            Err(e) => return Err(e.into()),
        };

        document.id = inserted.inserted_id.as_object_id();
        document.into_user()
    }

    async fn set_otp(&self, email: &str, otp: &str, expires: DateTime<Utc>) -> Result<bool> {
        let result = self
            .users
            .update_one(
                doc! { "email": email },
                doc! { "$set": { "otp": otp, "otpExpires": to_bson_time(expires) } },
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn clear_otp(&self, email: &str, otp: &str) -> Result<bool> {
        let result = self
            .users
            .update_one(
                doc! { "email": email, "otp": otp },
                doc! { "$unset": { "otp": "", "otpExpires": "" } },
            )
            .await?;
        Ok(result.modified_count == 1)
    }
}

#[async_trait]
impl NoteStore for MongoStore {
    async fn insert_note(
        &self,
        user_id: &str,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Note> {
        let mut document = NoteDocument {
            id: None,
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at: to_bson_time(created_at),
        };
        let inserted = self.notes.insert_one(&document).await?;
        document.id = inserted.inserted_id.as_object_id();
        document.into_note()
    }

    async fn notes_for_user(&self, user_id: &str) -> Result<Vec<Note>> {
        let documents: Vec<NoteDocument> = self
            .notes
            .find(doc! { "userId": user_id })
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .await?
            .try_collect()
            .await?;

        documents.into_iter().map(NoteDocument::into_note).collect()
    }

    async fn delete_note(&self, user_id: &str, note_id: &str) -> Result<bool> {
        let Ok(oid) = ObjectId::parse_str(note_id) else {
            return Ok(false);
        };
        let result = self
            .notes
            .delete_one(doc! { "_id": oid, "userId": user_id })
            .await?;
        Ok(result.deleted_count == 1)
    }
}
