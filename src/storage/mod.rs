//! Persistence for users, sessions and the image gallery.
//!
//! Handlers only see the [`Store`] trait. Production wiring uses
//! [`postgres::PgStore`]; router tests run against an in-memory store.

use anyhow::Result;
use async_trait::async_trait;
use std::{fmt, time::Duration};

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;

/// Role classification; every user has exactly one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserType {
    Admin,
    Regular,
}

impl UserType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Regular => "regular",
        }
    }

    /// Parse the stored/submitted representation. Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "regular" => Some(Self::Regular),
            _ => None,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    pub user_type: UserType,
    /// Path relative to the media root, e.g. `user_images/<file>`.
    pub image: Option<String>,
    pub created_at: String,
}

#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub user_type: UserType,
    pub image: Option<String>,
}

#[derive(Debug)]
pub enum InsertOutcome {
    Created(User),
    EmailTaken,
}

#[derive(Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
    EmailTaken,
}

#[derive(Clone, Debug)]
pub struct ImageFile {
    pub id: i64,
    pub file: String,
    pub created_at: String,
}

/// A gallery entry together with its files.
#[derive(Clone, Debug)]
pub struct GalleryImage {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub created_at: String,
    pub files: Vec<ImageFile>,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> Result<()>;

    async fn find_user(&self, id: i64) -> Result<Option<User>>;

    /// Lookup by already-normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// All users ordered by id.
    async fn list_users(&self) -> Result<Vec<User>>;

    async fn insert_user(&self, user: NewUser) -> Result<InsertOutcome>;

    /// Persist email, name, role, image and password hash of an existing user.
    async fn update_user(&self, user: &User) -> Result<UpdateOutcome>;

    /// Returns `false` when no user had that id. Sessions and images cascade.
    async fn delete_user(&self, id: i64) -> Result<bool>;

    /// Newest first. `owner` restricts the result to one user's images.
    async fn list_images(&self, owner: Option<i64>) -> Result<Vec<GalleryImage>>;

    /// Store a new session and drop every expired one.
    async fn insert_session(&self, token_hash: &[u8], user_id: i64, ttl: Duration) -> Result<()>;

    /// Resolve an unexpired session to its user.
    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<User>>;

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_type_parse_accepts_known_roles() {
        assert_eq!(UserType::parse("admin"), Some(UserType::Admin));
        assert_eq!(UserType::parse(" Regular "), Some(UserType::Regular));
        assert_eq!(UserType::parse("owner"), None);
        assert_eq!(UserType::parse(""), None);
    }

    #[test]
    fn user_type_display_matches_storage_value() {
        assert_eq!(UserType::Admin.to_string(), "admin");
        assert_eq!(UserType::Regular.as_str(), "regular");
    }
}
