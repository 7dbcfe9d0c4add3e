//! In-memory [`Store`] for router tests. Mirrors the cascade and uniqueness
//! rules of `sql/schema.sql`.

use anyhow::Result;
use async_trait::async_trait;
use std::{
    collections::HashMap,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

use super::{GalleryImage, ImageFile, InsertOutcome, NewUser, Store, UpdateOutcome, User};

const CREATED_AT: &str = "2024-01-01 00:00";

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<User>,
    sessions: HashMap<Vec<u8>, (i64, Instant)>,
    images: Vec<GalleryImage>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Seed a gallery entry owned by `user_id` with the given files.
    pub(crate) async fn insert_image(&self, user_id: i64, title: &str, files: &[&str]) -> i64 {
        let mut inner = self.inner.lock().await;
        let id = inner.next_id();
        let mut image_files = Vec::with_capacity(files.len());
        for file in files {
            let file_id = inner.next_id();
            image_files.push(ImageFile {
                id: file_id,
                file: (*file).to_string(),
                created_at: CREATED_AT.to_string(),
            });
        }
        inner.images.push(GalleryImage {
            id,
            user_id,
            title: title.to_string(),
            description: String::new(),
            created_at: CREATED_AT.to_string(),
            files: image_files,
        });
        id
    }

    pub(crate) async fn session_count(&self) -> usize {
        self.inner.lock().await.sessions.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|user| user.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.iter().find(|user| user.email == email).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let inner = self.inner.lock().await;
        let mut users = inner.users.clone();
        users.sort_by_key(|user| user.id);
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<InsertOutcome> {
        let mut inner = self.inner.lock().await;
        if inner.users.iter().any(|existing| existing.email == user.email) {
            return Ok(InsertOutcome::EmailTaken);
        }
        let id = inner.next_id();
        let created = User {
            id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            user_type: user.user_type,
            image: user.image,
            created_at: CREATED_AT.to_string(),
        };
        inner.users.push(created.clone());
        Ok(InsertOutcome::Created(created))
    }

    async fn update_user(&self, user: &User) -> Result<UpdateOutcome> {
        let mut inner = self.inner.lock().await;
        if inner
            .users
            .iter()
            .any(|existing| existing.id != user.id && existing.email == user.email)
        {
            return Ok(UpdateOutcome::EmailTaken);
        }
        match inner.users.iter_mut().find(|existing| existing.id == user.id) {
            Some(existing) => {
                let created_at = existing.created_at.clone();
                *existing = User {
                    created_at,
                    ..user.clone()
                };
                Ok(UpdateOutcome::Updated)
            }
            None => Ok(UpdateOutcome::NotFound),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        let before = inner.users.len();
        inner.users.retain(|user| user.id != id);
        if inner.users.len() == before {
            return Ok(false);
        }
        inner.sessions.retain(|_, (user_id, _)| *user_id != id);
        inner.images.retain(|image| image.user_id != id);
        Ok(true)
    }

    async fn list_images(&self, owner: Option<i64>) -> Result<Vec<GalleryImage>> {
        let inner = self.inner.lock().await;
        let mut images: Vec<GalleryImage> = inner
            .images
            .iter()
            .filter(|image| owner.map_or(true, |owner| image.user_id == owner))
            .cloned()
            .collect();
        images.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(images)
    }

    async fn insert_session(&self, token_hash: &[u8], user_id: i64, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        inner
            .sessions
            .retain(|_, (_, expires_at)| *expires_at > now);
        inner
            .sessions
            .insert(token_hash.to_vec(), (user_id, now + ttl));
        Ok(())
    }

    async fn lookup_session(&self, token_hash: &[u8]) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        let Some((user_id, expires_at)) = inner.sessions.get(token_hash) else {
            return Ok(None);
        };
        if *expires_at <= Instant::now() {
            return Ok(None);
        }
        Ok(inner.users.iter().find(|user| user.id == *user_id).cloned())
    }

    async fn delete_session(&self, token_hash: &[u8]) -> Result<()> {
        self.inner.lock().await.sessions.remove(token_hash);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::UserType;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            full_name: "Test User".to_string(),
            password_hash: "hash".to_string(),
            user_type: UserType::Regular,
            image: None,
        }
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_email() -> Result<()> {
        let store = MemoryStore::new();
        assert!(matches!(
            store.insert_user(new_user("a@example.com")).await?,
            InsertOutcome::Created(_)
        ));
        assert!(matches!(
            store.insert_user(new_user("a@example.com")).await?,
            InsertOutcome::EmailTaken
        ));
        Ok(())
    }

    #[tokio::test]
    async fn delete_cascades_sessions_and_images() -> Result<()> {
        let store = MemoryStore::new();
        let InsertOutcome::Created(user) = store.insert_user(new_user("b@example.com")).await?
        else {
            anyhow::bail!("expected user to be created");
        };
        store
            .insert_session(b"token", user.id, Duration::from_secs(60))
            .await?;
        store.insert_image(user.id, "one", &["a.jpg"]).await;

        assert!(store.delete_user(user.id).await?);
        assert_eq!(store.session_count().await, 0);
        assert!(store.list_images(None).await?.is_empty());
        assert!(!store.delete_user(user.id).await?);
        Ok(())
    }

    #[tokio::test]
    async fn expired_sessions_do_not_resolve() -> Result<()> {
        let store = MemoryStore::new();
        let InsertOutcome::Created(user) = store.insert_user(new_user("c@example.com")).await?
        else {
            anyhow::bail!("expected user to be created");
        };
        store
            .insert_session(b"stale", user.id, Duration::ZERO)
            .await?;
        assert!(store.lookup_session(b"stale").await?.is_none());
        Ok(())
    }
    #[tokio::test]
    async fn new_session_prunes_expired_sessions_of_every_user() -> Result<()> {
        let store = MemoryStore::new();
        let InsertOutcome::Created(idle) = store.insert_user(new_user("d@example.com")).await?
        else {
            anyhow::bail!("expected user to be created");
        };
        let InsertOutcome::Created(active) = store.insert_user(new_user("e@example.com")).await?
        else {
            anyhow::bail!("expected user to be created");
        };
        store
            .insert_session(b"idle", idle.id, Duration::ZERO)
            .await?;
        store
            .insert_session(b"active", active.id, Duration::from_secs(60))
            .await?;
        assert_eq!(store.session_count().await, 1);
        Ok(())
    }
}
