use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::models::{Post, User};
use crate::db::{PostStore, UserStore};
use crate::error::DatabaseError;
use crate::Result;

/// Process-local store used for development and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, User>>,
    posts: RwLock<Vec<Post>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a user by username, leaving their posts in place.
    pub async fn remove_user(&self, username: &str) -> Option<User> {
        self.users.write().await.remove(username)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.read().await.get(username).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<User> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.username) {
            return Err(DatabaseError::Duplicate("username".to_string()).into());
        }
        if let Some(email) = &user.email {
            if users.values().any(|u| u.email.as_ref() == Some(email)) {
                return Err(DatabaseError::Duplicate("email".to_string()).into());
            }
        }

        users.insert(user.username.clone(), user.clone());
        Ok(user.clone())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        self.posts.write().await.push(post.clone());
        Ok(post.clone())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.posts.read().await.iter().find(|p| p.id == id).cloned())
    }

    async fn list_posts(&self, skip: i64, limit: i64) -> Result<Vec<Post>> {
        let skip = usize::try_from(skip.max(0)).unwrap_or(usize::MAX);
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);

        Ok(self.posts.read().await.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>> {
        Ok(self
            .posts
            .read()
            .await
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect())
    }

    async fn delete_post(&self, id: Uuid) -> Result<bool> {
        let mut posts = self.posts.write().await;
        let before = posts.len();
        posts.retain(|p| p.id != id);
        Ok(posts.len() != before)
    }
}
