//! Storage for users and posts.
//!
//! Handlers and the auth layer only see the [`UserStore`] and [`PostStore`]
//! traits. [`DbOperations`] backs them with Postgres, [`MemoryStore`] keeps
//! everything in process memory.

pub mod memory;
pub mod models;
pub mod operations;

use async_trait::async_trait;
use uuid::Uuid;

use crate::Result;

pub use memory::MemoryStore;
pub use models::{Post, User, UserProfile};
pub use operations::DbOperations;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Inserts a new user. Fails with `DatabaseError::Duplicate("username")`
    /// or `DatabaseError::Duplicate("email")` on a uniqueness conflict.
    async fn create_user(&self, user: &User) -> Result<User>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post>;

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>>;

    /// Oldest first.
    async fn list_posts(&self, skip: i64, limit: i64) -> Result<Vec<Post>>;

    async fn list_posts_by_author(&self, author_id: Uuid) -> Result<Vec<Post>>;

    /// Returns whether a post was removed.
    async fn delete_post(&self, id: Uuid) -> Result<bool>;
}
