use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Stored user record. Carries the password hash, so it is never
/// serialized to clients directly; see [`UserProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub hashed_password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: String,
        hashed_password: String,
        email: Option<String>,
        full_name: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            hashed_password,
            email,
            full_name,
            is_active: true,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub image_url: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(title: String, content: String, image_url: String, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            content,
            image_url,
            author_id,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub is_active: bool,
    #[serde(default)]
    pub posts: Vec<Post>,
}

impl UserProfile {
    pub fn new(user: &User, posts: Vec<Post>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            is_active: user.is_active,
            posts,
        }
    }
}
