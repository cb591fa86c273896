use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::credentials::CredentialService;
use crate::db::{User, UserStore};
use crate::error::{AppError, AuthError, DatabaseError};
use crate::Result;

pub const TOKEN_TYPE: &str = "bearer";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

/// Registration and password login on top of the credential service and
/// the user store.
pub struct AuthService {
    credentials: Arc<CredentialService>,
    users: Arc<dyn UserStore>,
}

impl AuthService {
    pub fn new(credentials: Arc<CredentialService>, users: Arc<dyn UserStore>) -> Self {
        Self { credentials, users }
    }

    pub async fn register(&self, new_user: NewUser) -> Result<User> {
        let username = new_user.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::ValidationError("username must not be empty".into()));
        }
        if username.contains(char::is_whitespace) {
            return Err(AppError::ValidationError("username must not contain whitespace".into()));
        }
        if new_user.password.is_empty() {
            return Err(AppError::ValidationError("password must not be empty".into()));
        }

        if self.users.get_user_by_username(&username).await?.is_some() {
            warn!("Registration rejected, username already taken: {}", username);
            return Err(AuthError::DuplicateRegistration.into());
        }

        let credentials = self.credentials.clone();
        let password = new_user.password;
        let hashed_password = run_blocking(move || credentials.hash_password(&password)).await??;

        let email = new_user.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty());
        let user = User::new(username, hashed_password, email, new_user.full_name);

        match self.users.create_user(&user).await {
            Ok(user) => {
                info!("Registered user: {}", user.username);
                Ok(user)
            }
            // Lost a race with a concurrent registration of the same name.
            Err(AppError::DatabaseError(DatabaseError::Duplicate(field))) if field == "username" => {
                Err(AuthError::DuplicateRegistration.into())
            }
            Err(e) => Err(e),
        }
    }

    /// Unknown usernames and wrong passwords both yield
    /// [`AuthError::PasswordMismatch`] after the same amount of hashing work.
    pub async fn login(&self, username: &str, password: &str) -> Result<AccessToken> {
        let user = self.users.get_user_by_username(username.trim()).await?;

        let credentials = self.credentials.clone();
        let password = password.to_string();
        let stored_hash = user.as_ref().map(|u| u.hashed_password.clone());
        let verified = run_blocking(move || match stored_hash {
            Some(hash) => credentials.verify_password(&password, &hash),
            None => credentials.verify_decoy(&password),
        })
        .await?;

        let user = match user {
            Some(user) if verified && user.is_active => user,
            _ => {
                warn!("Login failed for username: {}", username);
                return Err(AuthError::PasswordMismatch.into());
            }
        };

        let access_token = self.credentials.issue_token(&user.username)?;
        info!("Login successful for username: {}", user.username);

        Ok(AccessToken {
            access_token,
            token_type: TOKEN_TYPE.to_string(),
        })
    }
}

// Password hashing is CPU-bound; keep it off the request workers.
async fn run_blocking<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::InternalError(format!("blocking task failed: {}", e)))
}
