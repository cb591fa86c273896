//! Request-time authentication.
//!
//! [`AuthGate::authenticate`] turns a raw `Authorization` header into the
//! stored user it names, or rejects. [`CurrentUser`] wraps it as an actix
//! extractor for protected handlers.

use std::sync::Arc;

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use tracing::debug;

use crate::auth::credentials::{CredentialService, TokenStatus};
use crate::db::{User, UserStore};
use crate::error::{AppError, AuthError};
use crate::{AppState, Result};

const BEARER_SCHEME: &str = "Bearer";

pub struct AuthGate {
    credentials: Arc<CredentialService>,
    users: Arc<dyn UserStore>,
}

impl AuthGate {
    pub fn new(credentials: Arc<CredentialService>, users: Arc<dyn UserStore>) -> Self {
        Self { credentials, users }
    }

    /// Resolves the user named by a `Bearer <token>` header.
    ///
    /// Rejections: [`AuthError::MissingCredentials`] for an absent or blank
    /// header, [`AuthError::MalformedHeader`] when it is not exactly a bearer
    /// scheme and one token, [`AuthError::InvalidOrExpiredCredential`] for a
    /// token that does not verify or names an inactive user, and
    /// [`AuthError::UnknownSubject`] when the user no longer exists. Store
    /// failures propagate unchanged.
    pub async fn authenticate(&self, raw_header: Option<&str>) -> Result<User> {
        let token = extract_bearer_token(raw_header)?;

        let subject = match self.credentials.decode_token(token) {
            TokenStatus::Valid(subject) => subject,
            TokenStatus::Invalid => return Err(AuthError::InvalidOrExpiredCredential.into()),
        };

        let user = self
            .users
            .get_user_by_username(subject.as_str())
            .await?
            .ok_or(AuthError::UnknownSubject)?;

        if !user.is_active {
            debug!("Rejected credential for inactive user");
            return Err(AuthError::InvalidOrExpiredCredential.into());
        }

        Ok(user)
    }
}

/// Splits `<scheme> <token>` on a single space. The scheme must be `Bearer`
/// (any case) and the token must be non-empty and contain no further spaces.
pub fn extract_bearer_token(raw_header: Option<&str>) -> std::result::Result<&str, AuthError> {
    let header = match raw_header.map(str::trim) {
        Some(header) if !header.is_empty() => header,
        _ => return Err(AuthError::MissingCredentials),
    };

    let (scheme, token) = header.split_once(' ').ok_or(AuthError::MalformedHeader)?;
    if !scheme.eq_ignore_ascii_case(BEARER_SCHEME) || token.is_empty() || token.contains(' ') {
        return Err(AuthError::MalformedHeader);
    }

    Ok(token)
}

/// Authenticated caller of a protected endpoint.
///
/// A token whose user has disappeared is reported like any other invalid
/// credential; only `/users/me` distinguishes that case.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let header = req
            .headers()
            .get(AUTHORIZATION)
            .map(|value| value.to_str().map(str::to_owned));

        Box::pin(async move {
            let state = state.ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
            let header = match header {
                None => None,
                Some(Ok(value)) => Some(value),
                Some(Err(_)) => return Err(AuthError::MalformedHeader.into()),
            };

            match state.auth_gate.authenticate(header.as_deref()).await {
                Ok(user) => Ok(CurrentUser(user)),
                Err(AppError::AuthError(AuthError::UnknownSubject)) => {
                    Err(AuthError::InvalidOrExpiredCredential.into())
                }
                Err(e) => Err(e),
            }
        })
    }
}
