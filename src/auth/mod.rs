//! Authentication module
//!
//! Password hashing, bearer-token issue and validation, and the request
//! gate that resolves a token to a stored user.

pub mod credentials;
pub mod gate;
pub mod handlers;
mod service;

pub use credentials::{inspect_token, Claims, CredentialService, Subject, TokenParts, TokenStatus};
pub use gate::{extract_bearer_token, AuthGate, CurrentUser};
pub use service::{AccessToken, AuthService, NewUser, TOKEN_TYPE};
