use actix_web::{http::header::AUTHORIZATION, web, HttpRequest, HttpResponse};
use serde::Deserialize;
use tracing::info;

use crate::auth::service::NewUser;
use crate::db::UserProfile;
use crate::error::{AppError, AuthError};
use crate::AppState;

/// OAuth2 password-grant form body.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

pub async fn register(
    req: web::Json<NewUser>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received registration request for username: {}", req.username);
    let user = state.auth_service.register(req.into_inner()).await?;

    Ok(HttpResponse::Created().json(UserProfile::new(&user, Vec::new())))
}

pub async fn login(
    form: web::Form<LoginForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    info!("Received login request for username: {}", form.username);
    let token = state.auth_service.login(&form.username, &form.password).await?;
    Ok(HttpResponse::Ok().json(token))
}

/// Returns the caller together with their posts. Unlike other protected
/// endpoints this one answers 404 when the token's user no longer exists.
pub async fn read_users_me(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let header = match req.headers().get(AUTHORIZATION) {
        None => None,
        Some(value) => Some(value.to_str().map_err(|_| AuthError::MalformedHeader)?),
    };

    let user = state.auth_gate.authenticate(header).await?;
    let posts = state.posts.list_posts_by_author(user.id).await?;

    Ok(HttpResponse::Ok().json(UserProfile::new(&user, posts)))
}
