use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::db::Post;
use crate::error::{AppError, AuthError, DatabaseError};
use crate::AppState;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct PostCreate {
    pub title: String,
    pub content: String,
    pub image_url: Url,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
}

impl Pagination {
    fn bounds(&self) -> (i64, i64) {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(0, MAX_PAGE_SIZE);
        (skip, limit)
    }
}

pub async fn create_post(
    CurrentUser(author): CurrentUser,
    req: web::Json<PostCreate>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let req = req.into_inner();
    if req.title.trim().is_empty() {
        return Err(AppError::ValidationError("title must not be empty".into()));
    }
    if !matches!(req.image_url.scheme(), "http" | "https") {
        return Err(AppError::ValidationError("image_url must be an http(s) URL".into()));
    }

    let post = Post::new(req.title, req.content, req.image_url.to_string(), author.id);
    let post = state.posts.create_post(&post).await?;
    info!("User {} created post {}", author.username, post.id);

    Ok(HttpResponse::Created().json(post))
}

pub async fn list_posts(
    query: web::Query<Pagination>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let (skip, limit) = query.bounds();
    let posts = state.posts.list_posts(skip, limit).await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_post(
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = state
        .posts
        .get_post(path.into_inner())
        .await?
        .ok_or(DatabaseError::NotFound)?;
    Ok(HttpResponse::Ok().json(post))
}

pub async fn delete_post(
    CurrentUser(caller): CurrentUser,
    path: web::Path<Uuid>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let post = state.posts.get_post(id).await?.ok_or(DatabaseError::NotFound)?;

    if post.author_id != caller.id {
        return Err(AuthError::NotAuthor.into());
    }

    if !state.posts.delete_post(id).await? {
        return Err(DatabaseError::NotFound.into());
    }
    info!("User {} deleted post {}", caller.username, id);

    Ok(HttpResponse::NoContent().finish())
}
