/// Post handlers - HTTP endpoints for post operations
use crate::error::Result;
use crate::middleware::UserId;
use crate::models::{IncomingBlock, LegacyContent, NewPost};
use crate::services::PostService;
use crate::storage::ImageStore;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Post creation body: legacy single-type fields and/or a `blocks` list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub text: Option<String>,
    pub img: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub code_snippet: Option<String>,
    pub language: Option<String>,
    pub post_type: Option<String>,
    pub blocks: Option<Vec<IncomingBlock>>,
}

impl CreatePostRequest {
    /// Decode into validated creation input before any business logic runs.
    pub fn into_new_post(self) -> Result<NewPost> {
        let legacy = LegacyContent {
            text: self.text,
            img: self.img,
            images: self.images,
            code_snippet: self.code_snippet,
            language: self.language,
        };
        NewPost::decode(self.post_type, self.blocks, legacy)
    }
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: Option<String>,
}

/// Create a new post
/// POST /api/v1/posts
pub async fn create_post(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    user_id: UserId,
    req: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let new_post = req.into_inner().into_new_post()?;

    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let post = service.create_post(user_id.0, new_post).await?;

    Ok(HttpResponse::Created().json(post))
}

/// Delete a post
/// DELETE /api/v1/posts/{post_id}
pub async fn delete_post(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    service.delete_post(*post_id, user_id.0).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Post deleted successfully"
    })))
}

/// Comment on a post
/// POST /api/v1/posts/{post_id}/comment
pub async fn comment_on_post(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
    req: web::Json<CommentRequest>,
) -> Result<HttpResponse> {
    let text = req.text.as_deref().unwrap_or_default();

    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let post = service.comment_on_post(*post_id, user_id.0, text).await?;

    Ok(HttpResponse::Ok().json(post))
}

/// Like or unlike a post; returns the resulting likers array
/// POST /api/v1/posts/{post_id}/like
pub async fn like_unlike_post(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    post_id: web::Path<Uuid>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let likers = service.toggle_like(*post_id, user_id.0).await?;

    Ok(HttpResponse::Ok().json(likers))
}

/// Get all posts, newest first
/// GET /api/v1/posts
pub async fn get_all_posts(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let posts = service.get_all_posts().await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Get posts liked by a user
/// GET /api/v1/posts/liked/{user_id}
pub async fn get_liked_posts(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let posts = service.get_liked_posts(path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Get posts from followed users
/// GET /api/v1/posts/following
pub async fn get_following_posts(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    user_id: UserId,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let posts = service.get_following_posts(user_id.0).await?;

    Ok(HttpResponse::Ok().json(posts))
}

/// Get a user's posts by username
/// GET /api/v1/posts/user/{username}
pub async fn get_user_posts(
    pool: web::Data<PgPool>,
    images: web::Data<Arc<dyn ImageStore>>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let service = PostService::new((**pool).clone(), images.get_ref().clone());
    let posts = service.get_user_posts(&path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(posts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[test]
    fn wire_format_decodes_camel_case_legacy_fields() {
        let body = r#"{
            "postType": "code",
            "codeSnippet": "fn main() {}",
            "language": "rust"
        }"#;
        let req: CreatePostRequest = serde_json::from_str(body).unwrap();
        let new_post = req.into_new_post().unwrap();
        assert!(matches!(new_post, NewPost::LegacyCode(_)));
        assert_eq!(new_post.legacy().language.as_deref(), Some("rust"));
    }

    #[test]
    fn wire_format_decodes_blocks() {
        let body = r#"{
            "blocks": [
                {"type": "image", "imageData": "data:image/png;base64,AAAA"},
                {"type": "code", "codeSnippet": "x = 1", "language": "python"}
            ]
        }"#;
        let req: CreatePostRequest = serde_json::from_str(body).unwrap();
        let new_post = req.into_new_post().unwrap();
        match new_post {
            NewPost::BlockList {
                blocks,
                declared_type,
                ..
            } => {
                assert_eq!(blocks.len(), 2);
                assert_eq!(declared_type, "text");
            }
            other => panic!("expected block list, got {:?}", other),
        }
    }

    #[test]
    fn empty_text_post_is_rejected_at_decode() {
        let body = r#"{"postType": "text"}"#;
        let req: CreatePostRequest = serde_json::from_str(body).unwrap();
        assert!(matches!(
            req.into_new_post(),
            Err(AppError::BadRequest(_))
        ));
    }
}
