/// Post service - post creation, deletion, comments, likes, and feeds
use std::collections::HashMap;
use std::sync::Arc;

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{comment_repo, like_repo, post_repo, user_repo};
use crate::error::{AppError, Result};
use crate::models::{CommentView, IncomingBlock, NewPost, Post, PostBlock, PostView, UserProfile};
use crate::storage::{derive_image_id, ImageStore};

pub struct PostService {
    pool: PgPool,
    images: Arc<dyn ImageStore>,
}

impl PostService {
    pub fn new(pool: PgPool, images: Arc<dyn ImageStore>) -> Self {
        Self { pool, images }
    }

    /// Create a post from validated input.
    ///
    /// Blocks are processed first, in order; then the legacy single image
    /// and the legacy image list are uploaded, one store call per image,
    /// preserving input order. The stored `images` list always has the same
    /// length and order as the input list.
    pub async fn create_post(&self, user_id: Uuid, new_post: NewPost) -> Result<Post> {
        if user_repo::find_profile_by_id(&self.pool, user_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let post_type = new_post.post_type().to_string();
        let (blocks, legacy) = match new_post {
            NewPost::BlockList { blocks, legacy, .. } => {
                let processed = process_blocks(self.images.as_ref(), blocks).await?;
                (Some(processed), legacy)
            }
            NewPost::LegacyText(legacy)
            | NewPost::LegacyImage(legacy)
            | NewPost::LegacyCode(legacy) => (None, legacy),
        };

        let img = match &legacy.img {
            Some(payload) => Some(self.images.upload(payload).await?),
            None => None,
        };

        let mut uploaded_images = Vec::with_capacity(legacy.images.len());
        for payload in &legacy.images {
            uploaded_images.push(self.images.upload(payload).await?);
        }

        // Blocks are persisted only when non-empty; a list that reduced to
        // nothing (all blocks dropped) is stored as absent.
        let blocks = blocks.filter(|b| !b.is_empty());

        let language = legacy.language.as_deref().unwrap_or("javascript");

        let post = post_repo::insert_post(
            &self.pool,
            user_id,
            legacy.text.as_deref(),
            img.as_deref(),
            uploaded_images,
            legacy.code_snippet.as_deref(),
            language,
            &post_type,
            blocks,
        )
        .await?;

        Ok(post)
    }

    /// Delete a post and every image it references from the store.
    ///
    /// Only the author may delete. Image deletions happen before the row
    /// delete; a failed store delete aborts the whole request.
    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        if post.user_id != user_id {
            return Err(AppError::Forbidden(
                "You are not authorized to delete this post".to_string(),
            ));
        }

        if let Some(img) = &post.img {
            self.images.destroy(derive_image_id(img)).await?;
        }

        for image_url in post.images.0.iter() {
            self.images.destroy(derive_image_id(image_url)).await?;
        }

        if let Some(blocks) = &post.blocks {
            for block in blocks.0.iter() {
                if let PostBlock::Image { image_url } = block {
                    self.images.destroy(derive_image_id(image_url)).await?;
                }
            }
        }

        // The row can disappear between the owner check and here
        if !post_repo::delete_post(&self.pool, post_id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }

        Ok(())
    }

    /// Append a comment to a post and return the updated, expanded post.
    /// Any authenticated user may comment on any post.
    pub async fn comment_on_post(
        &self,
        post_id: Uuid,
        user_id: Uuid,
        text: &str,
    ) -> Result<PostView> {
        if text.trim().is_empty() {
            return Err(AppError::BadRequest("Text field is required".to_string()));
        }

        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        comment_repo::insert_comment(&self.pool, post_id, user_id, text).await?;

        let mut views = self.expand_posts(vec![post]).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal("post expansion returned nothing".to_string()))
    }

    /// Toggle the requester's like on a post and return the resulting
    /// likers set.
    ///
    /// Membership check, like row, and the "like" notification all commit
    /// in one transaction, so a failure partway leaves no partial state.
    pub async fn toggle_like(&self, post_id: Uuid, user_id: Uuid) -> Result<Vec<Uuid>> {
        let post = post_repo::find_post_by_id(&self.pool, post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

        let mut tx = self.pool.begin().await?;

        let already_liked: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT user_id
            FROM likes
            WHERE post_id = $1 AND user_id = $2
            FOR UPDATE
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        if already_liked.is_some() {
            sqlx::query(
                r#"
                DELETE FROM likes
                WHERE post_id = $1 AND user_id = $2
                "#,
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        } else {
            sqlx::query(
                r#"
                INSERT INTO likes (post_id, user_id)
                VALUES ($1, $2)
                ON CONFLICT (post_id, user_id) DO NOTHING
                "#,
            )
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO notifications (from_user_id, to_user_id, notif_type)
                VALUES ($1, $2, 'like')
                "#,
            )
            .bind(user_id)
            .bind(post.user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        let likers = like_repo::likers_of_post(&self.pool, post_id).await?;
        Ok(likers)
    }

    /// All posts, newest first, with authors and commenters expanded.
    pub async fn get_all_posts(&self) -> Result<Vec<PostView>> {
        let posts = post_repo::find_all_posts(&self.pool).await?;
        self.expand_posts(posts).await
    }

    /// Posts the given user has liked, in store order.
    pub async fn get_liked_posts(&self, user_id: Uuid) -> Result<Vec<PostView>> {
        if user_repo::find_profile_by_id(&self.pool, user_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let liked_ids = like_repo::liked_post_ids(&self.pool, user_id).await?;
        let posts = post_repo::find_posts_by_ids(&self.pool, &liked_ids).await?;
        self.expand_posts(posts).await
    }

    /// Posts authored by users the requester follows, newest first.
    /// A user following nobody gets an empty feed.
    pub async fn get_following_posts(&self, user_id: Uuid) -> Result<Vec<PostView>> {
        if user_repo::find_profile_by_id(&self.pool, user_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let following = user_repo::following_ids(&self.pool, user_id).await?;
        if following.is_empty() {
            return Ok(Vec::new());
        }

        let posts = post_repo::find_posts_by_authors(&self.pool, &following).await?;
        self.expand_posts(posts).await
    }

    /// Posts by the named user, newest first.
    pub async fn get_user_posts(&self, username: &str) -> Result<Vec<PostView>> {
        let user = user_repo::find_profile_by_username(&self.pool, username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        let posts = post_repo::find_posts_by_user(&self.pool, user.id).await?;
        self.expand_posts(posts).await
    }

    /// Expand posts with author profiles, comments (with commenter
    /// profiles), and likers. Input order is preserved.
    async fn expand_posts(&self, posts: Vec<Post>) -> Result<Vec<PostView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let post_ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let mut author_ids: Vec<Uuid> = posts.iter().map(|p| p.user_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<Uuid, UserProfile> =
            user_repo::find_profiles_by_ids(&self.pool, &author_ids)
                .await?
                .into_iter()
                .map(|profile| (profile.id, profile))
                .collect();

        let mut comments_by_post: HashMap<Uuid, Vec<CommentView>> = HashMap::new();
        for (post_id, comment) in comment_repo::find_for_posts(&self.pool, &post_ids).await? {
            comments_by_post.entry(post_id).or_default().push(comment);
        }

        let mut likes_by_post: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for (post_id, liker) in like_repo::likers_for_posts(&self.pool, &post_ids).await? {
            likes_by_post.entry(post_id).or_default().push(liker);
        }

        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            let user = authors.get(&post.user_id).cloned().ok_or_else(|| {
                AppError::Internal(format!("author {} missing for post {}", post.user_id, post.id))
            })?;
            let comments = comments_by_post.remove(&post.id).unwrap_or_default();
            let likes = likes_by_post.remove(&post.id).unwrap_or_default();
            views.push(PostView::assemble(post, user, comments, likes));
        }

        Ok(views)
    }
}

/// Process incoming content blocks in order.
///
/// Image blocks upload their inline data and are rewritten to hold the
/// resulting URL; image blocks without data are dropped. Code blocks copy
/// through with language defaulting to "javascript". Unrecognized block
/// types are dropped, with a count recorded in the log.
pub(crate) async fn process_blocks(
    images: &dyn ImageStore,
    blocks: Vec<IncomingBlock>,
) -> Result<Vec<PostBlock>> {
    let mut processed = Vec::with_capacity(blocks.len());
    let mut dropped = 0usize;

    for block in blocks {
        match block {
            IncomingBlock::Image {
                image_data: Some(payload),
            } => {
                let image_url = images.upload(&payload).await?;
                processed.push(PostBlock::Image { image_url });
            }
            IncomingBlock::Image { image_data: None } => {
                dropped += 1;
            }
            IncomingBlock::Code {
                code_snippet,
                language,
            } => {
                processed.push(PostBlock::Code {
                    code_snippet,
                    language: language.unwrap_or_else(|| "javascript".to_string()),
                });
            }
            IncomingBlock::Unknown => {
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        tracing::warn!(dropped, "dropped unsupported content blocks");
    }

    Ok(processed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MockImageStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sequential_uploads() -> MockImageStore {
        let counter = AtomicUsize::new(0);
        let mut store = MockImageStore::new();
        store.expect_upload().returning(move |_| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(format!("https://cdn.example.com/posts/img-{}", n))
        });
        store
    }

    #[tokio::test]
    async fn blocks_are_processed_in_order() {
        let store = sequential_uploads();

        let blocks = vec![
            IncomingBlock::Image {
                image_data: Some("data:image/png;base64,AAAA".to_string()),
            },
            IncomingBlock::Code {
                code_snippet: "let x = 1;".to_string(),
                language: None,
            },
            IncomingBlock::Image {
                image_data: Some("data:image/png;base64,BBBB".to_string()),
            },
        ];

        let processed = process_blocks(&store, blocks).await.unwrap();
        assert_eq!(
            processed,
            vec![
                PostBlock::Image {
                    image_url: "https://cdn.example.com/posts/img-0".to_string(),
                },
                PostBlock::Code {
                    code_snippet: "let x = 1;".to_string(),
                    language: "javascript".to_string(),
                },
                PostBlock::Image {
                    image_url: "https://cdn.example.com/posts/img-1".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn unknown_and_empty_image_blocks_are_dropped() {
        let store = sequential_uploads();

        let blocks = vec![
            IncomingBlock::Unknown,
            IncomingBlock::Image { image_data: None },
            IncomingBlock::Code {
                code_snippet: "pass".to_string(),
                language: Some("python".to_string()),
            },
        ];

        let processed = process_blocks(&store, blocks).await.unwrap();
        assert_eq!(
            processed,
            vec![PostBlock::Code {
                code_snippet: "pass".to_string(),
                language: "python".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn upload_failure_aborts_block_processing() {
        let mut store = MockImageStore::new();
        store
            .expect_upload()
            .returning(|_| Err(crate::error::AppError::StorageError("boom".to_string())));

        let blocks = vec![IncomingBlock::Image {
            image_data: Some("data:image/png;base64,AAAA".to_string()),
        }];

        let result = process_blocks(&store, blocks).await;
        assert!(matches!(
            result,
            Err(crate::error::AppError::StorageError(_))
        ));
    }
}
