use crate::models::{Post, PostBlock};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

const POST_COLUMNS: &str =
    "id, user_id, text, img, images, code_snippet, language, post_type, blocks, created_at";

/// Insert a new post. `blocks` is stored only when non-empty; the column
/// stays NULL otherwise.
#[allow(clippy::too_many_arguments)]
pub async fn insert_post(
    pool: &PgPool,
    user_id: Uuid,
    text: Option<&str>,
    img: Option<&str>,
    images: Vec<String>,
    code_snippet: Option<&str>,
    language: &str,
    post_type: &str,
    blocks: Option<Vec<PostBlock>>,
) -> Result<Post, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        INSERT INTO posts (user_id, text, img, images, code_snippet, language, post_type, blocks)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {POST_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(text)
    .bind(img)
    .bind(Json(images))
    .bind(code_snippet)
    .bind(language)
    .bind(post_type)
    .bind(blocks.map(Json))
    .fetch_one(pool)
    .await?;

    Ok(post)
}

/// Find a post by id.
pub async fn find_post_by_id(pool: &PgPool, post_id: Uuid) -> Result<Option<Post>, sqlx::Error> {
    let post = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE id = $1
        "#
    ))
    .bind(post_id)
    .fetch_optional(pool)
    .await?;

    Ok(post)
}

/// All posts, newest first.
pub async fn find_all_posts(pool: &PgPool) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        ORDER BY created_at DESC
        "#
    ))
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// All posts by one author, newest first.
pub async fn find_posts_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Posts authored by any of the given users, newest first.
pub async fn find_posts_by_authors(
    pool: &PgPool,
    author_ids: &[Uuid],
) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE user_id = ANY($1)
        ORDER BY created_at DESC
        "#
    ))
    .bind(author_ids)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Posts whose id is in the given set, in store order (no explicit sort).
pub async fn find_posts_by_ids(pool: &PgPool, post_ids: &[Uuid]) -> Result<Vec<Post>, sqlx::Error> {
    let posts = sqlx::query_as::<_, Post>(&format!(
        r#"
        SELECT {POST_COLUMNS}
        FROM posts
        WHERE id = ANY($1)
        "#
    ))
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    Ok(posts)
}

/// Hard delete a post. Comments and likes cascade. Returns whether a row
/// was actually removed.
pub async fn delete_post(pool: &PgPool, post_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        DELETE FROM posts
        WHERE id = $1
        "#,
    )
    .bind(post_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}
