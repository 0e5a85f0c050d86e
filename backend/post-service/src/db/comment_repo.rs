use crate::models::{CommentView, UserProfile};
use sqlx::{PgPool, Row};
use uuid::Uuid;

/// Append a comment to a post's ordered comment list.
pub async fn insert_comment(
    pool: &PgPool,
    post_id: Uuid,
    user_id: Uuid,
    text: &str,
) -> Result<Uuid, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO comments (post_id, user_id, text)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(post_id)
    .bind(user_id)
    .bind(text)
    .fetch_one(pool)
    .await?;

    Ok(row.get("id"))
}

/// Comments for a set of posts with their authors expanded, oldest first
/// within each post.
pub async fn find_for_posts(
    pool: &PgPool,
    post_ids: &[Uuid],
) -> Result<Vec<(Uuid, CommentView)>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.post_id, c.text, c.created_at,
               u.id AS author_id, u.username, u.full_name, u.profile_img_url
        FROM comments c
        JOIN users u ON u.id = c.user_id
        WHERE c.post_id = ANY($1)
        ORDER BY c.created_at ASC
        "#,
    )
    .bind(post_ids)
    .fetch_all(pool)
    .await?;

    let comments = rows
        .into_iter()
        .map(|row| {
            let post_id: Uuid = row.get("post_id");
            let view = CommentView {
                id: row.get("id"),
                text: row.get("text"),
                user: UserProfile {
                    id: row.get("author_id"),
                    username: row.get("username"),
                    full_name: row.get("full_name"),
                    profile_img_url: row.get("profile_img_url"),
                },
                created_at: row.get("created_at"),
            };
            (post_id, view)
        })
        .collect();

    Ok(comments)
}
