use crate::models::UserProfile;
use sqlx::PgPool;
use uuid::Uuid;

/// Find a user's public profile by id. The password hash is never selected.
pub async fn find_profile_by_id(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, username, full_name, profile_img_url
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Find a user's public profile by username.
pub async fn find_profile_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let profile = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, username, full_name, profile_img_url
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(profile)
}

/// Fetch public profiles for a set of users.
pub async fn find_profiles_by_ids(
    pool: &PgPool,
    user_ids: &[Uuid],
) -> Result<Vec<UserProfile>, sqlx::Error> {
    let profiles = sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT id, username, full_name, profile_img_url
        FROM users
        WHERE id = ANY($1)
        "#,
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await?;

    Ok(profiles)
}

/// Ids of every user the given user follows.
pub async fn following_ids(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (Uuid,)>(
        r#"
        SELECT followee_id
        FROM follows
        WHERE follower_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}
