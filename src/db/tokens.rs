use sqlx::SqlitePool;

use crate::auth::{create_token_hash, generate_token};
use crate::error::AppError;

/// Tokens stay valid this long after login.
const TOKEN_LIFETIME_DAYS: i64 = 30;

fn expiry_format(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Issue a new token for `user_id` and return the raw value. Only its hash
/// is stored.
pub async fn issue_token(pool: &SqlitePool, user_id: &str) -> Result<String, AppError> {
    let token = generate_token();
    let token_hash = create_token_hash(&token);
    let expires_at = expiry_format(chrono::Utc::now() + chrono::Duration::days(TOKEN_LIFETIME_DAYS));

    sqlx::query("INSERT INTO user_tokens (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(&token_hash)
        .bind(user_id)
        .bind(&expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}

/// Resolve a raw token to its user id. Unknown and expired tokens yield `None`.
pub async fn resolve_token(pool: &SqlitePool, token: &str) -> Result<Option<String>, AppError> {
    let token_hash = create_token_hash(token);
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT user_id, expires_at FROM user_tokens WHERE token_hash = ?",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let now = expiry_format(chrono::Utc::now());
    Ok(row.and_then(|(user_id, expires_at)| (expires_at >= now).then_some(user_id)))
}
