use sqlx::{Row, SqlitePool};

use crate::error::AppError;
use crate::models::user::User;

fn row_to_user(row: sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        username: row.get("username"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USERS: &str = "SELECT id, name, username, created_at FROM users";

pub async fn get_user(pool: &SqlitePool, user_id: &str) -> Result<User, AppError> {
    let row = sqlx::query(&format!("{SELECT_USERS} WHERE id = ?"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    Ok(row_to_user(row))
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool, AppError> {
    let existing = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(existing.is_some())
}

/// Insert a user whose password has already been hashed.
pub async fn create_user(
    pool: &SqlitePool,
    name: &str,
    username: &str,
    password_hash: &str,
) -> Result<User, AppError> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO users (id, name, username, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(name)
    .bind(username)
    .bind(password_hash)
    .bind(super::now_timestamp())
    .execute(pool)
    .await
    .map_err(|e| match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("user already exists".to_string()),
        other => other,
    })?;

    get_user(pool, &id).await
}

/// Returns `(user_id, password_hash)` for a username, if it exists.
pub async fn get_credentials(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<(String, String)>, AppError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT id, password_hash FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}
