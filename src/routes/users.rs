use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::db;
use crate::error::AppError;
use crate::models::meeting::{AddHistoryRequest, HistoryQuery, MeetingVisit};
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::rooms::RoomCode;
use crate::state::AppState;

/// Present and not blank.
fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let (Some(name), Some(username), Some(password)) = (
        provided(input.name),
        provided(input.username),
        provided(input.password),
    ) else {
        return Err(AppError::BadRequest(
            "name, username and password are required".to_string(),
        ));
    };

    let username = username.trim();
    if username.chars().count() > 32 {
        return Err(AppError::BadRequest(
            "username must be between 1 and 32 characters".to_string(),
        ));
    }
    if password.len() < 8 || password.len() > 128 {
        return Err(AppError::BadRequest(
            "password must be between 8 and 128 characters".to_string(),
        ));
    }

    if db::users::username_exists(&state.db, username).await? {
        return Err(AppError::Conflict("user already exists".to_string()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?
        .to_string();

    let user = db::users::create_user(&state.db, name.trim(), username, &password_hash).await?;
    tracing::info!(user_id = %user.id, "registered user {}", user.username);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "user registered" })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (Some(username), Some(password)) = (provided(input.username), provided(input.password))
    else {
        return Err(AppError::BadRequest(
            "username and password are required".to_string(),
        ));
    };

    let (user_id, stored_hash) = db::users::get_credentials(&state.db, username.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("user not found".to_string()))?;

    let parsed_hash = PasswordHash::new(&stored_hash)
        .map_err(|e| AppError::Internal(format!("stored hash parse failed: {e}")))?;
    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(AppError::Unauthorized(
            "invalid username or password".to_string(),
        ));
    }

    let token = db::tokens::issue_token(&state.db, &user_id).await?;
    Ok(Json(serde_json::json!({ "token": token })))
}

async fn user_for_token(state: &AppState, token: &str) -> Result<String, AppError> {
    db::tokens::resolve_token(&state.db, token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid token".to_string()))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MeetingVisit>>, AppError> {
    let token = provided(query.token)
        .ok_or_else(|| AppError::BadRequest("token is required".to_string()))?;
    let user_id = user_for_token(&state, &token).await?;
    let meetings = db::meetings::list_meetings(&state.db, &user_id).await?;
    Ok(Json(meetings))
}

pub async fn add_history(
    State(state): State<AppState>,
    Json(input): Json<AddHistoryRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let (Some(token), Some(meeting_code)) = (provided(input.token), provided(input.meeting_code))
    else {
        return Err(AppError::BadRequest(
            "token and meeting_code are required".to_string(),
        ));
    };
    let code = RoomCode::parse(&meeting_code)
        .ok_or_else(|| AppError::BadRequest("invalid meeting code".to_string()))?;

    let user_id = user_for_token(&state, &token).await?;
    db::meetings::add_meeting(&state.db, &user_id, code.as_str()).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "message": "added code to history" })),
    ))
}
