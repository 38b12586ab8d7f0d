use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::meeting::MeetingVisit;

pub async fn add_meeting(
    pool: &SqlitePool,
    user_id: &str,
    meeting_code: &str,
) -> Result<MeetingVisit, AppError> {
    let when = super::now_timestamp();
    sqlx::query("INSERT INTO meetings (id, user_id, meeting_code, created_at) VALUES (?, ?, ?, ?)")
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(meeting_code)
        .bind(&when)
        .execute(pool)
        .await?;

    Ok(MeetingVisit {
        room_code: meeting_code.to_string(),
        when,
    })
}

/// A user's meetings, oldest first.
pub async fn list_meetings(pool: &SqlitePool, user_id: &str) -> Result<Vec<MeetingVisit>, AppError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT meeting_code, created_at FROM meetings WHERE user_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(room_code, when)| MeetingVisit { room_code, when })
        .collect())
}
