//! Survey preview sessions (community context)

use clist_common::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Community of a preview session, `None` if the session does not exist
pub async fn get_community(pool: &SqlitePool, preview_session_id: Uuid) -> Result<Option<String>> {
    let community: Option<String> =
        sqlx::query_scalar("SELECT community FROM preview_sessions WHERE id = ?")
            .bind(preview_session_id.to_string())
            .fetch_optional(pool)
            .await?;

    Ok(community)
}

/// Insert a preview session (used by survey ingestion and tests)
pub async fn insert_preview_session(pool: &SqlitePool, id: Uuid, community: &str) -> Result<()> {
    sqlx::query("INSERT INTO preview_sessions (id, community) VALUES (?, ?)")
        .bind(id.to_string())
        .bind(community)
        .execute(pool)
        .await?;

    Ok(())
}
