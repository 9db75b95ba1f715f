//! Match session persistence
//!
//! Sessions are saved after every transition so an open session survives a
//! service restart. Complex fields are stored as JSON text.

use clist_common::db::retry_on_lock;
use clist_common::{Error, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::MatchSession;

fn to_json<T: serde::Serialize>(field: &str, value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| Error::Internal(format!("Failed to serialize {}: {}", field, e)))
}

fn from_json<T: serde::de::DeserializeOwned>(field: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| Error::Internal(format!("Failed to deserialize {}: {}", field, e)))
}

fn parse_timestamp(field: &str, raw: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))
}

/// Insert or update a match session
///
/// Wrapped in `retry_on_lock` to ride out transient lock contention.
pub async fn save_session(pool: &SqlitePool, session: &MatchSession, max_wait_ms: u64) -> Result<()> {
    // Prepare all data before touching the database
    let session_id = session.session_id.to_string();
    let preview_session_id = session.preview_session_id.to_string();
    let queue = to_json("queue", &session.queue)?;
    let step = to_json("step", &session.step)?;
    let outcomes = to_json("outcomes", &session.outcomes)?;
    let notice = session
        .notice
        .as_ref()
        .map(|n| to_json("notice", n))
        .transpose()?;
    let current_index = session.current_index as i64;
    let started_at = session.started_at.to_rfc3339();
    let ended_at = session.ended_at.map(|dt| dt.to_rfc3339());

    retry_on_lock("save_match_session", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO match_sessions (
                session_id, preview_session_id, community, queue,
                current_index, step, outcomes, notice, started_at, ended_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(session_id) DO UPDATE SET
                queue = excluded.queue,
                current_index = excluded.current_index,
                step = excluded.step,
                outcomes = excluded.outcomes,
                notice = excluded.notice,
                ended_at = excluded.ended_at
            "#,
        )
        .bind(&session_id)
        .bind(&preview_session_id)
        .bind(&session.community)
        .bind(&queue)
        .bind(current_index)
        .bind(&step)
        .bind(&outcomes)
        .bind(&notice)
        .bind(&started_at)
        .bind(&ended_at)
        .execute(pool)
        .await?;

        Ok::<(), Error>(())
    })
    .await
}

/// Load a match session, `None` if it was never saved
pub async fn load_session(pool: &SqlitePool, session_id: Uuid) -> Result<Option<MatchSession>> {
    let row = sqlx::query(
        r#"
        SELECT session_id, preview_session_id, community, queue,
               current_index, step, outcomes, notice, started_at, ended_at
        FROM match_sessions
        WHERE session_id = ?
        "#,
    )
    .bind(session_id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let preview_session_id: String = row.try_get("preview_session_id")?;
    let queue: String = row.try_get("queue")?;
    let step: String = row.try_get("step")?;
    let outcomes: String = row.try_get("outcomes")?;
    let notice: Option<String> = row.try_get("notice")?;
    let started_at: String = row.try_get("started_at")?;
    let ended_at: Option<String> = row.try_get("ended_at")?;

    Ok(Some(MatchSession {
        session_id,
        preview_session_id: clist_common::uuid_utils::parse_column(
            "preview_session_id",
            &preview_session_id,
        )?,
        community: row.try_get("community")?,
        queue: from_json("queue", &queue)?,
        current_index: row.try_get::<i64, _>("current_index")? as usize,
        step: from_json("step", &step)?,
        outcomes: from_json("outcomes", &outcomes)?,
        notice: notice.as_deref().map(|n| from_json("notice", n)).transpose()?,
        started_at: parse_timestamp("started_at", &started_at)?,
        ended_at: ended_at
            .as_deref()
            .map(|s| parse_timestamp("ended_at", s))
            .transpose()?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchStep, MentionOutcome};
    use clist_common::db::{init_database, PendingVendorMention};

    #[tokio::test]
    async fn test_session_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("clist.db")).await.unwrap();
        let preview = Uuid::new_v4();
        let queue = vec![
            PendingVendorMention {
                id: Uuid::new_v4(),
                vendor_name: "Acme Pools".to_string(),
                category: "Pool Service".to_string(),
                session_id: preview,
                vendor_id: None,
            },
            PendingVendorMention {
                id: Uuid::new_v4(),
                vendor_name: "Joe's Lawn".to_string(),
                category: "Landscaping".to_string(),
                session_id: preview,
                vendor_id: None,
            },
        ];

        let mut session = MatchSession::new(preview, "Boca Bridges".to_string(), queue);
        session.enter_step(MatchStep::NoExactMatch);
        session.record_outcome(MentionOutcome::Skipped);
        session.move_to_next();
        session.enter_step(MatchStep::NoExactMatch);
        session.set_notice("vendor insert failed".to_string(), Some(session.queue[1].id));

        save_session(&pool, &session, 1000).await.unwrap();
        // Second save exercises the upsert path
        save_session(&pool, &session, 1000).await.unwrap();

        let loaded = load_session(&pool, session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.community, "Boca Bridges");
        assert_eq!(loaded.queue, session.queue);
        assert_eq!(loaded.current_index, 1);
        assert_eq!(loaded.step, MatchStep::NoExactMatch);
        assert_eq!(loaded.outcomes, session.outcomes);
        assert_eq!(loaded.notice, session.notice);
        assert_eq!(loaded.started_at, session.started_at);
    }

    #[tokio::test]
    async fn test_unknown_session_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("clist.db")).await.unwrap();

        assert!(load_session(&pool, Uuid::new_v4()).await.unwrap().is_none());
    }
}
