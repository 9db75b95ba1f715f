//! Survey pending ratings (vendor mentions awaiting a canonical vendor)

use clist_common::db::PendingVendorMention;
use clist_common::{uuid_utils, Error, Result};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::warn;
use uuid::Uuid;

/// Unmatched mentions of one preview session, oldest first
pub async fn list_unmatched(
    pool: &SqlitePool,
    preview_session_id: Uuid,
) -> Result<Vec<PendingVendorMention>> {
    let rows = sqlx::query(
        r#"
        SELECT id, session_id, vendor_name, category, vendor_id
        FROM survey_pending_ratings
        WHERE session_id = ?
          AND vendor_id IS NULL
        ORDER BY created_at ASC, rowid ASC
        "#,
    )
    .bind(preview_session_id.to_string())
    .fetch_all(pool)
    .await?;

    rows.iter().map(PendingVendorMention::from_row).collect()
}

/// Fetch mentions by id, in the requested order
///
/// Unknown ids are dropped with a warning.
pub async fn get_mentions(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<PendingVendorMention>> {
    let mut mentions = Vec::with_capacity(ids.len());

    for id in ids {
        match get_mention(pool, *id).await? {
            Some(mention) => mentions.push(mention),
            None => warn!(mention_id = %id, "Requested mention not found, leaving it out of the queue"),
        }
    }

    Ok(mentions)
}

pub async fn get_mention(pool: &SqlitePool, id: Uuid) -> Result<Option<PendingVendorMention>> {
    let row = sqlx::query(
        "SELECT id, session_id, vendor_name, category, vendor_id FROM survey_pending_ratings WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(PendingVendorMention::from_row).transpose()
}

/// Point a mention at its canonical vendor
///
/// Only unmatched mentions are updated. Zero affected rows means the mention
/// was matched by someone else or no longer exists, reported as `Conflict`.
pub async fn set_vendor_id<'e, E>(executor: E, mention_id: Uuid, vendor_id: Uuid) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE survey_pending_ratings SET vendor_id = ? WHERE id = ? AND vendor_id IS NULL",
    )
    .bind(vendor_id.to_string())
    .bind(mention_id.to_string())
    .execute(executor)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::Conflict(format!(
            "Mention {} is already matched or no longer exists",
            mention_id
        )));
    }

    Ok(())
}

/// Insert a mention (used by survey ingestion and tests)
pub async fn insert_mention(
    pool: &SqlitePool,
    preview_session_id: Uuid,
    vendor_name: &str,
    category: &str,
) -> Result<PendingVendorMention> {
    let id = uuid_utils::generate();

    sqlx::query(
        "INSERT INTO survey_pending_ratings (id, session_id, vendor_name, category) VALUES (?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(preview_session_id.to_string())
    .bind(vendor_name)
    .bind(category)
    .execute(pool)
    .await?;

    Ok(PendingVendorMention {
        id,
        vendor_name: vendor_name.to_string(),
        category: category.to_string(),
        session_id: preview_session_id,
        vendor_id: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{preview_sessions, vendors};
    use clist_common::db::{init_database, NewVendor};

    #[tokio::test]
    async fn test_second_match_of_same_mention_conflicts() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("clist.db")).await.unwrap();
        let preview = Uuid::new_v4();
        preview_sessions::insert_preview_session(&pool, preview, "Boca Bridges")
            .await
            .unwrap();
        let mention = insert_mention(&pool, preview, "Acme Pools", "Pool Service")
            .await
            .unwrap();
        let vendor = vendors::insert_vendor(
            &pool,
            &NewVendor {
                name: "Acme Pools".to_string(),
                category: "Pool Service".to_string(),
                community: "Boca Bridges".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        set_vendor_id(&pool, mention.id, vendor.id).await.unwrap();
        let second = set_vendor_id(&pool, mention.id, vendor.id).await;

        assert!(matches!(second, Err(Error::Conflict(_))));
        assert!(list_unmatched(&pool, preview).await.unwrap().is_empty());
        assert_eq!(
            get_mention(&pool, mention.id).await.unwrap().unwrap().vendor_id,
            Some(vendor.id)
        );
    }

    #[tokio::test]
    async fn test_get_mentions_keeps_requested_order_and_drops_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("clist.db")).await.unwrap();
        let preview = Uuid::new_v4();
        let first = insert_mention(&pool, preview, "First", "Plumbing").await.unwrap();
        let second = insert_mention(&pool, preview, "Second", "Plumbing").await.unwrap();

        let fetched = get_mentions(&pool, &[second.id, Uuid::new_v4(), first.id])
            .await
            .unwrap();

        assert_eq!(fetched, vec![second, first]);
    }
}
