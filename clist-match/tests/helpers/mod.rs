//! Shared fixtures for clist-match integration tests
//!
//! Every test gets its own database file in a temp dir, so tests never share state.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use clist_common::db::{init_database, NewVendor, PendingVendorMention, Vendor};
use clist_common::events::EventBus;
use clist_match::db::{mentions, preview_sessions, vendors};
use clist_match::models::MatchSummary;
use clist_match::services::{MatchSettings, VendorMatcher};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

pub const COMMUNITY: &str = "Boca Bridges";
pub const OTHER_COMMUNITY: &str = "Valencia Bay";

/// Database handle; the temp dir lives as long as this does
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn setup_db() -> TestDb {
    let dir = TempDir::new().expect("Should create temp dir");
    let pool = init_database(&dir.path().join("clist.db"))
        .await
        .expect("Should initialize database");
    TestDb { pool, _dir: dir }
}

pub async fn seed_preview(pool: &SqlitePool, community: &str) -> Uuid {
    let id = Uuid::new_v4();
    preview_sessions::insert_preview_session(pool, id, community)
        .await
        .expect("Should insert preview session");
    id
}

pub async fn seed_mention(
    pool: &SqlitePool,
    preview_session_id: Uuid,
    vendor_name: &str,
    category: &str,
) -> PendingVendorMention {
    mentions::insert_mention(pool, preview_session_id, vendor_name, category)
        .await
        .expect("Should insert mention")
}

pub async fn seed_vendor(
    pool: &SqlitePool,
    name: &str,
    category: &str,
    community: &str,
    contact_info: Option<&str>,
) -> Vendor {
    let new_vendor = NewVendor {
        name: name.to_string(),
        category: category.to_string(),
        community: community.to_string(),
        contact_info: contact_info.map(str::to_string),
        ..Default::default()
    };
    vendors::insert_vendor(pool, &new_vendor)
        .await
        .expect("Should insert vendor")
}

pub fn matcher(pool: &SqlitePool, event_bus: &EventBus) -> VendorMatcher {
    VendorMatcher::new(pool.clone(), event_bus.clone(), MatchSettings::default())
}

/// Matcher whose completion hook records every summary it receives
pub fn matcher_with_recorder(
    pool: &SqlitePool,
    event_bus: &EventBus,
) -> (VendorMatcher, Arc<Mutex<Vec<MatchSummary>>>) {
    let completed = Arc::new(Mutex::new(Vec::new()));
    let sink = completed.clone();
    let matcher = matcher(pool, event_bus).with_completion_hook(Arc::new(move |summary: &MatchSummary| {
        sink.lock().unwrap().push(summary.clone());
    }));
    (matcher, completed)
}

pub async fn mention_vendor_id(pool: &SqlitePool, mention_id: Uuid) -> Option<Uuid> {
    mentions::get_mention(pool, mention_id)
        .await
        .expect("Should query mention")
        .expect("Mention should exist")
        .vendor_id
}

pub async fn vendor_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM vendors")
        .fetch_one(pool)
        .await
        .expect("Should count vendors")
}

/// Make every vendor insert fail
pub async fn fail_vendor_inserts(pool: &SqlitePool) {
    sqlx::query(
        r#"
        CREATE TRIGGER fail_vendor_insert BEFORE INSERT ON vendors
        BEGIN
            SELECT RAISE(ABORT, 'vendor insert rejected');
        END
        "#,
    )
    .execute(pool)
    .await
    .expect("Should create trigger");
}

/// Make every mention update fail
pub async fn fail_mention_updates(pool: &SqlitePool) {
    sqlx::query(
        r#"
        CREATE TRIGGER fail_mention_update BEFORE UPDATE ON survey_pending_ratings
        BEGIN
            SELECT RAISE(ABORT, 'mention update rejected');
        END
        "#,
    )
    .execute(pool)
    .await
    .expect("Should create trigger");
}

pub async fn drop_trigger(pool: &SqlitePool, name: &str) {
    sqlx::query(&format!("DROP TRIGGER IF EXISTS {}", name))
        .execute(pool)
        .await
        .expect("Should drop trigger");
}
