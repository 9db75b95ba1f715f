//! Canonical vendor queries

use clist_common::db::{fold_text, NewVendor, Vendor};
use clist_common::{uuid_utils, Result};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

const VENDOR_COLUMNS: &str =
    "id, name, category, community, contact_info, website, description, google_place_id";

/// Exact match: case-insensitive name equality within one category and community
///
/// Compares against `name_folded`, so surrounding whitespace and case are
/// ignored for every script, not just ASCII.
pub async fn find_exact_match(
    pool: &SqlitePool,
    name: &str,
    category: &str,
    community: &str,
) -> Result<Option<Vendor>> {
    let row = sqlx::query(&format!(
        r#"
        SELECT {VENDOR_COLUMNS}
        FROM vendors
        WHERE community = ?
          AND category = ?
          AND name_folded = ?
        ORDER BY created_at ASC
        LIMIT 1
        "#
    ))
    .bind(community)
    .bind(category)
    .bind(fold_text(name))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(Vendor::from_row).transpose()
}

/// Fuzzy search on name or contact info within a category, across all communities
///
/// A blank `term` returns an empty list without touching the database.
pub async fn search_vendors(
    pool: &SqlitePool,
    term: &str,
    category: &str,
    limit: i64,
) -> Result<Vec<Vendor>> {
    let term = term.trim();
    if term.is_empty() {
        return Ok(Vec::new());
    }

    let pattern = format!("%{}%", escape_like(&fold_text(term)));

    let rows = sqlx::query(&format!(
        r#"
        SELECT {VENDOR_COLUMNS}
        FROM vendors
        WHERE category = ?
          AND (name_folded LIKE ? ESCAPE '\' OR contact_folded LIKE ? ESCAPE '\')
        ORDER BY name ASC, community ASC
        LIMIT ?
        "#
    ))
    .bind(category)
    .bind(&pattern)
    .bind(&pattern)
    .bind(limit.max(1))
    .fetch_all(pool)
    .await?;

    rows.iter().map(Vendor::from_row).collect()
}

pub async fn get_vendor(pool: &SqlitePool, id: Uuid) -> Result<Option<Vendor>> {
    let row = sqlx::query(&format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = ?"))
        .bind(id.to_string())
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(Vendor::from_row).transpose()
}

/// Insert a vendor with a fresh id and return the stored row
pub async fn insert_vendor<'e, E>(executor: E, vendor: &NewVendor) -> Result<Vendor>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(&format!(
        r#"
        INSERT INTO vendors (
            id, name, category, community,
            contact_info, website, description, google_place_id,
            name_folded, contact_folded
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING {VENDOR_COLUMNS}
        "#
    ))
    .bind(uuid_utils::generate().to_string())
    .bind(&vendor.name)
    .bind(&vendor.category)
    .bind(&vendor.community)
    .bind(&vendor.contact_info)
    .bind(&vendor.website)
    .bind(&vendor.description)
    .bind(&vendor.google_place_id)
    .bind(fold_text(&vendor.name))
    .bind(vendor.contact_info.as_deref().map(fold_text))
    .fetch_one(executor)
    .await?;

    Vendor::from_row(&row)
}

/// Insert a copy of `vendor` scoped to `community`
///
/// Every descriptive field carries over; the copy gets a new id.
pub async fn copy_to_community<'e, E>(executor: E, vendor: &Vendor, community: &str) -> Result<Vendor>
where
    E: Executor<'e, Database = Sqlite>,
{
    insert_vendor(executor, &NewVendor::copy_of(vendor, community)).await
}

/// Escape LIKE wildcards so user input matches literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
