//! Database models

use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use crate::uuid_utils::parse_column;
use crate::Result;

/// Canonical vendor record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub community: String,
    pub contact_info: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub google_place_id: Option<String>,
}

impl Vendor {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        Ok(Self {
            id: parse_column("id", &id)?,
            name: row.try_get("name")?,
            category: row.try_get("category")?,
            community: row.try_get("community")?,
            contact_info: row.try_get("contact_info")?,
            website: row.try_get("website")?,
            description: row.try_get("description")?,
            google_place_id: row.try_get("google_place_id")?,
        })
    }
}

/// Text form used for case-insensitive vendor comparisons
///
/// Trims and lowercases with full Unicode case mapping ("CAFÉ" → "café").
pub fn fold_text(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Fields for a vendor insert; the id is assigned by the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVendor {
    pub name: String,
    pub category: String,
    pub community: String,
    pub contact_info: Option<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub google_place_id: Option<String>,
}

impl NewVendor {
    /// Clone of `vendor` scoped to `community`
    pub fn copy_of(vendor: &Vendor, community: &str) -> Self {
        Self {
            name: vendor.name.clone(),
            category: vendor.category.clone(),
            community: community.to_string(),
            contact_info: vendor.contact_info.clone(),
            website: vendor.website.clone(),
            description: vendor.description.clone(),
            google_place_id: vendor.google_place_id.clone(),
        }
    }
}

/// Free-text vendor mention from a survey, awaiting a canonical vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingVendorMention {
    pub id: Uuid,
    pub vendor_name: String,
    pub category: String,
    pub session_id: Uuid,
    pub vendor_id: Option<Uuid>,
}

impl PendingVendorMention {
    pub fn from_row(row: &SqliteRow) -> Result<Self> {
        let id: String = row.try_get("id")?;
        let session_id: String = row.try_get("session_id")?;
        let vendor_id: Option<String> = row.try_get("vendor_id")?;
        Ok(Self {
            id: parse_column("id", &id)?,
            vendor_name: row.try_get("vendor_name")?,
            category: row.try_get("category")?,
            session_id: parse_column("session_id", &session_id)?,
            vendor_id: vendor_id
                .as_deref()
                .map(|v| parse_column("vendor_id", v))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_text_handles_non_ascii() {
        assert_eq!(fold_text("  CAFÉ ÉLAN "), "café élan");
        assert_eq!(fold_text("Ölçer Straße"), "ölçer straße");
        assert_eq!(fold_text("Acme"), "acme");
    }

    #[test]
    fn test_copy_of_keeps_details_and_changes_community() {
        let vendor = Vendor {
            id: Uuid::new_v4(),
            name: "Blue Wave Pools".to_string(),
            category: "Pool Service".to_string(),
            community: "Boca Bridges".to_string(),
            contact_info: Some("561-555-0100".to_string()),
            website: Some("https://bluewave.example".to_string()),
            description: Some("Weekly service".to_string()),
            google_place_id: Some("ChIJ123".to_string()),
        };

        let copy = NewVendor::copy_of(&vendor, "The Oaks");

        assert_eq!(copy.community, "The Oaks");
        assert_eq!(copy.name, vendor.name);
        assert_eq!(copy.category, vendor.category);
        assert_eq!(copy.contact_info, vendor.contact_info);
        assert_eq!(copy.website, vendor.website);
        assert_eq!(copy.description, vendor.description);
        assert_eq!(copy.google_place_id, vendor.google_place_id);
    }
}
