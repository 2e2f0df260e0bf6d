//! Offline backup of the current wish list.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::WishRecord;

/// One exported record: id, name, wish and ISO timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEntry {
    pub id: String,
    pub name: String,
    pub wish: String,
    pub created_at: Option<String>,
}

impl From<&WishRecord> for ExportEntry {
    fn from(r: &WishRecord) -> Self {
        Self {
            id: r.id.to_string(),
            name: r.name.clone(),
            wish: r.wish.clone(),
            created_at: r
                .display_time()
                .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

pub fn entries(records: &[WishRecord]) -> Vec<ExportEntry> {
    records.iter().map(ExportEntry::from).collect()
}

/// Pretty-printed JSON array, same order as the snapshot (newest first).
pub fn to_json(records: &[WishRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&entries(records))?)
}

/// Download name, e.g. `wishwall_2026-10-16T20-15-03-120Z.json`.
pub fn filename(now: DateTime<Utc>) -> String {
    let stamp = now
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("wishwall_{stamp}.json")
}
