//! Ledger of blobs that were uploaded but never referenced by an order.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::order_repo::format_timestamp;
use super::{Database, DatabaseError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrphanRow {
    pub blob_key: String,
    pub blob_url: String,
    pub reason: String,
    pub recorded_at: String,
}

impl OrphanRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            blob_key: row.get("blob_key")?,
            blob_url: row.get("blob_url")?,
            reason: row.get("reason")?,
            recorded_at: row.get("recorded_at")?,
        })
    }

    pub fn new(blob_key: &str, blob_url: &str, reason: &str, at: DateTime<Utc>) -> Self {
        Self {
            blob_key: blob_key.to_string(),
            blob_url: blob_url.to_string(),
            reason: reason.to_string(),
            recorded_at: format_timestamp(at),
        }
    }
}

/// Records an orphan. Recording the same key again refreshes its reason.
pub fn record(db: &Database, orphan: &OrphanRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO orphaned_blobs (blob_key, blob_url, reason, recorded_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(blob_key) DO UPDATE SET reason = excluded.reason,
                                                 recorded_at = excluded.recorded_at",
            params![
                orphan.blob_key,
                orphan.blob_url,
                orphan.reason,
                orphan.recorded_at
            ],
        )?;
        Ok(())
    })
}

/// All recorded orphans, oldest first.
pub fn list(db: &Database) -> Result<Vec<OrphanRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM orphaned_blobs ORDER BY recorded_at ASC")?;
        let rows = stmt
            .query_map([], OrphanRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

pub fn remove(db: &Database, blob_key: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute(
            "DELETE FROM orphaned_blobs WHERE blob_key = ?1",
            params![blob_key],
        )?;
        Ok(affected > 0)
    })
}
