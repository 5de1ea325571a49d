//! Order repository: CRUD and search for the `orders` table.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::record::{ArchiveRecord, OrderFilter, ValidatedRecord};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A raw order row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderRow {
    pub id: String,
    pub order_number: String,
    pub order_date: String,
    pub order_type: String,
    pub sub_type: Option<String>,
    pub employee_name: Option<String>,
    pub description: Option<String>,
    pub basis: Option<String>,
    pub pdf_url: String,
    pub created_at: String,
    pub updated_at: String,
}

impl OrderRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            order_number: row.get("order_number")?,
            order_date: row.get("order_date")?,
            order_type: row.get("type")?,
            sub_type: row.get("sub_type")?,
            employee_name: row.get("employee_name")?,
            description: row.get("description")?,
            basis: row.get("basis")?,
            pdf_url: row.get("pdf_url")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Builds a new row for a validated record whose blob lives at `pdf_url`.
    pub fn new(id: String, record: &ValidatedRecord, pdf_url: String, now: DateTime<Utc>) -> Self {
        let now = format_timestamp(now);
        Self {
            id,
            order_number: record.order_number.clone(),
            order_date: record.order_date.format(DATE_FORMAT).to_string(),
            order_type: record.order_type.label().to_string(),
            sub_type: record.sub_type.clone(),
            employee_name: record.employee_name.clone(),
            description: record.description.clone(),
            basis: record.basis.clone(),
            pdf_url,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    pub fn into_record(self) -> Result<ArchiveRecord, DatabaseError> {
        let order_date = NaiveDate::parse_from_str(&self.order_date, DATE_FORMAT).map_err(|_| {
            DatabaseError::CorruptValue {
                column: "order_date",
                value: self.order_date.clone(),
            }
        })?;
        Ok(ArchiveRecord {
            order_date,
            created_at: parse_timestamp("created_at", &self.created_at)?,
            updated_at: parse_timestamp("updated_at", &self.updated_at)?,
            id: self.id,
            order_number: self.order_number,
            order_type: self.order_type,
            sub_type: self.sub_type,
            employee_name: self.employee_name,
            description: self.description,
            basis: self.basis,
            pdf_url: self.pdf_url,
        })
    }
}

/// Fixed-width UTC timestamps so that text ordering equals time ordering.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &'static str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::CorruptValue {
            column,
            value: value.to_string(),
        })
}

/// Inserts a new order row.
pub fn insert(db: &Database, order: &OrderRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO orders (id, order_number, order_date, type, sub_type, employee_name,
             description, basis, pdf_url, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                order.id,
                order.order_number,
                order.order_date,
                order.order_type,
                order.sub_type,
                order.employee_name,
                order.description,
                order.basis,
                order.pdf_url,
                order.created_at,
                order.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites the metadata columns of an order. `pdf_url` and `created_at`
/// are never touched. Returns the updated row, or `None` when no order has
/// this id.
pub fn update_metadata(
    db: &Database,
    id: &str,
    record: &ValidatedRecord,
    now: DateTime<Utc>,
) -> Result<Option<OrderRow>, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE orders SET order_number=?2, order_date=?3, type=?4, sub_type=?5,
             employee_name=?6, description=?7, basis=?8, updated_at=?9
             WHERE id=?1",
            params![
                id,
                record.order_number,
                record.order_date.format(DATE_FORMAT).to_string(),
                record.order_type.label(),
                record.sub_type,
                record.employee_name,
                record.description,
                record.basis,
                format_timestamp(now),
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let row = conn.query_row(
            "SELECT * FROM orders WHERE id = ?1",
            params![id],
            OrderRow::from_row,
        )?;
        Ok(Some(row))
    })
}

/// Deletes an order. Returns `false` when no order has this id.
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM orders WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    })
}

/// Finds an order by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<OrderRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM orders WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], OrderRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists orders newest first, optionally narrowed by a search term.
///
/// The term matches case-insensitively as a substring of the order number,
/// type, employee name, description or basis. Ties on `created_at` fall back
/// to insertion order.
pub fn query(db: &Database, filter: &OrderFilter) -> Result<Vec<OrderRow>, DatabaseError> {
    db.with_conn(|conn| {
        let rows = match filter.term() {
            None => {
                let mut stmt =
                    conn.prepare("SELECT * FROM orders ORDER BY created_at DESC, rowid DESC")?;
                let rows = stmt
                    .query_map([], OrderRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            Some(term) => {
                // instr() instead of LIKE: the term is matched literally, so
                // '%' and '_' in order numbers need no escaping.
                let mut stmt = conn.prepare(
                    "SELECT * FROM orders
                     WHERE instr(casefold(order_number), ?1) > 0
                        OR instr(casefold(type), ?1) > 0
                        OR instr(casefold(employee_name), ?1) > 0
                        OR instr(casefold(description), ?1) > 0
                        OR instr(casefold(basis), ?1) > 0
                     ORDER BY created_at DESC, rowid DESC",
                )?;
                let rows = stmt
                    .query_map(params![term.to_lowercase()], OrderRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(rows)
    })
}

/// Counts all orders.
pub fn count(db: &Database) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM orders", [], |r| r.get(0))?;
        Ok(count)
    })
}
