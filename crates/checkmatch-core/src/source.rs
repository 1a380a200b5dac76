//! Reference record sources

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use tracing::{debug, info};

/// Runs a read-only query and returns its result set as a table
pub trait QueryExecutor {
    fn execute(&self, query: &str, connection: &str) -> Result<Table>;
}

impl<F> QueryExecutor for F
where
    F: Fn(&str, &str) -> Result<Table>,
{
    fn execute(&self, query: &str, connection: &str) -> Result<Table> {
        self(query, connection)
    }
}

/// Executes queries against a SQLite database file.
///
/// The connection string is the database path (or a `file:` URI). A fresh
/// read-only connection is opened for every query and closed afterwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteExecutor;

impl QueryExecutor for SqliteExecutor {
    fn execute(&self, query: &str, connection: &str) -> Result<Table> {
        if connection.trim().is_empty() {
            return Err(Error::Query("no connection configured".to_string()));
        }

        debug!(connection, "opening reference database");
        let conn = Connection::open_with_flags(
            connection,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;

        let mut stmt = conn.prepare(query)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = names.len();

        let mut rows = Vec::new();
        let mut result = stmt.query([])?;
        while let Some(row) = result.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_from_sql(row.get_ref(i)?));
            }
            rows.push(cells);
        }

        let table = Table::from_parts(names, rows);
        if table.is_empty() {
            info!("No records found.");
        } else {
            info!(records = table.row_count(), "reference records found");
        }
        Ok(table)
    }
}

fn cell_from_sql(value: ValueRef<'_>) -> CellValue {
    match value {
        ValueRef::Null => CellValue::Empty,
        ValueRef::Integer(i) => CellValue::Integer(i),
        ValueRef::Real(f) => CellValue::Float(f),
        ValueRef::Text(bytes) => CellValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => CellValue::String(format!("<{} bytes>", bytes.len())),
    }
}
