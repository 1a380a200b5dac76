//! Key normalization and inner join between reference records and an
//! imported table

use crate::error::{Error, Result};
use crate::normalize::join_key;
use crate::table::{CellValue, Column, ColumnIndex, Row, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Reference column holding the check number
pub const DEFAULT_REFERENCE_KEY_COLUMN: &str = "CHECK_NUM";

/// Canonical name of the imported check-number column
pub const DEFAULT_IMPORTED_KEY_ALIAS: &str = "PAYMENT/SERIALNUMBER";

/// Rows of the inner join, created fresh for every run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationResult {
    table: Table,
    created_at: DateTime<Utc>,
}

impl ReconciliationResult {
    fn new(table: Table) -> Self {
        Self {
            table,
            created_at: Utc::now(),
        }
    }

    /// A result with no columns and no rows
    pub fn empty() -> Self {
        Self::new(Table::default())
    }

    /// True when the join produced zero rows
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.table.row_count()
    }

    /// The joined rows: reference columns followed by imported columns
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// When the join ran
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Join behaviour that is not fixed by the column names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileOptions {
    /// Let keys that normalize to `""` (blank or all-zero) match each other
    pub match_empty_keys: bool,
}

/// Joins reference records to an imported table on the check number
#[derive(Debug, Clone)]
pub struct KeyReconciler {
    reference_key_column: String,
    imported_key_alias: String,
    options: ReconcileOptions,
}

impl KeyReconciler {
    pub fn new(
        reference_key_column: impl Into<String>,
        imported_key_alias: impl Into<String>,
        options: ReconcileOptions,
    ) -> Self {
        Self {
            reference_key_column: reference_key_column.into(),
            imported_key_alias: imported_key_alias.into(),
            options,
        }
    }

    /// Inner-join `reference` and `imported` on leading-zero-stripped keys.
    ///
    /// The imported key column is found by its space- and case-insensitive
    /// name and renamed to the alias in the output. Output rows follow
    /// reference row order, then imported row order. Column names are not
    /// deduplicated.
    pub fn reconcile(&self, reference: &Table, imported: &Table) -> Result<ReconciliationResult> {
        let imported_idx = ColumnIndex::build(imported)
            .lookup(&self.imported_key_alias)
            .ok_or_else(|| Error::MissingKeyColumn {
                expected: self.imported_key_alias.clone(),
            })?;
        debug!(
            column = %imported.columns[imported_idx].name,
            alias = %self.imported_key_alias,
            "imported key column detected"
        );

        let reference_idx = reference
            .find_column(&self.reference_key_column)
            .map(|c| c.index)
            .ok_or_else(|| {
                Error::ReconciliationFailure(format!(
                    "reference column '{}' not found",
                    self.reference_key_column
                ))
            })?;

        let columns = joined_columns(reference, imported, imported_idx, &self.imported_key_alias);

        // Imported key -> imported row positions, in row order
        let mut by_key: HashMap<String, Vec<usize>> = HashMap::new();
        for (pos, value) in imported.column_values(imported_idx).enumerate() {
            let key = join_key(value);
            if key.is_empty() && !self.options.match_empty_keys {
                continue;
            }
            by_key.entry(key).or_default().push(pos);
        }

        let mut rows = Vec::new();
        for (ref_row, value) in reference.rows.iter().zip(reference.column_values(reference_idx)) {
            let key = join_key(value);
            if key.is_empty() && !self.options.match_empty_keys {
                continue;
            }
            let Some(matches) = by_key.get(&key) else {
                continue;
            };

            for &pos in matches {
                let mut cells: Vec<CellValue> = padded(ref_row, reference.column_count());
                cells.extend(padded(&imported.rows[pos], imported.column_count()));
                rows.push(Row::new(cells));
            }
        }

        debug!(
            reference_rows = reference.row_count(),
            imported_rows = imported.row_count(),
            matched = rows.len(),
            "join complete"
        );

        Ok(ReconciliationResult::new(Table {
            columns,
            rows,
            source_path: None,
        }))
    }
}

impl Default for KeyReconciler {
    fn default() -> Self {
        Self::new(
            DEFAULT_REFERENCE_KEY_COLUMN,
            DEFAULT_IMPORTED_KEY_ALIAS,
            ReconcileOptions::default(),
        )
    }
}

fn joined_columns(
    reference: &Table,
    imported: &Table,
    imported_key_idx: usize,
    alias: &str,
) -> Vec<Column> {
    let names = reference.columns.iter().map(|c| c.name.clone()).chain(
        imported.columns.iter().map(|c| {
            if c.index == imported_key_idx {
                alias.to_string()
            } else {
                c.name.clone()
            }
        }),
    );
    names
        .enumerate()
        .map(|(i, name)| Column::new(name, i))
        .collect()
}

fn padded(row: &Row, width: usize) -> Vec<CellValue> {
    let mut cells = row.cells.clone();
    cells.resize(width, CellValue::Empty);
    cells
}
