//! Core table types shared by the loader, the reference source and the reconciler

use crate::normalize::column_key;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

/// Display format used when a date cell is stringified
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A table of named columns and equally-sized rows
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Table {
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
    /// File the table was loaded from, if any
    pub source_path: Option<PathBuf>,
}

impl Table {
    /// Build a table from column names and rows of cells.
    ///
    /// Rows shorter than the header are padded with empty cells, longer rows
    /// are truncated.
    pub fn from_parts(names: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = names.len();
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| Column::new(name, i))
            .collect();
        let rows = rows
            .into_iter()
            .map(|mut cells| {
                cells.resize(width, CellValue::Empty);
                Row::new(cells)
            })
            .collect();

        Self {
            columns,
            rows,
            source_path: None,
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find a column by exact name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Iterate over the values of one column
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &CellValue> + '_ {
        self.rows
            .iter()
            .map(move |r| r.get(index).unwrap_or(&CellValue::Empty))
    }

    /// Copy of this table whose duplicate column names carry `.1`, `.2` suffixes
    pub fn with_unique_column_names(&self) -> Table {
        let names = unique_column_names(self.columns.iter().map(|c| c.name.clone()));
        let mut table = self.clone();
        for (column, name) in table.columns.iter_mut().zip(names) {
            column.name = name;
        }
        table
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    /// True when every cell is empty
    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Bool(bool),
    /// Date and time value
    DateTime(NaiveDateTime),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a delimited-text field into a CellValue, detecting the type.
    ///
    /// Numbers written with leading zeros ("0099") stay strings: they are
    /// identifiers and their original text is what gets displayed.
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if has_leading_zero(trimmed) {
            return CellValue::String(trimmed.to_string());
        }

        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        // Too long for i64; a float would round the trailing digits away
        if is_integer_text(trimmed) {
            return CellValue::String(trimmed.to_string());
        }

        // Only plain decimals: "12E4" is an identifier, and Rust also
        // accepts words such as "inf" and "NaN"
        if is_decimal_text(trimmed) {
            if let Ok(f) = trimmed.parse::<f64>() {
                return CellValue::Float(f);
            }
        }

        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }

        CellValue::String(trimmed.to_string())
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            CellValue::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

fn is_integer_text(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

fn is_decimal_text(s: &str) -> bool {
    let digits = s.strip_prefix(|c: char| c == '-' || c == '+').unwrap_or(s);
    digits.bytes().filter(|&b| b == b'.').count() == 1
        && digits.bytes().any(|b| b.is_ascii_digit())
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

fn has_leading_zero(s: &str) -> bool {
    let digits = s.strip_prefix('-').unwrap_or(s);
    let mut chars = digits.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some('0'), Some(c)) if c.is_ascii_digit()
    )
}

/// Disambiguate duplicate names by appending `.1`, `.2`, ... to later copies
pub fn unique_column_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let names: Vec<String> = names.into_iter().collect();
    let mut taken: HashSet<String> = names.iter().cloned().collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(names.len());

    for name in names {
        if seen.insert(name.clone()) {
            result.push(name);
            continue;
        }

        let counter = counters.entry(name.clone()).or_insert(0);
        let renamed = loop {
            *counter += 1;
            let candidate = format!("{}.{}", name, counter);
            if !taken.contains(&candidate) {
                break candidate;
            }
        };
        taken.insert(renamed.clone());
        seen.insert(renamed.clone());
        result.push(renamed);
    }

    result
}

/// Lookup from a space-insensitive, case-insensitive column key to the
/// column's position, built once per table.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    by_key: HashMap<String, usize>,
}

impl ColumnIndex {
    /// Index every column of `table`; when two names share a key the later
    /// column wins.
    pub fn build(table: &Table) -> Self {
        let by_key = table
            .columns
            .iter()
            .map(|c| (column_key(&c.name), c.index))
            .collect();
        Self { by_key }
    }

    /// Position of the column whose key equals the key of `name`
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_key.get(&column_key(name)).copied()
    }
}
