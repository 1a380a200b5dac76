//! Header-row detection inside spreadsheets with unlabeled preamble rows

use crate::error::{Error, Result};
use crate::normalize::{normalize, normalize_str};
use crate::table::CellValue;
use tracing::debug;

/// Rows inspected when looking for the header
pub const DEFAULT_MAX_SCAN_ROWS: usize = 15;

/// Columns inspected per row (A through K)
pub const DEFAULT_MAX_SCAN_COLUMNS: usize = 11;

/// Keywords a single cell must all contain to mark the header row
pub const DEFAULT_HEADER_KEYWORDS: [&str; 3] = ["payment", "serial", "number"];

/// Normalized substrings that must all appear within one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderKeywordSet {
    keywords: Vec<String>,
}

impl HeaderKeywordSet {
    /// Build a set from raw keywords; each is normalized and blanks are dropped
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = normalize_str(keyword.as_ref());
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }
        Self {
            keywords: normalized,
        }
    }

    /// The normalized keywords in configured order
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// True when the already-normalized `cell` contains every keyword
    pub fn matches(&self, cell: &str) -> bool {
        self.keywords.iter().all(|k| cell.contains(k.as_str()))
    }
}

impl Default for HeaderKeywordSet {
    fn default() -> Self {
        Self::new(DEFAULT_HEADER_KEYWORDS)
    }
}

/// Finds the header row within a bounded scan window
#[derive(Debug, Clone)]
pub struct HeaderLocator {
    keywords: HeaderKeywordSet,
    max_scan_rows: usize,
    max_scan_columns: usize,
}

impl HeaderLocator {
    pub fn new(keywords: HeaderKeywordSet, max_scan_rows: usize, max_scan_columns: usize) -> Self {
        Self {
            keywords,
            max_scan_rows,
            max_scan_columns,
        }
    }

    pub fn keywords(&self) -> &HeaderKeywordSet {
        &self.keywords
    }

    pub fn max_scan_rows(&self) -> usize {
        self.max_scan_rows
    }

    pub fn max_scan_columns(&self) -> usize {
        self.max_scan_columns
    }

    /// Index of the first row, top to bottom, holding a cell that contains
    /// every keyword. Only the scan window is inspected, even when `rows`
    /// extends beyond it.
    pub fn locate(&self, rows: &[Vec<CellValue>]) -> Result<usize> {
        let window = &rows[..rows.len().min(self.max_scan_rows)];

        for (i, row) in window.iter().enumerate() {
            let hit = row
                .iter()
                .take(self.max_scan_columns)
                .map(normalize)
                .any(|cell| self.keywords.matches(&cell));

            if hit {
                debug!(row = i, "header row located");
                return Ok(i);
            }
        }

        Err(Error::HeaderNotFound {
            keywords: self.keywords.keywords().to_vec(),
            scanned_rows: window.len(),
        })
    }
}

impl Default for HeaderLocator {
    fn default() -> Self {
        Self::new(
            HeaderKeywordSet::default(),
            DEFAULT_MAX_SCAN_ROWS,
            DEFAULT_MAX_SCAN_COLUMNS,
        )
    }
}
