//! Run configuration stored as JSON

use crate::error::{Error, Result};
use crate::header::{
    HeaderKeywordSet, HeaderLocator, DEFAULT_HEADER_KEYWORDS, DEFAULT_MAX_SCAN_COLUMNS,
    DEFAULT_MAX_SCAN_ROWS,
};
use crate::history::DEFAULT_MAX_HISTORY;
use crate::loader::TabularFileLoader;
use crate::reconciler::{
    KeyReconciler, ReconcileOptions, DEFAULT_IMPORTED_KEY_ALIAS, DEFAULT_REFERENCE_KEY_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Query selecting the live, non-deleted check workflow records
pub const DEFAULT_REFERENCE_QUERY: &str = "SELECT a.* \
FROM CHECK_WORKFLOW a \
WHERE 1 = 1 \
AND a.DELETE_IND = 'N' \
AND a.RECORD_TYPE_RF = 'MCHK'";

/// Columns shown when a result is displayed
pub const DEFAULT_DISPLAY_COLUMNS: [&str; 6] = [
    "RECORD_TYPE_RF",
    "CARRIER_CD",
    "CARRIER_NM",
    "CHECK_NUM",
    "CHECK_AMT",
    "ProcessDate",
];

/// Everything a reconciliation run needs besides the input file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    /// Keywords that must all appear in one cell of the header row
    pub header_keywords: Vec<String>,
    /// Rows inspected when looking for the header
    pub max_scan_rows: usize,
    /// Columns inspected per row when looking for the header
    pub max_scan_columns: usize,
    /// Check-number column of the reference records
    pub reference_key_column: String,
    /// Name the imported check-number column is matched against and renamed to
    pub imported_key_alias: String,
    /// Query producing the reference records
    pub reference_query: String,
    /// Connection identifier handed to the query executor
    pub connection: String,
    /// Allow blank or all-zero keys to match each other
    pub match_empty_keys: bool,
    /// Columns kept when a result is displayed
    pub display_columns: Vec<String>,
    /// Recently used files list
    pub history_file: PathBuf,
    /// Maximum number of entries kept in the history file
    pub max_history: usize,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            header_keywords: DEFAULT_HEADER_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            max_scan_rows: DEFAULT_MAX_SCAN_ROWS,
            max_scan_columns: DEFAULT_MAX_SCAN_COLUMNS,
            reference_key_column: DEFAULT_REFERENCE_KEY_COLUMN.to_string(),
            imported_key_alias: DEFAULT_IMPORTED_KEY_ALIAS.to_string(),
            reference_query: DEFAULT_REFERENCE_QUERY.to_string(),
            connection: String::new(),
            match_empty_keys: false,
            display_columns: DEFAULT_DISPLAY_COLUMNS.iter().map(|s| s.to_string()).collect(),
            history_file: PathBuf::from("file_history.txt"),
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl ReconConfig {
    /// Load a config file from JSON; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the config to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values that would make every load or run fail
    pub fn validate(&self) -> Result<()> {
        if self.keyword_set().is_empty() {
            return Err(Error::Config(
                "header_keywords must contain at least one letter or digit".to_string(),
            ));
        }
        if self.max_scan_rows == 0 || self.max_scan_columns == 0 {
            return Err(Error::Config(
                "max_scan_rows and max_scan_columns must be positive".to_string(),
            ));
        }
        if self.reference_key_column.trim().is_empty() {
            return Err(Error::Config("reference_key_column is blank".to_string()));
        }
        if self.imported_key_alias.trim().is_empty() {
            return Err(Error::Config("imported_key_alias is blank".to_string()));
        }
        if self.reference_query.trim().is_empty() {
            return Err(Error::Config("reference_query is blank".to_string()));
        }
        Ok(())
    }

    pub fn keyword_set(&self) -> HeaderKeywordSet {
        HeaderKeywordSet::new(&self.header_keywords)
    }

    pub fn loader(&self) -> TabularFileLoader {
        TabularFileLoader::new(HeaderLocator::new(
            self.keyword_set(),
            self.max_scan_rows,
            self.max_scan_columns,
        ))
    }

    pub fn reconciler(&self) -> KeyReconciler {
        KeyReconciler::new(
            self.reference_key_column.clone(),
            self.imported_key_alias.clone(),
            ReconcileOptions {
                match_empty_keys: self.match_empty_keys,
            },
        )
    }
}
