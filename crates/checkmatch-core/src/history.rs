//! Recently used input files
//!
//! Stored as newline-delimited paths, most recent first.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Number of paths kept by default
pub const DEFAULT_MAX_HISTORY: usize = 10;

/// Most-recent-first list of file paths backed by a text file
#[derive(Debug, Clone)]
pub struct FileHistory {
    path: PathBuf,
    max_entries: usize,
    entries: Vec<String>,
}

impl FileHistory {
    /// Create an empty history that will be saved to `path`
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            entries: Vec::new(),
        }
    }

    /// Load history from a file, or create empty if not exists
    pub fn load(path: impl Into<PathBuf>, max_entries: usize) -> Result<Self> {
        let mut history = Self::new(path, max_entries);
        if !history.path.exists() {
            return Ok(history);
        }

        let content = fs::read_to_string(&history.path).map_err(|e| Error::FileRead {
            path: history.path.clone(),
            source: e,
        })?;
        history.entries = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        history.entries.truncate(max_entries);
        Ok(history)
    }

    /// Write the entries back, one per line
    pub fn save(&self) -> Result<()> {
        let mut content = String::new();
        for entry in &self.entries {
            content.push_str(entry);
            content.push('\n');
        }
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Move `file` to the front, dropping the oldest entry past the limit
    pub fn record(&mut self, file: &Path) {
        let entry = file.to_string_lossy().into_owned();
        self.entries.retain(|e| *e != entry);
        self.entries.insert(0, entry);
        self.entries.truncate(self.max_entries);
    }

    /// All entries, most recent first
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// The `n` most recent entries
    pub fn recent(&self, n: usize) -> &[String] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Strip surrounding whitespace and quotes from a user-entered path
pub fn clean_path_input(input: &str) -> PathBuf {
    PathBuf::from(input.trim().trim_matches('"').trim_matches('\''))
}
