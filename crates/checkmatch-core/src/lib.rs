//! checkmatch-core: Core library for reconciling imported check lists
//! against reference records
//!
//! This library provides functionality to:
//! - Locate the header row of a spreadsheet or CSV that has preamble rows
//! - Load the file into a table with cleaned column names
//! - Normalize check numbers on both sides and inner-join them
//! - Run one reconciliation per call against a query-backed reference source
//! - Export results and remember recently used files

pub mod config;
pub mod display;
pub mod error;
pub mod export;
pub mod header;
pub mod history;
pub mod loader;
pub mod normalize;
pub mod reconciler;
pub mod session;
pub mod source;
pub mod table;

pub use config::ReconConfig;
pub use display::{preview, project_display, render_grid};
pub use error::{Error, Result};
pub use export::{export_result, export_table, ExportFormat};
pub use header::{HeaderKeywordSet, HeaderLocator};
pub use history::{clean_path_input, FileHistory};
pub use loader::{FileKind, TabularFileLoader};
pub use normalize::{normalize, strip_leading_zeros};
pub use reconciler::{KeyReconciler, ReconcileOptions, ReconciliationResult};
pub use session::{execute_run, ReconciliationSession, RunTicket};
pub use source::{QueryExecutor, SqliteExecutor};
pub use table::{CellValue, Column, ColumnIndex, Row, Table};
