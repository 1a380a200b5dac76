//! Spreadsheet and delimited-text loader with header-row detection
//!
//! Loading is two passes over the file:
//! - a bounded scan (first rows, first columns, no header) fed to the
//!   [`HeaderLocator`]
//! - a full read of every row and column, using the located row as header

use crate::error::{Error, Result};
use crate::header::HeaderLocator;
use crate::normalize::strip_spaces;
use crate::table::{unique_column_names, CellValue, Table};
use calamine::{open_workbook_auto, Data, Reader};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// Parser family selected from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Excel workbook; the first worksheet is read
    Spreadsheet,
    /// Delimited text with the given separator byte
    Delimited(u8),
}

impl FileKind {
    /// Pick a parser for `path`, or fail with `UnsupportedFormat`
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xls" | "xlsx" | "xlsm" => Ok(FileKind::Spreadsheet),
            "csv" | "txt" => Ok(FileKind::Delimited(b',')),
            "tsv" => Ok(FileKind::Delimited(b'\t')),
            _ => Err(Error::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Portion of a file to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadWindow {
    /// Maximum number of rows, or all
    pub rows: Option<usize>,
    /// Maximum number of columns per row, or all
    pub columns: Option<usize>,
}

impl ReadWindow {
    /// Every row and column
    pub const FULL: ReadWindow = ReadWindow {
        rows: None,
        columns: None,
    };
}

/// Loads a file into a [`Table`], locating its header row first
#[derive(Debug, Clone, Default)]
pub struct TabularFileLoader {
    locator: HeaderLocator,
}

impl TabularFileLoader {
    pub fn new(locator: HeaderLocator) -> Self {
        Self { locator }
    }

    /// Load `path`, detecting the header row inside the scan window.
    ///
    /// Column names have embedded spaces removed.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<Table> {
        let path = path.as_ref();
        let kind = FileKind::from_path(path)?;

        let scan_window = ReadWindow {
            rows: Some(self.locator.max_scan_rows()),
            columns: Some(self.locator.max_scan_columns()),
        };
        let preview = read_rows(path, kind, scan_window)?;
        let header_row = self.locator.locate(&preview)?;
        debug!(path = %path.display(), header_row, "header row detected");

        self.load_with_header_row(path, header_row)
    }

    /// Load `path` using a known header row (0-based), skipping detection
    pub fn load_with_header_row<P: AsRef<Path>>(&self, path: P, header_row: usize) -> Result<Table> {
        let path = path.as_ref();
        let kind = FileKind::from_path(path)?;
        let grid = read_rows(path, kind, ReadWindow::FULL)?;

        let mut table = build_table(grid, header_row, path)?;
        table.source_path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            header_row,
            rows = table.row_count(),
            columns = table.column_count(),
            "file loaded"
        );
        Ok(table)
    }

    /// Load delimited text held in memory (useful for testing)
    pub fn load_str(&self, content: &str, delimiter: u8, source_name: &str) -> Result<Table> {
        let path = Path::new(source_name);
        let scan_window = ReadWindow {
            rows: Some(self.locator.max_scan_rows()),
            columns: Some(self.locator.max_scan_columns()),
        };
        let preview = read_delimited(content.as_bytes(), path, delimiter, scan_window)?;
        let header_row = self.locator.locate(&preview)?;

        let grid = read_delimited(content.as_bytes(), path, delimiter, ReadWindow::FULL)?;
        build_table(grid, header_row, path)
    }
}

/// Read raw rows from `path` with no header interpretation
pub fn read_rows(path: &Path, kind: FileKind, window: ReadWindow) -> Result<Vec<Vec<CellValue>>> {
    match kind {
        FileKind::Delimited(delimiter) => {
            let file = File::open(path).map_err(|e| Error::FileRead {
                path: path.to_path_buf(),
                source: e,
            })?;
            read_delimited(BufReader::new(file), path, delimiter, window)
        }
        FileKind::Spreadsheet => read_spreadsheet(path, window),
    }
}

fn read_delimited<R: Read>(
    reader: R,
    path: &Path,
    delimiter: u8,
    window: ReadWindow,
) -> Result<Vec<Vec<CellValue>>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true) // Preamble rows are usually narrower than the table
        .delimiter(delimiter)
        .from_reader(reader);

    let mut rows = Vec::new();
    for result in csv_reader.byte_records() {
        if window.rows.is_some_and(|max| rows.len() >= max) {
            break;
        }

        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        // Exports from accounting tools are not always UTF-8
        let mut cells: Vec<CellValue> = record
            .iter()
            .map(|field| CellValue::parse(&String::from_utf8_lossy(field)))
            .collect();
        if let Some(max) = window.columns {
            cells.truncate(max);
        }
        rows.push(cells);
    }

    Ok(rows)
}

fn read_spreadsheet(path: &Path, window: ReadWindow) -> Result<Vec<Vec<CellValue>>> {
    let mut workbook = open_workbook_auto(path).map_err(|e| match e {
        calamine::Error::Io(source) => Error::FileRead {
            path: path.to_path_buf(),
            source,
        },
        other => Error::Parse {
            path: path.to_path_buf(),
            message: other.to_string(),
        },
    })?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Parse {
            path: path.to_path_buf(),
            message: "workbook has no worksheets".to_string(),
        })?
        .map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    // Data may not begin at A1; keep sheet coordinates so row indices match
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Vec<Vec<CellValue>> = Vec::new();
    let leading = window.rows.map_or(start_row, |max| start_row.min(max));
    rows.resize(leading, Vec::new());

    for row in range.rows() {
        if window.rows.is_some_and(|max| rows.len() >= max) {
            break;
        }

        let mut cells = vec![CellValue::Empty; start_col];
        cells.extend(row.iter().map(cell_from_data));
        if let Some(max) = window.columns {
            cells.truncate(max);
        }
        rows.push(cells);
    }

    Ok(rows)
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::String(s.trim().to_string()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Float(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::String(s.clone()),
        Data::Error(e) => CellValue::String(e.to_string()),
    }
}

/// Turn raw rows into a table using `header_row` as the column names.
///
/// Blank header cells become `Unnamed:<index>`, duplicates get `.1`, `.2`
/// suffixes, and fully blank data rows are dropped.
fn build_table(grid: Vec<Vec<CellValue>>, header_row: usize, path: &Path) -> Result<Table> {
    let mut grid = grid.into_iter().skip(header_row);
    let header = grid.next().ok_or_else(|| Error::Parse {
        path: path.to_path_buf(),
        message: format!("header row {} is past the end of the file", header_row),
    })?;

    let names = header.iter().enumerate().map(|(i, cell)| {
        let name = strip_spaces(cell.to_string_value().trim());
        if name.is_empty() {
            format!("Unnamed:{}", i)
        } else {
            name
        }
    });
    let names = unique_column_names(names);
    let width = names.len();

    let mut rows = Vec::new();
    let mut truncated = 0usize;
    for cells in grid {
        if cells.iter().all(CellValue::is_empty) {
            continue;
        }
        if cells.len() > width && cells[width..].iter().any(|c| !c.is_empty()) {
            truncated += 1;
        }
        rows.push(cells);
    }

    if truncated > 0 {
        warn!(
            path = %path.display(),
            rows = truncated,
            "rows have more cells than header columns, truncating"
        );
    }

    Ok(Table::from_parts(names, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::join_key;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_file_kind_from_extension() {
        assert_eq!(
            FileKind::from_path(Path::new("a.XLSX")).unwrap(),
            FileKind::Spreadsheet
        );
        assert_eq!(
            FileKind::from_path(Path::new("a.csv")).unwrap(),
            FileKind::Delimited(b',')
        );
        assert_eq!(
            FileKind::from_path(Path::new("a.tsv")).unwrap(),
            FileKind::Delimited(b'\t')
        );
        assert!(matches!(
            FileKind::from_path(Path::new("a.pdf")),
            Err(Error::UnsupportedFormat { .. })
        ));
        assert!(matches!(
            FileKind::from_path(Path::new("noext")),
            Err(Error::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_load_str_skips_preamble() {
        let csv = "Bank Statement,,\nGenerated 2024-01-05,,\n\
                   Process Date,Payment / Serial Number,Amount\n\
                   2024-01-02,00123,10.5\n2024-01-03,456,20\n";
        let table = TabularFileLoader::default()
            .load_str(csv, b',', "test.csv")
            .unwrap();

        assert_eq!(
            table.column_names(),
            vec!["ProcessDate", "Payment/SerialNumber", "Amount"]
        );
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows[0].cells[1],
            CellValue::String("00123".to_string())
        );
        assert_eq!(table.rows[1].cells[2], CellValue::Integer(20));
    }

    #[test]
    fn test_load_keeps_columns_beyond_scan_window() {
        let mut header: Vec<String> = (0..14).map(|i| format!("Col {}", i)).collect();
        header[2] = "Payment Serial Number".to_string();
        let data: Vec<String> = (0..14).map(|i| i.to_string()).collect();
        let csv = format!("{}\n{}\n", header.join(","), data.join(","));

        let table = TabularFileLoader::default()
            .load_str(&csv, b',', "wide.csv")
            .unwrap();
        assert_eq!(table.column_count(), 14);
        assert_eq!(table.columns[13].name, "Col13");
        assert_eq!(table.rows[0].cells[13], CellValue::Integer(13));
    }

    #[test]
    fn test_load_blank_and_duplicate_headers() {
        let csv = "Payment Serial Number,,Amount,Amount\n1,x,2,3\n";
        let table = TabularFileLoader::default()
            .load_str(csv, b',', "dup.csv")
            .unwrap();
        assert_eq!(
            table.column_names(),
            vec!["PaymentSerialNumber", "Unnamed:1", "Amount", "Amount.1"]
        );
    }

    #[test]
    fn test_load_pads_short_rows_and_drops_blank_rows() {
        let csv = "Payment Serial Number,Amount\n1\n,\n2,5\n";
        let table = TabularFileLoader::default()
            .load_str(csv, b',', "short.csv")
            .unwrap();
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0].cells[1], CellValue::Empty);
    }

    #[test]
    fn test_load_missing_header() {
        let csv = "a,b\n1,2\n";
        assert!(matches!(
            TabularFileLoader::default().load_str(csv, b',', "bad.csv"),
            Err(Error::HeaderNotFound { .. })
        ));
    }

    #[test]
    fn test_load_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "checks.csv",
            "Report\nPayment/Serial Number,Payee\n0042,ACME\n",
        );

        let table = TabularFileLoader::default().load(&path).unwrap();
        assert_eq!(table.column_names(), vec!["Payment/SerialNumber", "Payee"]);
        assert_eq!(table.source_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_missing_file_is_file_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TabularFileLoader::default()
            .load(dir.path().join("missing.csv"))
            .unwrap_err();
        assert!(err.is_file_read());
    }

    #[test]
    fn test_load_xlsx_with_preamble() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checks.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Outstanding checks").unwrap();
        sheet.write_string(2, 0, "Payment/Serial Number").unwrap();
        sheet.write_string(2, 1, "Check Amount").unwrap();
        sheet.write_string(3, 0, "000987").unwrap();
        sheet.write_number(3, 1, 12.5).unwrap();
        sheet.write_number(4, 0, 654.0).unwrap();
        sheet.write_number(4, 1, 3.0).unwrap();
        workbook.save(&path).unwrap();

        let table = TabularFileLoader::default().load(&path).unwrap();
        assert_eq!(table.column_names(), vec!["Payment/SerialNumber", "CheckAmount"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(
            table.rows[0].cells[0],
            CellValue::String("000987".to_string())
        );
        assert_eq!(table.rows[1].cells[0].to_string_value(), "654");
    }

    #[test]
    fn test_xlsx_and_csv_keys_agree_on_padded_text() {
        let dir = tempfile::tempdir().unwrap();
        let xlsx = dir.path().join("padded.xlsx");

        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Payment/Serial Number").unwrap();
        sheet.write_string(1, 0, " 00123 ").unwrap();
        workbook.save(&xlsx).unwrap();
        let csv = write_file(&dir, "padded.csv", "Payment/Serial Number\n\" 00123 \"\n");

        let from_xlsx = TabularFileLoader::default().load(&xlsx).unwrap();
        let from_csv = TabularFileLoader::default().load(&csv).unwrap();
        assert_eq!(
            from_xlsx.rows[0].cells[0],
            CellValue::String("00123".to_string())
        );
        assert_eq!(from_xlsx.rows[0].cells[0], from_csv.rows[0].cells[0]);
        assert_eq!(join_key(&from_xlsx.rows[0].cells[0]), "123");
    }

    #[test]
    fn test_long_serials_load_as_text() {
        let csv = "Payment Serial Number,Ref\n123456789012345678901,12E4\n";
        let table = TabularFileLoader::default()
            .load_str(csv, b',', "long.csv")
            .unwrap();
        assert_eq!(table.rows[0].cells[0].to_string_value(), "123456789012345678901");
        assert_eq!(table.rows[0].cells[1].to_string_value(), "12E4");
    }

    #[test]
    fn test_corrupt_xlsx_is_file_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "broken.xlsx", "not a zip archive");
        let err = TabularFileLoader::default().load(&path).unwrap_err();
        assert!(err.is_file_read());
    }
}
