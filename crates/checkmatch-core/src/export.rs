//! Writers for reconciliation results: CSV, XLSX and JSON

use crate::error::{Error, Result};
use crate::reconciler::ReconciliationResult;
use crate::table::{CellValue, Table};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Largest integer an Excel number cell holds exactly
const MAX_EXACT_EXCEL_INT: u64 = 1 << 53;

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
    Json,
}

impl ExportFormat {
    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Json => "json",
        }
    }

    /// Guess the format from a path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            "json" => Ok(ExportFormat::Json),
            other => Err(Error::Config(format!(
                "unknown export format '{}', expected csv, xlsx or json",
                other
            ))),
        }
    }
}

/// Export a result; an empty result is refused
pub fn export_result<P: AsRef<Path>>(
    result: &ReconciliationResult,
    path: P,
    format: ExportFormat,
) -> Result<usize> {
    let path = path.as_ref();
    if result.is_empty() {
        return Err(Error::Export {
            path: path.to_path_buf(),
            message: "there is no data to export".to_string(),
        });
    }
    export_table(result.table(), path, format)
}

/// Write `table` to `path`, returning the number of data rows written.
///
/// Duplicate column names get `.1`, `.2` suffixes so the header can be
/// read back unambiguously.
pub fn export_table<P: AsRef<Path>>(table: &Table, path: P, format: ExportFormat) -> Result<usize> {
    let path = path.as_ref();
    let table = table.with_unique_column_names();

    match format {
        ExportFormat::Csv => write_csv(&table, path)?,
        ExportFormat::Xlsx => write_xlsx(&table, path).map_err(|e| Error::Export {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?,
        ExportFormat::Json => write_json(&table, path)?,
    }

    info!(
        path = %path.display(),
        format = format.extension(),
        rows = table.row_count(),
        "exported"
    );
    Ok(table.row_count())
}

fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let csv_error = |e: csv::Error| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    writer.write_record(table.column_names()).map_err(csv_error)?;
    for row in &table.rows {
        writer
            .write_record(row.cells.iter().map(CellValue::to_string_value))
            .map_err(csv_error)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(table: &Table, path: &Path) -> std::result::Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    for (col, column) in table.columns.iter().enumerate() {
        sheet.write_string_with_format(0, excel_col(col)?, &column.name, &header_format)?;
    }

    for (r, row) in table.rows.iter().enumerate() {
        let excel_row = u32::try_from(r + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (c, cell) in row.cells.iter().enumerate() {
            let col = excel_col(c)?;
            match cell {
                CellValue::Empty => {}
                CellValue::Integer(i) if i.unsigned_abs() <= MAX_EXACT_EXCEL_INT => {
                    sheet.write_number(excel_row, col, *i as f64)?;
                }
                CellValue::Float(f) => {
                    sheet.write_number(excel_row, col, *f)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(excel_row, col, *b)?;
                }
                CellValue::DateTime(dt) => {
                    sheet.write_datetime_with_format(excel_row, col, dt, &date_format)?;
                }
                other => {
                    sheet.write_string(excel_row, col, other.to_string_value())?;
                }
            }
        }
    }

    sheet.autofit();
    workbook.save(path)?;
    Ok(())
}

fn excel_col(index: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn write_json(table: &Table, path: &Path) -> Result<()> {
    let records: Vec<Map<String, Value>> = table
        .rows
        .iter()
        .map(|row| {
            table
                .columns
                .iter()
                .zip(&row.cells)
                .map(|(column, cell)| (column.name.clone(), json_value(cell)))
                .collect()
        })
        .collect();

    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), &records)?;
    Ok(())
}

fn json_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Float(f) => Value::from(*f),
        CellValue::Bool(b) => Value::from(*b),
        CellValue::Empty => Value::Null,
        other => Value::from(other.to_string_value()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_parts(
            vec![
                "CHECK_NUM".to_string(),
                "AMOUNT".to_string(),
                "AMOUNT".to_string(),
            ],
            vec![vec![
                CellValue::String("0042".to_string()),
                CellValue::Float(10.5),
                CellValue::String("with,comma".to_string()),
            ]],
        )
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!("xlsx".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("pdf".parse::<ExportFormat>().is_err());
        assert_eq!(
            ExportFormat::from_path(Path::new("out.JSON")),
            Some(ExportFormat::Json)
        );
    }

    #[test]
    fn test_csv_export_dedups_and_quotes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let rows = export_table(&sample(), &path, ExportFormat::Csv).unwrap();
        assert_eq!(rows, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "CHECK_NUM,AMOUNT,AMOUNT.1\n0042,10.5,\"with,comma\"\n");
    }

    #[test]
    fn test_json_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        export_table(&sample(), &path, ExportFormat::Json).unwrap();

        let records: Vec<Map<String, Value>> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(records[0]["CHECK_NUM"], Value::from("0042"));
        assert_eq!(records[0]["AMOUNT"], Value::from(10.5));
    }

    #[test]
    fn test_xlsx_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        export_table(&sample(), &path, ExportFormat::Xlsx).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn test_empty_result_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let err = export_result(&ReconciliationResult::empty(), &path, ExportFormat::Csv)
            .unwrap_err();
        assert!(matches!(err, Error::Export { .. }));
        assert!(!path.exists());
    }
}
