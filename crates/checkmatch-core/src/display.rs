//! Text rendering of tables for terminal output

use crate::reconciler::ReconciliationResult;
use crate::table::{unique_column_names, CellValue, Row, Table};
use tracing::warn;

/// Columns and rows shown in a file preview
pub const PREVIEW_LIMIT: usize = 10;

/// Cells longer than this are cut and suffixed with `...`
pub const PREVIEW_CELL_WIDTH: usize = 30;

/// First columns and rows of `table` with long cells truncated
pub fn preview(table: &Table) -> Table {
    let width = table.column_count().min(PREVIEW_LIMIT);
    let names = table.columns[..width].iter().map(|c| c.name.clone()).collect();
    let rows = table
        .rows
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|row| {
            row.cells[..width.min(row.cells.len())]
                .iter()
                .map(|cell| {
                    let text = cell.to_string_value();
                    if text.chars().count() > PREVIEW_CELL_WIDTH {
                        let cut: String = text.chars().take(PREVIEW_CELL_WIDTH).collect();
                        CellValue::String(format!("{}...", cut))
                    } else {
                        cell.clone()
                    }
                })
                .collect()
        })
        .collect();
    Table::from_parts(names, rows)
}

/// Restrict a result to `columns`, in that order.
///
/// Columns absent from the result are skipped with a warning; when a name
/// occurs twice in the result the first occurrence is shown.
pub fn project_display(result: &ReconciliationResult, columns: &[String]) -> Table {
    let table = result.table();
    let mut names = Vec::new();
    let mut positions = Vec::new();

    for name in columns {
        match table.find_column(name) {
            Some(column) => {
                names.push(column.name.clone());
                positions.push(column.index);
            }
            None => warn!(column = %name, "display column missing from result"),
        }
    }

    let rows = table
        .rows
        .iter()
        .map(|row| {
            positions
                .iter()
                .map(|&i| row.get(i).cloned().unwrap_or(CellValue::Empty))
                .collect()
        })
        .collect();
    Table::from_parts(unique_column_names(names), rows)
}

/// Render `table` as a bordered monospace grid
pub fn render_grid(table: &Table) -> String {
    let header: Vec<String> = table.columns.iter().map(|c| c.name.clone()).collect();
    let body: Vec<Vec<String>> = table.rows.iter().map(row_text).collect();

    let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let border = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    out.push_str(&format_line(&header, &widths));
    out.push_str(&border);
    out.push('\n');
    for row in &body {
        out.push_str(&format_line(row, &widths));
    }
    out.push_str(&border);
    out.push('\n');
    out
}

fn row_text(row: &Row) -> Vec<String> {
    row.cells.iter().map(|c| c.to_string_value()).collect()
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let pad = w - cell.chars().count();
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad + 1));
        line.push('|');
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::KeyReconciler;

    #[test]
    fn test_preview_limits_and_truncates() {
        let names: Vec<String> = (0..12).map(|i| format!("C{}", i)).collect();
        let long = "x".repeat(40);
        let rows: Vec<Vec<CellValue>> = (0..15)
            .map(|_| (0..12).map(|_| CellValue::String(long.clone())).collect())
            .collect();
        let table = Table::from_parts(names, rows);

        let preview = preview(&table);
        assert_eq!(preview.column_count(), 10);
        assert_eq!(preview.row_count(), 10);
        assert_eq!(
            preview.rows[0].cells[0].to_string_value(),
            format!("{}...", "x".repeat(30))
        );
    }

    #[test]
    fn test_project_display_skips_missing() {
        let reference = Table::from_parts(
            vec!["CHECK_NUM".to_string(), "CHECK_AMT".to_string(), "X".to_string()],
            vec![vec![
                CellValue::Integer(5),
                CellValue::Float(1.5),
                CellValue::Empty,
            ]],
        );
        let imported = Table::from_parts(
            vec!["PAYMENT/SERIALNUMBER".to_string()],
            vec![vec![CellValue::Integer(5)]],
        );
        let result = KeyReconciler::default()
            .reconcile(&reference, &imported)
            .unwrap();

        let shown = project_display(
            &result,
            &[
                "CHECK_AMT".to_string(),
                "CARRIER_NM".to_string(),
                "CHECK_NUM".to_string(),
            ],
        );
        assert_eq!(shown.column_names(), vec!["CHECK_AMT", "CHECK_NUM"]);
        assert_eq!(shown.rows[0].cells, vec![CellValue::Float(1.5), CellValue::Integer(5)]);
    }

    #[test]
    fn test_render_grid() {
        let table = Table::from_parts(
            vec!["A".to_string(), "Long".to_string()],
            vec![vec![CellValue::Integer(123), CellValue::Empty]],
        );
        let expected = "\
+-----+------+
| A   | Long |
+-----+------+
| 123 |      |
+-----+------+
";
        assert_eq!(render_grid(&table), expected);
    }
}
