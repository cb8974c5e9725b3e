//! CSV and Excel converter.
//!
//! Both formats load into a header plus rows of cell strings, rendered as a
//! fixed-width text table with a leading row-number column.

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;

use crate::domain::SheetKind;

#[derive(Debug, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn extract(bytes: &[u8], kind: SheetKind) -> Result<String, String> {
    let table = match kind {
        SheetKind::Csv => read_csv(bytes)?,
        SheetKind::Excel => read_excel(bytes)?,
    };
    Ok(render(&table))
}

/// First record is the header. A record wider than the header is an error;
/// shorter records are padded with empty cells.
pub fn read_csv(bytes: &[u8]) -> Result<Table, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| format!("invalid CSV header: {e}"))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| format!("invalid CSV record: {e}"))?;
        if record.len() > header.len() {
            return Err(format!(
                "CSV row {} has {} fields, expected {}",
                line + 1,
                record.len(),
                header.len()
            ));
        }
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table { header, rows })
}

/// Reads the first worksheet of an `.xlsx`/`.xls` workbook; its first row is the header.
pub fn read_excel(bytes: &[u8]) -> Result<Table, String> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| format!("invalid workbook: {e}"))?;

    let range = match workbook.worksheet_range_at(0) {
        Some(range) => range.map_err(|e| format!("unreadable worksheet: {e}"))?,
        None => return Ok(Table::default()),
    };

    let mut rows = range
        .rows()
        .map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let header = rows.next().unwrap_or_default();
    Ok(Table {
        header,
        rows: rows.collect(),
    })
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders the table with right-aligned columns separated by two spaces.
pub fn render(table: &Table) -> String {
    if table.header.is_empty() && table.rows.is_empty() {
        return String::new();
    }

    let columns = table
        .rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(table.header.len()))
        .max()
        .unwrap_or(0);

    let index_width = table.rows.len().saturating_sub(1).to_string().len();
    let mut widths = vec![0usize; columns];
    for row in std::iter::once(&table.header).chain(table.rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &" ".repeat(index_width), &table.header, &widths);
    for (i, row) in table.rows.iter().enumerate() {
        push_line(&mut out, &format!("{i:<index_width$}"), row, &widths);
    }
    out
}

fn push_line(out: &mut String, index: &str, cells: &[String], widths: &[usize]) {
    out.push_str(index);
    for (i, width) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        out.push_str("  ");
        out.push_str(&format!("{cell:>width$}"));
    }
    let trimmed = out.trim_end_matches(' ').len();
    out.truncate(trimmed);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_renders_table() {
        let csv = b"name,qty\nwidget,3\ngear,12\n";
        let text = extract(csv, SheetKind::Csv).unwrap();

        assert_eq!(text, "     name  qty\n0  widget    3\n1    gear   12\n");
    }

    #[test]
    fn test_csv_short_rows_are_padded() {
        let table = read_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.header, vec!["a", "b", "c"]);
        assert_eq!(table.rows, vec![vec!["1", "2"]]);

        let text = render(&table);
        assert!(text.lines().nth(1).unwrap().starts_with("0  1  2"));
    }

    #[test]
    fn test_csv_wide_row_is_error() {
        let err = read_csv(b"a,b\n1,2,3\n").unwrap_err();
        assert!(err.contains("expected 2"));
    }

    #[test]
    fn test_csv_empty_is_empty_text() {
        assert_eq!(extract(b"", SheetKind::Csv).unwrap(), "");
    }

    #[test]
    fn test_csv_header_only() {
        let text = extract(b"col_a,col_b\n", SheetKind::Csv).unwrap();
        assert_eq!(text, "   col_a  col_b\n");
    }

    #[test]
    fn test_index_column_widens_past_ten_rows() {
        let body: String = (0..12).map(|i| format!("{i}\n")).collect();
        let text = extract(format!("n\n{body}").as_bytes(), SheetKind::Csv).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "     n");
        assert_eq!(lines[1], "0    0");
        assert_eq!(lines[12], "11  11");
    }

    #[test]
    fn test_corrupt_workbook_is_error() {
        let err = extract(b"definitely not a workbook", SheetKind::Excel).unwrap_err();
        assert!(err.starts_with("invalid workbook"));
    }
}
