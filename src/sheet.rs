//! Spreadsheet-style output. Ragged rows are padded here, never upstream.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use crate::error::ExtractError;
use crate::model::{ExtractedTable, MergedOutput};
use crate::table_parse::pad_rows;

/// Longest sheet name common spreadsheet formats accept.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

#[must_use]
pub fn sheet_name(page: u32, table_id: usize) -> String {
    format!("Page{page}_Table{table_id}")
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect()
}

fn generated_headers(width: usize) -> Vec<String> {
    (1..=width).map(|index| format!("col_{index}")).collect()
}

fn write_rows<W: Write>(
    writer: W,
    headers: &[String],
    rows: &[Vec<String>],
    delimiter: u8,
) -> Result<W, ExtractError> {
    let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|error| ExtractError::Io(error.into_error()))
}

fn table_headers(table: &ExtractedTable, width: usize) -> Vec<String> {
    match &table.header {
        Some(header) => {
            let mut header = header.clone();
            header.resize(width, String::new());
            header
        }
        None => generated_headers(width),
    }
}

/// Writes one CSV per table into `dir`, named after the table's sheet name.
pub fn write_per_table(
    dir: &Path,
    tables: &[ExtractedTable],
    delimiter: u8,
) -> Result<Vec<PathBuf>, ExtractError> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(tables.len());
    for table in tables {
        let width = table.width();
        let path = dir.join(format!("{}.csv", sheet_name(table.page, table.table_id)));
        let file = fs::File::create(&path)?;
        write_rows(
            file,
            &table_headers(table, width),
            &pad_rows(&table.rows, width),
            delimiter,
        )?;
        written.push(path);
    }

    info!(dir = %dir.display(), sheets = written.len(), "wrote per-table sheets");
    Ok(written)
}

fn table_rows(table: &ExtractedTable) -> impl Iterator<Item = &Vec<String>> {
    table.header.iter().chain(table.rows.iter())
}

/// Stacks every table under one `page,table_id,col_1..col_n` schema.
///
/// A table's header, when it has one, is emitted as that table's first row.
#[must_use]
pub fn merge_tables(tables: &[ExtractedTable]) -> MergedOutput {
    let width = tables
        .iter()
        .flat_map(|table| table_rows(table).map(Vec::len))
        .max()
        .unwrap_or(0);

    let mut headers = vec!["page".to_string(), "table_id".to_string()];
    headers.extend(generated_headers(width));

    let rows = tables
        .iter()
        .flat_map(|table| {
            table_rows(table).map(move |data_row| {
                let mut row = Vec::with_capacity(width + 2);
                row.push(table.page.to_string());
                row.push(table.table_id.to_string());
                row.extend(data_row.iter().cloned());
                row.resize(width + 2, String::new());
                row
            })
        })
        .collect::<Vec<_>>();

    MergedOutput {
        headers,
        row_count: rows.len(),
        table_count: tables.len(),
        rows,
    }
}

pub fn write_merged(path: &Path, merged: &MergedOutput, delimiter: u8) -> Result<(), ExtractError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    write_rows(fs::File::create(path)?, &merged.headers, &merged.rows, delimiter)?;
    Ok(())
}

pub fn merged_to_string(merged: &MergedOutput, delimiter: u8) -> Result<String, ExtractError> {
    let bytes = write_rows(Vec::new(), &merged.headers, &merged.rows, delimiter)?;
    Ok(String::from_utf8(bytes)?)
}

/// Renders bare rows as CSV with generated headers, padding short rows.
///
/// No rows render as an empty string, without a header line.
pub fn rows_to_string(rows: &[Vec<String>], delimiter: u8) -> Result<String, ExtractError> {
    if rows.is_empty() {
        return Ok(String::new());
    }
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let bytes = write_rows(
        Vec::new(),
        &generated_headers(width),
        &pad_rows(rows, width),
        delimiter,
    )?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::{merge_tables, merged_to_string, rows_to_string, sheet_name, write_per_table};
    use crate::error::ExtractError;
    use crate::model::ExtractedTable;

    fn owned(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
            .collect()
    }

    #[test]
    fn merges_and_pads_rows_to_global_schema() {
        let tables = vec![ExtractedTable {
            page: 1,
            table_id: 1,
            header: None,
            rows: owned(&[&["a", "b"], &["c"]]),
        }];

        let merged = merge_tables(&tables);
        assert_eq!(merged.headers, vec!["page", "table_id", "col_1", "col_2"]);
        assert_eq!(merged.rows[1], vec!["1", "1", "c", ""]);
        assert_eq!(
            merged_to_string(&merged, b';').expect("csv"),
            "page;table_id;col_1;col_2\n1;1;a;b\n1;1;c;\n"
        );
    }

    #[test]
    fn merged_output_keeps_each_table_header_as_leading_row() {
        let tables = vec![
            ExtractedTable {
                page: 1,
                table_id: 1,
                header: owned(&[&["Product", "Qty", "Price"]]).pop(),
                rows: owned(&[&["Pen", "3", "1.5"]]),
            },
            ExtractedTable {
                page: 2,
                table_id: 2,
                header: None,
                rows: owned(&[&["x", "y"]]),
            },
        ];

        let merged = merge_tables(&tables);
        assert_eq!(merged.row_count, 3);
        assert_eq!(
            merged_to_string(&merged, b',').expect("csv"),
            "page,table_id,col_1,col_2,col_3\n\
             1,1,Product,Qty,Price\n\
             1,1,Pen,3,1.5\n\
             2,2,x,y,\n"
        );
    }

    #[test]
    fn sheet_names_are_truncated() {
        assert_eq!(sheet_name(2, 3), "Page2_Table3");
        assert_eq!(sheet_name(4_000_000_000, 123_456_789_012).chars().count(), 31);
    }

    #[test]
    fn per_table_files_pad_short_rows_and_header() {
        let dir = tempdir().expect("tempdir should be created");
        let tables = vec![
            ExtractedTable {
                page: 1,
                table_id: 1,
                header: Some(vec!["Item".to_string()]),
                rows: owned(&[&["Pen", "3"], &["Ink"]]),
            },
            ExtractedTable {
                page: 2,
                table_id: 2,
                header: None,
                rows: owned(&[&["x"]]),
            },
        ];

        let paths = write_per_table(&dir.path().join("out"), &tables, b',').expect("write");
        assert_eq!(paths.len(), 2);
        let first = std::fs::read_to_string(&paths[0]).expect("readable");
        assert_eq!(first, "Item,\nPen,3\nInk,\n");
        let second = std::fs::read_to_string(&paths[1]).expect("readable");
        assert_eq!(second, "col_1\nx\n");
        assert!(paths[1].ends_with("Page2_Table2.csv"));
    }

    #[test]
    fn bare_rows_get_generated_headers() {
        let csv = rows_to_string(&owned(&[&["A", "B"], &["C"]]), b',').expect("csv");
        assert_eq!(csv, "col_1,col_2\nA,B\nC,\n");
    }

    #[test]
    fn no_rows_render_as_empty_output() {
        assert_eq!(rows_to_string(&[], b',').expect("csv"), "");
    }

    #[test]
    fn non_ascii_delimiter_bytes_are_an_encoding_error() {
        let err = rows_to_string(&owned(&[&["A", "B"]]), 0xFF).expect_err("invalid utf-8");
        assert!(matches!(err, ExtractError::OutputEncoding(_)), "{err}");
    }
}
