//! Tabular input loading shared by the merge driver and the dedupe resolver.
//!
//! Supports `.xlsx`/`.xls` (via calamine) and `.csv`. Everything is read
//! into a small in-memory [`Table`]: a header row plus rows of optional
//! cells, where empty/blank cells become `None`.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Unsupported file format '{extension}' (expected xlsx, xls or csv)")]
    UnsupportedFormat { extension: String },

    #[error("Failed to read {1}: {0}")]
    Io(#[source] std::io::Error, String),

    #[error("Failed to open workbook: {0}")]
    Workbook(String),

    #[error("Workbook has no sheets")]
    EmptyWorkbook,

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Column '{name}' not found in input (headers: {headers})")]
    MissingColumn { name: String, headers: String },
}

/// An in-memory table: one header row and data rows of optional cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Extract a column by index; short rows are padded with `None`.
    pub fn column(&self, index: usize) -> Vec<Option<String>> {
        self.rows
            .iter()
            .map(|row| row.get(index).cloned().flatten())
            .collect()
    }

    /// Extract a column by header name, skipping empty cells.
    pub fn named_column(&self, name: &str) -> Result<Vec<String>, SheetError> {
        let index = self
            .headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| SheetError::MissingColumn {
                name: name.to_string(),
                headers: self.headers.join(", "),
            })?;
        Ok(self.column(index).into_iter().flatten().collect())
    }
}

/// Load a table from a spreadsheet or CSV file, dispatching on extension.
pub fn load_table(path: &Path) -> Result<Table, SheetError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    debug!("loading table from {} ({})", path.display(), extension);

    match extension.as_str() {
        "xlsx" | "xls" => load_workbook(path),
        "csv" => load_csv(path),
        _ => Err(SheetError::UnsupportedFormat { extension }),
    }
}

/// Ordered company names from the configured column; empty cells are skipped.
pub fn company_names(table: &Table, column: &str) -> Result<Vec<String>, SheetError> {
    table.named_column(column)
}

fn load_workbook(path: &Path) -> Result<Table, SheetError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| SheetError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SheetError::EmptyWorkbook)?
        .map_err(|e| SheetError::Workbook(e.to_string()))?;

    let mut rows = range.rows();
    let headers = match rows.next() {
        Some(header_row) => header_row
            .iter()
            .map(|cell| cell_to_string(cell).unwrap_or_default())
            .collect(),
        None => Vec::new(),
    };

    let data = rows
        .map(|row| row.iter().map(cell_to_string).collect())
        .collect();

    Ok(Table { headers, rows: data })
}

fn load_csv(path: &Path) -> Result<Table, SheetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| match e.kind() {
        csv::ErrorKind::Io(_) => {
            SheetError::Io(
                std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                path.display().to_string(),
            )
        }
        _ => SheetError::Csv(e),
    })?;

    let headers = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|cell| {
                    let trimmed = cell.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table { headers, rows })
}

fn cell_to_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Data::Float(f) => {
            // Whole numbers come back from Excel as floats; keep them readable
            if f.fract() == 0.0 {
                Some(format!("{}", *f as i64))
            } else {
                Some(f.to_string())
            }
        }
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("{:?}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_table(Path::new("input.pdf")).unwrap_err();
        assert!(matches!(err, SheetError::UnsupportedFormat { ref extension } if extension == "pdf"));
    }

    #[test]
    fn test_csv_roundtrip_with_empty_cells() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "in.csv", "NomeEmpresa,Outro\nAcme,1\n,2\nGlobex,\n");

        let table = load_table(&path).unwrap();
        assert_eq!(table.headers, vec!["NomeEmpresa", "Outro"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[1][0], None);
        assert_eq!(table.rows[2][1], None);
    }

    #[test]
    fn test_named_column_skips_empty_cells() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "in.csv", "NomeEmpresa\nAcme\n\nGlobex\n");

        let table = load_table(&path).unwrap();
        let companies = company_names(&table, "NomeEmpresa").unwrap();
        assert_eq!(companies, vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_missing_column_lists_headers() {
        let tmp = TempDir::new().unwrap();
        let path = write_csv(&tmp, "in.csv", "A,B\n1,2\n");

        let table = load_table(&path).unwrap();
        let err = company_names(&table, "NomeEmpresa").unwrap_err();
        let rendered = err.to_string();
        assert!(rendered.contains("NomeEmpresa"));
        assert!(rendered.contains("A, B"));
    }

    #[test]
    fn test_column_pads_short_rows() {
        let table = Table {
            headers: vec!["A".into(), "B".into()],
            rows: vec![
                vec![Some("x".into()), Some("y".into())],
                vec![Some("z".into())],
            ],
        };
        assert_eq!(table.column(1), vec![Some("y".to_string()), None]);
    }

    #[test]
    fn test_float_cells_render_as_integers() {
        assert_eq!(cell_to_string(&Data::Float(42.0)), Some("42".to_string()));
        assert_eq!(cell_to_string(&Data::Float(1.5)), Some("1.5".to_string()));
    }
}
