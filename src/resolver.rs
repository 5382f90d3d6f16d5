//! Duplicate/frequency resolver.
//!
//! Single-shot batch transform: load a two-column table, compute
//! equality/frequency statistics, and write the distinct non-empty values
//! of both columns combined as a single-column spreadsheet. The output
//! workbook is built in memory and saved once, so a failure never leaves
//! a partial file behind.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::sheet::{self, SheetError, Table};

#[derive(Error, Debug)]
pub enum DedupeError {
    #[error(transparent)]
    Sheet(#[from] SheetError),

    #[error("Input must have at least {required} columns, found {found}")]
    InsufficientColumns { required: usize, found: usize },

    #[error("Failed to write output: {0}")]
    Write(String),
}

#[derive(Debug, Clone)]
pub struct DedupeOptions {
    /// Zero-based indices of the two columns to compare.
    pub column1: usize,
    pub column2: usize,
    /// Header of the single output column.
    pub column_name: String,
    /// Occurrence counts strictly above this limit are reported.
    pub frequency_limit: usize,
    /// Appended to the input stem when no output path is given.
    pub output_suffix: String,
}

/// Statistics reported alongside the output table.
#[derive(Debug, Clone, PartialEq)]
pub struct DedupeStats {
    /// Element-wise equality of the two columns (empty cells equal only
    /// to empty cells).
    pub columns_equal: bool,
    /// value → count for every value exceeding the frequency limit,
    /// sorted by descending count; ties keep first-seen order.
    pub values_over_limit: Vec<(String, usize)>,
    pub input_rows: usize,
    pub output_rows: usize,
}

/// Core transform over an already-loaded table. Returns the deduplicated
/// values (first-occurrence order over column1 then column2) and the stats.
pub fn analyze(table: &Table, opts: &DedupeOptions) -> Result<(Vec<String>, DedupeStats), DedupeError> {
    let required = opts.column1.max(opts.column2) + 1;
    let found = table.column_count();
    if found < required {
        return Err(DedupeError::InsufficientColumns { required, found });
    }

    let col1 = table.column(opts.column1);
    let col2 = table.column(opts.column2);
    let columns_equal = col1 == col2;

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut distinct: Vec<String> = Vec::new();

    for cell in col1.iter().chain(col2.iter()).flatten() {
        let count = counts.entry(cell.as_str()).or_insert(0);
        *count += 1;
        if *count == 1 {
            distinct.push(cell.clone());
        }
    }

    // Stable sort over first-seen order keeps ties deterministic
    let mut values_over_limit: Vec<(String, usize)> = distinct
        .iter()
        .filter_map(|value| {
            let count = counts[value.as_str()];
            (count > opts.frequency_limit).then(|| (value.clone(), count))
        })
        .collect();
    values_over_limit.sort_by(|a, b| b.1.cmp(&a.1));

    let stats = DedupeStats {
        columns_equal,
        values_over_limit,
        input_rows: table.rows.len(),
        output_rows: distinct.len(),
    };

    Ok((distinct, stats))
}

/// Load `input`, deduplicate, and write the result table.
///
/// When `output` is `None`, the path is derived from the input by appending
/// the configured suffix to the stem (always `.xlsx`). Returns the written
/// path and the statistics.
pub fn resolve(
    input: &Path,
    output: Option<&Path>,
    opts: &DedupeOptions,
) -> Result<(PathBuf, DedupeStats), DedupeError> {
    let table = sheet::load_table(input)?;
    let (values, stats) = analyze(&table, opts)?;

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => derive_output_path(input, &opts.output_suffix),
    };

    debug!(
        "writing {} deduplicated values to {}",
        values.len(),
        output_path.display()
    );
    write_output(&output_path, &opts.column_name, &values)?;

    info!(
        "dedupe complete: {} input rows -> {} distinct values",
        stats.input_rows, stats.output_rows
    );
    Ok((output_path, stats))
}

fn derive_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{}{}.xlsx", stem, suffix))
}

/// Write a single-column table, dispatching on the output extension.
fn write_output(path: &Path, column_name: &str, values: &[String]) -> Result<(), DedupeError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "xlsx" => write_xlsx(path, column_name, values),
        "csv" => write_csv(path, column_name, values),
        _ => Err(DedupeError::Sheet(SheetError::UnsupportedFormat {
            extension,
        })),
    }
}

fn write_xlsx(path: &Path, column_name: &str, values: &[String]) -> Result<(), DedupeError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet
        .write_string(0, 0, column_name)
        .map_err(|e| DedupeError::Write(e.to_string()))?;
    for (row, value) in values.iter().enumerate() {
        worksheet
            .write_string(row as u32 + 1, 0, value)
            .map_err(|e| DedupeError::Write(e.to_string()))?;
    }

    workbook
        .save(path)
        .map_err(|e| DedupeError::Write(e.to_string()))
}

fn write_csv(path: &Path, column_name: &str, values: &[String]) -> Result<(), DedupeError> {
    let mut writer =
        csv::Writer::from_path(path).map_err(|e| DedupeError::Write(e.to_string()))?;
    writer
        .write_record([column_name])
        .map_err(|e| DedupeError::Write(e.to_string()))?;
    for value in values {
        writer
            .write_record([value])
            .map_err(|e| DedupeError::Write(e.to_string()))?;
    }
    writer.flush().map_err(|e| DedupeError::Write(e.to_string()))
}

/// Print resolver results the way the run summary does.
pub fn print_stats(output_path: &Path, stats: &DedupeStats, frequency_limit: usize) {
    println!("\nOutput written to: {}", output_path.display());
    println!("Input rows: {}", stats.input_rows);
    println!("Distinct output rows: {}", stats.output_rows);

    if !stats.columns_equal {
        println!("⚠️  The two columns are not identical.");
    }

    if !stats.values_over_limit.is_empty() {
        println!(
            "⚠️  Values appearing more than {} times:",
            frequency_limit
        );
        for (value, count) in &stats.values_over_limit {
            println!("  - '{}': {} times", value, count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> DedupeOptions {
        DedupeOptions {
            column1: 0,
            column2: 1,
            column_name: "NomeEmpresa".to_string(),
            frequency_limit: 3,
            output_suffix: "_deduped".to_string(),
        }
    }

    fn table(col1: &[Option<&str>], col2: &[Option<&str>]) -> Table {
        assert_eq!(col1.len(), col2.len());
        Table {
            headers: vec!["A".to_string(), "B".to_string()],
            rows: col1
                .iter()
                .zip(col2.iter())
                .map(|(a, b)| {
                    vec![
                        a.map(|s| s.to_string()),
                        b.map(|s| s.to_string()),
                    ]
                })
                .collect(),
        }
    }

    #[test]
    fn test_columns_equal_identical() {
        let cells = [Some("A"), Some("B"), Some("A"), Some("C")];
        let t = table(&cells, &cells);
        let (_, stats) = analyze(&t, &opts()).unwrap();
        assert!(stats.columns_equal);
    }

    #[test]
    fn test_columns_not_equal() {
        let t = table(&[Some("A"), Some("B")], &[Some("A"), Some("C")]);
        let (_, stats) = analyze(&t, &opts()).unwrap();
        assert!(!stats.columns_equal);
    }

    #[test]
    fn test_columns_equal_treats_empty_as_equal() {
        let t = table(&[Some("A"), None], &[Some("A"), None]);
        let (_, stats) = analyze(&t, &opts()).unwrap();
        assert!(stats.columns_equal);

        let t = table(&[Some("A"), None], &[Some("A"), Some("B")]);
        let (_, stats) = analyze(&t, &opts()).unwrap();
        assert!(!stats.columns_equal);
    }

    #[test]
    fn test_frequency_detection() {
        // Combined values: X,X,X plus X,Y -> X:4 above limit 3, Y excluded
        let t = table(&[Some("X"), Some("X"), Some("X")], &[Some("X"), Some("Y"), None]);
        let (_, stats) = analyze(&t, &opts()).unwrap();
        assert_eq!(stats.values_over_limit, vec![("X".to_string(), 4)]);
    }

    #[test]
    fn test_dedup_preserves_first_occurrence_order() {
        // Combined as [B, A, A, C] -> [B, A, C]
        let t = table(&[Some("B"), Some("A")], &[Some("A"), Some("C")]);
        let (values, stats) = analyze(&t, &opts()).unwrap();
        assert_eq!(values, vec!["B", "A", "C"]);
        assert_eq!(stats.output_rows, 3);
    }

    #[test]
    fn test_empty_cells_excluded_from_output() {
        let t = table(&[Some("A"), None], &[None, Some("B")]);
        let (values, _) = analyze(&t, &opts()).unwrap();
        assert_eq!(values, vec!["A", "B"]);
    }

    #[test]
    fn test_insufficient_columns() {
        let t = Table {
            headers: vec!["only".to_string()],
            rows: vec![vec![Some("A".to_string())]],
        };
        let err = analyze(&t, &opts()).unwrap_err();
        assert!(matches!(
            err,
            DedupeError::InsufficientColumns {
                required: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn test_over_limit_sorted_descending() {
        let t = table(
            &[Some("A"), Some("A"), Some("B"), Some("B")],
            &[Some("A"), Some("B"), Some("B"), Some("C")],
        );
        let mut o = opts();
        o.frequency_limit = 2;
        let (_, stats) = analyze(&t, &o).unwrap();
        assert_eq!(
            stats.values_over_limit,
            vec![("B".to_string(), 4), ("A".to_string(), 3)]
        );
    }

    #[test]
    fn test_derived_output_path() {
        let derived = derive_output_path(Path::new("/data/contatos.xlsx"), "_deduped");
        assert_eq!(derived, PathBuf::from("/data/contatos_deduped.xlsx"));
    }
}
