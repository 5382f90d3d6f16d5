//! End-to-end resolver tests over real files in a temp directory.

use std::io::Write;
use std::path::{Path, PathBuf};

use contactmerge::resolver::{resolve, DedupeError, DedupeOptions};
use contactmerge::sheet::{self, SheetError};
use tempfile::TempDir;

fn opts() -> DedupeOptions {
    DedupeOptions {
        column1: 0,
        column2: 1,
        column_name: "NomeEmpresa".to_string(),
        frequency_limit: 3,
        output_suffix: "_deduped".to_string(),
    }
}

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

fn output_column(path: &Path) -> Vec<String> {
    let table = sheet::load_table(path).unwrap();
    let header = table.headers[0].clone();
    table.named_column(&header).unwrap()
}

#[test]
fn resolve_writes_deduplicated_csv() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "in.csv", "A,B\nB,A\nA,C\n");
    let output = tmp.path().join("out.csv");

    let (written, stats) = resolve(&input, Some(&output), &opts()).unwrap();
    assert_eq!(written, output);

    // Combined column order: [B, A] then [A, C]
    assert_eq!(output_column(&output), vec!["B", "A", "C"]);
    assert_eq!(stats.input_rows, 2);
    assert_eq!(stats.output_rows, 3);
    assert!(!stats.columns_equal);
}

#[test]
fn resolve_writes_xlsx_readable_by_the_loader() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "in.csv", "A,B\nAcme,Acme\nGlobex,Hooli\n");
    let output = tmp.path().join("out.xlsx");

    resolve(&input, Some(&output), &opts()).unwrap();

    let table = sheet::load_table(&output).unwrap();
    assert_eq!(table.headers, vec!["NomeEmpresa"]);
    assert_eq!(
        table.named_column("NomeEmpresa").unwrap(),
        vec!["Acme", "Globex", "Hooli"]
    );
}

#[test]
fn resolve_is_idempotent_on_output_cardinality() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "in.csv", "A,B\nX,X\nX,Y\nY,Z\n");
    let first = tmp.path().join("first.csv");

    let (_, stats1) = resolve(&input, Some(&first), &opts()).unwrap();

    // Re-run over the deduplicated output, comparing the single column
    // against itself
    let mut second_opts = opts();
    second_opts.column1 = 0;
    second_opts.column2 = 0;
    let second = tmp.path().join("second.csv");
    let (_, stats2) = resolve(&first, Some(&second), &second_opts).unwrap();

    assert_eq!(stats1.output_rows, stats2.output_rows);
    assert!(stats2.columns_equal);
}

#[test]
fn resolve_reports_frequent_values() {
    let tmp = TempDir::new().unwrap();
    // Combined: X appears 4 times, Y once
    let input = write_file(&tmp, "in.csv", "A,B\nX,X\nX,Y\nX,\n");
    let output = tmp.path().join("out.csv");

    let (_, stats) = resolve(&input, Some(&output), &opts()).unwrap();
    assert_eq!(stats.values_over_limit, vec![("X".to_string(), 4)]);
}

#[test]
fn insufficient_columns_writes_no_output_file() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "in.csv", "OnlyColumn\nA\nB\n");
    let output = tmp.path().join("out.csv");

    let err = resolve(&input, Some(&output), &opts()).unwrap_err();
    assert!(matches!(
        err,
        DedupeError::InsufficientColumns {
            required: 2,
            found: 1
        }
    ));
    assert!(!output.exists(), "no partial output may be written on failure");
}

#[test]
fn unsupported_input_format_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "in.txt", "A,B\n1,2\n");

    let err = resolve(&input, None, &opts()).unwrap_err();
    assert!(matches!(
        err,
        DedupeError::Sheet(SheetError::UnsupportedFormat { .. })
    ));
}

#[test]
fn default_output_path_appends_suffix_before_extension() {
    let tmp = TempDir::new().unwrap();
    let input = write_file(&tmp, "contatos.csv", "A,B\nAcme,Acme\n");

    let (written, _) = resolve(&input, None, &opts()).unwrap();
    assert_eq!(written, tmp.path().join("contatos_deduped.xlsx"));
    assert!(written.exists());
}
