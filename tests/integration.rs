use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_xlsxwriter::Workbook;
use textbook_fees::{
    calculate, calculate_with, export_totals, read_grid, render, AmbiguityPolicy, CalcOptions,
    Cell, ExportFormat, FeeError, FeeReport, MatchTier,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn fixture_report(class: &str, options: &CalcOptions) -> FeeReport {
    let books = read_grid(&fixtures_dir().join("books.csv")).unwrap();
    let students = read_grid(&fixtures_dir().join("students.csv")).unwrap();
    calculate_with(&books, &students, class, options).unwrap()
}

fn write_csv(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// -------------------------------------------------------------------------
// Full pipeline
// -------------------------------------------------------------------------

#[test]
fn fixture_class_totals() {
    let report = fixture_report("电气231", &CalcOptions::default());

    assert_eq!(report.books.len(), 4);
    // blank-name row dropped, other class skipped
    assert_eq!(report.purchases.len(), 5);

    let names: Vec<&str> = report.totals().iter().map(|t| t.student_name.as_str()).collect();
    assert_eq!(names, vec!["李四", "张三"]);

    assert_eq!(report.summary.total_for("李四"), Some(dec("58.60")));
    assert_eq!(report.summary.total_for("张三"), Some(dec("65.00")));
    assert_eq!(report.grand_total(), dec("123.60"));
    assert!(report.is_ambiguous());
}

#[test]
fn fixture_tiers_and_policy() {
    let report = fixture_report("电气231", &CalcOptions::default());
    let tiers: Vec<MatchTier> = report.matches.iter().map(|m| m.tier).collect();
    assert_eq!(
        tiers,
        vec![
            MatchTier::Raw,
            MatchTier::Tier1,
            MatchTier::Tier1,
            MatchTier::Raw,
            MatchTier::Raw,
        ]
    );

    let strict = fixture_report(
        "电气231",
        &CalcOptions::with_ambiguity(AmbiguityPolicy::Tier2Only),
    );
    assert!(!strict.is_ambiguous());
    assert!(strict.ambiguous_matches().is_empty());
    assert_eq!(report.ambiguous_matches().len(), 2);
    assert_eq!(strict.grand_total(), report.grand_total());
}

#[test]
fn second_section_is_isolated() {
    let report = fixture_report("电气232", &CalcOptions::default());

    assert_eq!(report.books.len(), 2);
    assert_eq!(report.summary.total_for("王五"), Some(dec("52.50")));
    assert_eq!(report.grand_total(), dec("52.50"));
    assert!(!report.is_ambiguous());
}

#[test]
fn unmatched_titles_are_reported_together() {
    let students = write_csv(
        "姓名,班级,教材名称\n\
         张三,电气231,高等数学(上)\n\
         李四,电气231,概率论\n\
         王五,电气231,复变函数\n",
    );
    let books = read_grid(&fixtures_dir().join("books.csv")).unwrap();
    let students = read_grid(students.path()).unwrap();

    let err = calculate(&books, &students, "电气231").unwrap_err();
    match &err {
        FeeError::UnmatchedPurchases(list) => assert_eq!(list.len(), 2),
        other => panic!("unexpected error: {other}"),
    }
    let text = err.to_string();
    assert!(text.contains("李四 - 概率论"));
    assert!(text.contains("王五 - 复变函数"));
}

#[test]
fn missing_class_in_book_list() {
    let books = read_grid(&fixtures_dir().join("books.csv")).unwrap();
    let students = read_grid(&fixtures_dir().join("students.csv")).unwrap();

    let err = calculate(&books, &students, "机械241").unwrap_err();
    assert!(matches!(err, FeeError::ClassNotFound { .. }));
}

#[test]
fn workbook_input_with_numeric_cells() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("售书单.xlsx");

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.write_string(0, 0, "电气231").unwrap();
    sheet.write_string(1, 0, "序号").unwrap();
    sheet.write_string(1, 1, "教材名称").unwrap();
    sheet.write_string(1, 2, "折扣价").unwrap();
    sheet.write_number(2, 0, 1.0).unwrap();
    sheet.write_string(2, 1, "高等数学(上)").unwrap();
    sheet.write_number(2, 2, 45.0).unwrap();
    sheet.write_number(3, 0, 2.0).unwrap();
    sheet.write_string(3, 1, "大学物理").unwrap();
    sheet.write_number(3, 2, 38.6).unwrap();
    workbook.save(&path).unwrap();

    let students = write_csv("姓名,班级,教材名称\n张三,电气231,高等数学（上）\n张三,电气231,大学物理\n");

    let books = read_grid(&path).unwrap();
    assert_eq!(books.cell(2, 0), &Cell::Number(1.0));

    let report = calculate(&books, &read_grid(students.path()).unwrap(), "电气231").unwrap();
    assert_eq!(report.books[1].price, dec("38.6"));
    assert_eq!(report.grand_total(), dec("83.60"));
}

#[test]
fn text_report_and_json() {
    let report = fixture_report("电气231", &CalcOptions::default());

    let text = render(&report);
    assert!(text.contains("张三: ￥65.00"));
    assert!(text.contains("总计: ￥123.60"));
    assert!(text.contains("  张三 - 线性代数第5版 (tier-1)"));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["class_name"], "电气231");
    assert_eq!(json["summary"]["ambiguous"], true);
    assert_eq!(json["summary"]["totals"].as_array().unwrap().len(), 2);
}

// -------------------------------------------------------------------------
// Export round trips
// -------------------------------------------------------------------------

fn export_to(dir: &Path, file: &str) -> (PathBuf, ExportFormat) {
    let report = fixture_report("电气231", &CalcOptions::default());
    let path = dir.join(file);
    let format = export_totals(&report, &path).unwrap();
    (path, format)
}

#[test]
fn export_text() {
    let dir = tempfile::tempdir().unwrap();
    let (path, format) = export_to(dir.path(), "fees.txt");

    assert_eq!(format, ExportFormat::Text);
    let text = std::fs::read_to_string(path).unwrap();
    assert_eq!(
        text,
        "班级: 电气231\n\n姓名\t购书费用\n李四\t58.60\n张三\t65.00\n\n总计: ￥123.60"
    );
}

#[test]
fn export_csv_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let (path, format) = export_to(dir.path(), "fees.csv");

    assert_eq!(format, ExportFormat::Csv);
    let grid = read_grid(&path).unwrap();
    assert_eq!(grid.row_count(), 4);
    assert_eq!(grid.cell(0, 2).to_string(), "购书费用");
    assert_eq!(grid.cell(1, 0).to_string(), "电气231");
    assert_eq!(grid.cell(2, 0), &Cell::Empty);
    assert_eq!(grid.cell(2, 2).to_string(), "65.00");
    assert_eq!(grid.cell(3, 1).to_string(), "总计");
    assert_eq!(grid.cell(3, 2).to_string(), "123.60");
}

#[test]
fn export_xlsx_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let (path, format) = export_to(dir.path(), "fees.xlsx");

    assert_eq!(format, ExportFormat::Xlsx);
    let grid = read_grid(&path).unwrap();
    assert_eq!(grid.cell(0, 0).to_string(), "班级");
    assert_eq!(grid.cell(1, 1).to_string(), "李四");
    assert_eq!(grid.cell(1, 2), &Cell::Number(58.6));
    assert_eq!(grid.cell(2, 1).to_string(), "张三");
    assert_eq!(grid.cell(2, 2), &Cell::Number(65.0));
    assert_eq!(grid.cell(3, 1).to_string(), "总计");
    assert_eq!(grid.cell(3, 2), &Cell::Number(123.6));
}
