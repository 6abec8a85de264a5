// 💾 Export - Per-student totals to .txt / .csv / .xlsx
// Rows keep first-appearance order and end with a 总计 row

use crate::aggregate::{format_money, TOTAL_LABEL};
use crate::engine::FeeReport;
use anyhow::{Context, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::Workbook;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

pub const CLASS_HEADER: &str = "班级";
pub const NAME_HEADER: &str = "姓名";
pub const FEE_HEADER: &str = "购书费用";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Text,
    Csv,
    Xlsx,
}

impl ExportFormat {
    /// `.txt` and `.csv` by extension; anything else is a workbook
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("txt") => ExportFormat::Text,
            Some("csv") => ExportFormat::Csv,
            _ => ExportFormat::Xlsx,
        }
    }
}

pub fn export_totals(report: &FeeReport, path: &Path) -> Result<ExportFormat> {
    let format = ExportFormat::from_path(path);
    match format {
        ExportFormat::Text => export_text(report, path)?,
        ExportFormat::Csv => export_csv(report, path)?,
        ExportFormat::Xlsx => export_xlsx(report, path)?,
    }
    info!(path = %path.display(), ?format, "exported student fees");
    Ok(format)
}

pub fn render_text(report: &FeeReport) -> String {
    let mut out = format!("{CLASS_HEADER}: {}\n\n{NAME_HEADER}\t{FEE_HEADER}\n", report.class_name);
    for total in report.totals() {
        out.push_str(&format!("{}\t{}\n", total.student_name, format_money(total.total_fee)));
    }
    out.push_str(&format!("\n{TOTAL_LABEL}: ￥{}", format_money(report.grand_total())));
    out
}

fn export_text(report: &FeeReport, path: &Path) -> Result<()> {
    fs::write(path, render_text(report))
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Class name only on the first data row, like the workbook layout
fn table_rows(report: &FeeReport) -> Vec<[String; 3]> {
    let mut rows: Vec<[String; 3]> = report
        .totals()
        .iter()
        .enumerate()
        .map(|(i, t)| {
            [
                if i == 0 { report.class_name.clone() } else { String::new() },
                t.student_name.clone(),
                format_money(t.total_fee),
            ]
        })
        .collect();

    rows.push([
        if rows.is_empty() { report.class_name.clone() } else { String::new() },
        TOTAL_LABEL.to_string(),
        format_money(report.grand_total()),
    ]);
    rows
}

fn export_csv(report: &FeeReport, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record([CLASS_HEADER, NAME_HEADER, FEE_HEADER])?;
    for row in table_rows(report) {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Excel sheet names: at most 31 chars, none of []:*?/\
fn sheet_name(class_name: &str) -> String {
    format!("{class_name}_{FEE_HEADER}")
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(31)
        .collect()
}

fn export_xlsx(report: &FeeReport, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(&report.class_name))?;

    for (col, header) in [CLASS_HEADER, NAME_HEADER, FEE_HEADER].iter().enumerate() {
        worksheet.write_string(0, col as u16, *header)?;
    }

    let totals = report.totals();
    for (i, row) in table_rows(report).iter().enumerate() {
        let r = (i + 1) as u32;
        if !row[0].is_empty() {
            worksheet.write_string(r, 0, &row[0])?;
        }
        worksheet.write_string(r, 1, &row[1])?;

        let amount = totals
            .get(i)
            .map(|t| t.total_fee)
            .unwrap_or_else(|| report.grand_total());
        worksheet.write_number(r, 2, amount.to_f64().unwrap_or_default())?;
    }

    workbook
        .save(path)
        .with_context(|| format!("Failed to save workbook {}", path.display()))?;
    Ok(())
}
