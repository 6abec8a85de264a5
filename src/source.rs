// 📂 Grid Sources - Spreadsheet files in, untyped grids out
// One reader per file family, picked from the file extension

use crate::grid::{Cell, Grid};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

// ============================================================================
// SOURCE FORMAT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    /// xlsx, xlsm, xls, xlsb, ods
    Spreadsheet,
    Csv,
    Tsv,
}

impl SourceFormat {
    pub fn name(&self) -> &str {
        match self {
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Csv => "CSV",
            SourceFormat::Tsv => "TSV",
        }
    }
}

/// Detect the source format from the file extension
pub fn detect_format(path: &Path) -> Result<SourceFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Spreadsheet),
        "csv" => Ok(SourceFormat::Csv),
        "tsv" => Ok(SourceFormat::Tsv),
        _ => Err(anyhow!(
            "Unsupported file type '{}': expected .xlsx, .xls, .ods, .csv or .tsv",
            path.display()
        )),
    }
}

// ============================================================================
// READERS
// ============================================================================

pub trait GridReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<Grid>;

    fn format(&self) -> SourceFormat;
}

/// Factory: a boxed reader for the given format
pub fn get_reader(format: SourceFormat) -> Box<dyn GridReader> {
    match format {
        SourceFormat::Spreadsheet => Box::new(SpreadsheetGridReader),
        SourceFormat::Csv => Box::new(CsvGridReader::new(b',')),
        SourceFormat::Tsv => Box::new(CsvGridReader::new(b'\t')),
    }
}

/// Read any supported file into a grid
pub fn read_grid(path: &Path) -> Result<Grid> {
    let format = detect_format(path)?;
    let grid = get_reader(format).read(path)?;
    debug!(
        path = %path.display(),
        format = format.name(),
        rows = grid.row_count(),
        "read grid"
    );
    Ok(grid)
}

/// Delimited text. No header handling: every line is a grid row.
pub struct CsvGridReader {
    delimiter: u8,
}

impl CsvGridReader {
    pub fn new(delimiter: u8) -> Self {
        CsvGridReader { delimiter }
    }
}

impl GridReader for CsvGridReader {
    fn read(&self, path: &Path) -> Result<Grid> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_path(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let mut rows = Vec::new();
        for (line_num, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse line {} in {}", line_num + 1, path.display())
            })?;

            let row: Vec<Cell> = record
                .iter()
                .enumerate()
                .map(|(col, field)| {
                    if line_num == 0 && col == 0 {
                        Cell::from(field.trim_start_matches('\u{feff}'))
                    } else {
                        Cell::from(field)
                    }
                })
                .collect();
            rows.push(row);
        }

        Ok(Grid::new(rows))
    }

    fn format(&self) -> SourceFormat {
        if self.delimiter == b'\t' {
            SourceFormat::Tsv
        } else {
            SourceFormat::Csv
        }
    }
}

/// First worksheet of an Excel/ODS workbook
pub struct SpreadsheetGridReader;

impl GridReader for SpreadsheetGridReader {
    fn read(&self, path: &Path) -> Result<Grid> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?
            .with_context(|| format!("Failed to read first sheet of {}", path.display()))?;

        // Data may not begin at A1; pad so column 0 stays column A
        let (start_row, start_col) = range.start().unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];

        for data_row in range.rows() {
            let mut row = vec![Cell::Empty; start_col as usize];
            row.extend(data_row.iter().map(data_to_cell));
            rows.push(row);
        }

        Ok(Grid::new(rows))
    }

    fn format(&self) -> SourceFormat {
        SourceFormat::Spreadsheet
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        other => Cell::Text(other.to_string()),
    }
}
