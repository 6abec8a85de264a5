// 📋 Tabular Extractor - Typed records out of loosely formatted sheets
//
// Two phases per sheet:
//   1. locate the header row and map every required token to a column index
//   2. read rows through that mapping into BookEntry / StudentPurchase

use crate::error::{FeeError, SheetKind};
use crate::grid::{Cell, Grid};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info};

// ============================================================================
// HEADER TOKENS
// ============================================================================

pub const SERIAL_TOKEN: &str = "序号";
pub const TITLE_TOKEN: &str = "教材名称";
pub const PRICE_TOKEN: &str = "折扣价";
pub const NAME_TOKEN: &str = "姓名";
pub const CLASS_TOKEN: &str = "班级";

// ============================================================================
// RECORDS
// ============================================================================

/// One line of the bookseller's price list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookEntry {
    pub serial: u32,
    pub title: String,
    pub price: Decimal,
}

/// One line of the registrar's purchase log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentPurchase {
    pub student_name: String,
    pub class_name: String,
    pub book_title: String,
}

// ============================================================================
// COLUMN MAPS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookColumns {
    pub serial: usize,
    pub title: usize,
    pub price: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentColumns {
    pub name: usize,
    pub class: usize,
    pub title: usize,
}

/// First column whose header text contains `token`
fn find_column(header: &[Cell], token: &str, sheet: SheetKind) -> Result<usize, FeeError> {
    header
        .iter()
        .position(|cell| cell.to_string().contains(token))
        .ok_or_else(|| FeeError::MissingColumn {
            sheet,
            token: token.to_string(),
        })
}

impl BookColumns {
    pub fn resolve(header: &[Cell]) -> Result<Self, FeeError> {
        let sheet = SheetKind::Books;
        Ok(BookColumns {
            serial: find_column(header, SERIAL_TOKEN, sheet)?,
            title: find_column(header, TITLE_TOKEN, sheet)?,
            price: find_column(header, PRICE_TOKEN, sheet)?,
        })
    }
}

impl StudentColumns {
    pub fn resolve(header: &[Cell]) -> Result<Self, FeeError> {
        let sheet = SheetKind::Students;
        Ok(StudentColumns {
            name: find_column(header, NAME_TOKEN, sheet)?,
            class: find_column(header, CLASS_TOKEN, sheet)?,
            title: find_column(header, TITLE_TOKEN, sheet)?,
        })
    }
}

// ============================================================================
// BOOK LIST
// ============================================================================

/// Extract the price list block that belongs to `target_class`.
///
/// The block starts at the first row whose column 0 mentions the class, is
/// followed by a `序号` header row, and runs until the first blank serial.
pub fn extract_books(grid: &Grid, target_class: &str) -> Result<Vec<BookEntry>, FeeError> {
    let anchor = (0..grid.row_count())
        .find(|&row| grid.cell(row, 0).to_string().contains(target_class))
        .ok_or_else(|| FeeError::ClassNotFound {
            sheet: SheetKind::Books,
            class: target_class.to_string(),
        })?;

    let header_row = anchor + 1;
    if header_row >= grid.row_count() || grid.cell(header_row, 0).text() != SERIAL_TOKEN {
        return Err(FeeError::HeaderNotFound {
            sheet: SheetKind::Books,
            token: SERIAL_TOKEN.to_string(),
        });
    }

    let columns = BookColumns::resolve(grid.row(header_row))?;
    debug!(anchor, header_row, ?columns, "book list header resolved");

    let mut books = Vec::new();
    let mut expected: u32 = 1;

    for row in (header_row + 1)..grid.row_count() {
        let serial_cell = grid.cell(row, columns.serial);
        if serial_cell.is_blank() {
            break;
        }

        let serial = parse_serial(serial_cell).ok_or_else(|| FeeError::InvalidSerial {
            row: row + 1,
            value: serial_cell.text(),
        })?;
        if serial != i64::from(expected) {
            return Err(FeeError::NonContiguousSerial {
                expected,
                found: serial,
            });
        }

        let price_cell = grid.cell(row, columns.price);
        let price = parse_price(price_cell).ok_or_else(|| FeeError::InvalidPrice {
            row: row + 1,
            value: price_cell.text(),
        })?;

        books.push(BookEntry {
            serial: expected,
            title: grid.cell(row, columns.title).text(),
            price,
        });
        expected += 1;
    }

    if books.is_empty() {
        return Err(FeeError::NoValidData);
    }

    info!(class = target_class, count = books.len(), "extracted book list");
    Ok(books)
}

/// Integer serial from a number cell without fraction, or integer-looking text
fn parse_serial(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
        Cell::Text(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite() && n.fract() == 0.0)
                    .map(|n| n as i64)
            })
        }
        _ => None,
    }
}

/// Non-negative price; a blank cell is a free book
fn parse_price(cell: &Cell) -> Option<Decimal> {
    let price = match cell {
        _ if cell.is_blank() => return Some(Decimal::ZERO),
        // Shortest round-trip text keeps 19.995 as 19.995
        Cell::Number(n) if n.is_finite() => Decimal::from_str(&n.to_string()).ok()?,
        Cell::Text(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };

    if price.is_sign_negative() && !price.is_zero() {
        None
    } else {
        Some(price)
    }
}

// ============================================================================
// STUDENT LIST
// ============================================================================

/// Extract every purchase whose class cell contains `target_class`.
///
/// Rows with a blank name or title are dropped without error.
pub fn extract_purchases(grid: &Grid, target_class: &str) -> Result<Vec<StudentPurchase>, FeeError> {
    let header_row = (0..grid.row_count())
        .find(|&row| {
            grid.row(row)
                .iter()
                .any(|cell| cell.to_string().contains(NAME_TOKEN))
        })
        .ok_or_else(|| FeeError::HeaderNotFound {
            sheet: SheetKind::Students,
            token: NAME_TOKEN.to_string(),
        })?;

    let columns = StudentColumns::resolve(grid.row(header_row))?;
    debug!(header_row, ?columns, "student list header resolved");

    let mut purchases = Vec::new();
    let mut dropped = 0usize;

    for row in (header_row + 1)..grid.row_count() {
        let class_name = grid.cell(row, columns.class).text();
        if !class_name.contains(target_class) {
            continue;
        }

        let student_name = grid.cell(row, columns.name).text();
        let book_title = grid.cell(row, columns.title).text();
        if student_name.is_empty() || book_title.is_empty() {
            dropped += 1;
            continue;
        }

        purchases.push(StudentPurchase {
            student_name,
            class_name,
            book_title,
        });
    }

    if purchases.is_empty() {
        return Err(FeeError::ClassNotFound {
            sheet: SheetKind::Students,
            class: target_class.to_string(),
        });
    }

    info!(
        class = target_class,
        count = purchases.len(),
        dropped,
        "extracted student purchases"
    );
    Ok(purchases)
}

// ============================================================================
// TESTS
// ============================================================================
