// 🚨 Error Types - Why a calculation pass stopped
// Every variant is terminal to the pass; nothing is retried internally.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// SHEET KIND
// ============================================================================

/// Which input sheet an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SheetKind {
    /// Bookseller price list
    Books,
    /// Registrar purchase log
    Students,
}

impl SheetKind {
    pub fn name(&self) -> &str {
        match self {
            SheetKind::Books => "book list",
            SheetKind::Students => "student list",
        }
    }
}

impl fmt::Display for SheetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// UNMATCHED PURCHASE
// ============================================================================

/// A purchase no tier could price. Rendered as `name - title`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmatchedPurchase {
    pub student_name: String,
    pub book_title: String,
}

impl fmt::Display for UnmatchedPurchase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.student_name, self.book_title)
    }
}

// ============================================================================
// FEE ERROR
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum FeeError {
    #[error("target class is empty")]
    EmptyTargetClass,

    /// Class substring absent from the book anchor column, or no student row
    /// of that class survived extraction
    #[error("class '{class}' not found in {sheet}")]
    ClassNotFound { sheet: SheetKind, class: String },

    #[error("{sheet}: header '{token}' not found")]
    HeaderNotFound { sheet: SheetKind, token: String },

    #[error("{sheet}: missing required column '{token}'")]
    MissingColumn { sheet: SheetKind, token: String },

    #[error("book list row {row}: serial '{value}' is not an integer")]
    InvalidSerial { row: usize, value: String },

    #[error("book list row {row}: price '{value}' is not a non-negative number")]
    InvalidPrice { row: usize, value: String },

    #[error("serial numbers are not contiguous: expected {expected} but found {found}")]
    NonContiguousSerial { expected: u32, found: i64 },

    #[error("no valid data found in book list")]
    NoValidData,

    /// A running sum left the representable `Decimal` range
    #[error("fee total for {subject} is too large to represent")]
    AmountOverflow { subject: String },

    #[error("{}", format_unmatched(.0))]
    UnmatchedPurchases(Vec<UnmatchedPurchase>),
}

impl FeeError {
    /// True for the batched unmatched-purchase report, which lists every
    /// problem at once; false for malformed input.
    pub fn is_batch_diagnostic(&self) -> bool {
        matches!(self, FeeError::UnmatchedPurchases(_))
    }
}

fn format_unmatched(records: &[UnmatchedPurchase]) -> String {
    let mut msg = format!("could not match a price for {} purchase(s):", records.len());
    for record in records {
        msg.push_str("\n  ");
        msg.push_str(&record.to_string());
    }
    msg.push_str("\nmatch order: 1. raw title 2. without spaces/brackets 3. without bracketed text");
    msg
}
