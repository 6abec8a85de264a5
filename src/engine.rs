// ⚖️ Calculation Engine - One pass from two grids to per-student fees
//
//   book grid    ──extract_books──────┐
//                                     ├─ resolve_all ─ aggregate ─ FeeReport
//   student grid ──extract_purchases──┘
//
// A pass either produces a complete report or fails; partial totals are
// never returned.

use crate::aggregate::{aggregate, format_money, FeeSummary, StudentTotal};
use crate::error::FeeError;
use crate::extract::{extract_books, extract_purchases, BookEntry, StudentPurchase};
use crate::grid::Grid;
use crate::resolver::{resolve_all, AmbiguityPolicy, MatchResult};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// OPTIONS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalcOptions {
    pub ambiguity: AmbiguityPolicy,
}

impl CalcOptions {
    pub fn with_ambiguity(ambiguity: AmbiguityPolicy) -> Self {
        CalcOptions { ambiguity }
    }
}

// ============================================================================
// FEE REPORT
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeReport {
    pub class_name: String,
    pub books: Vec<BookEntry>,
    pub purchases: Vec<StudentPurchase>,
    pub matches: Vec<MatchResult>,
    pub summary: FeeSummary,
    /// Policy that decided `summary.ambiguous`
    pub ambiguity: AmbiguityPolicy,
    pub calculated_at: DateTime<Utc>,
}

impl FeeReport {
    pub fn totals(&self) -> &[StudentTotal] {
        &self.summary.totals
    }

    pub fn grand_total(&self) -> Decimal {
        self.summary.grand_total
    }

    pub fn is_ambiguous(&self) -> bool {
        self.summary.ambiguous
    }

    /// Matches that raised the ambiguity flag, for manual audit
    pub fn ambiguous_matches(&self) -> Vec<&MatchResult> {
        self.matches
            .iter()
            .filter(|m| self.ambiguity.is_ambiguous(m.tier))
            .collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "Class {}: {} books, {} purchases, {} students, total ￥{}{}",
            self.class_name,
            self.books.len(),
            self.purchases.len(),
            self.summary.totals.len(),
            format_money(self.summary.grand_total),
            if self.summary.ambiguous {
                " (contains fuzzy matches)"
            } else {
                ""
            }
        )
    }
}

// ============================================================================
// ENTRY POINTS
// ============================================================================

/// Run one pass with the default options
pub fn calculate(
    book_grid: &Grid,
    student_grid: &Grid,
    target_class: &str,
) -> Result<FeeReport, FeeError> {
    calculate_with(book_grid, student_grid, target_class, &CalcOptions::default())
}

pub fn calculate_with(
    book_grid: &Grid,
    student_grid: &Grid,
    target_class: &str,
    options: &CalcOptions,
) -> Result<FeeReport, FeeError> {
    let class_name = target_class.trim();
    if class_name.is_empty() {
        return Err(FeeError::EmptyTargetClass);
    }

    let books = extract_books(book_grid, class_name)?;
    let purchases = extract_purchases(student_grid, class_name)?;
    let resolution = resolve_all(&books, &purchases, options.ambiguity)?;
    let summary = aggregate(&resolution.matches, resolution.ambiguous)?;

    let report = FeeReport {
        class_name: class_name.to_string(),
        books,
        purchases,
        matches: resolution.matches,
        summary,
        ambiguity: options.ambiguity,
        calculated_at: Utc::now(),
    };

    info!("{}", report.summary());
    Ok(report)
}

// ============================================================================
// TESTS
// ============================================================================
