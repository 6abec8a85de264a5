// 🧮 Aggregation - Matched prices folded into per-student fees
// Totals keep first-appearance order; money is rounded half-up to cents

use crate::error::FeeError;
use crate::resolver::MatchResult;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label for the grand total row
pub const TOTAL_LABEL: &str = "总计";

// ============================================================================
// SUMMARY
// ============================================================================

/// Fee owed by one student, rounded to cents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentTotal {
    pub student_name: String,
    pub total_fee: Decimal,
}

/// Per-student totals in first-appearance order plus batch diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSummary {
    pub totals: Vec<StudentTotal>,

    /// Sum of the rounded per-student totals
    pub grand_total: Decimal,

    /// Any purchase in the batch matched below the confidence line
    pub ambiguous: bool,
}

impl FeeSummary {
    /// Display order: by student name
    pub fn sorted_by_name(&self) -> Vec<StudentTotal> {
        let mut totals = self.totals.clone();
        totals.sort_by(|a, b| a.student_name.cmp(&b.student_name));
        totals
    }

    pub fn total_for(&self, student_name: &str) -> Option<Decimal> {
        self.totals
            .iter()
            .find(|t| t.student_name == student_name)
            .map(|t| t.total_fee)
    }
}

// ============================================================================
// MONEY
// ============================================================================

/// Half-up to 2 fractional digits, always carrying 2 digits of scale
pub fn round_money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// `45` → `45.00`
pub fn format_money(amount: Decimal) -> String {
    round_money(amount).to_string()
}

// ============================================================================
// AGGREGATION
// ============================================================================

fn checked_sum(acc: Decimal, amount: Decimal, subject: &str) -> Result<Decimal, FeeError> {
    acc.checked_add(amount).ok_or_else(|| FeeError::AmountOverflow {
        subject: subject.to_string(),
    })
}

/// Sum matched prices per student. Rounding happens once per student total,
/// never per purchase.
pub fn aggregate(matches: &[MatchResult], ambiguous: bool) -> Result<FeeSummary, FeeError> {
    let mut order: Vec<(String, Decimal)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for m in matches {
        let Some(price) = m.price else { continue };

        let name = &m.purchase.student_name;
        match positions.get(name) {
            Some(&i) => order[i].1 = checked_sum(order[i].1, price, name)?,
            None => {
                positions.insert(name.clone(), order.len());
                order.push((name.clone(), price));
            }
        }
    }

    let totals: Vec<StudentTotal> = order
        .into_iter()
        .map(|(student_name, sum)| StudentTotal {
            student_name,
            total_fee: round_money(sum),
        })
        .collect();

    let grand_total = totals
        .iter()
        .try_fold(Decimal::ZERO, |acc, t| checked_sum(acc, t.total_fee, TOTAL_LABEL))?;

    Ok(FeeSummary {
        totals,
        grand_total: round_money(grand_total),
        ambiguous,
    })
}
