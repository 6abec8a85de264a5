// 🔍 Price Resolver - Find a price for every purchase
// Three lookup tiers tried in order: Raw title, Tier 1 key, Tier 2 key

use crate::error::{FeeError, UnmatchedPurchase};
use crate::extract::{BookEntry, StudentPurchase};
use crate::normalize;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

// ============================================================================
// MATCH TIER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchTier {
    /// Trimmed title equals a book title exactly
    Raw,

    /// Equal after dropping spaces and bracket characters
    Tier1,

    /// Equal only after dropping bracketed text and all symbols
    Tier2,

    /// No tier produced a price
    Unmatched,
}

impl MatchTier {
    pub fn name(&self) -> &str {
        match self {
            MatchTier::Raw => "raw",
            MatchTier::Tier1 => "tier-1",
            MatchTier::Tier2 => "tier-2",
            MatchTier::Unmatched => "unmatched",
        }
    }
}

// ============================================================================
// AMBIGUITY POLICY
// ============================================================================

/// Which resolved tiers count as low-confidence matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmbiguityPolicy {
    /// Every match that needed normalization (Tier 1 or Tier 2) is flagged
    #[default]
    AnyNormalized,

    /// Only Tier 2 matches are flagged
    Tier2Only,
}

impl AmbiguityPolicy {
    pub fn is_ambiguous(&self, tier: MatchTier) -> bool {
        match (self, tier) {
            (_, MatchTier::Tier2) => true,
            (AmbiguityPolicy::AnyNormalized, MatchTier::Tier1) => true,
            _ => false,
        }
    }
}

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub purchase: StudentPurchase,

    /// Absent only when `tier` is Unmatched; zero is a real price
    pub price: Option<Decimal>,

    pub tier: MatchTier,
}

/// Every purchase priced, plus the batch-level ambiguity flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub matches: Vec<MatchResult>,
    pub ambiguous: bool,
}

// ============================================================================
// PRICE INDEX
// ============================================================================

/// Title → price under each tier. Later duplicate keys overwrite earlier ones.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    raw: HashMap<String, Decimal>,
    tier1: HashMap<String, Decimal>,
    tier2: HashMap<String, Decimal>,
}

impl PriceIndex {
    pub fn build(books: &[BookEntry]) -> Self {
        let mut index = PriceIndex::default();

        for book in books {
            let raw = book.title.trim();
            index.tier1.insert(normalize::tier1(raw), book.price);
            index.tier2.insert(normalize::tier2(raw), book.price);
            index.raw.insert(raw.to_string(), book.price);
        }

        index
    }

    /// Try each tier in priority order; the first present key wins
    pub fn lookup(&self, title: &str) -> (Option<Decimal>, MatchTier) {
        let raw = title.trim();

        if let Some(price) = self.raw.get(raw) {
            return (Some(*price), MatchTier::Raw);
        }

        if let Some(price) = self.tier1.get(&normalize::tier1(raw)) {
            return (Some(*price), MatchTier::Tier1);
        }

        if let Some(price) = self.tier2.get(&normalize::tier2(raw)) {
            return (Some(*price), MatchTier::Tier2);
        }

        (None, MatchTier::Unmatched)
    }

    pub fn resolve(&self, purchase: &StudentPurchase) -> MatchResult {
        let (price, tier) = self.lookup(&purchase.book_title);
        MatchResult {
            purchase: purchase.clone(),
            price,
            tier,
        }
    }
}

// ============================================================================
// BATCH RESOLUTION
// ============================================================================

/// Resolve the whole batch. Any unmatched purchase fails the batch, and the
/// error lists all of them.
pub fn resolve_all(
    books: &[BookEntry],
    purchases: &[StudentPurchase],
    policy: AmbiguityPolicy,
) -> Result<Resolution, FeeError> {
    let index = PriceIndex::build(books);

    let mut matches = Vec::with_capacity(purchases.len());
    let mut unmatched = Vec::new();
    let mut ambiguous = false;

    for purchase in purchases {
        let result = index.resolve(purchase);

        match result.tier {
            MatchTier::Unmatched => unmatched.push(UnmatchedPurchase {
                student_name: purchase.student_name.clone(),
                book_title: purchase.book_title.clone(),
            }),
            tier if policy.is_ambiguous(tier) => {
                warn!(
                    student = %purchase.student_name,
                    title = %purchase.book_title,
                    tier = tier.name(),
                    "low-confidence title match"
                );
                ambiguous = true;
            }
            _ => {}
        }

        matches.push(result);
    }

    if !unmatched.is_empty() {
        return Err(FeeError::UnmatchedPurchases(unmatched));
    }

    info!(count = matches.len(), ambiguous, "resolved purchase prices");
    Ok(Resolution { matches, ambiguous })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn book(serial: u32, title: &str, price: &str) -> BookEntry {
        BookEntry {
            serial,
            title: title.to_string(),
            price: Decimal::from_str(price).unwrap(),
        }
    }

    fn purchase(name: &str, title: &str) -> StudentPurchase {
        StudentPurchase {
            student_name: name.to_string(),
            class_name: "电气231".to_string(),
            book_title: title.to_string(),
        }
    }

    #[test]
    fn test_raw_match_is_never_ambiguous() {
        let books = vec![book(1, "高等数学（第6版）", "45.00")];
        let purchases = vec![purchase("张三", "高等数学（第6版）")];

        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::AnyNormalized).unwrap();

        assert_eq!(resolution.matches[0].tier, MatchTier::Raw);
        assert_eq!(resolution.matches[0].price, Some(Decimal::from_str("45.00").unwrap()));
        assert!(!resolution.ambiguous);
    }

    #[test]
    fn test_tier1_match() {
        let books = vec![book(1, "高等数学 (上册)", "45")];
        let purchases = vec![purchase("张三", "高等数学（上册）")];

        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::default()).unwrap();
        assert_eq!(resolution.matches[0].tier, MatchTier::Tier1);
        assert!(resolution.ambiguous);

        // Tier-2-only policy lets the same batch through unflagged
        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::Tier2Only).unwrap();
        assert_eq!(resolution.matches[0].tier, MatchTier::Tier1);
        assert!(!resolution.ambiguous);
    }

    #[test]
    fn test_tier2_match_sets_ambiguous() {
        let books = vec![book(1, "线性代数（第5版）", "32.80")];
        let purchases = vec![purchase("李四", "线性代数（第五版）")];

        for policy in [AmbiguityPolicy::AnyNormalized, AmbiguityPolicy::Tier2Only] {
            let resolution = resolve_all(&books, &purchases, policy).unwrap();

            assert_eq!(resolution.matches[0].tier, MatchTier::Tier2);
            assert_eq!(resolution.matches[0].price, Some(Decimal::from_str("32.80").unwrap()));
            assert!(resolution.ambiguous);
        }
    }

    #[test]
    fn test_space_for_bracket_collapses_at_tier1() {
        let books = vec![book(1, "线性代数（第5版）", "32.80")];
        let purchases = vec![purchase("李四", "线性代数 第5版")];

        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::default()).unwrap();

        assert_eq!(resolution.matches[0].tier, MatchTier::Tier1);
        assert!(resolution.ambiguous);
    }

    #[test]
    fn test_zero_price_is_a_match() {
        let books = vec![book(1, "实验指导书", "0")];
        let purchases = vec![purchase("张三", "实验指导书"), purchase("李四", "实验 指导书")];

        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::default()).unwrap();

        assert!(resolution.matches.iter().all(|m| m.price == Some(Decimal::ZERO)));
        assert_eq!(resolution.matches[1].tier, MatchTier::Tier1);
    }

    #[test]
    fn test_zero_price_raw_beats_nonzero_lower_tier() {
        // A free raw hit must not fall through to another book's Tier 2 key
        let books = vec![book(1, "数学(A)", "30"), book(2, "数学", "0")];
        let purchases = vec![purchase("张三", "数学")];

        let resolution = resolve_all(&books, &purchases, AmbiguityPolicy::default()).unwrap();

        assert_eq!(resolution.matches[0].tier, MatchTier::Raw);
        assert_eq!(resolution.matches[0].price, Some(Decimal::ZERO));
        assert!(!resolution.ambiguous);
    }

    #[test]
    fn test_duplicate_titles_last_write_wins() {
        let books = vec![book(1, "大学物理", "40"), book(2, "大学物理", "38")];
        let index = PriceIndex::build(&books);

        assert_eq!(
            index.lookup("大学物理"),
            (Some(Decimal::from_str("38").unwrap()), MatchTier::Raw)
        );
    }

    #[test]
    fn test_last_write_wins_on_normalized_keys() {
        // distinct raw titles sharing a Tier 1 key
        let books = vec![book(1, "数学 A", "30"), book(2, "数学(A)", "40")];
        let index = PriceIndex::build(&books);
        assert_eq!(
            index.lookup("数学（A）"),
            (Some(Decimal::from_str("40").unwrap()), MatchTier::Tier1)
        );

        // distinct Tier 1 keys sharing a Tier 2 key
        let books = vec![book(1, "数学(A)", "30"), book(2, "数学（B）", "40")];
        let index = PriceIndex::build(&books);
        assert_eq!(
            index.lookup("数学（C）"),
            (Some(Decimal::from_str("40").unwrap()), MatchTier::Tier2)
        );
        assert_eq!(
            index.lookup("数学A"),
            (Some(Decimal::from_str("30").unwrap()), MatchTier::Tier1)
        );
    }

    #[test]
    fn test_unmatched_fails_whole_batch_listing_all() {
        let books = vec![book(1, "高等数学", "45")];
        let purchases = vec![
            purchase("张三", "高等数学"),
            purchase("李四", "大学物理（下）"),
            purchase("王五", "电路原理"),
        ];

        let err = resolve_all(&books, &purchases, AmbiguityPolicy::default()).unwrap_err();

        assert_eq!(
            err,
            FeeError::UnmatchedPurchases(vec![
                UnmatchedPurchase {
                    student_name: "李四".to_string(),
                    book_title: "大学物理（下）".to_string(),
                },
                UnmatchedPurchase {
                    student_name: "王五".to_string(),
                    book_title: "电路原理".to_string(),
                },
            ])
        );
        let msg = err.to_string();
        assert!(msg.contains("李四 - 大学物理（下）"));
        assert!(msg.contains("王五 - 电路原理"));
    }

    #[test]
    fn test_policy_table() {
        let strict = AmbiguityPolicy::AnyNormalized;
        let lenient = AmbiguityPolicy::Tier2Only;

        assert_eq!(AmbiguityPolicy::default(), strict);
        assert!(!lenient.is_ambiguous(MatchTier::Raw));
        assert!(!lenient.is_ambiguous(MatchTier::Tier1));
        assert!(lenient.is_ambiguous(MatchTier::Tier2));
        assert!(!strict.is_ambiguous(MatchTier::Raw));
        assert!(strict.is_ambiguous(MatchTier::Tier1));
        assert!(strict.is_ambiguous(MatchTier::Tier2));
        assert!(!strict.is_ambiguous(MatchTier::Unmatched));
    }
}
