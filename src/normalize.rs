// 🔤 Title Normalization - Equivalence keys for free-text book titles
//
// Tier 1: drop spaces and bracket characters, keep what was inside
//   "高等数学 (上册)"   → "高等数学上册"
// Tier 2: drop bracketed spans with their content, then every symbol
//   "高等数学（第6版）" → "高等数学"
//
// Both tiers are total and idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::Display;

const SPACES: [char; 2] = [' ', '\u{3000}'];
const BRACKETS: [char; 4] = ['(', ')', '（', '）'];

/// Anything that is not a word character or a CJK ideograph
static NON_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\u{4e00}-\u{9fa5}]").expect("static pattern"));

/// Tier 1: remove spaces (ASCII and full-width) and bracket characters,
/// keeping enclosed text.
pub fn tier1(input: impl Display) -> String {
    input
        .to_string()
        .chars()
        .filter(|c| !SPACES.contains(c) && !BRACKETS.contains(c))
        .collect()
}

/// Tier 2: remove full-width then ASCII bracketed spans with their content,
/// then everything but word characters and CJK ideographs.
pub fn tier2(input: impl Display) -> String {
    let mut s = input.to_string();
    strip_spans(&mut s, '（', '）');
    strip_spans(&mut s, '(', ')');

    NON_WORD
        .replace_all(&s, "")
        .chars()
        .filter(|c| !SPACES.contains(c))
        .collect()
}

/// Cut `open … close` spans while the first `open` precedes the first `close`.
/// An out-of-order pair stops stripping for this bracket style.
fn strip_spans(s: &mut String, open: char, close: char) {
    while let (Some(start), Some(end)) = (s.find(open), s.find(close)) {
        if start >= end {
            break;
        }
        s.replace_range(start..end + close.len_utf8(), "");
    }
}
