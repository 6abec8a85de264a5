// 🧾 Text Report - Three sections: books, purchases, fees
// Plain text for the terminal; amounts carry two decimals and ￥

use crate::aggregate::{format_money, TOTAL_LABEL};
use crate::engine::FeeReport;
use crate::extract::StudentPurchase;
use std::collections::BTreeMap;
use std::fmt;

const RULE: &str = "================================================================================";

pub const AMBIGUOUS_WARNING: &str = "注意：部分匹配为模糊匹配，请核对";

pub const VERIFY_REMINDER: &str =
    "请仔细核对程序计算的总金额与文件记录的合计金额是否一致，最终金额应以文件记录为准。";

/// Titles bought by each student, students sorted by name
pub fn titles_by_student(purchases: &[StudentPurchase]) -> Vec<(String, Vec<String>)> {
    let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for p in purchases {
        grouped
            .entry(p.student_name.as_str())
            .or_default()
            .push(p.book_title.clone());
    }

    grouped
        .into_iter()
        .map(|(name, titles)| (name.to_string(), titles))
        .collect()
}

/// Display adapter so the report can be written with `?` throughout
pub struct TextReport<'a>(pub &'a FeeReport);

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;

        writeln!(f, "{RULE}")?;
        writeln!(f, "教材清单（{}）：", report.class_name)?;
        writeln!(f, "{RULE}")?;
        for book in &report.books {
            writeln!(
                f,
                "序号: {}, 教材: {}, 价格: ￥{}",
                book.serial,
                book.title,
                format_money(book.price)
            )?;
        }

        writeln!(f, "\n{RULE}")?;
        writeln!(f, "学生购书记录：")?;
        writeln!(f, "{RULE}")?;
        for (name, titles) in titles_by_student(&report.purchases) {
            writeln!(f, "姓名: {}, 教材: {}", name, titles.join(", "))?;
        }

        writeln!(f, "\n{RULE}")?;
        writeln!(f, "学生购书费用：")?;
        writeln!(f, "{RULE}")?;
        for total in report.summary.sorted_by_name() {
            writeln!(f, "{}: ￥{}", total.student_name, format_money(total.total_fee))?;
        }
        writeln!(f, "{TOTAL_LABEL}: ￥{}", format_money(report.summary.grand_total))?;

        if report.summary.ambiguous {
            writeln!(f, "\n{AMBIGUOUS_WARNING}")?;
            for m in report.ambiguous_matches() {
                writeln!(
                    f,
                    "  {} - {} ({})",
                    m.purchase.student_name,
                    m.purchase.book_title,
                    m.tier.name()
                )?;
            }
        }

        writeln!(f, "\n{VERIFY_REMINDER}")?;
        Ok(())
    }
}

pub fn render(report: &FeeReport) -> String {
    TextReport(report).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::calculate;
    use crate::grid::Grid;

    fn sample_report() -> FeeReport {
        let books = Grid::from_strings(vec![
            vec!["电气231"],
            vec!["序号", "教材名称", "折扣价"],
            vec!["1", "高等数学(上)", "45"],
            vec!["2", "大学物理", "38.6"],
        ]);
        let students = Grid::from_strings(vec![
            vec!["姓名", "班级", "教材名称"],
            vec!["李四", "电气231", "大学物理"],
            vec!["张三", "电气231", "高等数学（上）"],
            vec!["张三", "电气231", "大学物理"],
        ]);
        calculate(&books, &students, "电气231").unwrap()
    }

    #[test]
    fn test_titles_grouped_per_student() {
        let report = sample_report();
        let grouped = titles_by_student(&report.purchases);

        assert_eq!(grouped.len(), 2);
        let zhang = grouped.iter().find(|(n, _)| n == "张三").unwrap();
        assert_eq!(zhang.1, vec!["高等数学（上）".to_string(), "大学物理".to_string()]);
    }

    #[test]
    fn test_render_sections_and_totals() {
        let text = render(&sample_report());

        assert!(text.contains("教材清单（电气231）："));
        assert!(text.contains("序号: 1, 教材: 高等数学(上), 价格: ￥45.00"));
        assert!(text.contains("姓名: 张三, 教材: 高等数学（上）, 大学物理"));
        assert!(text.contains("张三: ￥83.60"));
        assert!(text.contains("李四: ￥38.60"));
        assert!(text.contains("总计: ￥122.20"));
        assert!(text.contains(AMBIGUOUS_WARNING));
        assert!(text.ends_with(&format!("{VERIFY_REMINDER}\n")));
    }

    #[test]
    fn test_flagged_matches_listed_under_warning() {
        let text = render(&sample_report());
        let warning_at = text.find(AMBIGUOUS_WARNING).unwrap();

        let audit = &text[warning_at..];
        assert!(audit.contains("  张三 - 高等数学（上） (tier-1)"));
        assert!(!audit.contains("大学物理"));
    }

    #[test]
    fn test_no_warning_under_tier2_only_policy() {
        use crate::engine::{calculate_with, CalcOptions};
        use crate::resolver::AmbiguityPolicy;

        let books = Grid::from_strings(vec![
            vec!["电气231"],
            vec!["序号", "教材名称", "折扣价"],
            vec!["1", "高等数学(上)", "45"],
        ]);
        let students = Grid::from_strings(vec![
            vec!["姓名", "班级", "教材名称"],
            vec!["张三", "电气231", "高等数学（上）"],
        ]);
        let options = CalcOptions::with_ambiguity(AmbiguityPolicy::Tier2Only);
        let report = calculate_with(&books, &students, "电气231", &options).unwrap();

        let text = render(&report);
        assert!(!text.contains(AMBIGUOUS_WARNING));
        assert!(!text.contains("(tier-1)"));
    }
}
