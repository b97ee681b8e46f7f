//! `chunk_type` classification rules.
//!
//! First match wins, checked in a fixed order over the lowercased
//! concatenation of a chunk's title path and body text. Kept as a small
//! ordered table rather than inline branching so the keyword lists can be
//! extended without touching the parser.

use crate::chunking::chunk::ChunkType;

type Rule = (ChunkType, &'static [&'static str]);

const RULES: &[Rule] = &[
    (
        ChunkType::ManagementDiscussion,
        &["管理层讨论", "经营情况讨论", "management discussion", "md&a"],
    ),
    (
        ChunkType::FinancialAnalysis,
        &["财务分析", "财务状况", "financial analysis", "financial condition"],
    ),
    (ChunkType::Cashflow, &["现金流量", "现金流", "cash flow", "cashflow"]),
    (ChunkType::Risk, &["风险因素", "风险提示", "risk factor", "risks"]),
    (
        ChunkType::Governance,
        &["公司治理", "董事会", "监事会", "corporate governance", "board of directors"],
    ),
    (
        ChunkType::BusinessOverview,
        &["业务概况", "主营业务", "公司简介", "business overview", "company profile"],
    ),
    (ChunkType::Summary, &["摘要", "概要", "summary", "highlights"]),
    (ChunkType::Notes, &["附注", "脚注", "notes to", "footnote"]),
];

/// Classifies a block of text given its composed heading path and body.
///
/// Tables are classified upstream (atomic blocks carrying their own literal
/// `<table>`/`</table>` markers) — this function is for everything else and
/// never returns [`ChunkType::Table`].
#[must_use]
pub fn classify(title_path: &[String], body: &str) -> ChunkType {
    let haystack = {
        let mut s = title_path.join(" ");
        s.push(' ');
        s.push_str(body);
        s.to_lowercase()
    };

    if haystack.contains("<table>") && haystack.contains("</table>") {
        return ChunkType::Table;
    }

    for (chunk_type, keywords) in RULES {
        if keywords.iter().any(|kw| haystack.contains(kw)) {
            return *chunk_type;
        }
    }

    ChunkType::Other
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_management_discussion() {
        let path = vec!["管理层讨论与分析".to_string()];
        assert_eq!(classify(&path, "body"), ChunkType::ManagementDiscussion);
    }

    #[test]
    fn test_classify_risk() {
        let path = vec!["风险因素".to_string()];
        assert_eq!(classify(&path, ""), ChunkType::Risk);
    }

    #[test]
    fn test_classify_table_wins_first() {
        let path = vec!["任意标题".to_string()];
        assert_eq!(
            classify(&path, "<table><tr><td>1</td></tr></table>"),
            ChunkType::Table
        );
    }

    #[test]
    fn test_classify_default_other() {
        let path = vec!["杂项".to_string()];
        assert_eq!(classify(&path, "unrelated text"), ChunkType::Other);
    }

    #[test]
    fn test_classify_case_insensitive() {
        let path = vec!["Business Overview".to_string()];
        assert_eq!(classify(&path, ""), ChunkType::BusinessOverview);
    }
}
