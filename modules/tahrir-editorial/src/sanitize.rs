//! Draft HTML sanitization and diffing.

use std::collections::HashSet;

use ammonia::Builder;
use scraper::Html;

/// Tags a draft body may carry after sanitization.
const ALLOWED_TAGS: [&str; 12] = [
    "p", "h1", "h2", "h3", "strong", "em", "ul", "ol", "li", "blockquote", "a", "br",
];

/// Sanitize LLM- or editor-produced HTML to the allow-list. Anything
/// outside it (scripts, styles, event handlers, javascript: links) is
/// stripped, not escaped.
pub fn sanitize_html(value: &str) -> String {
    let mut builder = Builder::default();
    builder
        .tags(HashSet::from(ALLOWED_TAGS))
        .link_rel(Some("noopener noreferrer"))
        .url_schemes(HashSet::from(["http", "https", "mailto"]));
    builder.clean(value).to_string().trim().to_string()
}

/// Plain-text projection of a draft body, for gates and diff snapshots.
pub fn html_to_text(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(value);
    let text: Vec<String> = fragment
        .root_element()
        .text()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    text.join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

/// Line-level add/remove counts between two texts. Feeds the decision
/// log's before/after summaries; not a full unified diff.
pub fn build_diff(old_text: &str, new_text: &str) -> DiffStats {
    let old_lines: Vec<&str> = old_text.lines().collect();
    let new_lines: Vec<&str> = new_text.lines().collect();

    let mut old_counts = std::collections::HashMap::new();
    for line in &old_lines {
        *old_counts.entry(*line).or_insert(0i64) += 1;
    }
    let mut added = 0usize;
    let mut new_counts = std::collections::HashMap::new();
    for line in &new_lines {
        *new_counts.entry(*line).or_insert(0i64) += 1;
    }

    for (line, count) in &new_counts {
        let before = old_counts.get(line).copied().unwrap_or(0);
        if *count > before {
            added += (*count - before) as usize;
        }
    }
    let mut removed = 0usize;
    for (line, count) in &old_counts {
        let after = new_counts.get(line).copied().unwrap_or(0);
        if *count > after {
            removed += (*count - after) as usize;
        }
    }

    DiffStats { added, removed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_allowed_tags() {
        let html = "<h1>عنوان</h1><p>فقرة <strong>مهمة</strong></p>";
        let clean = sanitize_html(html);
        assert!(clean.contains("<h1>"));
        assert!(clean.contains("<strong>"));
    }

    #[test]
    fn strips_scripts_and_event_handlers() {
        let html = r#"<p onclick="evil()">نص</p><script>alert(1)</script>"#;
        let clean = sanitize_html(html);
        assert!(!clean.contains("script"));
        assert!(!clean.contains("onclick"));
        assert!(clean.contains("نص"));
    }

    #[test]
    fn drops_javascript_links() {
        let html = r#"<a href="javascript:alert(1)">اضغط</a><a href="https://ok.dz">سليم</a>"#;
        let clean = sanitize_html(html);
        assert!(!clean.contains("javascript:"));
        assert!(clean.contains("https://ok.dz"));
    }

    #[test]
    fn html_to_text_flattens() {
        let text = html_to_text("<h1>عنوان</h1><p>فقرة أولى</p><p>فقرة ثانية</p>");
        assert_eq!(text, "عنوان فقرة أولى فقرة ثانية");
    }

    #[test]
    fn diff_counts_changes() {
        let stats = build_diff("a\nb\nc", "a\nc\nd\ne");
        assert_eq!(stats.removed, 1); // b
        assert_eq!(stats.added, 2); // d, e
        assert_eq!(build_diff("same", "same"), DiffStats::default());
    }
}
