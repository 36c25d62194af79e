//! Arabic-aware text normalization shared by dedup, fingerprinting, and the
//! rule-based classifiers.

use std::sync::OnceLock;

use regex::Regex;

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

fn arabic_char_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ء-ي]").unwrap())
}

/// Lowercase, trim, and collapse internal whitespace.
pub fn normalize_text(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    space_re().replace_all(&lowered, " ").into_owned()
}

/// Fold Arabic orthographic variants for comparison purposes:
/// strip diacritics and tatweel, unify alef forms, taa marbuta, and
/// alef maqsura. Applied on top of [`normalize_text`].
pub fn normalize_arabic(text: &str) -> String {
    let base = normalize_text(text);
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        match c {
            // Harakat and Quranic marks
            '\u{064B}'..='\u{065F}' | '\u{0670}' => {}
            // Tatweel
            '\u{0640}' => {}
            'أ' | 'إ' | 'آ' => out.push('ا'),
            'ة' => out.push('ه'),
            'ى' => out.push('ي'),
            other => out.push(other),
        }
    }
    out
}

/// True when the text contains at least one Arabic letter.
pub fn contains_arabic(text: &str) -> bool {
    arabic_char_re().is_match(text)
}

/// Strip HTML tags and collapse whitespace. Used on feed entry bodies
/// before persistence; draft HTML goes through the ammonia sanitizer in
/// the editorial crate instead.
pub fn sanitize_input(text: &str) -> String {
    let stripped = tag_re().replace_all(text, " ");
    normalize_whitespace(&stripped)
}

/// Collapse whitespace without lowercasing (titles keep their case).
pub fn normalize_whitespace(text: &str) -> String {
    space_re().replace_all(text.trim(), " ").into_owned()
}

/// Truncate at a char boundary, never splitting a grapheme mid-codepoint.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_text("  Hello   World  "), "hello world");
    }

    #[test]
    fn arabic_folding_unifies_variants() {
        assert_eq!(normalize_arabic("أخبار"), "اخبار");
        assert_eq!(normalize_arabic("إعلان"), "اعلان");
        assert_eq!(normalize_arabic("مدرسة"), "مدرسه");
        assert_eq!(normalize_arabic("مستشفى"), "مستشفي");
    }

    #[test]
    fn arabic_folding_strips_diacritics_and_tatweel() {
        assert_eq!(normalize_arabic("فَوْرًا"), "فورا");
        assert_eq!(normalize_arabic("الجـــزائر"), "الجزائر");
    }

    #[test]
    fn detects_arabic_characters() {
        assert!(contains_arabic("عاجل: خبر"));
        assert!(!contains_arabic("breaking news only"));
    }

    #[test]
    fn sanitize_strips_tags() {
        assert_eq!(
            sanitize_input("<p>الرئيس  يعلن</p>\n<br/>قرارات"),
            "الرئيس يعلن قرارات"
        );
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let s = "مرحبا بالعالم";
        let t = truncate_text(s, 6);
        assert_eq!(t.chars().count(), 6);
        assert!(s.starts_with(&t));
        assert_eq!(truncate_text("short", 100), "short");
    }
}
