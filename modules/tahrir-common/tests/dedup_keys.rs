//! Cross-module behavior of the dedup building blocks: the same wire item
//! re-emitted with cosmetic differences must land on the same keys.

use tahrir_common::{normalize_arabic, sanitize_input, unique_hash};

#[test]
fn re_emitted_entry_lands_on_the_same_hash() {
    let first = unique_hash(
        "وكالة الأنباء الجزائرية",
        "https://aps.dz/article/123",
        "الرئيس يستقبل وفدا وزاريا",
    );
    let second = unique_hash(
        "وكالة الأنباء الجزائرية",
        "https://aps.dz/article/123",
        "  الرئيس يستقبل وفدا وزاريا ",
    );
    assert_eq!(first, second);
}

#[test]
fn different_urls_from_one_source_are_distinct() {
    let a = unique_hash("APS", "https://aps.dz/a", "عنوان مشترك");
    let b = unique_hash("APS", "https://aps.dz/b", "عنوان مشترك");
    assert_ne!(a, b);
}

#[test]
fn sanitized_feed_html_matches_plain_text_hash() {
    let plain = unique_hash("TSA", "https://tsa.dz/x", "عنوان الخبر");
    let from_html = unique_hash("TSA", "https://tsa.dz/x", &sanitize_input("<b>عنوان  الخبر</b>"));
    assert_eq!(plain, from_html);
}

#[test]
fn folding_is_idempotent() {
    let once = normalize_arabic("أسْعَار البترول إلى ارتفاع");
    let twice = normalize_arabic(&once);
    assert_eq!(once, twice);
}
