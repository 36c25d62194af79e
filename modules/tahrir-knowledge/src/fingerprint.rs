//! SimHash + shingle fingerprints over normalized article text.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tahrir_common::fnv1a_64;

/// Maximum shingles kept per fingerprint.
pub const SHINGLE_LIMIT: usize = 128;

/// Minimum token count for a usable fingerprint.
pub const MIN_TOKENS: usize = 3;

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Arabic block, Latin with diacritic extensions, digits; length >= 2.
    RE.get_or_init(|| {
        Regex::new(r"[\u{0600}-\u{06FF}A-Za-z\u{00C0}-\u{024F}0-9]{2,}").unwrap()
    })
}

/// Extract lowercased tokens from already-normalized text.
pub fn tokens(text: &str) -> Vec<String> {
    token_re()
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .collect()
}

/// SimHash + shingle fingerprint of one article's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    /// Unsigned semantics; stored signed in Postgres.
    pub simhash: u64,
    pub shingles: BTreeSet<String>,
    pub token_count: usize,
}

impl Fingerprint {
    pub fn simhash_signed(&self) -> i64 {
        self.simhash as i64
    }

    pub fn from_signed(simhash: i64, shingles: impl IntoIterator<Item = String>, token_count: usize) -> Self {
        Self {
            simhash: simhash as u64,
            shingles: shingles.into_iter().collect(),
            token_count,
        }
    }
}

/// Compute a fingerprint over normalized text. Returns `None` when the
/// text is too short to fingerprint meaningfully.
pub fn fingerprint(text: &str) -> Option<Fingerprint> {
    let toks = tokens(text);
    if toks.len() < MIN_TOKENS {
        return None;
    }
    Some(Fingerprint {
        simhash: simhash64(&toks),
        shingles: shingles(&toks, 2, SHINGLE_LIMIT),
        token_count: toks.len(),
    })
}

/// Unweighted 64-bit SimHash: each token's hash contributes ±1 per bit.
pub fn simhash64(tokens: &[String]) -> u64 {
    let mut weights = [0i32; 64];
    for tok in tokens {
        let h = fnv1a_64(tok.as_bytes());
        for (i, w) in weights.iter_mut().enumerate() {
            if (h >> i) & 1 == 1 {
                *w += 1;
            } else {
                *w -= 1;
            }
        }
    }
    let mut out = 0u64;
    for (i, w) in weights.iter().enumerate() {
        if *w >= 0 {
            out |= 1 << i;
        }
    }
    out
}

/// N-gram shingles over tokens, capped at `limit`.
pub fn shingles(tokens: &[String], n: usize, limit: usize) -> BTreeSet<String> {
    if tokens.len() < n {
        return tokens.iter().take(limit).cloned().collect();
    }
    let mut out = BTreeSet::new();
    for window in tokens.windows(n) {
        out.insert(window.join(" "));
        if out.len() >= limit {
            break;
        }
    }
    out
}

/// 1 − hamming/64. Identical hashes score 1.0.
pub fn hamming_ratio(a: u64, b: u64) -> f64 {
    let dist = (a ^ b).count_ones();
    1.0 - (dist as f64 / 64.0)
}

pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.union(b).count();
    inter as f64 / union.max(1) as f64
}

/// Blended similarity between two fingerprints.
pub fn combined_score(a: &Fingerprint, b: &Fingerprint) -> f64 {
    0.65 * hamming_ratio(a.simhash, b.simhash) + 0.35 * jaccard(&a.shingles, &b.shingles)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizer_captures_arabic_latin_digits() {
        let toks = tokens("سوناطراك تعلن عن اتفاق Gas 2026 مع شركة énergie");
        assert!(toks.contains(&"سوناطراك".to_string()));
        assert!(toks.contains(&"gas".to_string()));
        assert!(toks.contains(&"2026".to_string()));
        assert!(toks.contains(&"énergie".to_string()));
    }

    #[test]
    fn tokenizer_drops_single_chars() {
        let toks = tokens("a في b و");
        assert!(!toks.contains(&"a".to_string()));
        assert!(toks.contains(&"في".to_string()));
    }

    #[test]
    fn identical_text_scores_one() {
        let fp = fingerprint("الرئيس يعلن قرارات جديدة حول قطاع الطاقة").unwrap();
        assert!((combined_score(&fp, &fp) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn near_duplicate_scores_above_duplicate_threshold() {
        let a = fingerprint(
            "الرئيس يعلن قرارات سيادية هامة بخصوص قطاع الطاقة والمحروقات في الجزائر اليوم",
        )
        .unwrap();
        let b = fingerprint(
            "الرئيس يعلن قرارات سيادية هامة بخصوص قطاع الطاقة والمحروقات في الجزائر",
        )
        .unwrap();
        assert!(combined_score(&a, &b) >= 0.84, "{}", combined_score(&a, &b));
    }

    #[test]
    fn unrelated_text_scores_low() {
        let a = fingerprint("المنتخب الوطني يفوز بالمباراة النهائية لكأس أفريقيا").unwrap();
        let b = fingerprint("بنك الجزائر يحدد سعر الصرف الرسمي للدينار هذا الأسبوع").unwrap();
        assert!(combined_score(&a, &b) < 0.68, "{}", combined_score(&a, &b));
    }

    #[test]
    fn short_text_has_no_fingerprint() {
        assert!(fingerprint("عاجل").is_none());
        assert!(fingerprint("").is_none());
    }

    #[test]
    fn shingles_are_capped() {
        let toks: Vec<String> = (0..500).map(|i| format!("tok{i}")).collect();
        assert_eq!(shingles(&toks, 2, SHINGLE_LIMIT).len(), SHINGLE_LIMIT);
    }

    #[test]
    fn signed_round_trip_preserves_semantics() {
        let fp = fingerprint("نص تجريبي طويل بما يكفي لحساب بصمة").unwrap();
        let back = Fingerprint::from_signed(
            fp.simhash_signed(),
            fp.shingles.iter().cloned(),
            fp.token_count,
        );
        assert_eq!(fp.simhash, back.simhash);
    }
}
