//! Canonical comparison form for headwords and phonetic annotations.
//!
//! The same function must run at index-build time and at query time,
//! otherwise lookups silently miss.

use unic_ucd::normal::{decompose_canonical, CanonicalCombiningClass};
use unic_ucd::GeneralCategory;

/// Lowercase, decompose (NFD) and drop every nonspacing mark.
///
/// ```
/// use sqlite_dict_store::normalize::normalize;
///
/// assert_eq!(normalize("Café"), "cafe");
/// ```
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();

    let mut decomposed: Vec<char> = Vec::with_capacity(lowered.len());
    for c in lowered.chars() {
        decompose_canonical(c, |d| decomposed.push(d));
    }
    reorder_marks(&mut decomposed);

    decomposed
        .into_iter()
        .filter(|&c| GeneralCategory::of(c) != GeneralCategory::NonspacingMark)
        .collect()
}

/// Canonical ordering step of NFD: stable sort of each run of
/// non-starters by combining class.
fn reorder_marks(chars: &mut [char]) {
    let mut start = 0;
    while start < chars.len() {
        if CanonicalCombiningClass::of(chars[start]).is_not_reordered() {
            start += 1;
            continue;
        }
        let mut end = start;
        while end < chars.len() && CanonicalCombiningClass::of(chars[end]).is_reordered() {
            end += 1;
        }
        chars[start..end].sort_by_key(|&c| CanonicalCombiningClass::of(c).number());
        start = end;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        assert_eq!(normalize("café"), "cafe");
        assert_eq!(normalize("cafe"), "cafe");
        assert_eq!(normalize("café"), normalize("cafe"));
        assert_eq!(normalize("Ångström"), "angstrom");
        assert_eq!(normalize("naïve"), "naive");
    }

    #[test]
    fn test_precomposed_and_decomposed_agree() {
        // U+00E9 vs 'e' + U+0301
        assert_eq!(normalize("\u{e9}"), normalize("e\u{301}"));
    }

    #[test]
    fn test_lowercases() {
        assert_eq!(normalize("APPLE"), "apple");
        assert_eq!(normalize("Banana Split"), "banana split");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "",
            "Apple",
            "Crème Brûlée",
            "Ελληνικά",
            "ḥadīth",
            "pīnyīn shēngdiào",
            "日本語",
            "İstanbul",
            "x\u{301}\u{323}",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_keeps_non_latin_letters() {
        assert_eq!(normalize("日本語"), "日本語");
        assert_eq!(normalize("Ελληνικά"), "ελληνικα");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
    }
}
