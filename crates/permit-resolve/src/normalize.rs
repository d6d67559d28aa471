//! String normalization and similarity for the matching cascade.

use std::collections::BTreeSet;

/// Casefold, strip punctuation, collapse whitespace.
///
/// `"O'Brien & Sons, Inc."` becomes `"o brien sons inc"`.
#[must_use]
pub fn normalize_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_was_space = true;
    for ch in raw.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            last_was_space = false;
        } else if !last_was_space {
            out.push(' ');
            last_was_space = true;
        }
    }
    out.truncate(out.trim_end().len());
    out
}

/// Uppercase, strip punctuation and whitespace, then strip leading zeros
/// from the trailing digit run.
///
/// `"c-10"` and `"C10"` normalize identically, as do `"0012345"` and
/// `"12345"`. License formats vary per feed; this is the equality the
/// cascade merges on.
#[must_use]
pub fn normalize_license(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect();

    let tail_start = compact
        .rfind(|c: char| !c.is_ascii_digit())
        .map_or(0, |i| i + 1);
    let (head, tail) = compact.split_at(tail_start);
    let trimmed = tail.trim_start_matches('0');
    if tail.is_empty() {
        compact
    } else if trimmed.is_empty() {
        // All-zero tail keeps a single zero so "C-000" stays distinct from "C"
        format!("{head}0")
    } else {
        format!("{head}{trimmed}")
    }
}

/// Whitespace-delimited token set of a normalized name.
#[must_use]
pub fn name_tokens(normalized: &str) -> BTreeSet<&str> {
    normalized.split_whitespace().collect()
}

/// Token-set Jaccard similarity. Empty-union pairs score zero, so nameless
/// contacts never fuzzy-match.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn jaccard(a: &BTreeSet<&str>, b: &BTreeSet<&str>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Blocking key: first `len` characters of the normalized name.
///
/// Returns `None` for empty names; those contacts skip fuzzy matching
/// entirely and fall through to the singleton step.
#[must_use]
pub fn blocking_key(normalized: &str, len: usize) -> Option<String> {
    if normalized.is_empty() {
        return None;
    }
    Some(normalized.chars().take(len).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("O'Brien & Sons, Inc.", "o brien sons inc")]
    #[case("  ACME   ELECTRIC  ", "acme electric")]
    #[case("J.P. Construction", "j p construction")]
    #[case("", "")]
    fn normalize_name_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_name(raw), expected);
    }

    #[rstest]
    #[case("c-10", "C10")]
    #[case("C10", "C10")]
    #[case("0012345", "12345")]
    #[case("12345", "12345")]
    #[case(" lic #A-007 ", "LICA7")]
    #[case("C-000", "C0")]
    #[case("ABC", "ABC")]
    fn normalize_license_cases(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(normalize_license(raw), expected);
    }

    #[test]
    fn jaccard_boundaries() {
        let a = name_tokens("acme electric inc");
        let b = name_tokens("acme electric inc llc");
        // 3 shared of 4 distinct tokens
        assert!((jaccard(&a, &b) - 0.75).abs() < f64::EPSILON);

        let c = name_tokens("acme electric");
        let d = name_tokens("acme electric co");
        // 2 of 3
        assert!(jaccard(&c, &d) < 0.67);

        let empty = BTreeSet::new();
        assert!((jaccard(&empty, &empty)).abs() < f64::EPSILON);
    }

    #[test]
    fn blocking_key_prefix() {
        assert_eq!(blocking_key("acme electric", 3).as_deref(), Some("acm"));
        assert_eq!(blocking_key("ab", 3).as_deref(), Some("ab"));
        assert_eq!(blocking_key("", 3), None);
    }
}
