/// Lowercase, trim, strip punctuation and collapse internal whitespace.
pub(crate) fn normalize(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped: String =
        lowered.chars().map(|c| if c.is_alphanumeric() || c == '.' { c } else { ' ' }).collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First whitespace-delimited token, lowercased. Used by the exact tier of
/// short-answer matching.
pub(crate) fn first_token(raw: &str) -> String {
    raw.split_whitespace().next().unwrap_or("").to_lowercase()
}

/// Map a normalized token onto a boolean through the accepted equivalents.
/// Tokens outside both sets stay unmapped so callers can fall back to plain
/// string comparison instead of guessing.
pub(crate) fn as_boolean(normalized: &str) -> Option<bool> {
    match normalized {
        "true" | "t" | "1" | "yes" | "y" => Some(true),
        "false" | "f" | "0" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Classic single-character insert/delete/substitute edit distance.
pub(crate) fn edit_distance(left: &str, right: &str) -> usize {
    let left: Vec<char> = left.chars().collect();
    let right: Vec<char> = right.chars().collect();

    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0usize; right.len() + 1];

    for (row, left_char) in left.iter().enumerate() {
        current[0] = row + 1;
        for (col, right_char) in right.iter().enumerate() {
            let substitution = previous[col] + usize::from(left_char != right_char);
            current[col + 1] = substitution.min(previous[col + 1] + 1).min(current[col] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

/// Normalized similarity in `[0, 1]`: `1 - distance / max(len)`. Two empty
/// strings are identical.
pub(crate) fn similarity(left: &str, right: &str) -> f64 {
    let longest = left.chars().count().max(right.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - edit_distance(left, right) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize("  The Quick,  brown FOX!  "), "the quick brown fox");
        assert_eq!(normalize("3.14"), "3.14");
    }

    #[test]
    fn first_token_lowers_and_takes_head() {
        assert_eq!(first_token("  Paris France"), "paris");
        assert_eq!(first_token(""), "");
    }

    #[test]
    fn boolean_equivalents_map_both_ways() {
        for token in ["true", "t", "1", "yes", "y"] {
            assert_eq!(as_boolean(token), Some(true), "{token}");
        }
        for token in ["false", "f", "0", "no", "n"] {
            assert_eq!(as_boolean(token), Some(false), "{token}");
        }
        assert_eq!(as_boolean("maybe"), None);
    }

    #[test]
    fn edit_distance_counts_single_char_operations() {
        assert_eq!(edit_distance("elephant", "elefant"), 1);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("same", "same"), 0);
    }

    #[test]
    fn similarity_is_normalized_by_longest_side() {
        let value = similarity("elephant", "elefant");
        assert!((value - 0.875).abs() < 1e-12);
        assert_eq!(similarity("", ""), 1.0);
        assert!(similarity("elephant", "giraffe") < 0.5);
    }
}
