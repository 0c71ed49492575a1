//! Observation count parsing
//!
//! `OBSERVATION_COUNT` is stored as text: either a decimal integer or the
//! token `"X"` (species present, count unknown). Parsing never fails.

/// Token used by checklists for "present, count not recorded"
pub const PRESENT_TOKEN: &str = "X";

/// Returns true if `raw` (after trimming) is a non-empty run of ASCII digits
fn is_all_digits(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an observation count into a map intensity
///
/// Anything that is not a plain decimal integer (including `"X"`, signed
/// values and values that overflow `i64`) yields 0.
///
/// # Examples
/// ```
/// use birdwatch_common::parse_intensity;
///
/// assert_eq!(parse_intensity("12"), 12);
/// assert_eq!(parse_intensity("X"), 0);
/// ```
pub fn parse_intensity(raw: &str) -> i64 {
    if !is_all_digits(raw) {
        return 0;
    }
    raw.trim().parse::<i64>().unwrap_or(0)
}

/// A count is positive when it is all digits and parses to a value above zero
#[cfg(test)]
fn is_positive_count(raw: &str) -> bool {
    parse_intensity(raw) > 0
}

/// SQL predicate matching counts that are all digits and above zero
///
/// Agrees with [`parse_intensity`] `> 0` for every count that fits in `i64`.
///
/// Used by the search queries so filtering happens in SQLite rather than in memory.
pub fn positive_count_sql(column: &str) -> String {
    format!(
        "(trim({col}) <> '' AND trim({col}) NOT GLOB '*[^0-9]*' AND CAST(trim({col}) AS INTEGER) > 0)",
        col = column
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_count() {
        assert_eq!(parse_intensity("12"), 12);
        assert_eq!(parse_intensity("0"), 0);
        assert_eq!(parse_intensity(" 7 "), 7);
    }

    #[test]
    fn test_present_token_is_zero() {
        assert_eq!(parse_intensity(PRESENT_TOKEN), 0);
        assert!(!is_positive_count(PRESENT_TOKEN));
    }

    #[test]
    fn test_non_digit_strings_are_zero() {
        for raw in ["", "   ", "-3", "+3", "1.5", "12a", "many"] {
            assert_eq!(parse_intensity(raw), 0, "expected 0 for {:?}", raw);
        }
    }

    #[test]
    fn test_overflow_is_zero() {
        assert_eq!(parse_intensity("99999999999999999999999"), 0);
    }

    #[test]
    fn test_positive_count() {
        assert!(is_positive_count("1"));
        assert!(is_positive_count("250"));
        assert!(!is_positive_count("0"));
        assert!(!is_positive_count("00"));
    }

    #[test]
    fn test_positive_count_sql_mentions_column() {
        let sql = positive_count_sql("s.OBSERVATION_COUNT");
        assert!(sql.contains("trim(s.OBSERVATION_COUNT) NOT GLOB"));
        assert!(sql.contains("CAST(trim(s.OBSERVATION_COUNT) AS INTEGER) > 0"));
    }
}
