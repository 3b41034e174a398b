//! Raw input parsing for counted quantities.

/// Parse a counted quantity as typed by a stock-taker.
///
/// Count sheets are filled in fast, on the warehouse floor, so the rules are
/// deliberately forgiving: surrounding whitespace is ignored, and anything
/// that does not read as a non-negative whole number leaves the line
/// uncounted instead of failing the entry.
///
/// Returns `None` for empty, non-numeric, fractional or negative input.
pub fn parse_counted_quantity(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<i64>() {
        Ok(quantity) if quantity >= 0 => Some(quantity),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integers() {
        assert_eq!(parse_counted_quantity("45"), Some(45));
        assert_eq!(parse_counted_quantity("0"), Some(0));
        assert_eq!(parse_counted_quantity("1200"), Some(1200));
    }

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(parse_counted_quantity("  45  "), Some(45));
        assert_eq!(parse_counted_quantity("\t7\n"), Some(7));
    }

    #[test]
    fn non_numeric_input_reads_as_uncounted() {
        assert_eq!(parse_counted_quantity("abc"), None);
        assert_eq!(parse_counted_quantity("4x"), None);
        assert_eq!(parse_counted_quantity("12 34"), None);
    }

    #[test]
    fn empty_input_reads_as_uncounted() {
        assert_eq!(parse_counted_quantity(""), None);
        assert_eq!(parse_counted_quantity("   "), None);
    }

    #[test]
    fn negative_input_reads_as_uncounted() {
        assert_eq!(parse_counted_quantity("-5"), None);
        assert_eq!(parse_counted_quantity(" -1 "), None);
    }

    #[test]
    fn fractional_input_reads_as_uncounted() {
        assert_eq!(parse_counted_quantity("12.5"), None);
        assert_eq!(parse_counted_quantity("1,5"), None);
    }

    #[test]
    fn overflowing_input_reads_as_uncounted() {
        assert_eq!(parse_counted_quantity("99999999999999999999999999"), None);
    }
}
