//! Funding-amount parsing ("$5M", "€2.5K", "1,000,000").

/// Parse a funding amount into a plain number.
///
/// Currency symbols (`$`, `€`, `£`) and thousands separators are dropped; a
/// trailing `m` multiplies by one million and a trailing `k` by one thousand.
/// Anything unparsable yields `0.0`.
pub fn parse_funding_amount(amount: &str) -> f64 {
    let cleaned: String = amount
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ','))
        .collect();
    let cleaned = cleaned.trim();

    let (digits, multiplier) = if let Some(rest) = cleaned.strip_suffix('m') {
        (rest, 1_000_000.0)
    } else if let Some(rest) = cleaned.strip_suffix('k') {
        (rest, 1_000.0)
    } else {
        (cleaned, 1.0)
    };

    match digits.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => value * multiplier,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millions_and_thousands() {
        assert_eq!(parse_funding_amount("$5M"), 5_000_000.0);
        assert_eq!(parse_funding_amount("€2.5K"), 2_500.0);
        assert_eq!(parse_funding_amount("£250k"), 250_000.0);
        assert_eq!(parse_funding_amount("$4.5M"), 4_500_000.0);
    }

    #[test]
    fn plain_numbers_and_separators() {
        assert_eq!(parse_funding_amount("1,000,000"), 1_000_000.0);
        assert_eq!(parse_funding_amount(" $750 "), 750.0);
    }

    #[test]
    fn unparsable_is_zero() {
        assert_eq!(parse_funding_amount(""), 0.0);
        assert_eq!(parse_funding_amount("undisclosed"), 0.0);
        assert_eq!(parse_funding_amount("$5B"), 0.0);
        assert_eq!(parse_funding_amount("nan"), 0.0);
        assert_eq!(parse_funding_amount("inf"), 0.0);
    }
}
