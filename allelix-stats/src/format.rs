//! Number formatting for statistics attributes.

/// Format a frequency in scientific notation with at most two fraction
/// digits in the mantissa, e.g. `2.5E-1` for 0.25 and `0E0` for 0.
pub fn scientific(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        return "0E0".to_string();
    }
    let formatted = format!("{value:.2e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let mantissa = if mantissa.contains('.') {
        mantissa.trim_end_matches('0').trim_end_matches('.')
    } else {
        mantissa
    };
    format!("{mantissa}E{exponent}")
}

/// Format a decimal with at most one fraction digit, dropping a trailing
/// `.0`.
pub fn decimal(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let formatted = format!("{value:.1}");
    match formatted.strip_suffix(".0") {
        Some("-0") => "0".to_string(),
        Some(integral) => integral.to_string(),
        None => formatted,
    }
}

/// `count / total`, 0 if `total` is 0.
pub fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, "0E0")]
    #[case(1.0, "1E0")]
    #[case(0.5, "5E-1")]
    #[case(0.25, "2.5E-1")]
    #[case(1.0 / 3.0, "3.33E-1")]
    #[case(0.0125, "1.25E-2")]
    #[case(42.0, "4.2E1")]
    fn test_scientific(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(scientific(value), expected);
    }

    #[rstest]
    #[case(0.0, "0")]
    #[case(12.0, "12")]
    #[case(12.26, "12.3")]
    #[case(7.5, "7.5")]
    #[case(0.04, "0")]
    fn test_decimal(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(decimal(value), expected);
    }

    #[rstest]
    fn test_ratio_of_nothing() {
        assert_eq!(ratio(3, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }
}
