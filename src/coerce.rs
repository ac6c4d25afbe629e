use serde_json::Value;

/// Parses a display value such as `"12,345"` into a number.
///
/// Thousands separators are stripped before parsing. Empty strings, text that
/// is not a number, `null` and non-scalar values all yield `None`.
pub fn coerce(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64().filter(|n| n.is_finite()),
        Value::String(text) => coerce_str(text),
        _ => None,
    }
}

pub fn coerce_str(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Accumulation contexts (sums, bucket totals) treat a missing value as zero.
pub fn or_zero(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// First run of digits in free text, e.g. the lower bound of `"450-470"`.
pub fn leading_integer(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(|c| *c != ',')
        .collect();

    digits.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_thousands_separators() {
        assert_eq!(coerce(&json!("12,345")), Some(12345.0));
        assert_eq!(coerce(&json!("1,234,567")), Some(1234567.0));
        assert_eq!(coerce(&json!(" 481 ")), Some(481.0));
    }

    #[test]
    fn empty_and_missing_are_absent() {
        assert_eq!(coerce(&json!("")), None);
        assert_eq!(coerce(&json!(",")), None);
        assert_eq!(coerce(&Value::Null), None);
        assert_eq!(coerce(&json!("n/a")), None);
        assert_eq!(coerce(&json!("NaN")), None);
        assert_eq!(coerce(&json!(true)), None);
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(coerce(&json!(500)), Some(500.0));
        assert_eq!(coerce(&json!(12.5)), Some(12.5));
    }

    #[test]
    fn absent_collapses_to_zero_only_when_accumulating() {
        assert_eq!(or_zero(coerce(&json!(""))), 0.0);
        assert_eq!(or_zero(coerce(&json!("3,000"))), 3000.0);
    }

    #[test]
    fn leading_integer_reads_range_lower_bound() {
        assert_eq!(leading_integer("450-470"), Some(450.0));
        assert_eq!(leading_integer("Score: 1,200 and up"), Some(1200.0));
        assert_eq!(leading_integer("no score"), None);
    }
}
