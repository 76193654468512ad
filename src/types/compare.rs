//! Value-class-aware comparison.
//!
//! Numbers compare by value whatever their width, temporal values compare
//! chronologically (a date is midnight of that day), and a string compared
//! with a typed value is first converted to that value's type.

use std::cmp::Ordering;

use regex::RegexBuilder;

use super::Value;

/// Orders two values, `None` when either is absent or they are incomparable.
pub fn compare_values(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Time(a), Value::Time(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (a, b) if a.is_numeric() && b.is_numeric() => compare_numbers(a, b),
        (a @ (Value::Date(_) | Value::Timestamp(_)), b @ (Value::Date(_) | Value::Timestamp(_))) => {
            a.to_timestamp()?.partial_cmp(&b.to_timestamp()?)
        }
        (Value::String(text), other) => {
            compare_converted(other, text).map(Ordering::reverse)
        }
        (other, Value::String(text)) => compare_converted(other, text),
        (Value::Geometry(a), Value::Geometry(b)) => (a == b).then_some(Ordering::Equal),
        (Value::BoundingBox(a), Value::BoundingBox(b)) => (a == b).then_some(Ordering::Equal),
        (Value::List(a), Value::List(b)) => compare_lists(a, b),
        _ => None,
    }
}

/// Equality under [`compare_values`]; absent values are never equal.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Some(Ordering::Equal)
}

fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    match (left.to_decimal(), right.to_decimal()) {
        (Some(a), Some(b)) => Some(a.cmp(&b)),
        _ => left.to_f64()?.partial_cmp(&right.to_f64()?),
    }
}

fn compare_converted(typed: &Value, text: &str) -> Option<Ordering> {
    let data_type = typed.data_type()?;
    match data_type.convert(&Value::from(text)) {
        Ok(Value::String(_)) | Ok(Value::Null) | Err(_) => {
            Some(typed.to_plain_string().as_str().cmp(text))
        }
        Ok(converted) => compare_values(typed, &converted),
    }
}

fn compare_lists(left: &[Value], right: &[Value]) -> Option<Ordering> {
    for (a, b) in left.iter().zip(right) {
        match compare_values(a, b)? {
            Ordering::Equal => continue,
            other => return Some(other),
        }
    }
    Some(left.len().cmp(&right.len()))
}

/// Matches `text` against a SQL LIKE pattern (`%` any run, `_` one char).
pub fn like_matches(text: &str, pattern: &str, case_insensitive: bool) -> bool {
    let mut expression = String::with_capacity(pattern.len() + 8);
    expression.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => expression.push_str(".*"),
            '_' => expression.push('.'),
            other => expression.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    expression.push('$');
    match RegexBuilder::new(&expression)
        .case_insensitive(case_insensitive)
        .dot_matches_new_line(true)
        .build()
    {
        Ok(regex) => regex.is_match(text),
        Err(err) => {
            log::warn!("Invalid LIKE pattern '{}': {}", pattern, err);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    #[test]
    fn test_numbers_compare_across_widths() {
        assert!(values_equal(&Value::Int(30), &Value::Long(30)));
        assert!(values_equal(&Value::Short(2), &Value::Decimal(Decimal::new(20, 1))));
        assert_eq!(compare_values(&Value::Double(1.5), &Value::Int(2)), Some(Ordering::Less));
    }

    #[test]
    fn test_nulls_are_incomparable() {
        assert_eq!(compare_values(&Value::Null, &Value::Int(1)), None);
        assert!(!values_equal(&Value::Null, &Value::Null));
    }

    #[test]
    fn test_temporal_ordering() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        let ts = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(23, 0, 0).unwrap();
        assert_eq!(compare_values(&Value::Date(date), &Value::Timestamp(ts)), Some(Ordering::Greater));
    }

    #[test]
    fn test_string_against_typed_value() {
        assert!(values_equal(&Value::Int(30), &Value::from("30")));
        assert_eq!(compare_values(&Value::from("5"), &Value::Int(10)), Some(Ordering::Less));
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert!(values_equal(&Value::from("2020-01-02"), &Value::Date(date)));
    }

    #[test]
    fn test_like_matches() {
        assert!(like_matches("Bobby", "Bob%", false));
        assert!(like_matches("Bob", "B_b", false));
        assert!(!like_matches("bob", "Bob%", false));
        assert!(like_matches("bob", "BOB", true));
        assert!(like_matches("a.b", "a.b", false));
        assert!(!like_matches("axb", "a.b", false));
    }
}
