//! Best-effort conversion of loosely typed JSON values
//!
//! Model output is schema-unstable: amounts arrive as numbers or strings,
//! lists arrive as scalars, dates come in more than one format. Every helper
//! here returns "no value" (`None` or an empty list) for input it cannot use
//! and never fails.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Coerce a native number or numeric string into an `f64`
///
/// Non-finite results (`NaN`, `inf`) are rejected.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Coerce an amount bound for a filter
///
/// A bound of exactly zero is treated as "not provided". Negative bounds are
/// kept as given.
pub fn amount_bound(value: Option<&Value>) -> Option<f64> {
    let n = number(value?)?;
    (n != 0.0).then_some(n)
}

/// Coerce a calendar date, trying `YYYY-MM-DD` first and then RFC 3339
///
/// RFC 3339 timestamps are normalized to UTC before taking the date.
pub fn date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}

/// Coerce a point in time, trying RFC 3339 first and then `YYYY-MM-DD`
/// (midnight UTC)
pub fn timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Accept native strings only; numbers, arrays and objects yield `None`
pub fn string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

/// Like [`string`], but trims and drops blank strings
pub fn non_empty_string(value: &Value) -> Option<String> {
    let s = value.as_str()?.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Coerce a positive integral id from a number or integer string
pub fn id(value: &Value) -> Option<i64> {
    let id = match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => i,
            None => integral(n.as_f64()?)?,
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(i) => i,
                Err(_) => integral(s.parse::<f64>().ok()?)?,
            }
        }
        _ => return None,
    };
    (id > 0).then_some(id)
}

fn integral(n: f64) -> Option<i64> {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

/// Coerce an id list, dropping unusable entries individually
///
/// A single scalar is treated as a one-element list. Duplicates are removed,
/// first occurrence wins.
pub fn id_list(value: &Value) -> Vec<i64> {
    let mut ids: Vec<i64> = Vec::new();
    for n in as_items(value).iter().filter_map(id) {
        if !ids.contains(&n) {
            ids.push(n);
        }
    }
    ids
}

/// Coerce a list of strings, dropping non-strings and blanks
///
/// A single string is treated as a one-element list. Duplicates are removed,
/// first occurrence wins.
pub fn string_list(value: &Value) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for s in as_items(value).iter().filter_map(non_empty_string) {
        if !items.contains(&s) {
            items.push(s);
        }
    }
    items
}

fn as_items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Null => &[],
        other => std::slice::from_ref(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_number_accepts_numbers_and_numeric_strings() {
        assert_eq!(number(&json!(12.5)), Some(12.5));
        assert_eq!(number(&json!(3)), Some(3.0));
        assert_eq!(number(&json!("42")), Some(42.0));
        assert_eq!(number(&json!(" 7.25 ")), Some(7.25));
    }

    #[test]
    fn test_number_rejects_everything_else() {
        assert_eq!(number(&json!("twelve")), None);
        assert_eq!(number(&json!(true)), None);
        assert_eq!(number(&json!(null)), None);
        assert_eq!(number(&json!([1, 2])), None);
        assert_eq!(number(&json!({"amount": 1})), None);
        assert_eq!(number(&json!("NaN")), None);
        assert_eq!(number(&json!("inf")), None);
    }

    #[test]
    fn test_amount_bound_zero_means_absent() {
        assert_eq!(amount_bound(Some(&json!(0))), None);
        assert_eq!(amount_bound(Some(&json!("0"))), None);
        assert_eq!(amount_bound(Some(&json!(0.0))), None);
        assert_eq!(amount_bound(Some(&json!(-5))), Some(-5.0));
        assert_eq!(amount_bound(Some(&json!("-0"))), None);
        assert_eq!(amount_bound(None), None);
        assert_eq!(amount_bound(Some(&json!("150"))), Some(150.0));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(date(&json!("2024-03-01")), Some(expected));
        assert_eq!(date(&json!("2024-03-01T10:30:00Z")), Some(expected));
        // Normalized to UTC before taking the date
        assert_eq!(
            date(&json!("2024-02-29T22:00:00-05:00")),
            Some(expected)
        );
    }

    #[test]
    fn test_date_rejects_relative_and_garbage() {
        assert_eq!(date(&json!("last week")), None);
        assert_eq!(date(&json!("03/01/2024")), None);
        assert_eq!(date(&json!("2024-13-01")), None);
        assert_eq!(date(&json!(20240301)), None);
    }

    #[test]
    fn test_timestamp_prefers_rfc3339() {
        let ts = timestamp(&json!("2024-05-02T08:15:00+02:00")).unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-05-02T06:15:00+00:00");

        let midnight = timestamp(&json!("2024-05-02")).unwrap();
        assert_eq!(midnight.to_rfc3339(), "2024-05-02T00:00:00+00:00");

        assert!(timestamp(&json!("yesterday")).is_none());
    }

    #[test]
    fn test_string_only_accepts_native_strings() {
        assert_eq!(string(&json!("Food")), Some("Food".to_string()));
        assert_eq!(string(&json!(12)), None);
        assert_eq!(string(&json!(["Food"])), None);
        assert_eq!(non_empty_string(&json!("   ")), None);
        assert_eq!(non_empty_string(&json!(" cafe ")), Some("cafe".to_string()));
    }

    #[test]
    fn test_id_list_drops_bad_entries() {
        let ids = id_list(&json!([3, "4", 5.0, 5.5, "x", -1, 0, null, 3]));
        assert_eq!(ids, vec![3, 4, 5]);
    }

    #[test]
    fn test_id_list_accepts_scalar() {
        assert_eq!(id_list(&json!(9)), vec![9]);
        assert_eq!(id_list(&json!("12")), vec![12]);
        assert!(id_list(&json!(null)).is_empty());
        assert!(id_list(&json!({"id": 1})).is_empty());
    }

    #[test]
    fn test_string_list() {
        let items = string_list(&json!(["Food", "", 3, "Travel", "Food", "  "]));
        assert_eq!(items, vec!["Food".to_string(), "Travel".to_string()]);
        assert_eq!(string_list(&json!("Books")), vec!["Books".to_string()]);
        assert!(string_list(&json!(null)).is_empty());
    }
}
