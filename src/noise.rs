//! Noise derivation for recorded responses.
//!
//! A response is flattened into dotted paths (`header.<Name>`,
//! `body.<path>`) mapped to their string values; a path is noisy when its
//! values look like a timestamp, since those differ on every run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use indexmap::IndexMap;
use serde_json::Value;

use crate::models::TestCase;

/// Dotted path mapped to every value found under it.
pub type FlatMap = BTreeMap<String, Vec<String>>;

/// Flattens a JSON value.
///
/// Object keys are joined with `.`, array elements append to the same key,
/// scalars give a singleton list and `null` gives `[""]`. The root scalar
/// is keyed by the empty string.
#[must_use]
pub fn flatten(value: &Value) -> FlatMap {
    let mut out = FlatMap::new();
    flatten_into(String::new(), value, &mut out);
    out
}

fn flatten_into(prefix: String, value: &Value, out: &mut FlatMap) {
    let scalar = match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
                flatten_into(path, child, out);
            }
            return;
        }
        Value::Array(items) => {
            for item in items {
                flatten_into(prefix.clone(), item, out);
            }
            return;
        }
    };
    out.entry(prefix).or_default().push(scalar);
}

/// Flattens an HTTP response into `header.<Name>` and `body.<path>` keys.
///
/// Non-JSON bodies are kept whole under `body`.
#[must_use]
pub fn flatten_http_response(headers: &IndexMap<String, String>, body: &str) -> FlatMap {
    let mut out: FlatMap = headers
        .iter()
        .map(|(name, value)| (format!("header.{name}"), vec![value.clone()]))
        .collect();
    match serde_json::from_str::<Value>(body) {
        Ok(json) => {
            for (path, values) in flatten(&json) {
                let key = if path.is_empty() { "body".to_string() } else { format!("body.{path}") };
                out.insert(key, values);
            }
        }
        Err(_) => {
            out.insert("body".into(), vec![body.to_string()]);
        }
    }
    out
}

const ZONED_FORMATS: &[&str] = &[
    "%a %b %d %H:%M:%S %z %Y",
    "%d %b %y %H:%M %z",
    "%a, %d %b %Y %H:%M:%S %z",
    "%m/%d %I:%M:%S%p '%y %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%a %b %d %H:%M:%S %Y",
    "%d %b %y %H:%M",
    "%A, %d-%b-%y %H:%M:%S",
    "%a, %d %b %Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

/// Layouts without a year, checked against a fixed leap year.
const YEARLESS_FORMATS: &[&str] = &["%Y %b %d %H:%M:%S%.f"];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%I:%M%p"];

/// Drops whitespace-separated zone abbreviations such as `IST` or `GMT`.
fn strip_zone_names(value: &str) -> String {
    value
        .split_whitespace()
        .filter(|token| {
            !((2..=5).contains(&token.len()) && token.chars().all(|c| c.is_ascii_uppercase()))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// `true` when `value` parses as a date, time or timestamp in any of the
/// common layouts, with or without a zone name.
#[must_use]
pub fn is_time(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }
    if DateTime::parse_from_rfc3339(value).is_ok() || DateTime::parse_from_rfc2822(value).is_ok() {
        return true;
    }
    if ZONED_FORMATS.iter().any(|f| DateTime::parse_from_str(value, f).is_ok()) {
        return true;
    }
    let bare = strip_zone_names(value);
    NAIVE_DATETIME_FORMATS.iter().any(|f| NaiveDateTime::parse_from_str(&bare, f).is_ok())
        || YEARLESS_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(&format!("2000 {bare}"), f).is_ok())
        || DATE_FORMATS.iter().any(|f| NaiveDate::parse_from_str(&bare, f).is_ok())
        || TIME_FORMATS.iter().any(|f| NaiveTime::parse_from_str(&bare, f).is_ok())
}

/// Like [`is_time`], but also accepts a numeric nanosecond epoch within a
/// day of `now`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn is_time_at(value: &str, now: DateTime<Utc>) -> bool {
    if let Ok(nanos) = value.trim().parse::<f64>() {
        if nanos.is_finite() && nanos.abs() < i64::MAX as f64 {
            let stamp = DateTime::from_timestamp_nanos(nanos as i64);
            if (now - stamp).num_hours().abs() < 24 {
                return true;
            }
        }
    }
    is_time(value)
}

/// Returns the keys whose values look like timestamps, individually or
/// when joined with `", "`.
#[must_use]
pub fn find_noisy_fields(map: &FlatMap, now: DateTime<Utc>) -> BTreeSet<String> {
    map.iter()
        .filter(|(_, values)| {
            values.iter().any(|v| is_time_at(v, now)) || is_time_at(&values.join(", "), now)
        })
        .map(|(key, _)| key.clone())
        .collect()
}

/// Marks every timestamp-valued path of the recorded HTTP response as
/// noise (ignored entirely). Existing noise entries are kept.
///
/// Returns the keys that were added.
pub fn derive_noise(tc: &mut TestCase, now: DateTime<Utc>) -> BTreeSet<String> {
    let flat = flatten_http_response(&tc.http_resp.header, &tc.http_resp.body);
    let noisy = find_noisy_fields(&flat, now);
    let mut added = BTreeSet::new();
    for key in noisy {
        if !tc.noise.contains_key(&key) {
            tc.noise.insert(key.clone(), Vec::new());
            added.insert(key);
        }
    }
    tc.all_keys = flat;
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::http::{HttpReq, HttpResp};
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 1, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn flatten_joins_paths_and_appends_arrays() {
        let flat = flatten(&json!({
            "user": {"name": "ann", "tags": ["a", "b"]},
            "items": [{"id": 1}, {"id": 2}],
            "gone": null,
            "ok": true
        }));
        assert_eq!(flat["user.name"], vec!["ann"]);
        assert_eq!(flat["user.tags"], vec!["a", "b"]);
        assert_eq!(flat["items.id"], vec!["1", "2"]);
        assert_eq!(flat["gone"], vec![""]);
        assert_eq!(flat["ok"], vec!["true"]);
    }

    #[test]
    fn non_json_body_is_kept_whole() {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), "text/plain".to_string());
        let flat = flatten_http_response(&headers, "hello world");
        assert_eq!(flat["header.Content-Type"], vec!["text/plain"]);
        assert_eq!(flat["body"], vec!["hello world"]);
    }

    #[test]
    fn recognises_common_layouts() {
        for value in [
            "2023-01-17T16:34:58Z",
            "2023-01-17T16:34:58.123+05:30",
            "Tue, 17 Jan 2023 16:34:58 GMT",
            "Tue, 17 Jan 2023 16:34:58 IST",
            "Tue, 17 Jan 2023 16:34:58 +0530",
            "Tuesday, 17-Jan-23 16:34:58 UTC",
            "Tue Jan 17 16:34:58 2023",
            "Tue Jan 17 16:34:58 IST 2023",
            "2023-01-17 16:34:58",
            "2023-01-17",
            "16:34:58",
            "Jan 17 16:34:58",
            "4:34PM",
        ] {
            assert!(is_time(value), "{value}");
        }
    }

    #[test]
    fn rejects_ordinary_values() {
        for value in ["", "hello", "415e1a0b", "application/json", "42", "true"] {
            assert!(!is_time(value), "{value}");
        }
    }

    #[test]
    fn recent_nanosecond_epoch_is_time() {
        let nanos = now().timestamp_nanos_opt().unwrap() - 1_000_000_000;
        assert!(is_time_at(&nanos.to_string(), now()));
        assert!(!is_time_at("42", now()));
    }

    #[test]
    fn joined_values_are_checked() {
        let mut map = FlatMap::new();
        map.insert("header.Date".into(), vec!["Tue".into(), "17 Jan 2023 16:34:58".into()]);
        map.insert("header.Server".into(), vec!["nginx".into()]);
        let noisy = find_noisy_fields(&map, now());
        assert_eq!(noisy.into_iter().collect::<Vec<_>>(), vec!["header.Date".to_string()]);
    }

    #[test]
    fn derive_noise_keeps_existing_hints() {
        let mut resp = HttpResp::default();
        resp.header.insert("Date".into(), "Tue, 17 Jan 2023 16:34:58 GMT".into());
        resp.body = r#"{"id":"415e","createdAt":"2023-01-17T16:34:58Z"}"#.into();
        let mut tc = TestCase::from_http("test-1", HttpReq::default(), resp, 0);
        tc.noise.insert("body.createdAt".into(), vec!["^2023".into()]);

        let added = derive_noise(&mut tc, now());
        assert_eq!(added.into_iter().collect::<Vec<_>>(), vec!["header.Date".to_string()]);
        assert_eq!(tc.noise["body.createdAt"], vec!["^2023"]);
        assert!(tc.noise["header.Date"].is_empty());
        assert!(tc.all_keys.contains_key("body.id"));
    }

    #[test]
    fn derivation_is_idempotent() {
        let mut resp = HttpResp::default();
        resp.body = r#"{"at":"2023-01-17"}"#.into();
        let mut tc = TestCase::from_http("t", HttpReq::default(), resp, 0);
        derive_noise(&mut tc, now());
        let first = tc.noise.clone();
        assert!(derive_noise(&mut tc, now()).is_empty());
        assert_eq!(tc.noise, first);
    }

    proptest::proptest! {
        #[test]
        fn derive_noise_never_adds_twice(
            fields in proptest::collection::btree_map("[a-z]{1,6}", "[0-9a-zA-Z :-]{0,20}", 0..6)
        ) {
            let mut resp = HttpResp::default();
            resp.body = serde_json::to_string(&fields).unwrap();
            let mut tc = TestCase::from_http("t", HttpReq::default(), resp, 0);
            derive_noise(&mut tc, now());
            let first = tc.noise.clone();
            proptest::prop_assert!(derive_noise(&mut tc, now()).is_empty());
            proptest::prop_assert_eq!(&tc.noise, &first);
        }
    }
}
