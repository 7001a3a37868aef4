//! Typed field extraction over untyped JSON values.
//!
//! Every normalizer reads its input through [`Fields`], which accepts a
//! field only when its runtime type matches and otherwise reports it as
//! absent. Lookups take a key list in priority order (primary name first,
//! then legacy/alternate names); the first key whose value type-checks wins.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A type that can be accepted from an untyped JSON field.
pub trait Coerce: Sized {
    /// Returns `Some` only when `value` has the matching runtime type.
    fn coerce(value: &Value) -> Option<Self>;
}

impl Coerce for String {
    /// Non-empty strings only; `""` counts as absent.
    fn coerce(value: &Value) -> Option<Self> {
        value
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

impl Coerce for f64 {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_f64().filter(|n| n.is_finite())
    }
}

impl Coerce for u64 {
    /// Non-negative finite numbers, fractional parts truncated.
    fn coerce(value: &Value) -> Option<Self> {
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map(|n| n.trunc() as u64)
    }
}

impl Coerce for u16 {
    fn coerce(value: &Value) -> Option<Self> {
        u64::coerce(value).and_then(|n| u16::try_from(n).ok())
    }
}

impl Coerce for bool {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl Coerce for DateTime<Utc> {
    /// RFC 3339 strings, normalized to UTC.
    fn coerce(value: &Value) -> Option<Self> {
        let raw = value.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

impl Coerce for Vec<String> {
    fn coerce(value: &Value) -> Option<Self> {
        normalize_string_array(value)
    }
}

impl Coerce for Map<String, Value> {
    fn coerce(value: &Value) -> Option<Self> {
        value.as_object().cloned()
    }
}

/// Filter an untyped array down to its non-empty string elements.
///
/// Non-string and empty-string elements are dropped. Returns `None` when
/// the input is not an array or nothing survives the filter.
///
/// ```
/// use choices_core::decode::normalize_string_array;
/// use serde_json::json;
///
/// assert_eq!(
///     normalize_string_array(&json!(["a", "", 5, "b", null])),
///     Some(vec!["a".to_string(), "b".to_string()])
/// );
/// assert_eq!(normalize_string_array(&json!([])), None);
/// ```
pub fn normalize_string_array(value: &Value) -> Option<Vec<String>> {
    let items: Vec<String> = value
        .as_array()?
        .iter()
        .filter_map(String::coerce)
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Read-only view over an untyped value.
///
/// A view over anything that is not a JSON object behaves as an empty
/// object, so every lookup falls through to its default. A view may carry a
/// fallback layer consulted field by field when the primary layer has no
/// acceptable value.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
    fallback: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    /// View `value` as a record of fields.
    pub fn of(value: &'a Value) -> Self {
        Self {
            map: value.as_object(),
            fallback: None,
        }
    }

    /// View an object map directly.
    pub fn from_map(map: &'a Map<String, Value>) -> Self {
        Self {
            map: Some(map),
            fallback: None,
        }
    }

    /// A view with no fields.
    pub fn empty() -> Self {
        Self {
            map: None,
            fallback: None,
        }
    }

    /// Consult `fallback`'s primary layer for any field this view lacks.
    pub fn with_fallback(self, fallback: Fields<'a>) -> Self {
        Self {
            map: self.map,
            fallback: fallback.map,
        }
    }

    /// Whether the view has at least one object-like layer.
    pub fn is_object(&self) -> bool {
        self.map.is_some() || self.fallback.is_some()
    }

    fn layers(&self) -> impl Iterator<Item = &'a Map<String, Value>> {
        self.map.into_iter().chain(self.fallback)
    }

    /// Resolve a field against each layer on its own, primary first.
    ///
    /// For fields that accept several shapes: every shape is tried on the
    /// primary layer before the fallback layer is consulted at all.
    pub fn resolve<T>(&self, mut lookup: impl FnMut(Fields<'a>) -> Option<T>) -> Option<T> {
        self.layers().find_map(|map| lookup(Fields::from_map(map)))
    }

    /// First key in `keys` whose value type-checks as `T`.
    pub fn get<T: Coerce>(&self, keys: &[&str]) -> Option<T> {
        self.layers().find_map(|map| {
            keys.iter()
                .filter_map(|key| map.get(*key))
                .find_map(T::coerce)
        })
    }

    /// Like [`Fields::get`], falling back to `default`.
    pub fn get_or<T: Coerce>(&self, keys: &[&str], default: T) -> T {
        self.get(keys).unwrap_or(default)
    }

    /// String field, `""` when absent.
    pub fn string(&self, keys: &[&str]) -> String {
        self.get(keys).unwrap_or_default()
    }

    /// Numeric field, `0.0` when absent or not finite.
    pub fn number(&self, keys: &[&str]) -> f64 {
        self.get(keys).unwrap_or(0.0)
    }

    /// Count field, `0` when absent, negative, or not finite.
    pub fn count(&self, keys: &[&str]) -> u64 {
        self.get(keys).unwrap_or(0)
    }

    /// Boolean field, `false` when absent.
    pub fn flag(&self, keys: &[&str]) -> bool {
        self.get(keys).unwrap_or(false)
    }

    /// String field parsed through `FromStr`; unparseable strings are absent.
    pub fn parsed<T: FromStr>(&self, keys: &[&str]) -> Option<T> {
        self.layers().find_map(|map| {
            keys.iter()
                .filter_map(|key| map.get(*key))
                .filter_map(String::coerce)
                .find_map(|s| s.parse().ok())
        })
    }

    /// Nested record under the first key holding an object.
    ///
    /// The nested view does not inherit this view's fallback layer.
    pub fn nested(&self, keys: &[&str]) -> Fields<'a> {
        self.layers()
            .find_map(|map| {
                keys.iter()
                    .filter_map(|key| map.get(*key))
                    .find_map(Value::as_object)
            })
            .map(Fields::from_map)
            .unwrap_or_else(Fields::empty)
    }

    /// Elements of the first key holding an array, empty otherwise.
    pub fn list(&self, keys: &[&str]) -> &'a [Value] {
        self.layers()
            .find_map(|map| {
                keys.iter()
                    .filter_map(|key| map.get(*key))
                    .find_map(Value::as_array)
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Raw value under the first present, non-null key.
    pub fn raw(&self, keys: &[&str]) -> Option<&'a Value> {
        self.layers().find_map(|map| {
            keys.iter()
                .filter_map(|key| map.get(*key))
                .find(|value| !value.is_null())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_rejects_empty_and_wrong_type() {
        let v = json!({"a": "", "b": 3, "c": "ok"});
        let f = Fields::of(&v);
        assert_eq!(f.get::<String>(&["a"]), None);
        assert_eq!(f.get::<String>(&["b"]), None);
        assert_eq!(f.string(&["c"]), "ok");
        assert_eq!(f.string(&["missing"]), "");
    }

    #[test]
    fn test_primary_key_wins_when_both_present() {
        let v = json!({"timeOnPage": 7, "time_on_page": 42});
        let f = Fields::of(&v);
        assert_eq!(f.number(&["timeOnPage", "time_on_page"]), 7.0);
    }

    #[test]
    fn test_legacy_key_used_when_primary_absent() {
        let v = json!({"time_on_page": 42});
        assert_eq!(Fields::of(&v).number(&["timeOnPage", "time_on_page"]), 42.0);
    }

    #[test]
    fn test_legacy_key_used_when_primary_mistyped() {
        let v = json!({"timeOnPage": "7", "time_on_page": 42});
        assert_eq!(Fields::of(&v).number(&["timeOnPage", "time_on_page"]), 42.0);
    }

    #[test]
    fn test_count_rejects_negative_and_truncates() {
        let v = json!({"neg": -4, "frac": 3.9, "big": 12});
        let f = Fields::of(&v);
        assert_eq!(f.count(&["neg"]), 0);
        assert_eq!(f.count(&["frac"]), 3);
        assert_eq!(f.count(&["big"]), 12);
    }

    #[test]
    fn test_non_object_reads_as_empty() {
        for v in [json!(null), json!(5), json!("str"), json!([1, 2]), json!(true)] {
            let f = Fields::of(&v);
            assert!(!f.is_object());
            assert_eq!(f.string(&["id"]), "");
            assert_eq!(f.number(&["n"]), 0.0);
            assert!(f.list(&["xs"]).is_empty());
        }
    }

    #[test]
    fn test_timestamp_coercion() {
        let v = json!({"ok": "2026-03-01T12:00:00+02:00", "bad": "yesterday"});
        let f = Fields::of(&v);
        let ts: DateTime<Utc> = f.get(&["ok"]).unwrap();
        assert_eq!(ts.to_rfc3339(), "2026-03-01T10:00:00+00:00");
        assert!(f.get::<DateTime<Utc>>(&["bad"]).is_none());
    }

    #[test]
    fn test_nested_and_list() {
        let v = json!({"meta": {"k": "v"}, "items": [1, 2, 3]});
        let f = Fields::of(&v);
        assert_eq!(f.nested(&["meta"]).string(&["k"]), "v");
        assert!(!f.nested(&["items"]).is_object());
        assert_eq!(f.list(&["items"]).len(), 3);
        assert!(f.list(&["meta"]).is_empty());
    }

    #[test]
    fn test_raw_skips_null() {
        let v = json!({"a": null, "b": 1});
        assert_eq!(Fields::of(&v).raw(&["a", "b"]), Some(&json!(1)));
    }

    #[test]
    fn test_fallback_layer_fills_absent_fields() {
        let blob = json!({"title": "From blob", "tags": []});
        let row = json!({"title": "From row", "description": "Row text", "tags": ["ui"]});
        let f = Fields::of(&blob).with_fallback(Fields::of(&row));
        assert_eq!(f.string(&["title"]), "From blob");
        assert_eq!(f.string(&["description"]), "Row text");
        // An empty array in the primary layer is not an acceptable string array.
        assert_eq!(f.get::<Vec<String>>(&["tags"]), Some(vec!["ui".to_string()]));
    }

    #[test]
    fn test_resolve_exhausts_primary_before_fallback() {
        let blob = json!({"category": "bug-report"});
        let row = json!({"category": ["ui"]});
        let f = Fields::of(&blob).with_fallback(Fields::of(&row));

        let shapes = |layer: Fields<'_>| {
            layer
                .get::<Vec<String>>(&["category"])
                .or_else(|| layer.get::<String>(&["category"]).map(|s| vec![s]))
        };
        assert_eq!(f.resolve(shapes), Some(vec!["bug-report".to_string()]));

        let only_row = Fields::empty().with_fallback(Fields::of(&row));
        assert_eq!(only_row.resolve(shapes), Some(vec!["ui".to_string()]));
        assert_eq!(Fields::empty().resolve(shapes), None);
    }

    #[test]
    fn test_string_array_filtering() {
        assert_eq!(
            normalize_string_array(&json!(["a", "", 5, "b", null])),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(normalize_string_array(&json!([])), None);
        assert_eq!(normalize_string_array(&json!(["", 1])), None);
        assert_eq!(normalize_string_array(&json!("a")), None);
    }
}
