//! Replaces unresolved values with the sentinel literal.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SchetError};
use crate::models::fields::InvoiceFields;

/// Replace every `null` object entry with `sentinel`, recursing into nested
/// objects and into objects held by arrays. Anything else passes through,
/// including empty strings, zeros and `false`.
pub fn normalize(value: Value, sentinel: &str) -> Value {
    match value {
        Value::Object(map) => Value::Object(normalize_map(map, sentinel)),
        other => other,
    }
}

fn normalize_map(map: Map<String, Value>, sentinel: &str) -> Map<String, Value> {
    map.into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => Value::String(sentinel.to_string()),
                Value::Object(inner) => Value::Object(normalize_map(inner, sentinel)),
                Value::Array(items) => Value::Array(
                    items
                        .into_iter()
                        .map(|item| match item {
                            Value::Object(inner) => Value::Object(normalize_map(inner, sentinel)),
                            other => other,
                        })
                        .collect(),
                ),
                other => other,
            };
            (key, value)
        })
        .collect()
}

/// Final extraction result: the wire-shaped record with no nulls left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedFields(Map<String, Value>);

impl NormalizedFields {
    /// Serialize `fields` and normalize it against `sentinel`.
    pub fn from_fields(fields: &InvoiceFields, sentinel: &str) -> Result<Self> {
        Self::from_value(serde_json::to_value(fields)?, sentinel)
    }

    /// Normalize an already serialized record. Only objects are accepted.
    pub fn from_value(value: Value, sentinel: &str) -> Result<Self> {
        match normalize(value, sentinel) {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SchetError::Serialization(serde_json::Error::custom(format!(
                "expected a field object, got {}",
                other
            )))),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Look up a nested value, e.g. `["плательщик", "ИНН"]`.
    pub fn pointer(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter()
            .try_fold(self.0.get(*first)?, |value, key| value.get(*key))
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields::Party;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_replaces_nulls_recursively() {
        let input = json!({
            "a": null,
            "b": {"c": null, "d": "x"},
            "e": [{"f": null}, 3, null],
        });
        let expected = json!({
            "a": "U",
            "b": {"c": "U", "d": "x"},
            "e": [{"f": "U"}, 3, null],
        });
        assert_eq!(normalize(input, "U"), expected);
    }

    #[test]
    fn test_falsy_values_pass_through() {
        let input = json!({"s": "", "n": 0, "b": false, "l": []});
        assert_eq!(normalize(input.clone(), "U"), input);
    }

    #[test]
    fn test_non_object_root_unchanged() {
        assert_eq!(normalize(Value::Null, "U"), Value::Null);
        assert_eq!(normalize(json!("text"), "U"), json!("text"));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let input = json!({"a": null, "b": {"c": null}});
        let once = normalize(input, "U");
        assert_eq!(normalize(once.clone(), "U"), once);
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = NormalizedFields::from_value(json!(["x"]), "U").unwrap_err();
        assert!(matches!(err, SchetError::Serialization(_)));
        assert!(NormalizedFields::from_value(Value::Null, "U").is_err());

        let fields = NormalizedFields::from_value(json!({"a": null}), "U").unwrap();
        assert_eq!(fields.get("a"), Some(&json!("U")));
        assert_eq!(fields.as_map().len(), 1);
    }

    #[test]
    fn test_from_fields_has_no_nulls() {
        let fields = InvoiceFields {
            amount: Some("1500.00".to_string()),
            payer: Some(Party {
                inn: Some("1234567890".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let normalized = NormalizedFields::from_fields(&fields, "НЕ_РАСПОЗНАНО").unwrap();
        assert_eq!(normalized.get("сумма"), Some(&json!("1500.00")));
        assert_eq!(normalized.get("дата"), Some(&json!("НЕ_РАСПОЗНАНО")));
        assert_eq!(normalized.get("получатель"), Some(&json!("НЕ_РАСПОЗНАНО")));
        assert_eq!(
            normalized.pointer(&["плательщик", "наименование"]),
            Some(&json!("НЕ_РАСПОЗНАНО"))
        );
        assert_eq!(
            normalized.pointer(&["плательщик", "ИНН"]),
            Some(&json!("1234567890"))
        );
    }
}
