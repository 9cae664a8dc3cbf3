//! Decoding of fetched rows.
//!
//! Each row arrives as a single JSON object produced by `to_json(row)` on the
//! server. Object keys are output column names in server order. Unlike a plain
//! JSON parse, duplicate keys are an error: two output columns with the same
//! name would otherwise silently shadow each other.

use std::fmt;

use gpframe_error::{DbError, Result, ResultExt};
use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};

/// A fetched row, an ordered mapping of column name to value.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: IndexMap<String, Value>,
}

impl Row {
    /// Decode a row from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: StrictValue =
            serde_json::from_str(text).context("Failed to decode row from JSON")?;

        match value.0 {
            Value::Object(map) => Ok(Row {
                fields: map.into_iter().collect(),
            }),
            other => Err(DbError::new("Failed to fetch the entire row of the relation")
                .with_field("value", other)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        write!(f, "{}", Value::Object(map))
    }
}

/// A JSON value that rejects objects with duplicate keys at any depth.
struct StrictValue(Value);

impl<'de> Deserialize<'de> for StrictValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(StrictValueVisitor).map(StrictValue)
    }
}

struct StrictValueVisitor;

impl<'de> Visitor<'de> for StrictValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "any valid JSON value")
    }

    fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
        Ok(Value::Number(v.into()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Number::from_f64(v)
            .map(Value::Number)
            .ok_or_else(|| E::custom(format!("invalid float: {v}")))
    }

    fn visit_str<E>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_unit<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut values = Vec::new();
        while let Some(StrictValue(v)) = seq.next_element()? {
            values.push(v);
        }
        Ok(Value::Array(values))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Map::new();
        while let Some((key, StrictValue(value))) = access.next_entry::<String, StrictValue>()? {
            if map.contains_key(&key) {
                return Err(de::Error::custom(format!(
                    "Duplicate column name found: {key}"
                )));
            }
            map.insert(key, value);
        }
        Ok(Value::Object(map))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_preserves_order() {
        let row = Row::from_json(r#"{"b": 1, "a": "x", "c": null}"#).unwrap();
        assert_eq!(vec!["b", "a", "c"], row.column_names().collect::<Vec<_>>());
        assert_eq!(Some(&json!(1)), row.get("b"));
        assert_eq!(Some(&json!("x")), row.get("a"));
        assert_eq!(Some(&Value::Null), row.get("c"));
        assert_eq!(3, row.len());
    }

    #[test]
    fn decode_nested() {
        let row = Row::from_json(r#"{"complex": {"r": 1, "i": 2.5}, "arr": [1, [2]]}"#).unwrap();
        assert_eq!(Some(&json!({"r": 1, "i": 2.5})), row.get("complex"));
        assert_eq!(Some(&json!([1, [2]])), row.get("arr"));
    }

    #[test]
    fn duplicate_keys_rejected() {
        let err = Row::from_json(r#"{"id": 1, "id": 2}"#).unwrap_err();
        assert!(err.to_string().contains("Duplicate column name found: id"), "{err}");

        let err = Row::from_json(r#"{"a": {"x": 1, "x": 1}}"#).unwrap_err();
        assert!(err.to_string().contains("Duplicate column name found: x"), "{err}");
    }

    #[test]
    fn non_object_rejected() {
        Row::from_json("[1, 2]").unwrap_err();
        Row::from_json("not json").unwrap_err();
    }

    #[test]
    fn display_as_json() {
        let row = Row::from_json(r#"{"id": 1, "name": "a"}"#).unwrap();
        assert_eq!(r#"{"id":1,"name":"a"}"#, row.to_string());
    }
}
