//! Field values and the per-resource coercion rules.
//!
//! Entities hold their data as [`Fields`], an ordered map of [`Value`]s. Raw
//! JSON from the service is decoded through a [`Schema`], which turns
//! timestamps into [`chrono::NaiveDateTime`] and status codes into
//! [`Code`]s, drops nulls (except sentinels) and optionally flattens a nested
//! map into the top level. Encoding reverses the special coercions.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use emma_transport::Params;
use serde_json::Value as Json;
use tracing::warn;

use crate::enumerations::{Code, CodeKind, MemberStatus};

/// Date format used by most resources.
pub const DATE_FORMAT: &str = "@D:%Y-%m-%dT%H:%M:%S";

/// Date format used by automation workflows.
pub const WORKFLOW_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// A single field value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Explicit null (kept only for sentinel fields).
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Decoded timestamp.
    Date(NaiveDateTime),
    /// Decoded enumeration code.
    Code(Code),
    /// List of values.
    List(Vec<Value>),
    /// Nested map.
    Map(Fields),
}

impl Value {
    /// Converts plain JSON without any special coercion.
    #[must_use]
    pub fn from_json(json: &Json) -> Self {
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(*b),
            Json::Number(n) => n
                .as_i64()
                .map_or_else(|| Self::Float(n.as_f64().unwrap_or_default()), Self::Int),
            Json::String(s) => Self::Text(s.clone()),
            Json::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Json::Object(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Wire form, rendering dates with `date_format`.
    #[must_use]
    pub fn to_json(&self, date_format: &str) -> Json {
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int(i) => Json::from(*i),
            Self::Float(f) => Json::from(*f),
            Self::Text(s) => Json::String(s.clone()),
            Self::Date(d) => Json::String(d.format(date_format).to_string()),
            Self::Code(c) => Json::String(c.as_code().to_string()),
            Self::List(items) => {
                Json::Array(items.iter().map(|v| v.to_json(date_format)).collect())
            }
            Self::Map(fields) => Json::Object(fields.to_json(date_format)),
        }
    }

    /// Whether this is [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Integer content; numeric text is accepted.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Text content.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean content.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp content.
    #[must_use]
    pub const fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Enumeration content.
    #[must_use]
    pub const fn as_code(&self) -> Option<Code> {
        match self {
            Self::Code(c) => Some(*c),
            _ => None,
        }
    }

    /// List content.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<Code> for Value {
    fn from(value: Code) -> Self {
        Self::Code(value)
    }
}

impl From<MemberStatus> for Value {
    fn from(value: MemberStatus) -> Self {
        Self::Code(value.into())
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<Fields> for Value {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

/// Ordered map of field name to value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Mutable value of `key`, if present.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Sets `key`, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder form of [`Fields::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Whether `key` is present, even as null.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Whether `key` is present and not null.
    #[must_use]
    pub fn is_set(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|v| !v.is_null())
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Field names in order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Integer value of `key`.
    #[must_use]
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Text value of `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Boolean value of `key`.
    #[must_use]
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Timestamp value of `key`.
    #[must_use]
    pub fn get_date(&self, key: &str) -> Option<NaiveDateTime> {
        self.get(key).and_then(Value::as_date)
    }

    /// Enumeration value of `key`.
    #[must_use]
    pub fn get_code(&self, key: &str) -> Option<Code> {
        self.get(key).and_then(Value::as_code)
    }

    /// Wire form of every field.
    #[must_use]
    pub fn to_json(&self, date_format: &str) -> Params {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json(date_format)))
            .collect()
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Fields {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Coercion rules for one resource type.
#[derive(Debug, Clone, Copy)]
pub struct Schema {
    /// Fields holding timestamps.
    pub date_fields: &'static [&'static str],
    /// `chrono` format of those timestamps.
    pub date_format: &'static str,
    /// Fields holding enumeration codes.
    pub coded_fields: &'static [(&'static str, CodeKind)],
    /// Fields whose explicit null is kept.
    pub sentinels: &'static [&'static str],
    /// Nested map merged into the top level on decode.
    pub flatten: Option<&'static str>,
}

impl Schema {
    /// Rules with no special fields.
    pub const PLAIN: Self = Self {
        date_fields: &[],
        date_format: DATE_FORMAT,
        coded_fields: &[],
        sentinels: &[],
        flatten: None,
    };

    /// Decodes a raw record.
    #[must_use]
    pub fn decode(&self, raw: &Params) -> Fields {
        let nested = self
            .flatten
            .and_then(|key| raw.get(key))
            .and_then(Json::as_object);
        let mut fields = Fields::new();
        for (key, json) in raw {
            if nested.is_some() && self.flatten == Some(key.as_str()) {
                continue;
            }
            self.decode_into(&mut fields, key, json);
        }
        // Nested values win over top-level keys of the same name.
        for (inner_key, inner) in nested.into_iter().flatten() {
            self.decode_into(&mut fields, inner_key, inner);
        }
        fields
    }

    fn decode_into(&self, fields: &mut Fields, key: &str, json: &Json) {
        if json.is_null() && !self.sentinels.contains(&key) {
            return;
        }
        fields.set(key, self.decode_value(key, json));
    }

    /// Decodes one raw value according to the rules for `key`.
    #[must_use]
    pub fn decode_value(&self, key: &str, json: &Json) -> Value {
        let Json::String(text) = json else {
            return Value::from_json(json);
        };
        if self.date_fields.contains(&key) {
            return NaiveDateTime::parse_from_str(text, self.date_format).map_or_else(
                |e| {
                    warn!("Could not decode {key} date {text:?}: {e}");
                    Value::Text(text.clone())
                },
                Value::Date,
            );
        }
        if let Some((_, kind)) = self.coded_fields.iter().find(|(name, _)| *name == key) {
            return kind
                .decode(text)
                .map_or_else(|| Value::Text(text.clone()), Value::Code);
        }
        Value::Text(text.clone())
    }

    /// Encodes fields to their wire form.
    #[must_use]
    pub fn encode(&self, fields: &Fields) -> Params {
        fields.to_json(self.date_format)
    }

    /// Encodes only `keys` that are present.
    #[must_use]
    pub fn encode_keys(&self, fields: &Fields, keys: &[&str]) -> Params {
        keys.iter()
            .filter_map(|key| {
                fields
                    .get(key)
                    .map(|v| ((*key).to_string(), v.to_json(self.date_format)))
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::enumerations::MemberStatus;
    use chrono::NaiveDate;
    use serde_json::json;

    const MEMBER_LIKE: Schema = Schema {
        date_fields: &["member_since", "deleted_at"],
        date_format: DATE_FORMAT,
        coded_fields: &[("member_status_id", CodeKind::MemberStatus)],
        sentinels: &["deleted_at"],
        flatten: Some("fields"),
    };

    fn raw(value: Json) -> Params {
        match value {
            Json::Object(map) => map,
            _ => Params::new(),
        }
    }

    mod decode_tests {
        use super::*;

        #[test]
        fn dates_and_codes_are_coerced() {
            let fields = MEMBER_LIKE.decode(&raw(json!({
                "member_id": 200,
                "member_since": "@D:2010-11-12T11:23:45",
                "member_status_id": "o",
            })));

            assert_eq!(fields.get_i64("member_id"), Some(200));
            assert_eq!(
                fields.get_date("member_since"),
                NaiveDate::from_ymd_opt(2010, 11, 12)
                    .unwrap()
                    .and_hms_opt(11, 23, 45)
            );
            assert_eq!(
                fields.get_code("member_status_id"),
                Some(Code::MemberStatus(MemberStatus::OptOut))
            );
        }

        #[test]
        fn nulls_are_dropped_except_sentinels() {
            let fields = MEMBER_LIKE.decode(&raw(json!({
                "email": null,
                "deleted_at": null,
            })));
            assert!(!fields.contains("email"));
            assert!(fields.contains("deleted_at"));
            assert!(!fields.is_set("deleted_at"));
        }

        #[test]
        fn nested_map_is_flattened() {
            let fields = MEMBER_LIKE.decode(&raw(json!({
                "email": "test@example.com",
                "fields": {"first_name": "Emma", "age": null},
            })));
            assert_eq!(fields.get_str("first_name"), Some("Emma"));
            assert!(!fields.contains("fields"));
            assert!(!fields.contains("age"));
        }

        #[test]
        fn nested_value_wins_over_top_level() {
            let fields = MEMBER_LIKE.decode(&raw(json!({
                "fields": {"member_id": "custom", "email": "nested@example.com"},
                "member_id": 1024,
                "email": "test@example.com",
            })));
            assert_eq!(fields.get_str("member_id"), Some("custom"));
            assert_eq!(fields.get_str("email"), Some("nested@example.com"));
        }

        #[test]
        fn bad_date_stays_text() {
            let fields = MEMBER_LIKE.decode(&raw(json!({"member_since": "yesterday"})));
            assert_eq!(fields.get_str("member_since"), Some("yesterday"));
        }

        #[test]
        fn unknown_code_stays_text() {
            let fields = MEMBER_LIKE.decode(&raw(json!({"member_status_id": "q"})));
            assert_eq!(fields.get_str("member_status_id"), Some("q"));
        }

        #[test]
        fn workflow_format() {
            let schema = Schema {
                date_fields: &["created_at"],
                date_format: WORKFLOW_DATE_FORMAT,
                ..Schema::PLAIN
            };
            let fields = schema.decode(&raw(json!({"created_at": "2016-03-01 12:04:33.123"})));
            assert!(fields.get_date("created_at").is_some());
        }
    }

    mod encode_tests {
        use super::*;

        #[test]
        fn special_values_go_back_to_wire_form() {
            let when = NaiveDate::from_ymd_opt(2011, 1, 2)
                .unwrap()
                .and_hms_opt(3, 4, 5)
                .unwrap();
            let fields = Fields::new()
                .with("member_since", when)
                .with("member_status_id", MemberStatus::Active)
                .with("tags", vec![Value::from("a"), Value::from(1_i64)]);

            let wire = MEMBER_LIKE.encode(&fields);
            assert_eq!(wire["member_since"], json!("@D:2011-01-02T03:04:05"));
            assert_eq!(wire["member_status_id"], json!("a"));
            assert_eq!(wire["tags"], json!(["a", 1]));
        }

        #[test]
        fn encode_keys_skips_absent() {
            let fields = Fields::new().with("group_name", "Test").with("extra", 1_i64);
            let wire = Schema::PLAIN.encode_keys(&fields, &["group_name", "missing"]);
            assert_eq!(Json::Object(wire), json!({"group_name": "Test"}));
        }
    }

    #[test]
    fn numeric_text_reads_as_integer() {
        assert_eq!(Value::from("204").as_i64(), Some(204));
        assert_eq!(Value::from("abc").as_i64(), None);
        assert_eq!(Value::from_json(&json!(1.5)), Value::Float(1.5));
    }
}
