//! Attribute values as the store represents them on the wire.
//!
//! Each value is a single-key JSON object such as `{"S": "hello"}` or
//! `{"N": "42"}`. Numbers stay string-encoded so that no precision is lost
//! between the caller and the store.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// A single attribute value.
///
/// Serializes externally tagged by the store's type descriptor, so exactly
/// one key is accepted per value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    /// Kept as text so no precision is lost.
    N(String),
    #[serde(with = "base64_bytes")]
    B(bytes::Bytes),
    #[serde(rename = "SS")]
    Ss(Vec<String>),
    #[serde(rename = "NS")]
    Ns(Vec<String>),
    #[serde(rename = "BS", with = "base64_bytes_set")]
    Bs(Vec<bytes::Bytes>),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    L(Vec<AttributeValue>),
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Build a number value from anything that renders as a number.
    #[must_use]
    pub fn number(n: impl fmt::Display) -> Self {
        Self::N(n.to_string())
    }

    /// The text of an `S` value.
    #[must_use]
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s),
            _ => None,
        }
    }

    /// The digits of an `N` value.
    #[must_use]
    pub fn as_n(&self) -> Option<&str> {
        match self {
            Self::N(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_m(&self) -> Option<&HashMap<String, AttributeValue>> {
        match self {
            Self::M(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The tag this value carries on the wire.
    #[must_use]
    pub fn type_descriptor(&self) -> &'static str {
        match self {
            Self::S(_) => "S",
            Self::N(_) => "N",
            Self::B(_) => "B",
            Self::Ss(_) => "SS",
            Self::Ns(_) => "NS",
            Self::Bs(_) => "BS",
            Self::Bool(_) => "BOOL",
            Self::Null(_) => "NULL",
            Self::L(_) => "L",
            Self::M(_) => "M",
        }
    }

    /// Convert a plain JSON document value into an attribute value.
    ///
    /// Objects become `M`, arrays become `L`, JSON `null` becomes `NULL`.
    /// Sets and binaries have no plain JSON form and are never produced here.
    #[must_use]
    pub fn from_json(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null(true),
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::N(n.to_string()),
            serde_json::Value::String(s) => Self::S(s),
            serde_json::Value::Array(values) => {
                Self::L(values.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(fields) => Self::M(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert this value into a plain JSON document value.
    ///
    /// Numbers that do not parse as JSON numbers are kept as strings, sets
    /// become arrays and binaries become base64 strings.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use base64::Engine;

        match self {
            Self::S(s) => serde_json::Value::String(s.clone()),
            Self::N(n) => serde_json::from_str::<serde_json::Number>(n)
                .map_or_else(|_| serde_json::Value::String(n.clone()), Into::into),
            Self::B(b) => {
                serde_json::Value::String(base64::engine::general_purpose::STANDARD.encode(b))
            }
            Self::Ss(v) => v.iter().cloned().map(serde_json::Value::String).collect(),
            Self::Ns(v) => v
                .iter()
                .map(|n| Self::N(n.clone()).to_json())
                .collect(),
            Self::Bs(v) => v
                .iter()
                .map(|b| Self::B(b.clone()).to_json())
                .collect(),
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Null(_) => serde_json::Value::Null,
            Self::L(list) => list.iter().map(Self::to_json).collect(),
            Self::M(m) => serde_json::Value::Object(
                m.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::S(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::S(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! number_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for AttributeValue {
                fn from(value: $ty) -> Self {
                    Self::N(value.to_string())
                }
            }
        )*
    };
}

number_from!(i32, i64, u32, u64, usize);

/// NaN and the infinities have no number representation in the store.
impl TryFrom<f64> for AttributeValue {
    type Error = StoreError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if value.is_finite() {
            Ok(Self::N(value.to_string()))
        } else {
            Err(StoreError::validation(format!("number {value} is not finite")))
        }
    }
}

impl From<serde_json::Value> for AttributeValue {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.type_descriptor();
        match self {
            Self::S(v) | Self::N(v) => write!(f, "{{{tag}: {v}}}"),
            Self::Bool(v) | Self::Null(v) => write!(f, "{{{tag}: {v}}}"),
            Self::Ss(v) | Self::Ns(v) => write!(f, "{{{tag}: {v:?}}}"),
            Self::B(b) => write!(f, "{{{tag}: {} bytes}}", b.len()),
            Self::Bs(v) => write!(f, "{{{tag}: {} items}}", v.len()),
            Self::L(v) => write!(f, "{{{tag}: {} items}}", v.len()),
            Self::M(m) => write!(f, "{{{tag}: {} keys}}", m.len()),
        }
    }
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S: Serializer>(value: &bytes::Bytes, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(value))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bytes::Bytes, D::Error> {
        let text = String::deserialize(d)?;
        STANDARD
            .decode(text)
            .map(bytes::Bytes::from)
            .map_err(de::Error::custom)
    }
}

mod base64_bytes_set {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::ser::SerializeSeq;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub(super) fn serialize<S: Serializer>(
        values: &[bytes::Bytes],
        s: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = s.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&STANDARD.encode(value))?;
        }
        seq.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Vec<bytes::Bytes>, D::Error> {
        Vec::<String>::deserialize(d)?
            .into_iter()
            .map(|text| STANDARD.decode(text).map(bytes::Bytes::from))
            .collect::<Result<_, _>>()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_serialize_number_from_integer() {
        let json = serde_json::to_string(&AttributeValue::from(30)).unwrap();
        assert_eq!(json, r#"{"N":"30"}"#);
    }

    #[test]
    fn test_should_reject_non_finite_float() {
        assert_eq!(
            AttributeValue::try_from(2.5).unwrap(),
            AttributeValue::N("2.5".to_owned())
        );
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = AttributeValue::try_from(value).unwrap_err();
            assert_eq!(err.code, crate::error::StoreErrorCode::ValidationException);
        }
    }

    #[test]
    fn test_should_serialize_nested_list() {
        let val = AttributeValue::L(vec![AttributeValue::from("a"), AttributeValue::from(1_i64)]);
        let json = serde_json::to_string(&val).unwrap();
        assert_eq!(json, r#"{"L":[{"S":"a"},{"N":"1"}]}"#);
    }

    #[test]
    fn test_should_decode_base64_binary() {
        let val: AttributeValue = serde_json::from_str(r#"{"B":"dGVzdA=="}"#).unwrap();
        assert_eq!(val, AttributeValue::B(bytes::Bytes::from_static(b"test")));
    }

    #[test]
    fn test_should_reject_value_with_two_type_keys() {
        let res = serde_json::from_str::<AttributeValue>(r#"{"S":"a","N":"1"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_should_reject_unknown_type_key() {
        let res = serde_json::from_str::<AttributeValue>(r#"{"X":"a"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_should_convert_json_document_to_map() {
        let doc = serde_json::json!({"name": "pen", "price": 30, "tags": ["a"], "gone": null});
        let val = AttributeValue::from_json(doc);
        let m = val.as_m().unwrap();
        assert_eq!(m["name"].as_s(), Some("pen"));
        assert_eq!(m["price"].as_n(), Some("30"));
        assert_eq!(m["tags"], AttributeValue::L(vec![AttributeValue::from("a")]));
        assert_eq!(m["gone"], AttributeValue::Null(true));
    }

    #[test]
    fn test_should_render_number_set_as_json_numbers() {
        let val = AttributeValue::Ns(vec!["1".to_owned(), "2.5".to_owned()]);
        assert_eq!(val.to_json(), serde_json::json!([1, 2.5]));
    }

    #[test]
    fn test_should_keep_unparseable_number_as_string() {
        let val = AttributeValue::N("not-a-number".to_owned());
        assert_eq!(val.to_json(), serde_json::json!("not-a-number"));
    }
}
