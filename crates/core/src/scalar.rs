//! Lenient text scalars for hand-edited documents.
//!
//! YAML authors write `username: 1001` or `allowed_tools: [crm, 365]`
//! without quoting; those values are still keys, so any string, integer or
//! float scalar is accepted and kept as text.

use core::fmt;

use serde::de::{self, Deserialize, Deserializer, Visitor};

/// A scalar read as text regardless of how it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarString(pub String);

impl ScalarString {
    pub fn into_inner(self) -> String {
        self.0
    }
}

struct ScalarVisitor;

impl Visitor<'_> for ScalarVisitor {
    type Value = ScalarString;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(ScalarString(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(ScalarString(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for ScalarString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ScalarVisitor)
    }
}

/// `deserialize_with` helper for an optional text field.
pub fn optional_scalar<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<ScalarString>::deserialize(d)?.map(ScalarString::into_inner))
}
