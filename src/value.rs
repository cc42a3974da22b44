//! Dynamic argument values.
//!
//! Generic procedures dispatch over a closed set of value kinds rather than
//! over an unconstrained type. Predicates are tests over [`Value`], and the
//! canonical serialization of an argument list is what the cached store hashes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dynamically-typed argument or result.
///
/// # Examples
///
/// ```
/// use generic_dispatch::Value;
///
/// assert!(Value::from(5).is_number());
/// assert!(Value::from("a").is_text());
/// assert_eq!(Value::from(vec![Value::from(1), Value::from(2)]).to_string(), "[1, 2]");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Number(#[serde(with = "number_repr")] f64),
    Text(String),
    Sequence(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool(_))
    }

    pub const fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// A number with no fractional part.
    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_finite() && n.fract() == 0.0)
    }

    /// A finite number with a fractional part.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Number(n) if n.is_finite() && n.fract() != 0.0)
    }

    pub const fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }

    pub const fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }

    /// Text, number, boolean or record. Sequences and null are not atoms.
    pub const fn is_atom(&self) -> bool {
        matches!(
            self,
            Self::Text(_) | Self::Number(_) | Self::Bool(_) | Self::Record(_)
        )
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(v) => Some(v),
            _ => None,
        }
    }

    pub const fn as_record(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Record(v) => Some(v),
            _ => None,
        }
    }

    /// Lowercase kind label for diagnostics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Sequence(_) => "sequence",
            Self::Record(_) => "record",
        }
    }

    /// Plain (untagged) JSON view, used for human-readable rendering.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n)
                .map_or_else(|| serde_json::Value::String(number_repr::label(*n)), serde_json::Value::Number),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Sequence(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Record(fields) => serde_json::Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Record(_) => write!(f, "{}", self.to_json()),
        }
    }
}

/// Render an argument list as `[a, b, c]`.
pub fn display_args(args: &[Value]) -> String {
    Value::Sequence(args.to_vec()).to_string()
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for Value {
    #[allow(clippy::cast_precision_loss)]
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Sequence(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Self::Record(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Self::Text(s),
            serde_json::Value::Array(items) => {
                Self::Sequence(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(fields) => Self::Record(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Canonical form
// ---------------------------------------------------------------------------

/// Content hash of an argument list.
///
/// Structurally equal argument lists hash identically regardless of where
/// they were allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgsKey([u8; 32]);

impl ArgsKey {
    /// Raw hash bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ArgsKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Canonical textual form of an argument list: tagged JSON with ordered
/// record keys.
pub fn canonical_form(args: &[Value]) -> String {
    // Serializing plain enums, strings and BTreeMaps cannot fail; a failure
    // would only collapse distinct keys into one, never produce a wrong hit
    // for equal ones, so fall back to the debug form.
    serde_json::to_string(args).unwrap_or_else(|_| format!("{args:?}"))
}

/// Hash the canonical form of `args` with blake3.
pub fn canonical_key(args: &[Value]) -> ArgsKey {
    ArgsKey(*blake3::hash(canonical_form(args).as_bytes()).as_bytes())
}

/// Numbers serialize as JSON numbers when finite and as the strings `"NaN"`,
/// `"inf"` or `"-inf"` otherwise, so non-finite values stay distinct.
mod number_repr {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Finite(f64),
        Special(String),
    }

    pub(super) fn label(n: f64) -> String {
        if n.is_nan() {
            "NaN".into()
        } else if n.is_sign_positive() {
            "inf".into()
        } else {
            "-inf".into()
        }
    }

    pub(super) fn serialize<S: Serializer>(n: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if n.is_finite() {
            Repr::Finite(*n).serialize(serializer)
        } else {
            Repr::Special(label(*n)).serialize(serializer)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Finite(n) => Ok(n),
            Repr::Special(s) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                _ => Ok(f64::NAN),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Value {
        Value::Record(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
        )
    }

    #[test]
    fn kind_queries() {
        assert!(Value::from(3).is_integer());
        assert!(!Value::from(3).is_float());
        assert!(Value::from(3.5).is_float());
        assert!(Value::Null.is_null());
        assert!(Value::from("x").is_atom());
        assert!(record(&[]).is_atom());
        assert!(!Value::Sequence(vec![]).is_atom());
        assert!(!Value::Null.is_atom());
    }

    #[test]
    fn display_matches_readable_form() {
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from("a").to_string(), "a");
        assert_eq!(
            Value::from(vec![Value::from(1), Value::from(vec![Value::from(2)])]).to_string(),
            "[1, [2]]"
        );
        assert_eq!(record(&[("b", Value::from(1)), ("a", Value::Null)]).to_string(), r#"{"a":null,"b":1.0}"#);
    }

    #[test]
    fn structurally_equal_args_share_a_key() {
        let a = vec![Value::from(vec![Value::from(1), Value::from("x")])];
        let b = vec![Value::from(vec![Value::from(1), Value::from("x")])];
        assert_eq!(canonical_key(&a), canonical_key(&b));
    }

    #[test]
    fn distinct_kinds_get_distinct_keys() {
        let keys = [
            canonical_key(&[Value::from(1)]),
            canonical_key(&[Value::from("1")]),
            canonical_key(&[Value::Null]),
            canonical_key(&[Value::from(f64::NAN)]),
            canonical_key(&[Value::from(f64::INFINITY)]),
            canonical_key(&[Value::from(1), Value::from(1)]),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn record_key_order_does_not_matter() {
        let mut left = BTreeMap::new();
        left.insert("x".to_string(), Value::from(1));
        left.insert("y".to_string(), Value::from(2));
        let mut right = BTreeMap::new();
        right.insert("y".to_string(), Value::from(2));
        right.insert("x".to_string(), Value::from(1));
        assert_eq!(
            canonical_key(&[Value::Record(left)]),
            canonical_key(&[Value::Record(right)])
        );
    }

    #[test]
    fn canonical_form_is_tagged() {
        let form = canonical_form(&[Value::from(1)]);
        assert_eq!(form, r#"[{"type":"number","value":1.0}]"#);
    }

    #[test]
    fn converts_from_json() {
        let v: Value = serde_json::json!({"a": [1, "b", null]}).into();
        assert_eq!(v.to_string(), r#"{"a":[1.0,"b",null]}"#);
    }
}
