use std::fmt;

use crate::array::NdArray;
use crate::error::TypeError;
use crate::kind::VariableKind;

/// A 64-bit number.
///
/// Integers and floats stay distinct through every round-trip: the decimal
/// form of a float always carries a `.`, an exponent, or a non-finite
/// marker, so it never reparses as an integer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scalar {
    Int(i64),
    Float(f64),
}

impl Scalar {
    /// Parse the decimal form written by `Display`.
    pub fn parse(text: &str) -> Result<Self, TypeError> {
        let text = text.trim();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Self::Int(i));
        }
        text.parse::<f64>()
            .map(Self::Float)
            .map_err(|_| TypeError::InvalidScalar(text.to_string()))
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(i) => *i as f64,
            Self::Float(f) => *f,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            // Debug keeps the trailing `.0` and round-trips exactly.
            Self::Float(x) => write!(f, "{x:?}"),
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Scalar {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Everything a variable can hold.
///
/// `Mapping` keeps insertion order and is a plain list of pairs; keys are
/// expected to be unique, which the encoder enforces. `Null` only appears
/// nested inside a composite; it cannot be stored on its own.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Scalar(Scalar),
    Text(String),
    Array(NdArray),
    Sequence(Vec<Value>),
    Mapping(Vec<(String, Value)>),
}

impl Value {
    /// Build a mapping from `(key, value)` pairs, keeping their order.
    pub fn mapping<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The on-disk kind this value is stored as, or `None` for `Null`.
    pub fn kind(&self) -> Option<VariableKind> {
        match self {
            Self::Null => None,
            Self::Scalar(_) => Some(VariableKind::Scalar),
            Self::Text(_) => Some(VariableKind::Text),
            Self::Array(_) => Some(VariableKind::Array),
            Self::Sequence(_) => Some(VariableKind::Sequence),
            Self::Mapping(_) => Some(VariableKind::Mapping),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Mapping(_))
    }

    /// Look up a key of a mapping.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Self::Mapping(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Number of array leaves anywhere in the tree.
    pub fn array_count(&self) -> usize {
        match self {
            Self::Array(_) => 1,
            Self::Sequence(items) => items.iter().map(Value::array_count).sum(),
            Self::Mapping(entries) => entries.iter().map(|(_, v)| v.array_count()).sum(),
            _ => 0,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Scalar(Scalar::Int(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(Scalar::Float(v))
    }
}

impl From<Scalar> for Value {
    fn from(v: Scalar) -> Self {
        Self::Scalar(v)
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

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::Sequence(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_text_roundtrip_keeps_kind() {
        for s in [
            Scalar::Int(0),
            Scalar::Int(-42),
            Scalar::Int(i64::MAX),
            Scalar::Float(1.0),
            Scalar::Float(-0.5),
            Scalar::Float(1e300),
            Scalar::Float(f64::INFINITY),
        ] {
            assert_eq!(Scalar::parse(&s.to_string()).unwrap(), s);
        }
    }

    #[test]
    fn float_display_is_never_integral() {
        assert_eq!(Scalar::Float(3.0).to_string(), "3.0");
        assert_eq!(Scalar::Int(3).to_string(), "3");
    }

    #[test]
    fn nan_parses_back_as_float() {
        let parsed = Scalar::parse(&Scalar::Float(f64::NAN).to_string()).unwrap();
        assert!(matches!(parsed, Scalar::Float(x) if x.is_nan()));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(Scalar::parse("twelve"), Err(TypeError::InvalidScalar(_))));
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        assert_eq!(Scalar::parse(" 7\n").unwrap(), Scalar::Int(7));
    }

    #[test]
    fn kinds() {
        assert_eq!(Value::from(1i64).kind(), Some(VariableKind::Scalar));
        assert_eq!(Value::from("x").kind(), Some(VariableKind::Text));
        assert_eq!(Value::Sequence(vec![]).kind(), Some(VariableKind::Sequence));
        assert_eq!(Value::mapping::<&str, _>([]).kind(), Some(VariableKind::Mapping));
        assert_eq!(Value::from(NdArray::scalar(1u8)).kind(), Some(VariableKind::Array));
        assert_eq!(Value::Null.kind(), None);
    }

    #[test]
    fn mapping_get_and_array_count() {
        let v = Value::mapping([
            ("a", Value::from(NdArray::vector(&[1.0f64]))),
            (
                "b",
                Value::Sequence(vec![
                    Value::from(NdArray::vector(&[2i32])),
                    Value::mapping([("c", Value::from(NdArray::scalar(3u8)))]),
                ]),
            ),
            ("d", Value::from("text")),
        ]);
        assert_eq!(v.array_count(), 3);
        assert_eq!(v.get("d").and_then(Value::as_str), Some("text"));
        assert!(v.get("missing").is_none());
    }
}
