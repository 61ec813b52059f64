//! Scalar values and their rendering hints.

use base64::Engine;
use std::fmt;

/// The primitive payload of a scalar node, or a raw (unwrapped) item.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Opaque bytes, written as base64 under `!!binary`.
    Binary(Vec<u8>),
}

/// Numeric rendering hint. Only affects integers and floats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarFormat {
    /// `0b1010`, read back only by the YAML 1.1 number forms
    Bin,
    /// `0x1f`
    Hex,
    /// `0o17`
    Oct,
    /// Base 60, e.g. `1:30:00`; YAML 1.1 like `Bin`
    Time,
}

/// Original quoting or block style. Only affects strings and binary data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    BlockFolded,
    BlockLiteral,
    Plain,
    QuoteDouble,
    QuoteSingle,
}

impl ScalarType {
    /// Whether this is one of the two block styles (`|` or `>`).
    pub fn is_block(self) -> bool {
        matches!(self, ScalarType::BlockFolded | ScalarType::BlockLiteral)
    }
}

/// A leaf node: a value plus advisory rendering hints.
///
/// `format` and `scalar_type` never change the value; they only guide the
/// stringifier, and an explicit tag decides which of the two is consulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Scalar {
    pub value: ScalarValue,
    pub format: Option<ScalarFormat>,
    pub scalar_type: Option<ScalarType>,
}

impl Scalar {
    pub fn new(value: impl Into<ScalarValue>) -> Self {
        Self {
            value: value.into(),
            format: None,
            scalar_type: None,
        }
    }

    pub fn with_format(mut self, format: ScalarFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_type(mut self, scalar_type: ScalarType) -> Self {
        self.scalar_type = Some(scalar_type);
        self
    }
}

impl ScalarValue {
    /// Scalar-equivalent matching used by collection lookups.
    ///
    /// Values of the same kind compare by value. Integers and floats compare
    /// numerically, so `1` and `1.0` are equivalent.
    pub fn equivalent(&self, other: &ScalarValue) -> bool {
        match (self, other) {
            (ScalarValue::Int(a), ScalarValue::Float(b))
            | (ScalarValue::Float(b), ScalarValue::Int(a)) => (*a as f64) == *b,
            _ => self == other,
        }
    }

    /// Short name of the value kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "bool",
            ScalarValue::Int(_) => "int",
            ScalarValue::Float(_) => "float",
            ScalarValue::Str(_) => "string",
            ScalarValue::Binary(_) => "binary",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScalarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ScalarValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Float(f) => Some(*f),
            ScalarValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text used when this value becomes a key of a materialized map.
    ///
    /// Matches `Display` except that null becomes the empty string.
    pub fn to_key_string(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "null"),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Int(i) => write!(f, "{}", i),
            ScalarValue::Float(x) => write!(f, "{}", x),
            ScalarValue::Str(s) => write!(f, "{}", s),
            ScalarValue::Binary(bytes) => write!(
                f,
                "{}",
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(b: bool) -> Self {
        ScalarValue::Bool(b)
    }
}

impl From<i64> for ScalarValue {
    fn from(i: i64) -> Self {
        ScalarValue::Int(i)
    }
}

impl From<i32> for ScalarValue {
    fn from(i: i32) -> Self {
        ScalarValue::Int(i64::from(i))
    }
}

impl From<usize> for ScalarValue {
    fn from(i: usize) -> Self {
        i64::try_from(i)
            .map(ScalarValue::Int)
            .unwrap_or(ScalarValue::Float(i as f64))
    }
}

impl From<f64> for ScalarValue {
    fn from(x: f64) -> Self {
        ScalarValue::Float(x)
    }
}

impl From<&str> for ScalarValue {
    fn from(s: &str) -> Self {
        ScalarValue::Str(s.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(s: String) -> Self {
        ScalarValue::Str(s)
    }
}

impl From<Vec<u8>> for ScalarValue {
    fn from(bytes: Vec<u8>) -> Self {
        ScalarValue::Binary(bytes)
    }
}

impl From<()> for ScalarValue {
    fn from(_: ()) -> Self {
        ScalarValue::Null
    }
}
