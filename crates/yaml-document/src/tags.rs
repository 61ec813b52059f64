//! Tags and the core schema.
//!
//! Tags are stored fully qualified (`tag:yaml.org,2002:str`, `!local`).
//! A [`TagResolver`] maps them to a [`TagKind`], decides the implicit tag of
//! plain scalars, and constructs scalar values from source text.

use crate::error::{Error, Result};
use crate::scalar::{Scalar, ScalarFormat, ScalarType, ScalarValue};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Prefix shared by the standard tags; `!!x` is shorthand for `{prefix}x`.
pub const YAML_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// Expand a tag as written (`!!str`, `!<tag:...>`, `!local`) to its stored form.
pub fn normalize_tag(tag: &str) -> String {
    if let Some(suffix) = tag.strip_prefix("!!") {
        format!("{}{}", YAML_TAG_PREFIX, suffix)
    } else if let Some(verbatim) = tag.strip_prefix("!<").and_then(|t| t.strip_suffix('>')) {
        verbatim.to_string()
    } else {
        tag.to_string()
    }
}

/// Shortest written form of a stored tag.
pub fn short_tag(tag: &str) -> String {
    if let Some(suffix) = tag.strip_prefix(YAML_TAG_PREFIX) {
        format!("!!{}", suffix)
    } else if tag.starts_with('!') {
        tag.to_string()
    } else {
        format!("!<{}>", tag)
    }
}

/// What a tag means to the document model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Map,
    /// Ordered map with unique keys (`!!omap`)
    OrderedMap,
    /// Ordered pairs, keys may repeat (`!!pairs`)
    Pairs,
    /// Map whose values are all null (`!!set`)
    Set,
    Seq,
    Str,
    Int,
    Float,
    Bool,
    Null,
    Binary,
    /// Kept as text, always written with its tag
    Timestamp,
}

impl TagKind {
    /// The standard tag for this kind, fully qualified.
    pub fn tag(self) -> String {
        format!("{}{}", YAML_TAG_PREFIX, self.name())
    }

    pub fn name(self) -> &'static str {
        match self {
            TagKind::Map => "map",
            TagKind::OrderedMap => "omap",
            TagKind::Pairs => "pairs",
            TagKind::Set => "set",
            TagKind::Seq => "seq",
            TagKind::Str => "str",
            TagKind::Int => "int",
            TagKind::Float => "float",
            TagKind::Bool => "bool",
            TagKind::Null => "null",
            TagKind::Binary => "binary",
            TagKind::Timestamp => "timestamp",
        }
    }

    fn from_name(name: &str) -> Option<TagKind> {
        Some(match name {
            "map" => TagKind::Map,
            "omap" => TagKind::OrderedMap,
            "pairs" => TagKind::Pairs,
            "set" => TagKind::Set,
            "seq" => TagKind::Seq,
            "str" => TagKind::Str,
            "int" => TagKind::Int,
            "float" => TagKind::Float,
            "bool" => TagKind::Bool,
            "null" => TagKind::Null,
            "binary" => TagKind::Binary,
            "timestamp" => TagKind::Timestamp,
            _ => return None,
        })
    }

    /// Kinds represented by a map node.
    pub fn is_mapping(self) -> bool {
        matches!(
            self,
            TagKind::Map | TagKind::OrderedMap | TagKind::Pairs | TagKind::Set
        )
    }

    pub fn is_sequence(self) -> bool {
        self == TagKind::Seq
    }

    pub fn is_scalar(self) -> bool {
        !self.is_mapping() && !self.is_sequence()
    }
}

/// Resolves tags and constructs scalar values.
///
/// The resolver is passed explicitly to every operation that needs one;
/// [`CoreSchema`] is the usual choice.
pub trait TagResolver {
    /// Meaning of a stored (normalized) tag. Fails with [`Error::UnknownTag`].
    fn resolve(&self, tag: &str) -> Result<TagKind>;

    /// Tag a value receives when none is written.
    fn implicit_kind(&self, value: &ScalarValue) -> TagKind {
        match value {
            ScalarValue::Null => TagKind::Null,
            ScalarValue::Bool(_) => TagKind::Bool,
            ScalarValue::Int(_) => TagKind::Int,
            ScalarValue::Float(_) => TagKind::Float,
            ScalarValue::Str(_) => TagKind::Str,
            ScalarValue::Binary(_) => TagKind::Binary,
        }
    }

    /// Build a scalar from its source text.
    ///
    /// Without a tag, only plain scalars are resolved; quoted and block
    /// scalars are always strings.
    fn construct_scalar(&self, raw: &str, tag: Option<&str>, style: ScalarType) -> Result<Scalar>;
}

/// The YAML 1.2 core schema, plus the `!!binary`, `!!omap`, `!!pairs`,
/// `!!set` and `!!timestamp` types, plus any registered local tags.
///
/// Binary (`0b101`) and base 60 (`1:30:00`) integers are YAML 1.1 forms and
/// read as strings unless [`CoreSchema::with_yaml11_numbers`] is set.
#[derive(Debug, Clone, Default)]
pub struct CoreSchema {
    custom: HashMap<String, TagKind>,
    yaml11_numbers: bool,
}

impl CoreSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a local tag (e.g. `!color`) and treat it as `kind`.
    pub fn with_tag(mut self, tag: &str, kind: TagKind) -> Self {
        self.custom.insert(normalize_tag(tag), kind);
        self
    }

    /// Also resolve the YAML 1.1 binary and base 60 integer forms.
    pub fn with_yaml11_numbers(mut self) -> Self {
        self.yaml11_numbers = true;
        self
    }
}

static NULL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:~|null|Null|NULL)?$").expect("valid regex"));
static BOOL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:true|True|TRUE|false|False|FALSE)$").expect("valid regex")
});
static INT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("valid regex"));
static OCT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0o[0-7]+$").expect("valid regex"));
static HEX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]+$").expect("valid regex"));
static BIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0b[01]+$").expect("valid regex"));
static SEXAGESIMAL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?[0-9][0-9_]*(?::[0-5]?[0-9])+$").expect("valid regex"));
static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:\.[0-9]+|[0-9]+(?:\.[0-9]*)?)(?:[eE][-+]?[0-9]+)?$")
        .expect("valid regex")
});
static INF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?\.(?:inf|Inf|INF)$").expect("valid regex"));
static NAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.(?:nan|NaN|NAN)$").expect("valid regex"));

fn parse_int(raw: &str, yaml11: bool) -> Option<Scalar> {
    if OCT_RE.is_match(raw) {
        let value = i64::from_str_radix(&raw[2..], 8).ok()?;
        return Some(Scalar::new(value).with_format(ScalarFormat::Oct));
    }
    if HEX_RE.is_match(raw) {
        let value = i64::from_str_radix(&raw[2..], 16).ok()?;
        return Some(Scalar::new(value).with_format(ScalarFormat::Hex));
    }
    if yaml11 && BIN_RE.is_match(raw) {
        let value = i64::from_str_radix(&raw[2..], 2).ok()?;
        return Some(Scalar::new(value).with_format(ScalarFormat::Bin));
    }
    if INT_RE.is_match(raw) {
        return Some(match raw.parse::<i64>() {
            Ok(value) => Scalar::new(value),
            // out of range for i64
            Err(_) => Scalar::new(raw.parse::<f64>().ok()?),
        });
    }
    if yaml11 && SEXAGESIMAL_RE.is_match(raw) {
        let (negative, digits) = match raw.as_bytes()[0] {
            b'-' => (true, &raw[1..]),
            b'+' => (false, &raw[1..]),
            _ => (false, raw),
        };
        let mut value: i64 = 0;
        for part in digits.split(':') {
            let part: i64 = part.replace('_', "").parse().ok()?;
            value = value.checked_mul(60)?.checked_add(part)?;
        }
        let value = if negative { -value } else { value };
        return Some(Scalar::new(value).with_format(ScalarFormat::Time));
    }
    None
}

fn parse_float(raw: &str) -> Option<f64> {
    if NAN_RE.is_match(raw) {
        Some(f64::NAN)
    } else if INF_RE.is_match(raw) {
        Some(if raw.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        })
    } else if FLOAT_RE.is_match(raw) {
        raw.parse().ok()
    } else {
        None
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    BOOL_RE
        .is_match(raw)
        .then(|| raw.eq_ignore_ascii_case("true"))
}

fn invalid(raw: &str, kind: TagKind) -> Error {
    Error::parse(format!("\"{}\" is not a valid !!{}", raw, kind.name()), None)
}

/// Resolve a plain scalar without a tag.
fn resolve_plain(raw: &str, yaml11: bool) -> Scalar {
    if NULL_RE.is_match(raw) {
        return Scalar::new(ScalarValue::Null);
    }
    if let Some(b) = parse_bool(raw) {
        return Scalar::new(b);
    }
    if let Some(scalar) = parse_int(raw, yaml11) {
        return scalar;
    }
    if let Some(x) = parse_float(raw) {
        return Scalar::new(x);
    }
    Scalar::new(raw)
}

impl TagResolver for CoreSchema {
    fn resolve(&self, tag: &str) -> Result<TagKind> {
        let tag = normalize_tag(tag);
        if tag == "!" {
            // non-specific tag on a scalar
            return Ok(TagKind::Str);
        }
        let kind = match tag.strip_prefix(YAML_TAG_PREFIX) {
            Some(name) => TagKind::from_name(name),
            None => self.custom.get(&tag).copied(),
        };
        kind.ok_or(Error::UnknownTag { tag })
    }

    fn construct_scalar(&self, raw: &str, tag: Option<&str>, style: ScalarType) -> Result<Scalar> {
        let Some(tag) = tag else {
            let scalar = if style == ScalarType::Plain {
                resolve_plain(raw, self.yaml11_numbers)
            } else {
                Scalar::new(raw)
            };
            return Ok(scalar.with_type(style));
        };

        let kind = self.resolve(tag)?;
        let scalar = match kind {
            TagKind::Str | TagKind::Timestamp => Scalar::new(raw),
            TagKind::Null if NULL_RE.is_match(raw) => Scalar::new(ScalarValue::Null),
            TagKind::Bool => Scalar::new(parse_bool(raw).ok_or_else(|| invalid(raw, kind))?),
            TagKind::Int => parse_int(raw, self.yaml11_numbers)
                .filter(|s| matches!(s.value, ScalarValue::Int(_)))
                .ok_or_else(|| invalid(raw, kind))?,
            TagKind::Float => match parse_int(raw, self.yaml11_numbers) {
                Some(Scalar {
                    value: ScalarValue::Int(i),
                    ..
                }) => Scalar::new(i as f64),
                _ => Scalar::new(parse_float(raw).ok_or_else(|| invalid(raw, kind))?),
            },
            TagKind::Binary => {
                let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(compact)
                    .map_err(|e| Error::parse(format!("Invalid !!binary data: {}", e), None))?;
                Scalar::new(bytes)
            }
            TagKind::Null => return Err(invalid(raw, kind)),
            _ => {
                return Err(Error::TagMismatch {
                    tag: short_tag(&normalize_tag(tag)),
                    found: "scalar",
                });
            }
        };
        Ok(scalar.with_type(style))
    }
}
