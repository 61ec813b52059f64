//! Plain host values.
//!
//! `Value` is both the input of the node factory and the output of
//! materialization. Collections are shared through `Rc<RefCell<_>>`, so the
//! same collection can appear at several positions (and inside itself); that
//! shared identity is what anchors and aliases map onto.

use crate::error::{Error, Result};
use crate::scalar::ScalarValue;
use base64::Engine;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

pub type SeqRef = Rc<RefCell<Vec<Value>>>;
pub type MapRef = Rc<RefCell<IndexMap<String, Value>>>;
pub type PairsRef = Rc<RefCell<Vec<(Value, Value)>>>;

/// A plain value, with shared identity for collections.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Binary(Vec<u8>),
    Seq(SeqRef),
    /// Key-unique mapping, in insertion order
    Map(MapRef),
    /// Ordered key/value pairs (`!!omap`, `!!pairs`)
    Pairs(PairsRef),
    /// Set-like collection (`!!set`)
    Set(SeqRef),
}

/// The capability a value offers to the node factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Key/value iteration
    Mapping,
    /// Ordered iteration, not a mapping
    Sequence,
    /// Anything else
    Leaf,
}

impl Value {
    pub fn seq(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Seq(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(Rc::new(RefCell::new(
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        )))
    }

    pub fn pairs(entries: impl IntoIterator<Item = (Value, Value)>) -> Value {
        Value::Pairs(Rc::new(RefCell::new(entries.into_iter().collect())))
    }

    pub fn set(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Set(Rc::new(RefCell::new(items.into_iter().collect())))
    }

    /// Capability query used to decide which node kind a value becomes.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Map(_) | Value::Pairs(_) => Shape::Mapping,
            Value::Seq(_) | Value::Set(_) => Shape::Sequence,
            _ => Shape::Leaf,
        }
    }

    /// Identity of a collection value; `None` for leaves.
    ///
    /// Two values with the same identity are the same shared collection.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Seq(rc) | Value::Set(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Map(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            Value::Pairs(rc) => Some(Rc::as_ptr(rc) as *const () as usize),
            _ => None,
        }
    }

    /// Whether both values are the same shared collection.
    pub fn same_identity(&self, other: &Value) -> bool {
        match (self.identity(), other.identity()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Binary(_) => "binary",
            Value::Seq(_) => "seq",
            Value::Map(_) => "map",
            Value::Pairs(_) => "pairs",
            Value::Set(_) => "set",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&SeqRef> {
        match self {
            Value::Seq(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_pairs(&self) -> Option<&PairsRef> {
        match self {
            Value::Pairs(rc) => Some(rc),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&SeqRef> {
        match self {
            Value::Set(rc) => Some(rc),
            _ => None,
        }
    }

    /// Look up `key` in a map (or the first matching entry of a pair list).
    ///
    /// The returned value shares identity with the stored one.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Map(rc) => rc.borrow().get(key).cloned(),
            Value::Pairs(rc) => rc
                .borrow()
                .iter()
                .find(|(k, _)| k.key_string() == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Item `index` of a sequence or set.
    pub fn index(&self, index: usize) -> Option<Value> {
        match self {
            Value::Seq(rc) | Value::Set(rc) => rc.borrow().get(index).cloned(),
            _ => None,
        }
    }

    /// The scalar payload of a leaf value.
    pub fn as_scalar(&self) -> Option<ScalarValue> {
        match self {
            Value::Null => Some(ScalarValue::Null),
            Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            Value::Int(i) => Some(ScalarValue::Int(*i)),
            Value::Float(x) => Some(ScalarValue::Float(*x)),
            Value::Str(s) => Some(ScalarValue::Str(s.clone())),
            Value::Binary(bytes) => Some(ScalarValue::Binary(bytes.clone())),
            _ => None,
        }
    }

    /// Text used when this value is a key of a map.
    pub(crate) fn key_string(&self) -> String {
        match self.as_scalar() {
            Some(scalar) => scalar.to_key_string(),
            None => match self.to_json() {
                Ok(json) => json.to_string(),
                Err(err) => {
                    tracing::warn!(%err, "collection key has no text form, using an empty key");
                    String::new()
                }
            },
        }
    }

    /// Convert to JSON.
    ///
    /// JSON has no shared identity: repeated collections are copied, and a
    /// collection that contains itself fails with
    /// [`Error::CircularWithoutIdentity`]. Binary data becomes a base64
    /// string; non-finite floats become `null`.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut ancestors = Vec::new();
        let mut path = Vec::new();
        to_json_inner(self, &mut ancestors, &mut path)
    }

    /// Build a value from JSON. Objects become maps, arrays become sequences.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::seq(items.iter().map(Value::from_json)),
            serde_json::Value::Object(entries) => Value::map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from_json(v))),
            ),
        }
    }
}

fn to_json_inner(
    value: &Value,
    ancestors: &mut Vec<usize>,
    path: &mut Vec<String>,
) -> Result<serde_json::Value> {
    if let Some(id) = value.identity() {
        if ancestors.contains(&id) {
            return Err(Error::CircularWithoutIdentity { path: path.clone() });
        }
        ancestors.push(id);
    }

    let json = match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(x) => serde_json::Number::from_f64(*x)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Str(s) => serde_json::Value::String(s.clone()),
        Value::Binary(bytes) => serde_json::Value::String(
            base64::engine::general_purpose::STANDARD.encode(bytes),
        ),
        Value::Seq(rc) | Value::Set(rc) => {
            let mut items = Vec::new();
            for (i, item) in rc.borrow().iter().enumerate() {
                path.push(i.to_string());
                items.push(to_json_inner(item, ancestors, path)?);
                path.pop();
            }
            serde_json::Value::Array(items)
        }
        Value::Map(rc) => {
            let mut object = serde_json::Map::new();
            for (k, v) in rc.borrow().iter() {
                path.push(k.clone());
                object.insert(k.clone(), to_json_inner(v, ancestors, path)?);
                path.pop();
            }
            serde_json::Value::Object(object)
        }
        Value::Pairs(rc) => {
            let mut items = Vec::new();
            for (k, v) in rc.borrow().iter() {
                let key = k.key_string();
                path.push(key.clone());
                let mut object = serde_json::Map::new();
                object.insert(key, to_json_inner(v, ancestors, path)?);
                items.push(serde_json::Value::Object(object));
                path.pop();
            }
            serde_json::Value::Array(items)
        }
    };

    if value.identity().is_some() {
        ancestors.pop();
    }
    Ok(json)
}

impl PartialEq for Value {
    /// Structural equality. Map entry order is not significant; shared
    /// collections compare equal by identity without being walked. Cyclic
    /// values compare equal when they unfold to the same structure.
    fn eq(&self, other: &Value) -> bool {
        eq_guarded(self, other, &mut HashSet::new())
    }
}

/// Equality over collection pairs; a pair met a second time counts as
/// equal.
fn eq_guarded(a: &Value, b: &Value, seen: &mut HashSet<(usize, usize)>) -> bool {
    if std::mem::discriminant(a) != std::mem::discriminant(b) {
        return false;
    }
    if let (Some(x), Some(y)) = (a.identity(), b.identity()) {
        if x == y || !seen.insert((x, y)) {
            return true;
        }
    }
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Binary(a), Value::Binary(b)) => a == b,
        (Value::Seq(a), Value::Seq(b)) | (Value::Set(a), Value::Set(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| eq_guarded(x, y, seen))
        }
        (Value::Map(a), Value::Map(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter().all(|(key, x)| match b.get(key) {
                    Some(y) => eq_guarded(x, y, seen),
                    None => false,
                })
        }
        (Value::Pairs(a), Value::Pairs(b)) => {
            let (a, b) = (a.borrow(), b.borrow());
            a.len() == b.len()
                && a.iter().zip(b.iter()).all(|((ka, va), (kb, vb))| {
                    eq_guarded(ka, kb, seen) && eq_guarded(va, vb, seen)
                })
        }
        _ => false,
    }
}

/// Debug output that prints `<cycle>` instead of recursing forever.
struct Guarded<'a> {
    value: &'a Value,
    seen: &'a RefCell<Vec<usize>>,
}

impl fmt::Debug for Guarded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.value.identity();
        if let Some(id) = id {
            if self.seen.borrow().contains(&id) {
                return f.write_str("<cycle>");
            }
            self.seen.borrow_mut().push(id);
        }
        let guard = |value| Guarded {
            value,
            seen: self.seen,
        };
        let result = match self.value {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({:?})", b),
            Value::Int(i) => write!(f, "Int({:?})", i),
            Value::Float(x) => write!(f, "Float({:?})", x),
            Value::Str(s) => write!(f, "Str({:?})", s),
            Value::Binary(bytes) => write!(f, "Binary({:?})", bytes),
            Value::Seq(rc) => f.debug_list().entries(rc.borrow().iter().map(guard)).finish(),
            Value::Set(rc) => {
                f.write_str("Set")?;
                f.debug_set().entries(rc.borrow().iter().map(guard)).finish()
            }
            Value::Map(rc) => f
                .debug_map()
                .entries(rc.borrow().iter().map(|(k, v)| (k, guard(v))))
                .finish(),
            Value::Pairs(rc) => {
                f.write_str("Pairs")?;
                f.debug_list()
                    .entries(rc.borrow().iter().map(|(k, v)| (guard(k), guard(v))))
                    .finish()
            }
        };
        if id.is_some() {
            self.seen.borrow_mut().pop();
        }
        result
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let seen = RefCell::new(Vec::new());
        Guarded { value: self, seen: &seen }.fmt(f)
    }
}

impl From<ScalarValue> for Value {
    fn from(scalar: ScalarValue) -> Self {
        match scalar {
            ScalarValue::Null => Value::Null,
            ScalarValue::Bool(b) => Value::Bool(b),
            ScalarValue::Int(i) => Value::Int(i),
            ScalarValue::Float(x) => Value::Float(x),
            ScalarValue::Str(s) => Value::Str(s),
            ScalarValue::Binary(bytes) => Value::Binary(bytes),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::seq(items)
    }
}
