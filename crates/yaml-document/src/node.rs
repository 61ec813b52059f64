//! Node kinds of the document model.
//!
//! Nodes live in the arena owned by a [`Document`](crate::Document) and refer
//! to each other through [`NodeId`] handles. Ownership edges (map pairs,
//! sequence items, pair keys and values) form a tree; [`Alias::source`] is the
//! only non-owning edge and may point anywhere in the arena, including at an
//! ancestor of the alias itself.

use crate::notation::Notation;
use crate::range::Range;
use crate::scalar::{Scalar, ScalarValue};

/// Key of the merge pair (`<<: *base`).
pub const MERGE_KEY: &str = "<<";

/// Handle to a node in a document's arena.
///
/// Handles are only meaningful for the document that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A slot in a collection: either a node or a raw, unwrapped value.
///
/// Raw values are stored exactly as given; the collection accessors never
/// wrap them into scalar nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Node(NodeId),
    Value(ScalarValue),
}

impl Item {
    pub fn null() -> Self {
        Item::Value(ScalarValue::Null)
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            Item::Node(id) => Some(*id),
            Item::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&ScalarValue> {
        match self {
            Item::Value(value) => Some(value),
            Item::Node(_) => None,
        }
    }
}

impl From<NodeId> for Item {
    fn from(id: NodeId) -> Self {
        Item::Node(id)
    }
}

impl From<ScalarValue> for Item {
    fn from(value: ScalarValue) -> Self {
        Item::Value(value)
    }
}

macro_rules! item_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    Item::Value(ScalarValue::from(value))
                }
            }
        )*
    };
}

item_from_scalar!(bool, i64, i32, usize, f64, &str, String, Vec<u8>);

/// Attributes shared by every node kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Trailing comment, without the leading `#`
    pub comment: Option<String>,

    /// Leading comment lines, without the leading `#`, joined with `\n`
    pub comment_before: Option<String>,

    /// Source range; `None` for synthetic nodes
    pub range: Option<Range>,

    /// Fully-qualified tag (e.g. `tag:yaml.org,2002:omap` or `!local`)
    pub tag: Option<String>,

    /// Anchor name, if this node is (or may be) the target of aliases
    pub anchor: Option<String>,

    /// A blank line precedes this node and its leading comment
    pub space_before: bool,
}

/// A node in the arena: common attributes plus the variant payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub meta: NodeMeta,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(Scalar),
    Pair(Pair),
    Merge(Merge),
    Map(YamlMap),
    Seq(YamlSeq),
    Alias(Alias),
}

/// A key/value entry of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    /// Never absent; an explicit null key is `Item::Value(ScalarValue::Null)`
    pub key: Item,
    pub value: Option<Item>,
}

/// The `<<` pair of a map. Its value must be a sequence of aliases to maps.
#[derive(Debug, Clone, PartialEq)]
pub struct Merge {
    pub value: Option<Item>,
}

/// An ordered list of `Pair`/`Merge` nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlMap {
    pub items: Vec<NodeId>,
    /// Flow (`{}`) or block hint
    pub notation: Option<Notation>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct YamlSeq {
    pub items: Vec<Item>,
    /// Flow (`[]`) or block hint
    pub notation: Option<Notation>,
}

/// Non-owning reference to another node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub source: NodeId,
}

impl NodeKind {
    /// Short name of the variant, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            NodeKind::Scalar(_) => "scalar",
            NodeKind::Pair(_) => "pair",
            NodeKind::Merge(_) => "merge",
            NodeKind::Map(_) => "map",
            NodeKind::Seq(_) => "seq",
            NodeKind::Alias(_) => "alias",
        }
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            meta: NodeMeta::default(),
            kind,
        }
    }

    pub fn with_range(mut self, range: Range) -> Self {
        self.meta.range = Some(range);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tag = Some(tag.into());
        self
    }

    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.meta.anchor = Some(anchor.into());
        self
    }

    /// Whether this node is a map or a sequence.
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, NodeKind::Map(_) | NodeKind::Seq(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match &self.kind {
            NodeKind::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&YamlMap> {
        match &self.kind {
            NodeKind::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&YamlSeq> {
        match &self.kind {
            NodeKind::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<&Pair> {
        match &self.kind {
            NodeKind::Pair(pair) => Some(pair),
            _ => None,
        }
    }

    pub fn as_alias(&self) -> Option<&Alias> {
        match &self.kind {
            NodeKind::Alias(alias) => Some(alias),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_conversions() {
        assert_eq!(Item::from("a"), Item::Value(ScalarValue::Str("a".into())));
        assert_eq!(Item::from(3usize), Item::Value(ScalarValue::Int(3)));
        assert_eq!(Item::from(NodeId(4)).as_node(), Some(NodeId(4)));
        assert!(Item::null().as_value().is_some_and(ScalarValue::is_null));
    }

    #[test]
    fn test_node_accessors() {
        let node = Node::new(NodeKind::Seq(YamlSeq::default())).with_range(Range::new(0, 3));
        assert!(node.is_collection());
        assert!(node.as_seq().is_some());
        assert!(node.as_map().is_none());
        assert_eq!(node.meta.range, Some(Range::new(0, 3)));
        assert_eq!(node.kind.kind_name(), "seq");
    }

    #[test]
    fn test_synthetic_nodes_have_no_range() {
        let node = Node::new(NodeKind::Scalar(Scalar::new("x")));
        assert_eq!(node.meta.range, None);
        assert!(!node.is_collection());
    }
}
