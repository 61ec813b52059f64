//! The document root and its node arena.

use crate::error::{Error, Result};
use crate::factory::NodeFactory;
use crate::materialize::Materializer;
use crate::merge;
use crate::node::{Alias, Item, Merge, Node, NodeId, NodeKind, Pair, YamlMap, YamlSeq};
use crate::notation::Notation;
use crate::options::{CreateNodeOptions, MaterializeOptions, ParseOptions, StringifyOptions};
use crate::scalar::{Scalar, ScalarValue};
use crate::stringify::Stringifier;
use crate::tags::{normalize_tag, CoreSchema, TagResolver};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// A YAML document: the node arena, the root item and document-level comments.
///
/// Every node of the document lives in the arena and is addressed by a
/// [`NodeId`]. Nodes are never removed from the arena; a node detached from
/// the tree (e.g. by [`Document::delete`]) stays valid, so aliases that still
/// point at it keep working.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    nodes: Vec<Node>,

    /// Root of the document; `None` for an empty document
    pub contents: Option<Item>,

    /// Comment after the contents, without the leading `#`
    pub comment: Option<String>,

    /// Comment before the contents, without the leading `#`
    pub comment_before: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a document from a host value with the core schema.
    ///
    /// Repeated collections become anchored nodes plus aliases.
    pub fn from_value(value: &Value, options: &CreateNodeOptions) -> Result<Document> {
        let mut doc = Document::new();
        let root = doc.create_node(value, options)?;
        doc.contents = Some(root);
        Ok(doc)
    }

    /// Add a node to the arena.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not created by this document.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Borrow a node, or `None` for a handle from another document.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the arena, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The root node, when the contents is a node.
    pub fn root(&self) -> Option<NodeId> {
        self.contents.as_ref().and_then(Item::as_node)
    }

    /// Short name of what an item holds, used in error messages.
    pub fn kind_of(&self, item: &Item) -> &'static str {
        match item {
            Item::Node(id) => self.node(*id).kind.kind_name(),
            Item::Value(value) => value.kind_name(),
        }
    }

    /// The scalar value behind an item: a raw value or a scalar node.
    pub(crate) fn scalar_value<'a>(&'a self, item: &'a Item) -> Option<&'a ScalarValue> {
        match item {
            Item::Value(value) => Some(value),
            Item::Node(id) => self.node(*id).as_scalar().map(|s| &s.value),
        }
    }

    /// Follow aliases until a non-alias node is reached.
    ///
    /// Returns `None` if the alias chain loops on itself.
    pub(crate) fn resolve_alias(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        for _ in 0..=self.nodes.len() {
            match &self.node(current).kind {
                NodeKind::Alias(alias) => current = alias.source,
                _ => return Some(current),
            }
        }
        None
    }

    // Constructors

    pub fn scalar(&mut self, value: impl Into<ScalarValue>) -> NodeId {
        self.add_node(Node::new(NodeKind::Scalar(Scalar::new(value))))
    }

    /// Add a scalar node carrying rendering hints.
    pub fn scalar_node(&mut self, scalar: Scalar) -> NodeId {
        self.add_node(Node::new(NodeKind::Scalar(scalar)))
    }

    /// Add a map holding one pair per entry.
    pub fn map<K, V>(&mut self, entries: impl IntoIterator<Item = (K, V)>) -> NodeId
    where
        K: Into<Item>,
        V: Into<Item>,
    {
        let items = entries
            .into_iter()
            .map(|(k, v)| self.pair(k, v))
            .collect();
        self.add_node(Node::new(NodeKind::Map(YamlMap {
            items,
            notation: None,
        })))
    }

    pub fn seq<V: Into<Item>>(&mut self, items: impl IntoIterator<Item = V>) -> NodeId {
        let items = items.into_iter().map(Into::into).collect();
        self.add_node(Node::new(NodeKind::Seq(YamlSeq {
            items,
            notation: None,
        })))
    }

    /// Add a detached pair, ready to be passed to [`Document::add`].
    pub fn pair(&mut self, key: impl Into<Item>, value: impl Into<Item>) -> NodeId {
        self.add_node(Node::new(NodeKind::Pair(Pair {
            key: key.into(),
            value: Some(value.into()),
        })))
    }

    pub fn alias(&mut self, source: NodeId) -> NodeId {
        self.add_node(Node::new(NodeKind::Alias(Alias { source })))
    }

    /// Add a merge pair that splices in the given maps, in priority order.
    pub fn merge(&mut self, sources: impl IntoIterator<Item = NodeId>) -> NodeId {
        let aliases: Vec<Item> = sources
            .into_iter()
            .map(|source| Item::Node(self.alias(source)))
            .collect();
        let seq = self.seq(aliases);
        self.add_node(Node::new(NodeKind::Merge(Merge {
            value: Some(Item::Node(seq)),
        })))
    }

    /// Convert a host value into nodes of this document, using the core schema.
    pub fn create_node(&mut self, value: &Value, options: &CreateNodeOptions) -> Result<Item> {
        self.create_node_with(value, &CoreSchema::new(), options)
    }

    pub fn create_node_with(
        &mut self,
        value: &Value,
        resolver: &dyn TagResolver,
        options: &CreateNodeOptions,
    ) -> Result<Item> {
        NodeFactory::new(self, resolver, options).create(value)
    }

    // Metadata

    pub fn set_comment(&mut self, id: NodeId, comment: impl Into<String>) {
        self.node_mut(id).meta.comment = Some(comment.into());
    }

    pub fn set_comment_before(&mut self, id: NodeId, comment: impl Into<String>) {
        self.node_mut(id).meta.comment_before = Some(comment.into());
    }

    pub fn set_space_before(&mut self, id: NodeId, space_before: bool) {
        self.node_mut(id).meta.space_before = space_before;
    }

    /// Set an explicit tag; `!!x` shorthand is expanded.
    pub fn set_tag(&mut self, id: NodeId, tag: &str) {
        self.node_mut(id).meta.tag = Some(normalize_tag(tag));
    }

    pub fn set_anchor(&mut self, id: NodeId, anchor: impl Into<String>) {
        self.node_mut(id).meta.anchor = Some(anchor.into());
    }

    /// Set the flow/block hint of a map or sequence. Other nodes are unchanged.
    pub fn set_notation(&mut self, id: NodeId, notation: Notation) {
        match &mut self.node_mut(id).kind {
            NodeKind::Map(map) => map.notation = Some(notation),
            NodeKind::Seq(seq) => seq.notation = Some(notation),
            _ => {}
        }
    }

    // Output

    /// Materialize the contents into a plain value (`Null` when empty).
    pub fn to_value(&self) -> Result<Value> {
        self.to_value_with(&MaterializeOptions::default())
    }

    pub fn to_value_with(&self, options: &MaterializeOptions) -> Result<Value> {
        match &self.contents {
            None => Ok(Value::Null),
            Some(item) => Materializer::new(self, options).materialize(item),
        }
    }

    /// Materialize and convert to JSON.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        self.to_value()?.to_json()
    }

    /// Render as YAML text with the core schema.
    pub fn to_yaml_string(&self, options: &StringifyOptions) -> Result<String> {
        self.to_yaml_string_with(&CoreSchema::new(), options)
    }

    pub fn to_yaml_string_with(
        &self,
        resolver: &dyn TagResolver,
        options: &StringifyOptions,
    ) -> Result<String> {
        Stringifier::new(self, resolver, options).stringify()
    }

    /// Check every merge pair reachable from the contents.
    pub fn validate_merges(&self) -> Result<()> {
        match self.root() {
            Some(root) => merge::validate_tree(self, root),
            None => Ok(()),
        }
    }

    pub(crate) fn not_a_collection(&self, key: &Item, path: &[Item]) -> Error {
        Error::NotACollection {
            key: self.key_text(key),
            path: path.iter().map(|k| self.key_text(k)).collect(),
        }
    }

    /// Text of a key for error messages.
    pub(crate) fn key_text(&self, key: &Item) -> String {
        match self.scalar_value(key) {
            Some(value) => value.to_key_string(),
            None => format!("<{}>", self.kind_of(key)),
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self
            .to_yaml_string(&StringifyOptions::default())
            .map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Document {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        crate::parse(text, &ParseOptions::default())
    }
}
