//! Building nodes from host values.

use crate::anchors::AnchorNames;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Alias, Item, Node, NodeId, NodeKind, Pair, YamlMap, YamlSeq};
use crate::options::CreateNodeOptions;
use crate::scalar::{Scalar, ScalarValue};
use crate::tags::{normalize_tag, short_tag, TagKind, TagResolver};
use crate::value::{Shape, Value};
use std::collections::{HashMap, HashSet};

/// Converts a host value graph into nodes of one document.
///
/// Each collection is registered under its identity before its children are
/// converted. Meeting the same identity again, whether as a repeat or as a
/// cycle back to an ancestor, yields an alias to the registered node, and
/// the aliased node is given an anchor at that moment.
pub(crate) struct NodeFactory<'a> {
    doc: &'a mut Document,
    resolver: &'a dyn TagResolver,
    options: &'a CreateNodeOptions,
    seen: HashMap<usize, NodeId>,
    names: AnchorNames,
}

impl<'a> NodeFactory<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        resolver: &'a dyn TagResolver,
        options: &'a CreateNodeOptions,
    ) -> Self {
        let names = AnchorNames::from_document(doc, &options.anchor_prefix);
        Self {
            doc,
            resolver,
            options,
            seen: HashMap::new(),
            names,
        }
    }

    pub(crate) fn create(mut self, value: &Value) -> Result<Item> {
        let tag = self.options.tag.as_deref().map(normalize_tag);
        self.build(value, tag.as_deref())
    }

    fn build(&mut self, value: &Value, tag: Option<&str>) -> Result<Item> {
        if let Some(identity) = value.identity() {
            if let Some(&existing) = self.seen.get(&identity) {
                return Ok(Item::Node(self.alias_to(existing)));
            }
        }
        let kind = tag.map(|t| self.resolver.resolve(t)).transpose()?;
        match value.as_scalar() {
            Some(scalar) => self.leaf(scalar, value, tag, kind),
            None => self.collection(value, tag, kind),
        }
    }

    fn alias_to(&mut self, source: NodeId) -> NodeId {
        if self.doc.node(source).meta.anchor.is_none() {
            let name = self.names.next_name();
            tracing::debug!(anchor = %name, node = source.index(), "anchoring repeated value");
            self.doc.node_mut(source).meta.anchor = Some(name);
        }
        self.doc.add_node(Node::new(NodeKind::Alias(Alias { source })))
    }

    fn leaf(
        &mut self,
        scalar: ScalarValue,
        value: &Value,
        tag: Option<&str>,
        kind: Option<TagKind>,
    ) -> Result<Item> {
        if let (Some(tag), Some(kind)) = (tag, kind) {
            if !kind.is_scalar() {
                return Err(Error::TagMismatch {
                    tag: short_tag(tag),
                    found: value.kind_name(),
                });
            }
        }
        if !self.options.wrap_scalars {
            return Ok(Item::Value(scalar));
        }
        let mut node = Node::new(NodeKind::Scalar(Scalar::new(scalar)));
        node.meta.tag = tag.map(str::to_string);
        Ok(Item::Node(self.doc.add_node(node)))
    }

    fn wrap(&mut self, scalar: ScalarValue) -> Item {
        if self.options.wrap_scalars {
            Item::Node(self.doc.scalar(scalar))
        } else {
            Item::Value(scalar)
        }
    }

    fn collection(
        &mut self,
        value: &Value,
        tag: Option<&str>,
        kind: Option<TagKind>,
    ) -> Result<Item> {
        let shape = value.shape();
        let kind = kind.unwrap_or(match value {
            Value::Pairs(_) => TagKind::Pairs,
            Value::Set(_) => TagKind::Set,
            _ if shape == Shape::Mapping => TagKind::Map,
            _ => TagKind::Seq,
        });
        let compatible = match kind {
            TagKind::Map | TagKind::OrderedMap | TagKind::Pairs => shape == Shape::Mapping,
            TagKind::Seq => shape == Shape::Sequence,
            TagKind::Set => true,
            _ => false,
        };
        if !compatible {
            return Err(Error::TagMismatch {
                tag: short_tag(&tag.map_or_else(|| kind.tag(), str::to_string)),
                found: value.kind_name(),
            });
        }

        let stored_tag = match tag {
            Some(tag) if tag != TagKind::Map.tag() && tag != TagKind::Seq.tag() => {
                Some(tag.to_string())
            }
            Some(_) => None,
            None if kind.is_mapping() && kind != TagKind::Map => Some(kind.tag()),
            None => None,
        };
        let node_kind = if kind.is_sequence() {
            NodeKind::Seq(YamlSeq::default())
        } else {
            NodeKind::Map(YamlMap::default())
        };
        let mut node = Node::new(node_kind);
        node.meta.tag = stored_tag;
        let id = self.doc.add_node(node);
        if let Some(identity) = value.identity() {
            self.seen.insert(identity, id);
        }

        if kind.is_sequence() {
            let items = self.seq_items(value)?;
            if let NodeKind::Seq(seq) = &mut self.doc.node_mut(id).kind {
                seq.items = items;
            }
        } else {
            let entries = self.map_entries(value, kind)?;
            let pairs: Vec<NodeId> = entries
                .into_iter()
                .map(|(key, value)| {
                    self.doc
                        .add_node(Node::new(NodeKind::Pair(Pair { key, value })))
                })
                .collect();
            if let NodeKind::Map(map) = &mut self.doc.node_mut(id).kind {
                map.items = pairs;
            }
        }
        Ok(Item::Node(id))
    }

    fn seq_items(&mut self, value: &Value) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        if let Value::Seq(rc) | Value::Set(rc) = value {
            for item in rc.borrow().iter() {
                items.push(self.build(item, None)?);
            }
        }
        Ok(items)
    }

    fn map_entries(&mut self, value: &Value, kind: TagKind) -> Result<Vec<(Item, Option<Item>)>> {
        let unique = kind != TagKind::Pairs;
        let mut keys = HashSet::new();
        let mut check = |key: String| {
            if unique && !keys.insert(key.clone()) {
                return Err(Error::DuplicateKey { key });
            }
            Ok(())
        };

        let mut entries = Vec::new();
        match value {
            Value::Map(rc) => {
                for (key, item) in rc.borrow().iter() {
                    check(key.clone())?;
                    let key = self.wrap(ScalarValue::Str(key.clone()));
                    let item = (kind != TagKind::Set)
                        .then(|| self.build(item, None))
                        .transpose()?;
                    entries.push((key, item));
                }
            }
            Value::Pairs(rc) => {
                for (key, item) in rc.borrow().iter() {
                    check(key.key_string())?;
                    let key = self.build(key, None)?;
                    let item = (kind != TagKind::Set)
                        .then(|| self.build(item, None))
                        .transpose()?;
                    entries.push((key, item));
                }
            }
            Value::Seq(rc) | Value::Set(rc) => {
                for key in rc.borrow().iter() {
                    check(key.key_string())?;
                    entries.push((self.build(key, None)?, None));
                }
            }
            _ => {}
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::CoreSchema;

    fn create(doc: &mut Document, value: &Value, options: &CreateNodeOptions) -> Result<Item> {
        doc.create_node_with(value, &CoreSchema::new(), options)
    }

    #[test]
    fn test_map_becomes_map_node() {
        let mut doc = Document::new();
        let value = Value::map([("a", Value::Int(1)), ("b", Value::seq([Value::from("x")]))]);
        let root = create(&mut doc, &value, &CreateNodeOptions::default()).unwrap();
        let root = root.as_node().unwrap();
        assert_eq!(doc.len(root), 2);
        assert_eq!(doc.get(root, &Item::from("a"), false), Some(Item::from(1)));
        let inner = doc.get(root, &Item::from("b"), false).unwrap().as_node().unwrap();
        assert!(doc.node(inner).as_seq().is_some());
        // leaves are wrapped
        assert!(matches!(doc.get(root, &Item::from("a"), true), Some(Item::Node(_))));
    }

    #[test]
    fn test_unwrapped_leaf_is_returned_raw() {
        let mut doc = Document::new();
        let item = create(&mut doc, &Value::from("x"), &CreateNodeOptions::default().unwrapped())
            .unwrap();
        assert_eq!(item, Item::from("x"));
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn test_unwrapped_nested_leaves() {
        let mut doc = Document::new();
        let value = Value::seq([Value::Int(1)]);
        let root = create(&mut doc, &value, &CreateNodeOptions::default().unwrapped()).unwrap();
        assert_eq!(doc.items(root.as_node().unwrap()), vec![Item::from(1)]);
    }

    #[test]
    fn test_repeated_value_becomes_alias() {
        let mut doc = Document::new();
        let shared = Value::map([("x", Value::Int(1))]);
        let value = Value::seq([shared.clone(), shared]);
        let root = create(&mut doc, &value, &CreateNodeOptions::default()).unwrap();
        let items = doc.items(root.as_node().unwrap());

        let first = items[0].as_node().unwrap();
        let second = items[1].as_node().unwrap();
        assert_eq!(doc.node(second).as_alias().unwrap().source, first);
        assert_eq!(doc.node(first).meta.anchor.as_deref(), Some("a1"));
    }

    #[test]
    fn test_cycle_becomes_alias_to_ancestor() {
        let mut doc = Document::new();
        let value = Value::map::<&str>([]);
        value
            .as_map()
            .unwrap()
            .borrow_mut()
            .insert("me".into(), value.clone());
        let root = create(&mut doc, &value, &CreateNodeOptions::default())
            .unwrap()
            .as_node()
            .unwrap();
        let alias = doc.get(root, &Item::from("me"), true).unwrap().as_node().unwrap();
        assert_eq!(doc.node(alias).as_alias().unwrap().source, root);
    }

    #[test]
    fn test_unaliased_nodes_get_no_anchor() {
        let mut doc = Document::new();
        let value = Value::seq([Value::seq([]), Value::seq([])]);
        create(&mut doc, &value, &CreateNodeOptions::default()).unwrap();
        assert!((0..doc.node_count()).all(|i| doc.node(NodeId(i)).meta.anchor.is_none()));
    }

    #[test]
    fn test_collection_tags() {
        let mut doc = Document::new();
        let value = Value::map([("b", Value::Int(1)), ("a", Value::Int(2))]);
        let omap = create(&mut doc, &value, &CreateNodeOptions::default().with_tag("!!omap"))
            .unwrap()
            .as_node()
            .unwrap();
        assert_eq!(
            doc.node(omap).meta.tag.as_deref(),
            Some("tag:yaml.org,2002:omap")
        );

        let set = create(
            &mut doc,
            &Value::seq([Value::from("x")]),
            &CreateNodeOptions::default().with_tag("!!set"),
        )
        .unwrap()
        .as_node()
        .unwrap();
        assert!(doc.has(set, &Item::from("x")));
        assert_eq!(doc.get(set, &Item::from("x"), false), Some(Item::null()));
    }

    #[test]
    fn test_pairs_keep_duplicates_but_omap_rejects_them() {
        let pairs = Value::pairs([
            (Value::from("k"), Value::Int(1)),
            (Value::from("k"), Value::Int(2)),
        ]);
        let mut doc = Document::new();
        let root = create(&mut doc, &pairs, &CreateNodeOptions::default())
            .unwrap()
            .as_node()
            .unwrap();
        assert_eq!(doc.len(root), 2);
        assert_eq!(
            doc.node(root).meta.tag.as_deref(),
            Some("tag:yaml.org,2002:pairs")
        );

        let err = create(&mut doc, &pairs, &CreateNodeOptions::default().with_tag("!!omap"))
            .unwrap_err();
        assert_eq!(err, Error::DuplicateKey { key: "k".into() });
    }

    #[test]
    fn test_tag_errors() {
        let mut doc = Document::new();
        let err = create(
            &mut doc,
            &Value::seq([]),
            &CreateNodeOptions::default().with_tag("!nope"),
        )
        .unwrap_err();
        assert_eq!(err, Error::UnknownTag { tag: "!nope".into() });

        let err = create(
            &mut doc,
            &Value::map::<&str>([]),
            &CreateNodeOptions::default().with_tag("!!seq"),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::TagMismatch {
                tag: "!!seq".into(),
                found: "map"
            }
        );

        let err = create(
            &mut doc,
            &Value::Int(1),
            &CreateNodeOptions::default().with_tag("!!map"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::TagMismatch { found: "int", .. }));
    }
}
