//! Materialization of nodes into plain [`Value`]s.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Item, NodeId, NodeKind};
use crate::options::MaterializeOptions;
use crate::tags::TagKind;
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// One materialization pass over a document.
///
/// Every collection node is materialized at most once per pass. Its value is
/// registered before its children are visited, so an alias (or a cycle back
/// to an ancestor) yields the very same shared value instead of a copy.
pub(crate) struct Materializer<'a> {
    doc: &'a Document,
    options: &'a MaterializeOptions,
    visited: HashMap<NodeId, Value>,
    depth: usize,
}

impl<'a> Materializer<'a> {
    pub(crate) fn new(doc: &'a Document, options: &'a MaterializeOptions) -> Self {
        Self {
            doc,
            options,
            visited: HashMap::new(),
            depth: 0,
        }
    }

    pub(crate) fn materialize(&mut self, item: &Item) -> Result<Value> {
        match item {
            Item::Value(value) => Ok(Value::from(value.clone())),
            Item::Node(id) => self.node(*id),
        }
    }

    fn node(&mut self, id: NodeId) -> Result<Value> {
        if let Some(value) = self.visited.get(&id) {
            return Ok(value.clone());
        }
        let doc = self.doc;
        let node = doc.node(id);
        match &node.kind {
            NodeKind::Scalar(scalar) => Ok(Value::from(scalar.value.clone())),
            NodeKind::Alias(alias) => {
                let source = doc.resolve_alias(alias.source).ok_or_else(|| {
                    Error::UnresolvedAlias {
                        name: node.meta.anchor.clone().unwrap_or_default(),
                        range: node.meta.range,
                    }
                })?;
                self.node(source)
            }
            NodeKind::Pair(pair) => {
                let key = self.key_string(&pair.key)?;
                let value = self.optional(pair.value.as_ref())?;
                Ok(Value::map([(key, value)]))
            }
            NodeKind::Merge(_) => Err(Error::invalid_merge(
                "merge pairs are only valid in a map",
                node.meta.range,
            )),
            NodeKind::Seq(seq) => {
                self.enter()?;
                let rc = Rc::new(RefCell::new(Vec::with_capacity(seq.items.len())));
                self.visited.insert(id, Value::Seq(rc.clone()));
                let mut items = Vec::with_capacity(seq.items.len());
                for item in &seq.items {
                    items.push(self.materialize(item)?);
                }
                *rc.borrow_mut() = items;
                self.depth -= 1;
                Ok(Value::Seq(rc))
            }
            NodeKind::Map(_) => {
                self.enter()?;
                let value = self.map(id)?;
                self.depth -= 1;
                Ok(value)
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(Error::NestingTooDeep {
                max_depth: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn optional(&mut self, item: Option<&Item>) -> Result<Value> {
        match item {
            Some(item) => self.materialize(item),
            None => Ok(Value::Null),
        }
    }

    /// Key text of a plain map entry. Collection keys use their JSON text.
    fn key_string(&mut self, key: &Item) -> Result<String> {
        if let Some(scalar) = self.doc.scalar_value(key) {
            return Ok(scalar.to_key_string());
        }
        Ok(self.materialize(key)?.key_string())
    }

    fn map(&mut self, id: NodeId) -> Result<Value> {
        let doc = self.doc;
        let tag = doc.node(id).meta.tag.as_deref();
        let is = |kind: TagKind| tag == Some(kind.tag().as_str());
        let pairs = doc.expand_merges(id)?;

        if is(TagKind::Set) {
            let rc = Rc::new(RefCell::new(Vec::with_capacity(pairs.len())));
            self.visited.insert(id, Value::Set(rc.clone()));
            let mut items = Vec::with_capacity(pairs.len());
            for pair in pairs {
                if let Some(pair) = doc.node(pair).as_pair() {
                    items.push(self.materialize(&pair.key)?);
                }
            }
            *rc.borrow_mut() = items;
            return Ok(Value::Set(rc));
        }

        if is(TagKind::Pairs) || is(TagKind::OrderedMap) {
            let rc = Rc::new(RefCell::new(Vec::with_capacity(pairs.len())));
            self.visited.insert(id, Value::Pairs(rc.clone()));
            let mut entries = Vec::with_capacity(pairs.len());
            for pair in pairs {
                if let Some(pair) = doc.node(pair).as_pair() {
                    let key = self.materialize(&pair.key)?;
                    let value = self.optional(pair.value.as_ref())?;
                    entries.push((key, value));
                }
            }
            *rc.borrow_mut() = entries;
            return Ok(Value::Pairs(rc));
        }

        let rc = Rc::new(RefCell::new(IndexMap::with_capacity(pairs.len())));
        self.visited.insert(id, Value::Map(rc.clone()));
        let mut entries = IndexMap::with_capacity(pairs.len());
        for pair in pairs {
            if let Some(pair) = doc.node(pair).as_pair() {
                let key = self.key_string(&pair.key)?;
                let value = self.optional(pair.value.as_ref())?;
                entries.insert(key, value);
            }
        }
        *rc.borrow_mut() = entries;
        Ok(Value::Map(rc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materialize(doc: &Document, id: NodeId) -> Value {
        Materializer::new(doc, &MaterializeOptions::default())
            .materialize(&Item::Node(id))
            .unwrap()
    }

    #[test]
    fn test_alias_shares_identity() {
        let mut doc = Document::new();
        let target = doc.map([("X", 1)]);
        let alias = doc.alias(target);
        let root = doc.seq([target, alias]);

        let value = materialize(&doc, root);
        let first = value.index(0).unwrap();
        let second = value.index(1).unwrap();
        assert!(first.same_identity(&second));

        second
            .as_map()
            .unwrap()
            .borrow_mut()
            .insert("X".into(), Value::Int(2));
        assert_eq!(first.get("X"), Some(Value::Int(2)));
    }

    #[test]
    fn test_cycle_materializes_self_reference() {
        let mut doc = Document::new();
        let map = doc.map::<&str, i32>([]);
        let alias = doc.alias(map);
        doc.set(map, "self", alias).unwrap();

        let value = materialize(&doc, map);
        assert!(value.get("self").unwrap().same_identity(&value));
    }

    #[test]
    fn test_merge_precedence() {
        let mut doc = Document::new();
        let base = doc.map([("a", 9), ("b", 2)]);
        let merge = doc.merge([base]);
        let map = doc.map([("a", 1)]);
        doc.add(map, merge).unwrap();

        let value = materialize(&doc, map);
        assert_eq!(
            value,
            Value::map([("a", Value::Int(1)), ("b", Value::Int(2))])
        );
    }

    #[test]
    fn test_tagged_maps() {
        let mut doc = Document::new();
        let set = doc.map::<&str, i32>([]);
        doc.set_tag(set, "!!set");
        doc.add(set, "x").unwrap();
        assert_eq!(materialize(&doc, set), Value::set([Value::from("x")]));

        let pairs = doc.map([("k", 1)]);
        doc.set_tag(pairs, "!!pairs");
        doc.add_pair(pairs, "k", 2).unwrap();
        assert_eq!(
            materialize(&doc, pairs),
            Value::pairs([
                (Value::from("k"), Value::Int(1)),
                (Value::from("k"), Value::Int(2)),
            ])
        );
    }

    #[test]
    fn test_null_key_becomes_empty_string() {
        let mut doc = Document::new();
        let map = doc.map([(Item::null(), Item::from(1))]);
        assert_eq!(materialize(&doc, map), Value::map([("", Value::Int(1))]));
    }

    #[test]
    fn test_orphaned_alias_source() {
        let mut doc = Document::new();
        let target = doc.seq([1]);
        let alias = doc.alias(target);
        let root = doc.map([("kept", alias)]);
        let _detached = doc.map([("gone", target)]);

        assert_eq!(
            materialize(&doc, root),
            Value::map([("kept", Value::seq([Value::Int(1)]))])
        );
    }

    #[test]
    fn test_depth_limit() {
        let mut doc = Document::new();
        let mut current = doc.seq::<i32>([]);
        for _ in 0..5 {
            current = doc.seq([current]);
        }
        let options = MaterializeOptions { max_depth: 3 };
        let err = Materializer::new(&doc, &options)
            .materialize(&Item::Node(current))
            .unwrap_err();
        assert_eq!(err, Error::NestingTooDeep { max_depth: 3 });
    }

    #[test]
    fn test_standalone_pair() {
        let mut doc = Document::new();
        let pair = doc.pair("k", "v");
        assert_eq!(materialize(&doc, pair), Value::map([("k", Value::from("v"))]));
    }
}
