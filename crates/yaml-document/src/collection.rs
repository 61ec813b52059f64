//! Key and path accessors for maps and sequences.
//!
//! Maps are keyed by scalar-equivalent matching: a raw key matches a stored
//! key when their scalar values are equivalent, and a node key matches when
//! it is the same node or holds an equivalent scalar. Sequences are keyed by
//! non-negative integers or their decimal string form.
//!
//! Values are stored exactly as passed. `set` and `add` never wrap raw values
//! into scalar nodes, so a raw value read back with `get` is the value that
//! was stored.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Item, Merge, Node, NodeId, NodeKind, Pair, MERGE_KEY};
use crate::scalar::ScalarValue;
use crate::tags::TagKind;

/// Interpret a key as a sequence index.
///
/// Only non-negative integers and strings of ASCII digits qualify, so
/// `"+1"`, `"1.0"` and `" 1"` are not indices. Integral floats are accepted
/// up to `i64::MAX`.
fn index_of(value: &ScalarValue) -> Option<usize> {
    match value {
        ScalarValue::Int(i) => usize::try_from(*i).ok(),
        ScalarValue::Float(x) if *x >= 0.0 && x.fract() == 0.0 && *x < i64::MAX as f64 => {
            usize::try_from(*x as i64).ok()
        }
        ScalarValue::Str(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

impl Document {
    fn seq_index(&self, key: &Item) -> Option<usize> {
        self.scalar_value(key).and_then(index_of)
    }

    fn has_tag(&self, id: NodeId, kind: TagKind) -> bool {
        self.node(id).meta.tag.as_deref() == Some(kind.tag().as_str())
    }

    /// Whether a stored key matches a lookup key.
    pub(crate) fn key_matches(&self, stored: &Item, key: &Item) -> bool {
        if let (Item::Node(a), Item::Node(b)) = (stored, key) {
            if a == b {
                return true;
            }
        }
        match (self.scalar_value(stored), self.scalar_value(key)) {
            (Some(a), Some(b)) => a.equivalent(b),
            _ => false,
        }
    }

    /// Whether the pair or merge node `entry` has the key `key`.
    fn entry_matches(&self, entry: NodeId, key: &Item) -> bool {
        match &self.node(entry).kind {
            NodeKind::Pair(pair) => self.key_matches(&pair.key, key),
            NodeKind::Merge(_) => self.key_matches(&Item::from(MERGE_KEY), key),
            _ => false,
        }
    }

    /// Position of the first entry of `map` with key `key`.
    fn find_entry(&self, map: NodeId, key: &Item) -> Option<usize> {
        let map = self.node(map).as_map()?;
        map.items
            .iter()
            .position(|&entry| self.entry_matches(entry, key))
    }

    fn unwrap_scalar(&self, item: Item, keep_scalar: bool) -> Item {
        match item {
            Item::Node(id) if !keep_scalar => match self.node(id).as_scalar() {
                Some(scalar) => Item::Value(scalar.value.clone()),
                None => Item::Node(id),
            },
            other => other,
        }
    }

    /// Look up `key` in the map or sequence `coll`.
    ///
    /// A matched scalar node is returned as its raw value unless
    /// `keep_scalar` is set; collections are always returned as nodes. A
    /// pair without a value reads as null.
    pub fn get(&self, coll: NodeId, key: &Item, keep_scalar: bool) -> Option<Item> {
        let found = match &self.node(coll).kind {
            NodeKind::Map(map) => {
                let entry = map.items[self.find_entry(coll, key)?];
                match &self.node(entry).kind {
                    NodeKind::Pair(Pair { value, .. }) | NodeKind::Merge(Merge { value }) => {
                        value.clone().unwrap_or_else(Item::null)
                    }
                    _ => return None,
                }
            }
            NodeKind::Seq(seq) => seq.items.get(self.seq_index(key)?)?.clone(),
            _ => return None,
        };
        Some(self.unwrap_scalar(found, keep_scalar))
    }

    pub fn has(&self, coll: NodeId, key: &Item) -> bool {
        match &self.node(coll).kind {
            NodeKind::Map(_) => self.find_entry(coll, key).is_some(),
            NodeKind::Seq(seq) => self.seq_index(key).is_some_and(|i| i < seq.items.len()),
            _ => false,
        }
    }

    /// Set the value at `key`, creating the entry if needed.
    ///
    /// On a sequence, indices past the end grow the sequence and fill the
    /// gap with nulls.
    pub fn set(&mut self, coll: NodeId, key: impl Into<Item>, value: impl Into<Item>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        if self.node(coll).as_map().is_some() {
            match self.find_entry(coll, &key) {
                Some(pos) => {
                    let entry = self.node(coll).as_map().map(|m| m.items[pos]);
                    if let Some(entry) = entry {
                        match &mut self.node_mut(entry).kind {
                            NodeKind::Pair(pair) => pair.value = Some(value),
                            NodeKind::Merge(merge) => merge.value = Some(value),
                            _ => {}
                        }
                    }
                }
                None => {
                    let pair = self.add_node(Node::new(NodeKind::Pair(Pair {
                        key,
                        value: Some(value),
                    })));
                    if let NodeKind::Map(map) = &mut self.node_mut(coll).kind {
                        map.items.push(pair);
                    }
                }
            }
            return Ok(());
        }

        if self.node(coll).as_seq().is_none() {
            return Err(self.not_a_collection(&key, std::slice::from_ref(&key)));
        }
        let index = self.seq_index(&key).ok_or_else(|| Error::InvalidIndex {
            key: self.key_text(&key),
        })?;
        let invalid = || Error::InvalidIndex {
            key: self.key_text(&key),
        };
        let len = index.checked_add(1).ok_or_else(invalid)?;
        let Some(seq) = self.node(coll).as_seq() else {
            return Ok(());
        };
        let missing = len.saturating_sub(seq.items.len());
        let mut items = Vec::new();
        if missing > 0 {
            // reserved before the sequence is touched
            items.try_reserve_exact(missing).map_err(|_| invalid())?;
        }
        if let NodeKind::Seq(seq) = &mut self.node_mut(coll).kind {
            if missing > 0 {
                items.resize(missing, Item::null());
                seq.items.append(&mut items);
            }
            seq.items[index] = value;
        }
        Ok(())
    }

    /// Append to a sequence, or add a pair (or merge) node to a map.
    ///
    /// Adding a pair whose key is already present fails with
    /// [`Error::DuplicateKey`], except in a `!!pairs` map. A `!!set` map
    /// also accepts a bare key.
    pub fn add(&mut self, coll: NodeId, value: impl Into<Item>) -> Result<()> {
        let value = value.into();
        if let NodeKind::Seq(seq) = &mut self.node_mut(coll).kind {
            seq.items.push(value);
            return Ok(());
        }
        if self.node(coll).as_map().is_none() {
            return Err(Error::NotACollection {
                key: String::new(),
                path: Vec::new(),
            });
        }
        let entry = self.entry_for_add(coll, value)?;
        let key = match &self.node(entry).kind {
            NodeKind::Pair(pair) => pair.key.clone(),
            _ => Item::from(MERGE_KEY),
        };
        if !self.has_tag(coll, TagKind::Pairs) && self.find_entry(coll, &key).is_some() {
            return Err(Error::DuplicateKey {
                key: self.key_text(&key),
            });
        }
        if let NodeKind::Map(map) = &mut self.node_mut(coll).kind {
            map.items.push(entry);
        }
        Ok(())
    }

    /// The pair or merge node to add to `map` for `value`.
    fn entry_for_add(&mut self, map: NodeId, value: Item) -> Result<NodeId> {
        if let Item::Node(id) = value {
            if matches!(self.node(id).kind, NodeKind::Pair(_) | NodeKind::Merge(_)) {
                return Ok(id);
            }
        }
        if self.has_tag(map, TagKind::Set) {
            return Ok(self.add_node(Node::new(NodeKind::Pair(Pair {
                key: value,
                value: None,
            }))));
        }
        Err(Error::NotAPair {
            found: self.kind_of(&value),
        })
    }

    /// Create a pair and add it to `map`. Returns the new pair node.
    pub fn add_pair(
        &mut self,
        map: NodeId,
        key: impl Into<Item>,
        value: impl Into<Item>,
    ) -> Result<NodeId> {
        let pair = self.pair(key, value);
        self.add(map, pair)?;
        Ok(pair)
    }

    /// Remove the first entry matching `key`. Returns whether one was removed.
    pub fn delete(&mut self, coll: NodeId, key: &Item) -> bool {
        let position = match &self.node(coll).kind {
            NodeKind::Map(_) => self.find_entry(coll, key),
            NodeKind::Seq(seq) => self.seq_index(key).filter(|&i| i < seq.items.len()),
            _ => None,
        };
        let Some(position) = position else {
            return false;
        };
        match &mut self.node_mut(coll).kind {
            NodeKind::Map(map) => {
                map.items.remove(position);
            }
            NodeKind::Seq(seq) => {
                seq.items.remove(position);
            }
            _ => return false,
        }
        true
    }

    /// Follow `path` from `coll` through nested collections.
    ///
    /// Returns `Err(step)` with the index of the first key that did not lead
    /// to a collection.
    fn walk(&self, coll: NodeId, path: &[Item]) -> std::result::Result<NodeId, usize> {
        let mut current = coll;
        for (step, key) in path.iter().enumerate() {
            match self.get(current, key, true) {
                Some(Item::Node(id)) if self.node(id).is_collection() => current = id,
                _ => return Err(step),
            }
        }
        Ok(current)
    }

    fn walk_mut(&self, coll: NodeId, path: &[Item], full_path: &[Item]) -> Result<NodeId> {
        if !self.node(coll).is_collection() {
            let key = full_path.first().cloned().unwrap_or_else(Item::null);
            return Err(self.not_a_collection(&key, full_path));
        }
        self.walk(coll, path)
            .map_err(|step| self.not_a_collection(&path[step], full_path))
    }

    /// Look up a nested value. Never fails; absent steps give `None`.
    ///
    /// An empty path returns `coll` itself.
    pub fn get_in(&self, coll: NodeId, path: &[Item], keep_scalar: bool) -> Option<Item> {
        let Some((last, parents)) = path.split_last() else {
            return Some(Item::Node(coll));
        };
        let parent = self.walk(coll, parents).ok()?;
        self.get(parent, last, keep_scalar)
    }

    pub fn has_in(&self, coll: NodeId, path: &[Item]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        self.walk(coll, parents)
            .is_ok_and(|parent| self.has(parent, last))
    }

    /// Set a nested value. Every key but the last must lead to an existing
    /// collection, otherwise this fails with [`Error::NotACollection`].
    pub fn set_in(&mut self, coll: NodeId, path: &[Item], value: impl Into<Item>) -> Result<()> {
        let Some((last, parents)) = path.split_last() else {
            return Err(Error::NotACollection {
                key: String::new(),
                path: Vec::new(),
            });
        };
        let parent = self.walk_mut(coll, parents, path)?;
        self.set(parent, last.clone(), value)
    }

    /// Add `value` to the collection found at `path` (the collection itself,
    /// not the new item's position).
    pub fn add_in(&mut self, coll: NodeId, path: &[Item], value: impl Into<Item>) -> Result<()> {
        let target = self.walk_mut(coll, path, path)?;
        self.add(target, value)
    }

    /// Delete a nested entry. Returns `false` when any step of the path is
    /// missing or not a collection.
    pub fn delete_in(&mut self, coll: NodeId, path: &[Item]) -> bool {
        let Some((last, parents)) = path.split_last() else {
            return false;
        };
        match self.walk(coll, parents) {
            Ok(parent) => self.delete(parent, last),
            Err(_) => false,
        }
    }

    // Paths from the document contents

    /// [`Document::get_in`] starting at the contents.
    pub fn get_path(&self, path: &[Item], keep_scalar: bool) -> Option<Item> {
        match (&self.contents, path.is_empty()) {
            (Some(contents), true) => Some(self.unwrap_scalar(contents.clone(), keep_scalar)),
            (Some(Item::Node(root)), false) => self.get_in(*root, path, keep_scalar),
            _ => None,
        }
    }

    pub fn has_path(&self, path: &[Item]) -> bool {
        match (&self.contents, path.is_empty()) {
            (Some(_), true) => true,
            (Some(Item::Node(root)), false) => self.has_in(*root, path),
            _ => false,
        }
    }

    /// [`Document::set_in`] starting at the contents. An empty path replaces
    /// the contents.
    pub fn set_path(&mut self, path: &[Item], value: impl Into<Item>) -> Result<()> {
        if path.is_empty() {
            self.contents = Some(value.into());
            return Ok(());
        }
        match self.root() {
            Some(root) => self.set_in(root, path, value),
            None => Err(self.not_a_collection(&path[0], path)),
        }
    }

    pub fn add_path(&mut self, path: &[Item], value: impl Into<Item>) -> Result<()> {
        match self.root() {
            Some(root) => self.add_in(root, path, value),
            None => {
                let key = path.first().cloned().unwrap_or_else(Item::null);
                Err(self.not_a_collection(&key, path))
            }
        }
    }

    /// [`Document::delete_in`] starting at the contents. An empty path clears
    /// the contents.
    pub fn delete_path(&mut self, path: &[Item]) -> bool {
        if path.is_empty() {
            return self.contents.take().is_some();
        }
        match self.root() {
            Some(root) => self.delete_in(root, path),
            None => false,
        }
    }

    /// Items of a map (its pair nodes) or a sequence.
    pub fn items(&self, coll: NodeId) -> Vec<Item> {
        match &self.node(coll).kind {
            NodeKind::Map(map) => map.items.iter().map(|&id| Item::Node(id)).collect(),
            NodeKind::Seq(seq) => seq.items.clone(),
            _ => Vec::new(),
        }
    }

    /// Number of entries of a map or sequence; 0 for other nodes.
    pub fn len(&self, coll: NodeId) -> usize {
        match &self.node(coll).kind {
            NodeKind::Map(map) => map.items.len(),
            NodeKind::Seq(seq) => seq.items.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Scalar;

    fn keys(keys: &[&str]) -> Vec<Item> {
        keys.iter().map(|&k| Item::from(k)).collect()
    }

    #[test]
    fn test_missing_key() {
        let mut doc = Document::new();
        let map = doc.map([("a", 1)]);
        assert!(!doc.has(map, &Item::from("b")));
        assert_eq!(doc.get(map, &Item::from("b"), false), None);
    }

    #[test]
    fn test_get_unwraps_scalars() {
        let mut doc = Document::new();
        let value = doc.scalar("v");
        let map = doc.map([("k", value)]);
        assert_eq!(doc.get(map, &Item::from("k"), false), Some(Item::from("v")));
        assert_eq!(doc.get(map, &Item::from("k"), true), Some(Item::Node(value)));
    }

    #[test]
    fn test_collections_are_never_unwrapped() {
        let mut doc = Document::new();
        let inner = doc.seq([1]);
        let map = doc.map([("k", inner)]);
        assert_eq!(doc.get(map, &Item::from("k"), false), Some(Item::Node(inner)));
    }

    #[test]
    fn test_scalar_equivalent_keys() {
        let mut doc = Document::new();
        let key = doc.scalar(1);
        let map = doc.map([(key, "one")]);
        assert!(doc.has(map, &Item::from(1)));
        assert!(doc.has(map, &Item::from(1.0)));
        assert!(doc.has(map, &Item::Node(key)));
        assert!(!doc.has(map, &Item::from("1")));
    }

    #[test]
    fn test_set_stores_raw_values() {
        let mut doc = Document::new();
        let map = doc.map::<&str, i32>([]);
        doc.set(map, "a", 5).unwrap();
        assert_eq!(doc.get(map, &Item::from("a"), true), Some(Item::from(5)));
        doc.set(map, "a", 6).unwrap();
        assert_eq!(doc.len(map), 1);
        assert_eq!(doc.get(map, &Item::from("a"), false), Some(Item::from(6)));
    }

    #[test]
    fn test_set_scalar_node_reads_back() {
        let mut doc = Document::new();
        let map = doc.map::<&str, i32>([]);
        let node = doc.scalar_node(Scalar::new("x"));
        doc.set(map, "k", node).unwrap();
        assert_eq!(doc.get(map, &Item::from("k"), true), Some(Item::Node(node)));
        assert_eq!(doc.get(map, &Item::from("k"), false), Some(Item::from("x")));
    }

    #[test]
    fn test_seq_indices() {
        let mut doc = Document::new();
        let seq = doc.seq(["a", "b"]);
        assert_eq!(doc.get(seq, &Item::from(1), false), Some(Item::from("b")));
        assert_eq!(doc.get(seq, &Item::from("1"), false), Some(Item::from("b")));
        assert_eq!(doc.get(seq, &Item::from("-1"), false), None);
        assert_eq!(doc.get(seq, &Item::from("0.5"), false), None);
        assert_eq!(doc.get(seq, &Item::from(-1), false), None);
        assert!(doc.has(seq, &Item::from("0")));
        assert!(!doc.has(seq, &Item::from(2)));
    }

    #[test]
    fn test_seq_set_grows_with_nulls() {
        let mut doc = Document::new();
        let seq = doc.seq(["a"]);
        doc.set(seq, 3, "d").unwrap();
        assert_eq!(
            doc.items(seq),
            vec![Item::from("a"), Item::null(), Item::null(), Item::from("d")]
        );
        assert_eq!(
            doc.set(seq, "x", 1),
            Err(Error::InvalidIndex { key: "x".into() })
        );
    }

    #[test]
    fn test_seq_set_rejects_unreachable_indices() {
        let mut doc = Document::new();
        let seq = doc.seq(["a"]);
        for key in [Item::from(1e300), Item::from(i64::MAX), Item::from(f64::MAX)] {
            assert!(matches!(
                doc.set(seq, key, 1),
                Err(Error::InvalidIndex { .. })
            ));
        }
        assert_eq!(doc.items(seq), vec![Item::from("a")]);
        doc.set(seq, 2.0, "c").unwrap();
        assert_eq!(doc.len(seq), 3);
    }

    #[test]
    fn test_index_strings_are_plain_digits() {
        let mut doc = Document::new();
        let seq = doc.seq(["a", "b"]);
        for key in ["+1", "1.0", " 1", "1e0"] {
            assert_eq!(doc.get(seq, &Item::from(key), false), None, "{}", key);
        }
        assert_eq!(
            doc.set(seq, "+1", "x"),
            Err(Error::InvalidIndex { key: "+1".into() })
        );
    }

    #[test]
    fn test_add_rejects_duplicates() {
        let mut doc = Document::new();
        let map = doc.map([("a", 1)]);
        let dup = doc.pair("a", 2);
        assert_eq!(doc.add(map, dup), Err(Error::DuplicateKey { key: "a".into() }));
        assert_eq!(doc.get(map, &Item::from("a"), false), Some(Item::from(1)));

        doc.add_pair(map, "b", 2).unwrap();
        assert_eq!(doc.get(map, &Item::from("b"), false), Some(Item::from(2)));
    }

    #[test]
    fn test_add_requires_pair() {
        let mut doc = Document::new();
        let map = doc.map::<&str, i32>([]);
        assert_eq!(doc.add(map, 3), Err(Error::NotAPair { found: "int" }));
    }

    #[test]
    fn test_pairs_map_allows_duplicates() {
        let mut doc = Document::new();
        let map = doc.map([("a", 1)]);
        doc.set_tag(map, "!!pairs");
        doc.add_pair(map, "a", 2).unwrap();
        assert_eq!(doc.len(map), 2);
        // first match wins
        assert_eq!(doc.get(map, &Item::from("a"), false), Some(Item::from(1)));
    }

    #[test]
    fn test_set_map_accepts_bare_keys() {
        let mut doc = Document::new();
        let set = doc.map::<&str, i32>([]);
        doc.set_tag(set, "!!set");
        doc.add(set, "x").unwrap();
        assert!(doc.has(set, &Item::from("x")));
        assert_eq!(doc.add(set, "x"), Err(Error::DuplicateKey { key: "x".into() }));
    }

    #[test]
    fn test_seq_add_appends() {
        let mut doc = Document::new();
        let seq = doc.seq::<i32>([]);
        doc.add(seq, 1).unwrap();
        doc.add(seq, "two").unwrap();
        assert_eq!(doc.items(seq), vec![Item::from(1), Item::from("two")]);
    }

    #[test]
    fn test_delete() {
        let mut doc = Document::new();
        let map = doc.map([("a", 1), ("b", 2)]);
        assert!(doc.delete(map, &Item::from("a")));
        assert!(!doc.delete(map, &Item::from("a")));
        assert_eq!(doc.len(map), 1);

        let seq = doc.seq([1, 2, 3]);
        assert!(doc.delete(seq, &Item::from("1")));
        assert_eq!(doc.items(seq), vec![Item::from(1), Item::from(3)]);
        assert!(!doc.delete(seq, &Item::from(5)));
    }

    #[test]
    fn test_path_reads_never_fail() {
        let mut doc = Document::new();
        let inner = doc.map([("c", 3)]);
        let root = doc.map([("a", Item::from(1)), ("b", Item::Node(inner))]);
        assert_eq!(doc.get_in(root, &keys(&["b", "c"]), false), Some(Item::from(3)));
        assert!(doc.has_in(root, &keys(&["b", "c"])));
        assert_eq!(doc.get_in(root, &keys(&["a", "c"]), false), None);
        assert_eq!(doc.get_in(root, &keys(&["x", "y"]), false), None);
        assert!(!doc.has_in(root, &keys(&["a", "c"])));
        assert_eq!(doc.get_in(root, &[], false), Some(Item::Node(root)));
    }

    #[test]
    fn test_set_in_requires_collections() {
        let mut doc = Document::new();
        let inner = doc.map([("c", 3)]);
        let root = doc.map([("a", Item::from(1)), ("b", Item::Node(inner))]);

        doc.set_in(root, &keys(&["b", "d"]), 4).unwrap();
        assert_eq!(doc.get_in(root, &keys(&["b", "d"]), false), Some(Item::from(4)));

        let err = doc.set_in(root, &keys(&["a", "c", "d"]), 5).unwrap_err();
        assert_eq!(
            err,
            Error::NotACollection {
                key: "a".into(),
                path: vec!["a".into(), "c".into(), "d".into()],
            }
        );
        assert!(matches!(
            doc.set_in(root, &keys(&["missing", "x"]), 1),
            Err(Error::NotACollection { .. })
        ));
        assert!(!doc.delete_in(root, &keys(&["a", "c"])));
        assert!(!doc.delete_in(root, &keys(&["missing", "x"])));
        assert!(doc.delete_in(root, &keys(&["b", "c"])));
    }

    #[test]
    fn test_add_in_targets_collection() {
        let mut doc = Document::new();
        let list = doc.seq([1]);
        let root = doc.map([("list", list)]);
        doc.add_in(root, &keys(&["list"]), 2).unwrap();
        assert_eq!(doc.items(list), vec![Item::from(1), Item::from(2)]);
        assert!(matches!(
            doc.add_in(root, &keys(&["nope"]), 2),
            Err(Error::NotACollection { .. })
        ));
    }

    #[test]
    fn test_document_paths() {
        let mut doc = Document::new();
        assert!(!doc.has_path(&keys(&["a"])));
        assert!(doc.set_path(&keys(&["a"]), 1).is_err());
        assert!(!doc.delete_path(&keys(&["a"])));

        let root = doc.map([("a", 1)]);
        doc.set_path(&[], root).unwrap();
        doc.set_path(&keys(&["b"]), 2).unwrap();
        assert_eq!(doc.get_path(&keys(&["b"]), false), Some(Item::from(2)));
        assert!(doc.has_path(&keys(&["a"])));
        assert!(doc.delete_path(&keys(&["a"])));
        assert!(!doc.has_path(&keys(&["a"])));
    }
}
