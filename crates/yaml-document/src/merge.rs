//! Merge keys (`<<: [*a, *b]`).
//!
//! A merge pair is only valid as a direct item of a map, and its value must
//! be a sequence of aliases whose sources are maps. Expansion happens when a
//! map is read through [`Document::expand_merges`] or materialized; the node
//! tree itself is never rewritten.

use crate::anchors::for_each_node;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Item, Merge, NodeId, NodeKind};
use std::collections::HashSet;

/// The maps a merge pair pulls from, in priority order.
pub(crate) fn merge_sources(doc: &Document, merge: NodeId) -> Result<Vec<NodeId>> {
    let node = doc.node(merge);
    let range = node.meta.range;
    let NodeKind::Merge(Merge { value }) = &node.kind else {
        return Err(Error::invalid_merge("not a merge pair", range));
    };
    let seq = match value {
        Some(Item::Node(id)) => doc.node(*id).as_seq(),
        _ => None,
    }
    .ok_or_else(|| Error::invalid_merge("merge value must be a sequence of aliases", range))?;

    seq.items
        .iter()
        .map(|item| -> Result<NodeId> {
            let alias = item
                .as_node()
                .and_then(|id| doc.node(id).as_alias())
                .ok_or_else(|| Error::invalid_merge("merge sequence items must be aliases", range))?;
            let target = doc
                .resolve_alias(alias.source)
                .filter(|&target| doc.node(target).as_map().is_some())
                .ok_or_else(|| Error::invalid_merge("merged aliases must refer to maps", range))?;
            Ok(target)
        })
        .collect()
}

/// Check every merge pair reachable from `root`.
pub(crate) fn validate_tree(doc: &Document, root: NodeId) -> Result<()> {
    let mut placed = HashSet::new();
    let mut merges = Vec::new();
    for_each_node(doc, root, |id, first| {
        if !first {
            return;
        }
        match &doc.node(id).kind {
            NodeKind::Map(map) => placed.extend(map.items.iter().copied()),
            NodeKind::Merge(_) => merges.push(id),
            _ => {}
        }
    });
    for merge in merges {
        if !placed.contains(&merge) {
            return Err(Error::invalid_merge(
                "merge pairs are only valid in a map",
                doc.node(merge).meta.range,
            ));
        }
        merge_sources(doc, merge)?;
    }
    Ok(())
}

fn pair_key(doc: &Document, entry: NodeId) -> Option<&Item> {
    doc.node(entry).as_pair().map(|pair| &pair.key)
}

impl Document {
    /// The pairs a map presents once its merge keys are expanded.
    ///
    /// Direct pairs are always kept. Each merge pair is replaced by the pairs
    /// of its source maps whose keys are not already present; earlier sources
    /// win over later ones. Sources that merge other maps are expanded too.
    pub fn expand_merges(&self, map: NodeId) -> Result<Vec<NodeId>> {
        let mut active = Vec::new();
        self.expand_inner(map, &mut active)
    }

    fn expand_inner(&self, map: NodeId, active: &mut Vec<NodeId>) -> Result<Vec<NodeId>> {
        // a map that merges itself, directly or not, contributes nothing more
        if active.contains(&map) {
            return Ok(Vec::new());
        }
        let Some(items) = self.node(map).as_map().map(|m| m.items.clone()) else {
            return Ok(Vec::new());
        };
        active.push(map);

        let direct: Vec<&Item> = items.iter().filter_map(|&id| pair_key(self, id)).collect();
        let mut result: Vec<NodeId> = Vec::new();
        for entry in &items {
            match &self.node(*entry).kind {
                NodeKind::Pair(_) => result.push(*entry),
                NodeKind::Merge(_) => {
                    for source in merge_sources(self, *entry)? {
                        tracing::debug!(map = map.index(), source = source.index(), "expanding merge");
                        for pair in self.expand_inner(source, active)? {
                            let Some(key) = pair_key(self, pair) else {
                                continue;
                            };
                            let shadowed = direct.iter().any(|d| self.key_matches(d, key))
                                || result
                                    .iter()
                                    .filter_map(|&r| pair_key(self, r))
                                    .any(|r| self.key_matches(r, key));
                            if !shadowed {
                                result.push(pair);
                            }
                        }
                    }
                }
                other => {
                    return Err(Error::NotAPair {
                        found: other.kind_name(),
                    });
                }
            }
        }
        active.pop();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_and_values(doc: &Document, pairs: &[NodeId]) -> Vec<(Item, Option<Item>)> {
        pairs
            .iter()
            .map(|&id| {
                let pair = doc.node(id).as_pair().unwrap();
                (pair.key.clone(), pair.value.clone())
            })
            .collect()
    }

    #[test]
    fn test_direct_pairs_win() {
        let mut doc = Document::new();
        let base = doc.map([("a", 9), ("b", 2)]);
        let merge = doc.merge([base]);
        let map = doc.map([("a", 1)]);
        doc.add(map, merge).unwrap();

        let expanded = doc.expand_merges(map).unwrap();
        assert_eq!(
            keys_and_values(&doc, &expanded),
            vec![
                (Item::from("a"), Some(Item::from(1))),
                (Item::from("b"), Some(Item::from(2))),
            ]
        );
    }

    #[test]
    fn test_direct_pair_after_merge_still_wins() {
        let mut doc = Document::new();
        let base = doc.map([("a", 9)]);
        let merge = doc.merge([base]);
        let map = doc.map::<&str, i32>([]);
        doc.add(map, merge).unwrap();
        doc.add_pair(map, "a", 1).unwrap();

        let expanded = doc.expand_merges(map).unwrap();
        assert_eq!(
            keys_and_values(&doc, &expanded),
            vec![(Item::from("a"), Some(Item::from(1)))]
        );
    }

    #[test]
    fn test_first_source_wins() {
        let mut doc = Document::new();
        let m1 = doc.map([("c", 1)]);
        let m2 = doc.map([("c", 2), ("d", 3)]);
        let merge = doc.merge([m1, m2]);
        let map = doc.map::<&str, i32>([]);
        doc.add(map, merge).unwrap();

        let expanded = doc.expand_merges(map).unwrap();
        assert_eq!(
            keys_and_values(&doc, &expanded),
            vec![
                (Item::from("c"), Some(Item::from(1))),
                (Item::from("d"), Some(Item::from(3))),
            ]
        );
    }

    #[test]
    fn test_invalid_merge_values() {
        let mut doc = Document::new();
        let scalar = doc.scalar("x");
        let alias = doc.alias(scalar);
        let seq = doc.seq([alias]);
        let merge = doc.add_node(crate::node::Node::new(NodeKind::Merge(Merge {
            value: Some(Item::Node(seq)),
        })));
        assert!(matches!(
            merge_sources(&doc, merge),
            Err(Error::InvalidMerge { .. })
        ));

        let raw = doc.add_node(crate::node::Node::new(NodeKind::Merge(Merge {
            value: Some(Item::from("x")),
        })));
        assert!(matches!(merge_sources(&doc, raw), Err(Error::InvalidMerge { .. })));
    }

    #[test]
    fn test_merge_outside_map_is_invalid() {
        let mut doc = Document::new();
        let base = doc.map([("a", 1)]);
        let merge = doc.merge([base]);
        let root = doc.seq([merge]);
        doc.contents = Some(root.into());
        assert!(matches!(
            doc.validate_merges(),
            Err(Error::InvalidMerge { .. })
        ));
    }

    #[test]
    fn test_self_merge_terminates() {
        let mut doc = Document::new();
        let map = doc.map([("a", 1)]);
        let merge = doc.merge([map]);
        doc.add(map, merge).unwrap();
        let expanded = doc.expand_merges(map).unwrap();
        assert_eq!(expanded.len(), 1);
    }
}
