//! Anchors and aliases.
//!
//! - [`AnchorScope`] binds anchor names while composing from events.
//! - [`AnchorNames`] generates names that do not collide with existing ones.
//! - [`plan_anchors`] decides which nodes need an anchor when stringifying.

use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Item, NodeId, NodeKind};
use crate::range::Range;
use std::collections::{HashMap, HashSet};

/// Anchor bindings in effect at the current point of a document.
///
/// A later definition of the same name shadows the earlier one for every
/// alias that follows it.
#[derive(Debug, Default)]
pub struct AnchorScope {
    bindings: HashMap<String, NodeId>,
}

impl AnchorScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: &str, node: NodeId) {
        if let Some(previous) = self.bindings.insert(name.to_string(), node) {
            tracing::trace!(anchor = name, ?previous, ?node, "anchor redefined");
        }
    }

    /// The node bound to `name`, or [`Error::UnresolvedAlias`].
    pub fn resolve(&self, name: &str, range: Option<Range>) -> Result<NodeId> {
        self.bindings
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnresolvedAlias {
                name: name.to_string(),
                range,
            })
    }
}

/// Generator of anchor names `{prefix}1`, `{prefix}2`, ... skipping taken ones.
#[derive(Debug, Clone)]
pub struct AnchorNames {
    prefix: String,
    taken: HashSet<String>,
    counter: usize,
}

impl AnchorNames {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            taken: HashSet::new(),
            counter: 0,
        }
    }

    /// A generator that avoids every anchor already set in `doc`.
    pub fn from_document(doc: &Document, prefix: &str) -> Self {
        let mut names = Self::new(prefix);
        for index in 0..doc.node_count() {
            if let Some(anchor) = &doc.node(NodeId(index)).meta.anchor {
                names.reserve(anchor);
            }
        }
        names
    }

    /// Mark `name` as used. Returns `false` if it was already taken.
    pub fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    pub fn next_name(&mut self) -> String {
        loop {
            self.counter += 1;
            let name = format!("{}{}", self.prefix, self.counter);
            if self.taken.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Visit every node reachable from `root`, in pre-order.
///
/// Ownership edges and alias edges are both followed. `visit` receives each
/// encounter with a flag telling whether it is the first one; a node is only
/// descended into on its first encounter, so cycles terminate.
pub(crate) fn for_each_node(doc: &Document, root: NodeId, mut visit: impl FnMut(NodeId, bool)) {
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        let first = seen.insert(id);
        visit(id, first);
        if !first {
            continue;
        }
        let children: Vec<NodeId> = match &doc.node(id).kind {
            NodeKind::Map(map) => map.items.clone(),
            NodeKind::Seq(seq) => seq.items.iter().filter_map(Item::as_node).collect(),
            NodeKind::Pair(pair) => std::iter::once(&pair.key)
                .chain(pair.value.as_ref())
                .filter_map(Item::as_node)
                .collect(),
            NodeKind::Merge(merge) => merge.value.iter().filter_map(Item::as_node).collect(),
            NodeKind::Alias(alias) => vec![alias.source],
            NodeKind::Scalar(_) => Vec::new(),
        };
        stack.extend(children.into_iter().rev());
    }
}

/// Anchor names for every node that needs one in the output of `root`.
///
/// A node needs an anchor when it already carries one, when an alias points
/// at it, or when it is reachable through more than one ownership path.
/// Existing anchors are kept unless two nodes share a name, in which case
/// the later one is renamed. Names are assigned in pre-order.
pub(crate) fn plan_anchors(doc: &Document, root: NodeId, prefix: &str) -> HashMap<NodeId, String> {
    let mut order: Vec<NodeId> = Vec::new();
    let mut needs: HashSet<NodeId> = HashSet::new();
    let mut mark = |id: NodeId, order: &mut Vec<NodeId>| {
        let anchorable = matches!(
            doc.node(id).kind,
            NodeKind::Scalar(_) | NodeKind::Map(_) | NodeKind::Seq(_)
        );
        if anchorable && needs.insert(id) {
            order.push(id);
        }
    };

    for_each_node(doc, root, |id, first| {
        let node = doc.node(id);
        if !first || node.meta.anchor.is_some() {
            mark(id, &mut order);
        }
        if let NodeKind::Alias(alias) = node.kind {
            if let Some(target) = doc.resolve_alias(alias.source) {
                mark(target, &mut order);
            }
        }
    });
    // Pre-order position of the first encounter decides naming order.
    let mut position = HashMap::new();
    for_each_node(doc, root, |id, first| {
        if first {
            let next = position.len();
            position.entry(id).or_insert(next);
        }
    });
    order.sort_by_key(|id| position.get(id).copied().unwrap_or(usize::MAX));

    let mut generated = AnchorNames::from_document(doc, prefix);
    let mut used = HashSet::new();
    let mut names = HashMap::new();
    for id in order {
        let name = match &doc.node(id).meta.anchor {
            Some(existing) if used.insert(existing.clone()) => existing.clone(),
            _ => {
                let name = generated.next_name();
                used.insert(name.clone());
                tracing::debug!(anchor = %name, node = id.index(), "generated anchor");
                name
            }
        };
        names.insert(id, name);
    }
    names
}
