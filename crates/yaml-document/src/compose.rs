//! Composition of an event stream into documents.

use crate::anchors::AnchorScope;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::events::{Event, NodeProps};
use crate::merge::merge_sources;
use crate::node::{Alias, Item, Merge, Node, NodeId, NodeKind, Pair, YamlMap, YamlSeq, MERGE_KEY};
use crate::notation::Notation;
use crate::options::ParseOptions;
use crate::range::Range;
use crate::scalar::{ScalarType, ScalarValue};
use crate::tags::{normalize_tag, short_tag, TagKind, TagResolver};

/// Build documents from a stream of events.
///
/// Anchors are bound when their node starts, so an alias inside a
/// collection may refer to that collection. An alias whose name is not
/// bound at that point fails with [`Error::UnresolvedAlias`].
///
/// # Errors
///
/// Fails on unresolved aliases, repeated keys (except under `!!pairs`),
/// tags the resolver does not know or that do not fit the node, scalars
/// that do not parse under their explicit tag, invalid merge keys when
/// `merge_keys` is enabled, and unbalanced events.
pub fn compose<I>(
    events: I,
    resolver: &dyn TagResolver,
    options: &ParseOptions,
) -> Result<Vec<Document>>
where
    I: IntoIterator<Item = Event>,
{
    let mut composer = Composer::new(resolver, options);
    for event in events {
        tracing::trace!(?event, depth = composer.stack.len(), "compose");
        composer.event(event)?;
    }
    composer.finish()
}

/// A collection being filled.
enum Frame {
    Map { id: NodeId, key: Option<Item> },
    Seq { id: NodeId },
}

impl Frame {
    fn id(&self) -> NodeId {
        match self {
            Frame::Map { id, .. } | Frame::Seq { id } => *id,
        }
    }
}

struct Composer<'a> {
    resolver: &'a dyn TagResolver,
    options: &'a ParseOptions,
    documents: Vec<Document>,
    doc: Option<Document>,
    scope: AnchorScope,
    stack: Vec<Frame>,
    /// Leading comment lines waiting for the next node
    leading: Vec<String>,
    space_before: bool,
    /// Most recently completed node, owner of trailing comments
    last: Option<NodeId>,
}

fn append_line(slot: &mut Option<String>, text: &str) {
    match slot {
        Some(existing) => {
            existing.push('\n');
            existing.push_str(text);
        }
        None => *slot = Some(text.to_string()),
    }
}

/// Attach a location to an error raised without one.
fn locate(err: Error, at: Option<Range>) -> Error {
    match err {
        Error::Parse {
            message,
            range: None,
        } => Error::Parse { message, range: at },
        other => other,
    }
}

fn item_range(doc: &Document, item: &Item) -> Option<Range> {
    item.as_node().and_then(|id| doc.node(id).meta.range)
}

impl<'a> Composer<'a> {
    fn new(resolver: &'a dyn TagResolver, options: &'a ParseOptions) -> Self {
        Self {
            resolver,
            options,
            documents: Vec::new(),
            doc: None,
            scope: AnchorScope::new(),
            stack: Vec::new(),
            leading: Vec::new(),
            space_before: false,
            last: None,
        }
    }

    fn doc(&mut self) -> &mut Document {
        self.doc.get_or_insert_with(Document::new)
    }

    fn event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::DocumentStart => {
                if self.doc.is_some() {
                    self.end_document()?;
                }
                self.doc = Some(Document::new());
                Ok(())
            }
            Event::DocumentEnd => self.end_document(),
            Event::Comment {
                text,
                trailing: true,
            } => {
                match self.last {
                    Some(last) => append_line(&mut self.doc().node_mut(last).meta.comment, &text),
                    None => self.leading.push(text),
                }
                Ok(())
            }
            Event::Comment { text, .. } => {
                self.leading.push(text);
                Ok(())
            }
            Event::BlankLine => {
                self.space_before = true;
                Ok(())
            }
            Event::Scalar {
                value,
                style,
                props,
                implicit,
            } => self.scalar(value, style, props, implicit),
            Event::Alias { name, range } => {
                let source = self.scope.resolve(&name, range)?;
                let mut node = Node::new(NodeKind::Alias(Alias { source }));
                node.meta.range = range;
                let id = self.start_node(node, None);
                self.last = Some(id);
                self.complete(Some(Item::Node(id)))
            }
            Event::MappingStart { props, notation } => self.start_collection(props, notation, false),
            Event::SequenceStart { props, notation } => self.start_collection(props, notation, true),
            Event::MappingEnd { end } => self.end_collection(end, false),
            Event::SequenceEnd { end } => self.end_collection(end, true),
        }
    }

    fn scalar(
        &mut self,
        value: String,
        style: ScalarType,
        props: NodeProps,
        implicit: bool,
    ) -> Result<()> {
        if implicit && props.anchor.is_none() && props.tag.is_none() {
            return self.complete(None);
        }
        let tag = props.tag.as_deref().map(normalize_tag);
        let scalar = self
            .resolver
            .construct_scalar(&value, tag.as_deref(), style)
            .map_err(|e| locate(e, props.range))?;
        let mut node = Node::new(NodeKind::Scalar(scalar));
        node.meta.tag = tag;
        node.meta.range = props.range;
        let id = self.start_node(node, props.anchor);
        self.last = Some(id);
        self.complete(Some(Item::Node(id)))
    }

    /// Add a node, handing it pending leading comments and its anchor.
    fn start_node(&mut self, mut node: Node, anchor: Option<String>) -> NodeId {
        let leading = std::mem::take(&mut self.leading);
        let space_before = std::mem::take(&mut self.space_before);
        let at_root = self.stack.is_empty();
        let doc = self.doc.get_or_insert_with(Document::new);
        for line in &leading {
            if at_root {
                append_line(&mut doc.comment_before, line);
            } else {
                append_line(&mut node.meta.comment_before, line);
            }
        }
        node.meta.space_before = space_before && !at_root;
        node.meta.anchor = anchor.clone();
        let id = doc.add_node(node);
        if let Some(name) = anchor {
            self.scope.define(&name, id);
        }
        id
    }

    fn collection_tag(
        &self,
        tag: Option<&str>,
        sequence: bool,
        range: Option<Range>,
    ) -> Result<Option<String>> {
        let Some(tag) = tag else {
            return Ok(None);
        };
        let tag = normalize_tag(tag);
        let kind = self.resolver.resolve(&tag).map_err(|e| locate(e, range))?;
        let fits = if sequence {
            matches!(kind, TagKind::Seq | TagKind::OrderedMap | TagKind::Pairs)
        } else {
            kind.is_mapping()
        };
        if !fits {
            return Err(Error::TagMismatch {
                tag: short_tag(&tag),
                found: if sequence { "seq" } else { "map" },
            });
        }
        Ok(Some(tag))
    }

    fn start_collection(&mut self, props: NodeProps, notation: Notation, sequence: bool) -> Result<()> {
        let tag = self.collection_tag(props.tag.as_deref(), sequence, props.range)?;
        let kind = if sequence {
            NodeKind::Seq(YamlSeq {
                items: Vec::new(),
                notation: Some(notation),
            })
        } else {
            NodeKind::Map(YamlMap {
                items: Vec::new(),
                notation: Some(notation),
            })
        };
        let mut node = Node::new(kind);
        node.meta.tag = tag;
        node.meta.range = props.range;
        let id = self.start_node(node, props.anchor);
        self.stack.push(if sequence {
            Frame::Seq { id }
        } else {
            Frame::Map { id, key: None }
        });
        Ok(())
    }

    fn end_collection(&mut self, end: Option<usize>, sequence: bool) -> Result<()> {
        let frame = match self.stack.pop() {
            Some(frame) if matches!(frame, Frame::Seq { .. }) == sequence => frame,
            _ => {
                return Err(Error::parse(
                    "collection end does not match an open collection",
                    None,
                ));
            }
        };
        let id = frame.id();
        if let Frame::Map { key: Some(key), .. } = frame {
            self.add_entry(id, key, None)?;
        }

        let leading = std::mem::take(&mut self.leading);
        let doc = self.doc();
        let last_child = match &doc.node(id).kind {
            NodeKind::Map(map) => map.items.last().and_then(|&p| doc.node(p).meta.range),
            NodeKind::Seq(seq) => seq.items.last().and_then(|item| item_range(doc, item)),
            _ => None,
        };
        let node = doc.node_mut(id);
        if let Some(range) = node.meta.range.as_mut() {
            range.end = end
                .or(last_child.map(|r| r.end))
                .unwrap_or(range.start)
                .max(range.start);
        }
        for line in &leading {
            append_line(&mut node.meta.comment, line);
        }

        if sequence {
            self.pairs_from_seq(id)?;
        }
        self.last = Some(id);
        self.complete(Some(Item::Node(id)))
    }

    /// Turn a `!!omap` or `!!pairs` sequence of single-pair maps into a map.
    fn pairs_from_seq(&mut self, id: NodeId) -> Result<()> {
        let doc = self.doc();
        let node = doc.node(id);
        let tag = node.meta.tag.as_deref();
        let omap = tag == Some(TagKind::OrderedMap.tag().as_str());
        if !omap && tag != Some(TagKind::Pairs.tag().as_str()) {
            return Ok(());
        }
        let Some(seq) = node.as_seq() else {
            return Ok(());
        };
        let range = node.meta.range;
        let notation = seq.notation;
        let mut pairs: Vec<NodeId> = Vec::with_capacity(seq.items.len());
        for item in &seq.items {
            let pair = item
                .as_node()
                .and_then(|entry| doc.node(entry).as_map())
                .filter(|map| map.items.len() == 1)
                .map(|map| map.items[0])
                .filter(|&pair| doc.node(pair).as_pair().is_some())
                .ok_or_else(|| {
                    Error::parse(
                        format!(
                            "Each item of !!{} must be a map with a single pair",
                            if omap { "omap" } else { "pairs" }
                        ),
                        range,
                    )
                })?;
            if omap {
                if let Some(key) = doc.node(pair).as_pair().map(|p| &p.key) {
                    let repeated = pairs.iter().any(|&seen| {
                        doc.node(seen)
                            .as_pair()
                            .is_some_and(|p| doc.key_matches(&p.key, key))
                    });
                    if repeated {
                        return Err(Error::DuplicateKey {
                            key: doc.key_text(key),
                        });
                    }
                }
            }
            pairs.push(pair);
        }
        doc.node_mut(id).kind = NodeKind::Map(YamlMap {
            items: pairs,
            notation,
        });
        Ok(())
    }

    /// Place a completed item (`None` for an implicit null) in its parent.
    fn complete(&mut self, item: Option<Item>) -> Result<()> {
        let Some(frame) = self.stack.last_mut() else {
            self.doc().contents = item;
            return Ok(());
        };
        match frame {
            Frame::Seq { id } => {
                let id = *id;
                if let NodeKind::Seq(seq) = &mut self.doc().node_mut(id).kind {
                    seq.items.push(item.unwrap_or_else(Item::null));
                }
                Ok(())
            }
            Frame::Map { key, .. } if key.is_none() => {
                *key = Some(item.unwrap_or_else(Item::null));
                Ok(())
            }
            Frame::Map { id, key } => {
                let id = *id;
                let key = key.take().unwrap_or_else(Item::null);
                self.add_entry(id, key, item)
            }
        }
    }

    fn is_merge_key(&self, key: &Item) -> bool {
        let Some(doc) = &self.doc else {
            return false;
        };
        key.as_node()
            .map(|id| doc.node(id))
            .filter(|node| node.meta.tag.is_none())
            .and_then(|node| node.as_scalar())
            .is_some_and(|scalar| {
                scalar.scalar_type == Some(ScalarType::Plain)
                    && scalar.value == ScalarValue::Str(MERGE_KEY.into())
            })
    }

    fn add_entry(&mut self, map: NodeId, key: Item, value: Option<Item>) -> Result<()> {
        let merge = self.options.merge_keys && self.is_merge_key(&key);
        let doc = self.doc();
        let start = item_range(doc, &key);
        let end = value.as_ref().and_then(|v| item_range(doc, v)).or(start);
        let range = start.zip(end).map(|(s, e)| Range::new(s.start, e.end));

        let entry = if merge {
            let value = match value {
                Some(Item::Node(alias)) if doc.node(alias).as_alias().is_some() => {
                    let mut seq = Node::new(NodeKind::Seq(YamlSeq {
                        items: vec![Item::Node(alias)],
                        notation: None,
                    }));
                    seq.meta.range = doc.node(alias).meta.range;
                    Some(Item::Node(doc.add_node(seq)))
                }
                other => other,
            };
            let mut node = Node::new(NodeKind::Merge(Merge { value }));
            node.meta.range = range;
            if let Some(key) = key.as_node() {
                let key_meta = &doc.node(key).meta;
                node.meta.comment_before = key_meta.comment_before.clone();
                node.meta.space_before = key_meta.space_before;
            }
            let id = doc.add_node(node);
            merge_sources(doc, id)?;
            tracing::debug!(map = map.index(), merge = id.index(), "merge key");
            id
        } else {
            let duplicates_allowed =
                doc.node(map).meta.tag.as_deref() == Some(TagKind::Pairs.tag().as_str());
            if !duplicates_allowed {
                let items = doc.node(map).as_map().map(|m| m.items.as_slice()).unwrap_or_default();
                let repeated = items.iter().any(|&entry| {
                    doc.node(entry)
                        .as_pair()
                        .is_some_and(|pair| doc.key_matches(&pair.key, &key))
                });
                if repeated {
                    return Err(Error::DuplicateKey {
                        key: doc.key_text(&key),
                    });
                }
            }
            let mut node = Node::new(NodeKind::Pair(Pair { key, value }));
            node.meta.range = range;
            doc.add_node(node)
        };

        if let NodeKind::Map(items) = &mut doc.node_mut(map).kind {
            items.items.push(entry);
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::parse("document ended inside a collection", None));
        }
        let leading = std::mem::take(&mut self.leading);
        let mut doc = self.doc.take().unwrap_or_default();
        for line in &leading {
            append_line(&mut doc.comment, line);
        }
        self.documents.push(doc);
        self.scope = AnchorScope::new();
        self.last = None;
        self.space_before = false;
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<Document>> {
        if self.doc.is_some() {
            self.end_document()?;
        }
        Ok(self.documents)
    }
}
