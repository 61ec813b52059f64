//! Rendering documents as YAML text.
//!
//! Each collection is written in block or flow notation as decided by
//! [`select_notation`]. Nodes reachable more than once are written in full
//! the first time, with an anchor, and as an alias afterwards. Comments and
//! blank lines are written in block context only.

use crate::anchors::plan_anchors;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::node::{Item, Merge, NodeId, NodeKind, MERGE_KEY};
use crate::notation::{select_notation, Notation, Position};
use crate::options::StringifyOptions;
use crate::parser::is_flow_indicator;
use crate::scalar::{ScalarFormat, ScalarType, ScalarValue};
use crate::tags::{short_tag, TagKind, TagResolver};
use base64::Engine;
use std::collections::{HashMap, HashSet};

/// What an item is written as.
enum Target<'i> {
    Value(&'i ScalarValue),
    Node(NodeId),
    Alias(String),
}

/// How a map is laid out, decided by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MapForm {
    Map,
    /// `? key` entries
    Set,
    /// A sequence of single-pair maps (`!!omap`, `!!pairs`)
    PairSeq,
}

/// Where a value is written in block context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root,
    MapValue,
    SeqItem,
}

#[derive(Debug, Clone, Copy)]
struct ScalarContext {
    in_flow: bool,
    implicit_key: bool,
    /// Indentation of block scalar content
    indent: usize,
}

impl ScalarContext {
    fn block_allowed(self) -> bool {
        !self.in_flow && !self.implicit_key
    }
}

/// A rendered scalar: text for the current line plus block scalar content.
struct ScalarText {
    head: String,
    body: Vec<String>,
}

impl ScalarText {
    fn inline(head: String) -> Self {
        Self {
            head,
            body: Vec::new(),
        }
    }
}

const TOP: Position = Position {
    in_flow: false,
    implicit_key: false,
};

pub(crate) struct Stringifier<'a> {
    doc: &'a Document,
    resolver: &'a dyn TagResolver,
    options: &'a StringifyOptions,
    anchors: HashMap<NodeId, String>,
    emitted: HashSet<NodeId>,
    out: String,
}

impl<'a> Stringifier<'a> {
    pub(crate) fn new(
        doc: &'a Document,
        resolver: &'a dyn TagResolver,
        options: &'a StringifyOptions,
    ) -> Self {
        Self {
            doc,
            resolver,
            options,
            anchors: HashMap::new(),
            emitted: HashSet::new(),
            out: String::new(),
        }
    }

    pub(crate) fn stringify(mut self) -> Result<String> {
        let doc = self.doc;
        doc.validate_merges()?;
        if let Some(root) = doc.root() {
            self.anchors = plan_anchors(doc, root, &self.options.anchor_prefix);
        }
        tracing::debug!(anchors = self.anchors.len(), "stringify");

        if let Some(comment) = &doc.comment_before {
            self.comment_lines(comment, 0);
        }
        if let Some(contents) = &doc.contents {
            if let Some(id) = contents.as_node() {
                if let Some(comment) = &doc.node(id).meta.comment_before {
                    self.comment_lines(comment, 0);
                }
            }
            self.value(contents, 0, TOP, Slot::Root, None)?;
        }
        if let Some(comment) = &doc.comment {
            self.comment_lines(comment, 0);
        }
        Ok(self.out)
    }

    fn width(&self) -> usize {
        self.options.indent_width()
    }

    fn pad(&mut self, indent: usize) {
        self.out.extend(std::iter::repeat_n(' ', indent));
    }

    fn comment_lines(&mut self, comment: &str, indent: usize) {
        for line in comment.split('\n') {
            self.pad(indent);
            self.out.push('#');
            self.out.push_str(line);
            self.out.push('\n');
        }
    }

    fn line_comment(&mut self, comment: Option<&str>) {
        if let Some(comment) = comment {
            self.out.push_str(" #");
            self.out.push_str(&comment.replace('\n', " "));
        }
    }

    fn blank_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    // Targets and props

    fn target<'i>(&self, item: &'i Item) -> Result<Target<'i>> {
        let id = match item {
            Item::Value(value) => return Ok(Target::Value(value)),
            Item::Node(id) => *id,
        };
        let node = self.doc.node(id);
        let id = match &node.kind {
            NodeKind::Alias(alias) => {
                self.doc
                    .resolve_alias(alias.source)
                    .ok_or_else(|| Error::UnresolvedAlias {
                        name: node.meta.anchor.clone().unwrap_or_default(),
                        range: node.meta.range,
                    })?
            }
            _ => id,
        };
        if self.emitted.contains(&id) {
            if let Some(name) = self.anchors.get(&id) {
                return Ok(Target::Alias(name.clone()));
            }
        }
        Ok(Target::Node(id))
    }

    /// `&anchor !tag` of a node about to be written in full.
    fn props(&self, id: NodeId) -> Result<String> {
        let node = self.doc.node(id);
        let mut parts = Vec::new();
        if let Some(name) = self.anchors.get(&id) {
            parts.push(format!("&{}", name));
        }
        match &node.meta.tag {
            Some(tag) => {
                self.resolver.resolve(tag)?;
                parts.push(short_tag(tag));
            }
            None => {
                if let Some(scalar) = node.as_scalar() {
                    if matches!(scalar.value, ScalarValue::Binary(_)) {
                        parts.push(short_tag(&TagKind::Binary.tag()));
                    }
                }
            }
        }
        Ok(parts.join(" "))
    }

    fn map_form(&self, id: NodeId) -> Result<MapForm> {
        let Some(tag) = &self.doc.node(id).meta.tag else {
            return Ok(MapForm::Map);
        };
        Ok(match self.resolver.resolve(tag)? {
            TagKind::Set => MapForm::Set,
            TagKind::OrderedMap | TagKind::Pairs => MapForm::PairSeq,
            _ => MapForm::Map,
        })
    }

    fn is_block(&self, id: NodeId, position: Position) -> bool {
        let (declared, empty) = match &self.doc.node(id).kind {
            NodeKind::Map(map) => (map.notation, map.items.is_empty()),
            NodeKind::Seq(seq) => (seq.notation, seq.items.is_empty()),
            _ => return false,
        };
        !empty
            && select_notation(declared, position, self.options.collection_style) == Notation::Block
    }

    fn renders_block(&self, item: &Item) -> bool {
        matches!(self.target(item), Ok(Target::Node(id)) if self.is_block(id, TOP))
    }

    // Leading comments and blank lines

    fn has_leading(&self, item: &Item) -> bool {
        item.as_node().is_some_and(|id| {
            let meta = &self.doc.node(id).meta;
            meta.comment_before.is_some() || meta.space_before
        })
    }

    /// Nodes whose leading comments go in front of a map entry's line.
    fn entry_lead_nodes(&self, entry: NodeId) -> Vec<NodeId> {
        let mut nodes = vec![entry];
        if let NodeKind::Pair(pair) = &self.doc.node(entry).kind {
            nodes.extend(pair.key.as_node());
            if let Some(value) = &pair.value {
                if !self.renders_block(value) {
                    nodes.extend(value.as_node());
                }
            }
        }
        nodes
    }

    fn write_leading(&mut self, nodes: &[NodeId], indent: usize) {
        let doc = self.doc;
        if nodes.iter().any(|&id| doc.node(id).meta.space_before) {
            self.blank_line();
        }
        for &id in nodes {
            if let Some(comment) = &doc.node(id).meta.comment_before {
                self.comment_lines(comment, indent);
            }
        }
    }

    /// Whether a collection can start on the line of its `- `.
    fn compact(&self, id: NodeId) -> bool {
        match &self.doc.node(id).kind {
            NodeKind::Map(map) => map.items.first().is_none_or(|&entry| {
                let doc = self.doc;
                !self
                    .entry_lead_nodes(entry)
                    .iter()
                    .any(|&n| doc.node(n).meta.comment_before.is_some() || doc.node(n).meta.space_before)
            }),
            NodeKind::Seq(seq) => seq.items.first().is_none_or(|item| !self.has_leading(item)),
            _ => false,
        }
    }

    // Block output

    /// Write `item` after the prefix already on the current line (`key:`,
    /// `-`, or nothing at the root). Nested block content goes at `indent`.
    fn value(
        &mut self,
        item: &Item,
        indent: usize,
        position: Position,
        slot: Slot,
        line_comment: Option<&str>,
    ) -> Result<()> {
        let doc = self.doc;
        let ctx = ScalarContext {
            in_flow: position.in_flow,
            implicit_key: position.implicit_key,
            indent: if slot == Slot::Root { self.width() } else { indent },
        };
        let id = match self.target(item)? {
            Target::Node(id) => id,
            Target::Alias(name) => {
                let comment = joined_comment(line_comment, item_comment(doc, item));
                let text = ScalarText::inline(format!("*{}", name));
                self.write_scalar(slot, "", text, comment.as_deref(), indent);
                return Ok(());
            }
            Target::Value(value) => {
                let props = match value {
                    ScalarValue::Binary(_) => short_tag(&TagKind::Binary.tag()),
                    _ => String::new(),
                };
                let text = self.scalar_text(value, None, None, None, ctx)?;
                self.write_scalar(slot, &props, text, line_comment, indent);
                return Ok(());
            }
        };

        let node = doc.node(id);
        match &node.kind {
            NodeKind::Map(_) | NodeKind::Seq(_) if self.is_block(id, position) => {
                self.block_collection(id, indent, slot, line_comment)
            }
            NodeKind::Pair(_) if slot != Slot::MapValue => {
                self.emitted.insert(id);
                if slot == Slot::SeqItem {
                    self.pad(self.width() - 1);
                }
                self.entry(id, indent, MapForm::Map)
            }
            NodeKind::Scalar(scalar) => {
                self.emitted.insert(id);
                let props = self.props(id)?;
                let text = self.scalar_text(
                    &scalar.value,
                    node.meta.tag.as_deref(),
                    scalar.format,
                    scalar.scalar_type,
                    ctx,
                )?;
                let comment = joined_comment(line_comment, node.meta.comment.as_deref());
                self.write_scalar(slot, &props, text, comment.as_deref(), indent);
                Ok(())
            }
            _ => {
                let text = self.flow_node(id, position)?;
                let comment = joined_comment(line_comment, node.meta.comment.as_deref());
                self.write_scalar(slot, "", ScalarText::inline(text), comment.as_deref(), indent);
                Ok(())
            }
        }
    }

    fn write_scalar(
        &mut self,
        slot: Slot,
        props: &str,
        text: ScalarText,
        comment: Option<&str>,
        indent: usize,
    ) {
        if slot != Slot::Root {
            self.out.push(' ');
        }
        if !props.is_empty() {
            self.out.push_str(props);
            self.out.push(' ');
        }
        self.out.push_str(&text.head);
        self.line_comment(comment);
        self.out.push('\n');
        let body_indent = if slot == Slot::Root { self.width() } else { indent };
        for line in text.body {
            if !line.is_empty() {
                self.pad(body_indent);
                self.out.push_str(&line);
            }
            self.out.push('\n');
        }
    }

    fn block_collection(
        &mut self,
        id: NodeId,
        indent: usize,
        slot: Slot,
        line_comment: Option<&str>,
    ) -> Result<()> {
        self.emitted.insert(id);
        let props = self.props(id)?;
        let doc = self.doc;
        let meta = &doc.node(id).meta;

        if slot == Slot::SeqItem && props.is_empty() && line_comment.is_none() && self.compact(id) {
            self.pad(self.width() - 1);
            return self.collection_body(id, indent, true);
        }

        if !props.is_empty() {
            if slot != Slot::Root {
                self.out.push(' ');
            }
            self.out.push_str(&props);
        }
        self.line_comment(line_comment);
        if slot != Slot::Root || !props.is_empty() || line_comment.is_some() {
            self.out.push('\n');
        }
        if slot == Slot::MapValue {
            if let Some(comment) = &meta.comment_before {
                self.comment_lines(comment, indent);
            }
        }
        self.collection_body(id, indent, false)
    }

    /// Entries of a block collection at `indent`. With `first_inline`, the
    /// first entry continues the current line.
    fn collection_body(&mut self, id: NodeId, indent: usize, first_inline: bool) -> Result<()> {
        let doc = self.doc;
        let node = doc.node(id);
        let width = self.width();
        match &node.kind {
            NodeKind::Map(map) => {
                let form = self.map_form(id)?;
                for (i, &entry) in map.items.iter().enumerate() {
                    let inline = first_inline && i == 0;
                    if !inline {
                        let lead = self.entry_lead_nodes(entry);
                        self.write_leading(&lead, indent);
                        self.pad(indent);
                    }
                    if form == MapForm::PairSeq {
                        self.out.push('-');
                        self.pad(width - 1);
                        self.entry(entry, indent + width, MapForm::Map)?;
                    } else {
                        self.entry(entry, indent, form)?;
                    }
                }
            }
            NodeKind::Seq(seq) => {
                for (i, item) in seq.items.iter().enumerate() {
                    if !(first_inline && i == 0) {
                        let lead: Vec<NodeId> = item.as_node().into_iter().collect();
                        self.write_leading(&lead, indent);
                        self.pad(indent);
                    }
                    self.out.push('-');
                    self.value(item, indent + width, TOP, Slot::SeqItem, None)?;
                }
            }
            _ => {}
        }
        if let Some(comment) = &node.meta.comment {
            self.comment_lines(comment, indent);
        }
        Ok(())
    }

    /// One map entry whose key starts at column `indent`, already padded.
    fn entry(&mut self, entry: NodeId, indent: usize, form: MapForm) -> Result<()> {
        let doc = self.doc;
        let node = doc.node(entry);
        match &node.kind {
            NodeKind::Merge(merge) => {
                let text = self.merge_text(merge)?;
                self.out.push_str(MERGE_KEY);
                self.out.push_str(": ");
                self.out.push_str(&text);
                self.line_comment(node.meta.comment.as_deref());
                self.out.push('\n');
                Ok(())
            }
            NodeKind::Pair(pair) => {
                let key = self.flow(&pair.key, Position { in_flow: false, implicit_key: true })?;
                let key_comment =
                    joined_comment(node.meta.comment.as_deref(), item_comment(doc, &pair.key));
                let key_comment = key_comment.as_deref();
                if form == MapForm::Set {
                    self.out.push_str("? ");
                    self.out.push_str(&key);
                    self.line_comment(key_comment);
                    self.out.push('\n');
                    return Ok(());
                }
                self.out.push_str(&key);
                if key.starts_with('*') {
                    self.out.push(' ');
                }
                self.out.push(':');
                match &pair.value {
                    None => {
                        self.line_comment(key_comment);
                        self.out.push('\n');
                        Ok(())
                    }
                    Some(value) => {
                        self.value(value, indent + self.width(), TOP, Slot::MapValue, key_comment)
                    }
                }
            }
            other => Err(Error::NotAPair {
                found: other.kind_name(),
            }),
        }
    }

    // Flow output

    fn flow(&mut self, item: &Item, position: Position) -> Result<String> {
        match self.target(item)? {
            Target::Alias(name) => Ok(format!("*{}", name)),
            Target::Value(value) => {
                let ctx = ScalarContext {
                    in_flow: position.in_flow,
                    implicit_key: position.implicit_key,
                    indent: 0,
                };
                let text = self.scalar_text(value, None, None, None, ctx)?.head;
                Ok(match value {
                    ScalarValue::Binary(_) => format!("{} {}", short_tag(&TagKind::Binary.tag()), text),
                    _ => text,
                })
            }
            Target::Node(id) => self.flow_node(id, position),
        }
    }

    fn flow_node(&mut self, id: NodeId, position: Position) -> Result<String> {
        self.emitted.insert(id);
        let props = self.props(id)?;
        let doc = self.doc;
        let node = doc.node(id);
        let inner = Position {
            in_flow: true,
            implicit_key: false,
        };
        let text = match &node.kind {
            NodeKind::Scalar(scalar) => {
                let ctx = ScalarContext {
                    in_flow: position.in_flow,
                    implicit_key: position.implicit_key,
                    indent: 0,
                };
                self.scalar_text(
                    &scalar.value,
                    node.meta.tag.as_deref(),
                    scalar.format,
                    scalar.scalar_type,
                    ctx,
                )?
                .head
            }
            NodeKind::Map(map) => {
                let form = self.map_form(id)?;
                let mut entries = Vec::with_capacity(map.items.len());
                for &entry in &map.items {
                    let text = self.flow_entry(entry, form)?;
                    entries.push(if form == MapForm::PairSeq {
                        format!("{{ {} }}", text)
                    } else {
                        text
                    });
                }
                if form == MapForm::PairSeq {
                    bracketed('[', ']', &entries)
                } else {
                    bracketed('{', '}', &entries)
                }
            }
            NodeKind::Seq(seq) => {
                let mut items = Vec::with_capacity(seq.items.len());
                for item in &seq.items {
                    items.push(self.flow(item, inner)?);
                }
                bracketed('[', ']', &items)
            }
            NodeKind::Pair(_) => format!("{{ {} }}", self.flow_entry(id, MapForm::Map)?),
            NodeKind::Merge(_) | NodeKind::Alias(_) => {
                return Err(Error::invalid_merge(
                    "merge pairs are only valid in a map",
                    node.meta.range,
                ));
            }
        };
        Ok(if props.is_empty() {
            text
        } else {
            format!("{} {}", props, text)
        })
    }

    fn flow_entry(&mut self, entry: NodeId, form: MapForm) -> Result<String> {
        let doc = self.doc;
        let node = doc.node(entry);
        match &node.kind {
            NodeKind::Merge(merge) => Ok(format!("{}: {}", MERGE_KEY, self.merge_text(merge)?)),
            NodeKind::Pair(pair) => {
                let key = self.flow(
                    &pair.key,
                    Position {
                        in_flow: true,
                        implicit_key: true,
                    },
                )?;
                let separator = if key.starts_with('*') { " :" } else { ":" };
                match &pair.value {
                    Some(value) if form != MapForm::Set => {
                        let value = self.flow(
                            value,
                            Position {
                                in_flow: true,
                                implicit_key: false,
                            },
                        )?;
                        Ok(format!("{}{} {}", key, separator, value))
                    }
                    _ => Ok(key),
                }
            }
            other => Err(Error::NotAPair {
                found: other.kind_name(),
            }),
        }
    }

    /// `*a` for a single source, `[ *a, *b ]` otherwise.
    fn merge_text(&mut self, merge: &Merge) -> Result<String> {
        let inner = Position {
            in_flow: true,
            implicit_key: false,
        };
        let Some(value) = &merge.value else {
            return Ok("null".to_string());
        };
        let doc = self.doc;
        let items = match value.as_node().map(|id| (id, &doc.node(id).kind)) {
            Some((id, NodeKind::Seq(seq))) => {
                self.emitted.insert(id);
                seq.items.clone()
            }
            _ => return self.flow(value, inner),
        };
        let mut sources = Vec::with_capacity(items.len());
        for item in &items {
            sources.push(self.flow(item, inner)?);
        }
        Ok(if sources.len() == 1 {
            sources.remove(0)
        } else {
            bracketed('[', ']', &sources)
        })
    }

    // Scalars

    fn scalar_text(
        &self,
        value: &ScalarValue,
        tag: Option<&str>,
        format: Option<ScalarFormat>,
        hint: Option<ScalarType>,
        ctx: ScalarContext,
    ) -> Result<ScalarText> {
        let kind = match tag {
            Some(tag) => self.resolver.resolve(tag)?,
            None => self.resolver.implicit_kind(value),
        };
        let honors_type = matches!(kind, TagKind::Str | TagKind::Binary);
        let head = match value {
            ScalarValue::Null => "null".to_string(),
            ScalarValue::Bool(b) => b.to_string(),
            ScalarValue::Int(i) if kind == TagKind::Int => self.formatted_int(*i, format),
            ScalarValue::Int(i) => i.to_string(),
            ScalarValue::Float(x) => float_text(*x),
            ScalarValue::Str(s) => {
                return Ok(self.string_text(s, hint.filter(|_| honors_type), tag.is_some(), ctx));
            }
            ScalarValue::Binary(bytes) => {
                return Ok(self.binary_text(bytes, hint.filter(|_| honors_type), ctx));
            }
        };
        Ok(ScalarText::inline(head))
    }

    /// `i` in its recorded format, or in decimal when the resolver would not
    /// read that format back as the same integer.
    fn formatted_int(&self, i: i64, format: Option<ScalarFormat>) -> String {
        let text = int_text(i, format);
        let reads_back = self
            .resolver
            .construct_scalar(&text, None, ScalarType::Plain)
            .is_ok_and(|scalar| scalar.value == ScalarValue::Int(i));
        if reads_back { text } else { i.to_string() }
    }

    /// Whether `s` written plain and untagged reads back as the same string.
    fn reads_back_as_str(&self, s: &str) -> bool {
        self.resolver
            .construct_scalar(s, None, ScalarType::Plain)
            .is_ok_and(|scalar| matches!(&scalar.value, ScalarValue::Str(v) if v == s))
    }

    fn string_text(
        &self,
        s: &str,
        hint: Option<ScalarType>,
        tagged: bool,
        ctx: ScalarContext,
    ) -> ScalarText {
        let block_ok = ctx.block_allowed() && block_safe(s);
        match hint {
            Some(ScalarType::QuoteDouble) => return ScalarText::inline(double_quoted(s)),
            Some(ScalarType::QuoteSingle) if single_safe(s) => {
                return ScalarText::inline(single_quoted(s));
            }
            Some(style) if style.is_block() && block_ok => return block_text(s, style),
            _ => {}
        }
        if plain_safe(s, ctx.in_flow) && (tagged || self.reads_back_as_str(s)) {
            ScalarText::inline(s.to_string())
        } else if block_ok && s.contains('\n') {
            block_text(s, ScalarType::BlockLiteral)
        } else if single_safe(s) {
            ScalarText::inline(single_quoted(s))
        } else {
            ScalarText::inline(double_quoted(s))
        }
    }

    fn binary_text(&self, bytes: &[u8], hint: Option<ScalarType>, ctx: ScalarContext) -> ScalarText {
        let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
        if encoded.is_empty() {
            return ScalarText::inline("\"\"".to_string());
        }
        let width = self.options.line_width.saturating_sub(ctx.indent).max(20);
        let wants_block = hint.is_some_and(ScalarType::is_block) || encoded.len() > width;
        if !(ctx.block_allowed() && wants_block) {
            return ScalarText::inline(encoded);
        }
        ScalarText {
            head: "|-".to_string(),
            body: encoded
                .as_bytes()
                .chunks(width)
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect(),
        }
    }
}

fn item_comment<'d>(doc: &'d Document, item: &Item) -> Option<&'d str> {
    item.as_node()
        .and_then(|id| doc.node(id).meta.comment.as_deref())
}

/// Both comments on one line, outer first.
fn joined_comment(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
    match (outer, inner) {
        (Some(outer), Some(inner)) => Some(format!("{} #{}", outer, inner)),
        (outer, inner) => outer.or(inner).map(str::to_string),
    }
}

fn bracketed(open: char, close: char, items: &[String]) -> String {
    if items.is_empty() {
        format!("{}{}", open, close)
    } else {
        format!("{} {} {}", open, items.join(", "), close)
    }
}

fn int_text(i: i64, format: Option<ScalarFormat>) -> String {
    match format {
        Some(ScalarFormat::Bin) if i >= 0 => format!("0b{:b}", i),
        Some(ScalarFormat::Hex) if i >= 0 => format!("0x{:x}", i),
        Some(ScalarFormat::Oct) if i >= 0 => format!("0o{:o}", i),
        Some(ScalarFormat::Time) => sexagesimal(i),
        _ => i.to_string(),
    }
}

/// Base 60 with `:` separators, e.g. `1:30:00`.
fn sexagesimal(i: i64) -> String {
    let mut rest = i.unsigned_abs();
    let mut parts = Vec::new();
    loop {
        parts.push(rest % 60);
        rest /= 60;
        if rest == 0 {
            break;
        }
    }
    let mut text = String::from(if i < 0 { "-" } else { "" });
    for (n, part) in parts.iter().rev().enumerate() {
        if n == 0 {
            text.push_str(&part.to_string());
        } else {
            text.push_str(&format!(":{:02}", part));
        }
    }
    text
}

fn float_text(x: f64) -> String {
    if x.is_nan() {
        ".nan".to_string()
    } else if x.is_infinite() {
        let text = if x > 0.0 { ".inf" } else { "-.inf" };
        text.to_string()
    } else {
        // Debug keeps a `.0` on integral values and switches to exponents
        // for very large or small ones.
        format!("{:?}", x)
    }
}

/// Whether `s` can be written without quotes and read back unchanged.
///
/// Type resolution (`true`, `12`, `null`) is checked separately against the
/// resolver; this covers the syntax only.
fn plain_safe(s: &str, in_flow: bool) -> bool {
    let Some(first) = s.chars().next() else {
        return false;
    };
    if s.starts_with([' ', '\t'])
        || s.ends_with([' ', '\t', ':'])
        || s.starts_with("---")
        || s.starts_with("...")
        || s.chars().any(char::is_control)
    {
        return false;
    }
    if matches!(
        first,
        '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@' | '`' | '#'
    ) || is_flow_indicator(first)
    {
        return false;
    }
    if matches!(first, '-' | '?' | ':') {
        let second = s[1..].chars().next();
        if second.is_none_or(|c| c == ' ' || is_flow_indicator(c)) {
            return false;
        }
    }
    if s.contains(": ") || s.contains(" #") {
        return false;
    }
    if in_flow && (s.contains(is_flow_indicator) || s.contains(':')) {
        return false;
    }
    // YAML 1.1 booleans, still read as such by many consumers
    ![
        "yes", "Yes", "YES", "no", "No", "NO", "on", "On", "ON", "off", "Off", "OFF",
    ]
    .contains(&s)
}

fn single_safe(s: &str) -> bool {
    !s.chars().any(char::is_control)
}

/// Whether `s` can be a `|` or `>` block scalar.
fn block_safe(s: &str) -> bool {
    let content = s.trim_end_matches('\n');
    !content.is_empty()
        && !content.starts_with([' ', '\t'])
        && !content.chars().any(|c| c.is_control() && c != '\n' && c != '\t')
}

fn block_text(s: &str, style: ScalarType) -> ScalarText {
    let content = s.trim_end_matches('\n');
    let trailing = s.len() - content.len();
    let chomp = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };
    let indicator = if style == ScalarType::BlockFolded && !content.contains('\n') {
        '>'
    } else {
        '|'
    };
    let mut body: Vec<String> = content.split('\n').map(str::to_string).collect();
    body.extend(std::iter::repeat_n(String::new(), trailing.saturating_sub(1)));
    ScalarText {
        head: format!("{}{}", indicator, chomp),
        body,
    }
}

fn single_quoted(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
