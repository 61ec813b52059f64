//! YAML text to documents, through the `yaml-rust2` event parser.
//!
//! `yaml-rust2` reports node positions but not anchor names, comments or
//! blank lines. Those are recovered from the source text between events:
//! everything between the end of one node and the start of the next is
//! either syntax (`:`, `-`, `,`), node props (`&anchor`, `!tag`), a comment
//! or whitespace.

use crate::compose::compose;
use crate::document::Document;
use crate::error::{Error, Result};
use crate::events::{Event, NodeProps};
use crate::notation::Notation;
use crate::options::ParseOptions;
use crate::range::Range;
use crate::scalar::ScalarType;
use crate::tags::{CoreSchema, TagResolver};
use std::collections::HashMap;
use yaml_rust2::parser::{Event as RawEvent, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};
use yaml_rust2::ScanError;

/// Parse a single YAML document with the core schema.
///
/// An empty source gives an empty document.
///
/// # Example
///
/// ```rust
/// use yaml_document::{parse, Item, ParseOptions};
///
/// let doc = parse("title: My Document", &ParseOptions::default()).unwrap();
/// let title = doc.get_path(&[Item::from("title")], false);
/// assert_eq!(title, Some(Item::from("My Document")));
/// ```
///
/// # Errors
///
/// Returns an error if the YAML is invalid, if it contains more than one
/// document, or if composition fails (see [`compose`]).
pub fn parse(text: &str, options: &ParseOptions) -> Result<Document> {
    parse_with(text, &CoreSchema::new(), options)
}

/// Parse a single document with a custom tag resolver.
pub fn parse_with(
    text: &str,
    resolver: &dyn TagResolver,
    options: &ParseOptions,
) -> Result<Document> {
    let mut documents = parse_all_with(text, resolver, options)?;
    match documents.len() {
        0 => Ok(Document::new()),
        1 => Ok(documents.remove(0)),
        n => Err(Error::parse(
            format!("Source contains {} documents; use parse_all to read them all", n),
            None,
        )),
    }
}

/// Parse every document of a multi-document stream.
pub fn parse_all(text: &str, options: &ParseOptions) -> Result<Vec<Document>> {
    parse_all_with(text, &CoreSchema::new(), options)
}

pub fn parse_all_with(
    text: &str,
    resolver: &dyn TagResolver,
    options: &ParseOptions,
) -> Result<Vec<Document>> {
    compose(scan_events(text)?, resolver, options)
}

/// The event stream of `text`, including comment and blank-line events.
pub fn scan_events(text: &str) -> Result<Vec<Event>> {
    let lines = LineIndex::new(text);
    let mut parser = Parser::new_from_str(text);
    let mut collector = EventCollector::new(text, &lines);

    parser
        .load(&mut collector, true)
        .map_err(|err| scan_error(text, &lines, &err))?;

    Ok(collector.events)
}

fn scan_error(text: &str, lines: &LineIndex, err: &ScanError) -> Error {
    let at = lines.offset(text, err.marker());
    if err.info().contains("unknown anchor") {
        let name = name_at(text, at + 1);
        let range = Range::new(at, at + 1 + name.len());
        return Error::UnresolvedAlias {
            name: name.to_string(),
            range: Some(range),
        };
    }
    Error::parse(err.info(), Some(Range::new(at, at)))
}

/// Byte offsets of line starts.
///
/// Marker lines and columns are reliable, while `Marker::index` drifts
/// after block scalars with multi-byte content.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    fn offset(&self, text: &str, marker: &Marker) -> usize {
        let Some(&start) = self.starts.get(marker.line().saturating_sub(1)) else {
            return text.len();
        };
        text[start..]
            .char_indices()
            .nth(marker.col())
            .map_or(text.len(), |(i, _)| start + i)
    }

    fn line_start(&self, offset: usize) -> usize {
        let index = self.starts.partition_point(|&start| start <= offset);
        self.starts[index.saturating_sub(1)]
    }
}

/// An anchor or alias name starting at `at`.
fn name_at(text: &str, at: usize) -> &str {
    let rest = text.get(at..).unwrap_or_default();
    let len = rest
        .find(|c: char| c.is_whitespace() || is_flow_indicator(c))
        .unwrap_or(rest.len());
    &rest[..len]
}

pub(crate) fn is_flow_indicator(c: char) -> bool {
    matches!(c, ',' | '[' | ']' | '{' | '}')
}

fn scalar_type(style: TScalarStyle) -> ScalarType {
    match style {
        TScalarStyle::Plain => ScalarType::Plain,
        TScalarStyle::SingleQuoted => ScalarType::QuoteSingle,
        TScalarStyle::DoubleQuoted => ScalarType::QuoteDouble,
        TScalarStyle::Literal => ScalarType::BlockLiteral,
        TScalarStyle::Folded => ScalarType::BlockFolded,
    }
}

fn tag_text(tag: Tag) -> String {
    format!("{}{}", tag.handle, tag.suffix)
}

/// A line of the text between two events that matters to the composer.
enum GapLine {
    Blank,
    Comment { column: usize, text: String },
}

/// A collection that has started and not yet ended.
struct Open {
    flow: bool,
    /// Written with `{`/`[`; false for an implicit map inside a flow sequence
    bracketed: bool,
    column: usize,
}

/// Receiver that turns `yaml-rust2` events into [`Event`]s.
struct EventCollector<'a> {
    text: &'a str,
    lines: &'a LineIndex,

    /// Events produced so far
    events: Vec<Event>,

    /// End of the text already accounted for
    cursor: usize,

    open: Vec<Open>,

    /// End events of block collections, held back until the comments in
    /// front of the next token are known; each with its collection's column
    pending_ends: Vec<(Event, usize)>,

    /// Offset of the collection start event just emitted
    last_start: Option<usize>,

    anchor_names: HashMap<usize, String>,
}

impl<'a> EventCollector<'a> {
    fn new(text: &'a str, lines: &'a LineIndex) -> Self {
        Self {
            text,
            lines,
            events: Vec::new(),
            cursor: 0,
            open: Vec::new(),
            pending_ends: Vec::new(),
            last_start: None,
            anchor_names: HashMap::new(),
        }
    }

    /// Account for the text between the cursor and `pos`.
    ///
    /// Emits a trailing comment for the previous node, distributes comment
    /// lines between held-back end events and what follows, and returns the
    /// last anchor name written in the gap.
    fn gap(&mut self, pos: usize) -> Option<String> {
        let text = self.text;
        let start = self.cursor;
        let pos = pos.max(start);
        let after_content = !text[self.lines.line_start(start)..start].trim().is_empty();

        let mut anchor = None;
        let mut lines = Vec::new();
        let segments: Vec<&str> = text[start..pos].split('\n').collect();
        let last = segments.len() - 1;
        let mut seg_start = start;
        for (i, segment) in segments.iter().enumerate() {
            let comment_at = self.comment_start(seg_start, segment);
            let code = &segment[..comment_at.unwrap_or(segment.len())];
            for token in code.split(|c: char| c.is_whitespace() || is_flow_indicator(c)) {
                if let Some(name) = token.strip_prefix('&').filter(|n| !n.is_empty()) {
                    anchor = Some(name.to_string());
                }
            }

            let full_line = (i > 0 || !after_content) && i < last;
            if i == 0 && after_content {
                if let Some(at) = comment_at {
                    let text = segment[at + 1..].trim_end().to_string();
                    self.events.push(Event::Comment {
                        text,
                        trailing: true,
                    });
                }
            } else if full_line {
                if let Some(at) = comment_at {
                    let line_start = self.lines.line_start(seg_start);
                    lines.push(GapLine::Comment {
                        column: text[line_start..seg_start + at].chars().count(),
                        text: segment[at + 1..].trim_end().to_string(),
                    });
                } else if segment.trim().is_empty() {
                    lines.push(GapLine::Blank);
                }
            }
            seg_start += segment.len() + 1;
        }

        self.cursor = pos;
        self.flush(lines);
        anchor
    }

    /// Offset within `segment` of a `#` that starts a comment.
    fn comment_start(&self, seg_start: usize, segment: &str) -> Option<usize> {
        segment.match_indices('#').map(|(i, _)| i).find(|&i| {
            let abs = seg_start + i;
            abs == 0 || self.text.as_bytes()[abs - 1].is_ascii_whitespace()
        })
    }

    /// Emit held-back end events, each preceded by the comment lines
    /// indented at least as deep as its collection.
    fn flush(&mut self, lines: Vec<GapLine>) {
        let mut lines = lines.into_iter().peekable();
        for (end, column) in std::mem::take(&mut self.pending_ends) {
            while let Some(GapLine::Comment { column: at, .. }) = lines.peek() {
                if *at < column {
                    break;
                }
                if let Some(line) = lines.next() {
                    self.emit_line(line);
                }
            }
            self.events.push(end);
        }
        for line in lines {
            self.emit_line(line);
        }
    }

    fn emit_line(&mut self, line: GapLine) {
        self.events.push(match line {
            GapLine::Blank => Event::BlankLine,
            GapLine::Comment { text, .. } => Event::Comment {
                text,
                trailing: false,
            },
        });
    }

    /// Anchor name for a parser anchor id, preferring what the source says.
    fn anchor_name(&mut self, id: usize, written: Option<String>) -> Option<String> {
        if id == 0 {
            return None;
        }
        let name = written.unwrap_or_else(|| format!("anchor{}", id));
        self.anchor_names.insert(id, name.clone());
        Some(name)
    }

    fn scalar_end(&self, pos: usize, value: &str, style: TScalarStyle) -> usize {
        match style {
            TScalarStyle::SingleQuoted => {
                let mut i = pos + 1;
                while let Some(found) = self.text[i..].find('\'') {
                    let at = i + found;
                    if self.text[at + 1..].starts_with('\'') {
                        i = at + 2;
                    } else {
                        return at + 1;
                    }
                }
                self.text.len()
            }
            TScalarStyle::DoubleQuoted => {
                let mut escaped = false;
                for (i, c) in self.text[pos + 1..].char_indices() {
                    match c {
                        _ if escaped => escaped = false,
                        '\\' => escaped = true,
                        '"' => return pos + 1 + i + 1,
                        _ => {}
                    }
                }
                self.text.len()
            }
            TScalarStyle::Literal | TScalarStyle::Folded => self.block_scalar_end(pos, value),
            TScalarStyle::Plain => {
                let mut end = pos;
                for word in value.split_whitespace() {
                    match self.text[end..].find(word) {
                        Some(found) => end += found + word.len(),
                        None => break,
                    }
                }
                end
            }
        }
    }

    /// End of the last non-blank content line of a `|` or `>` scalar.
    fn block_scalar_end(&self, pos: usize, value: &str) -> usize {
        let header_end = self.text[pos..].find('\n').map_or(self.text.len(), |i| pos + i);
        if value.is_empty() {
            return header_end;
        }
        let mut end = header_end;
        let mut indent = None;
        let mut line_start = header_end + 1;
        while line_start < self.text.len() {
            let line_end = self.text[line_start..]
                .find('\n')
                .map_or(self.text.len(), |i| line_start + i);
            let line = &self.text[line_start..line_end];
            if !line.trim().is_empty() {
                let width = line.len() - line.trim_start_matches(' ').len();
                match indent {
                    None => indent = Some(width),
                    Some(required) if width < required => break,
                    Some(_) => {}
                }
                end = line_end;
            }
            line_start = line_end + 1;
        }
        end
    }

    fn start_collection(
        &mut self,
        pos: usize,
        column: usize,
        anchor_id: usize,
        tag: Option<Tag>,
        sequence: bool,
    ) {
        // A map whose first key is a flow collection starts at the same
        // offset as that key. It is a block map, or an implicit map
        // inside a flow sequence.
        if self.last_start == Some(pos) {
            let parent_flow = self.open.iter().rev().nth(1).is_some_and(|open| open.flow);
            if let Some(open) = self.open.last_mut() {
                open.bracketed = false;
                open.flow = parent_flow;
            }
            if !parent_flow {
                if let Some(Event::MappingStart { notation, .. }) = self.events.last_mut() {
                    *notation = Notation::Block;
                }
            }
        }
        let in_flow = self.open.last().is_some_and(|open| open.flow);

        let bracket = if sequence { '[' } else { '{' };
        let bracketed = self.text[pos..].starts_with(bracket);
        let flow = in_flow || bracketed;

        let written = self.gap(pos);
        let props = NodeProps {
            anchor: self.anchor_name(anchor_id, written),
            tag: tag.map(tag_text),
            range: Some(Range::new(pos, pos)),
        };
        if bracketed {
            self.cursor = pos + 1;
        }
        self.open.push(Open {
            flow,
            bracketed,
            column,
        });
        let notation = if flow { Notation::Flow } else { Notation::Block };
        self.events.push(if sequence {
            Event::SequenceStart { props, notation }
        } else {
            Event::MappingStart { props, notation }
        });
        self.last_start = Some(pos);
    }

    fn end_collection(&mut self, pos: usize, sequence: bool) {
        let open = self.open.pop().unwrap_or(Open {
            flow: false,
            bracketed: false,
            column: 0,
        });
        let end = |end: Option<usize>| {
            if sequence {
                Event::SequenceEnd { end }
            } else {
                Event::MappingEnd { end }
            }
        };
        if open.bracketed {
            self.gap(pos);
            self.cursor = (pos + 1).min(self.text.len());
            self.events.push(end(Some(self.cursor)));
        } else if open.flow {
            self.events.push(end(None));
        } else {
            self.pending_ends.push((end(None), open.column));
        }
    }
}

impl<'a> MarkedEventReceiver for EventCollector<'a> {
    fn on_event(&mut self, ev: RawEvent, marker: Marker) {
        let pos = self.lines.offset(self.text, &marker);
        let last_start = self.last_start.take();

        match ev {
            RawEvent::Nothing | RawEvent::StreamStart => {}

            RawEvent::StreamEnd => {
                self.gap(self.text.len());
            }

            RawEvent::DocumentStart => {
                self.events.push(Event::DocumentStart);
                self.gap(pos);
                if self.text[pos..].starts_with("---") {
                    self.cursor = pos + 3;
                }
            }

            RawEvent::DocumentEnd => {
                self.gap(pos);
                if self.text[pos..].starts_with("...") {
                    self.cursor = pos + 3;
                }
                self.events.push(Event::DocumentEnd);
            }

            RawEvent::Scalar(value, style, anchor_id, tag) => {
                // an empty plain scalar is never written out
                let implicit = style == TScalarStyle::Plain && value.is_empty();
                if implicit && anchor_id == 0 && tag.is_none() {
                    self.events.push(Event::Scalar {
                        value,
                        style: ScalarType::Plain,
                        props: NodeProps::default(),
                        implicit,
                    });
                    return;
                }
                let written = self.gap(pos);
                let range = if implicit {
                    None
                } else {
                    let end = self.scalar_end(pos, &value, style);
                    self.cursor = end;
                    Some(Range::new(pos, end))
                };
                let props = NodeProps {
                    anchor: self.anchor_name(anchor_id, written),
                    tag: tag.map(tag_text),
                    range,
                };
                self.events.push(Event::Scalar {
                    value,
                    style: scalar_type(style),
                    props,
                    implicit,
                });
            }

            RawEvent::Alias(id) => {
                self.gap(pos);
                let written = name_at(self.text, pos + 1);
                let name = self
                    .anchor_names
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| written.to_string());
                let end = pos + 1 + written.len();
                self.cursor = end;
                self.events.push(Event::Alias {
                    name,
                    range: Some(Range::new(pos, end)),
                });
            }

            RawEvent::SequenceStart(anchor_id, tag) => {
                self.last_start = last_start;
                self.start_collection(pos, marker.col(), anchor_id, tag, true);
            }

            RawEvent::MappingStart(anchor_id, tag) => {
                self.last_start = last_start;
                self.start_collection(pos, marker.col(), anchor_id, tag, false);
            }

            RawEvent::SequenceEnd => self.end_collection(pos, true),
            RawEvent::MappingEnd => self.end_collection(pos, false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Item;
    use crate::scalar::ScalarValue;
    use crate::value::Value;

    fn parse_default(text: &str) -> Document {
        parse(text, &ParseOptions::default()).unwrap()
    }

    fn comments(events: &[Event]) -> Vec<(&str, bool)> {
        events
            .iter()
            .filter_map(|event| match event {
                Event::Comment { text, trailing } => Some((text.as_str(), *trailing)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_parse_simple_map() {
        let doc = parse_default("title: My Document\ncount: 3\n");
        assert_eq!(
            doc.to_value().unwrap(),
            Value::map([
                ("title", Value::from("My Document")),
                ("count", Value::Int(3)),
            ])
        );
    }

    #[test]
    fn test_empty_source() {
        let doc = parse_default("");
        assert_eq!(doc.contents, None);
        assert!(parse_all("", &ParseOptions::default()).unwrap().is_empty());
    }

    #[test]
    fn test_multiple_documents() {
        let docs = parse_all("a: 1\n---\nb: 2\n", &ParseOptions::default()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].to_value().unwrap(), Value::map([("b", Value::Int(2))]));

        let err = parse("a: 1\n---\nb: 2\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn test_scalar_ranges() {
        let text = "a: 'x''y'\nb: \"q\\\"r\"\nc: plain words\n";
        let doc = parse_default(text);
        let root = doc.root().unwrap();
        let range_of = |key: &str| {
            let id = doc.get(root, &Item::from(key), true).unwrap().as_node().unwrap();
            let range = doc.node(id).meta.range.unwrap();
            &text[range.start..range.end]
        };
        assert_eq!(range_of("a"), "'x''y'");
        assert_eq!(range_of("b"), "\"q\\\"r\"");
        assert_eq!(range_of("c"), "plain words");
    }

    #[test]
    fn test_ranges_after_multibyte_block_scalar() {
        let text = "a: |\n  héllo wörld\n  ünïcode\nb: next\n";
        let doc = parse_default(text);
        let root = doc.root().unwrap();
        let b = doc.get(root, &Item::from("b"), true).unwrap().as_node().unwrap();
        let range = doc.node(b).meta.range.unwrap();
        assert_eq!(&text[range.start..range.end], "next");

        let a = doc.get(root, &Item::from("a"), true).unwrap().as_node().unwrap();
        let range = doc.node(a).meta.range.unwrap();
        assert!(text[range.start..range.end].ends_with("ünïcode"));
    }

    #[test]
    fn test_anchor_names_recovered() {
        let doc = parse_default("base: &base {x: 1}\nother: *base\n");
        let root = doc.root().unwrap();
        let base = doc.get(root, &Item::from("base"), true).unwrap().as_node().unwrap();
        assert_eq!(doc.node(base).meta.anchor.as_deref(), Some("base"));

        let value = doc.to_value().unwrap();
        assert!(value.get("base").unwrap().same_identity(&value.get("other").unwrap()));
    }

    #[test]
    fn test_anchor_on_first_key_belongs_to_key() {
        let doc = parse_default("&k key: value\n");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).meta.anchor, None);
        let pair = doc.node(root).as_map().unwrap().items[0];
        let key = doc.node(pair).as_pair().unwrap().key.as_node().unwrap();
        assert_eq!(doc.node(key).meta.anchor.as_deref(), Some("k"));
    }

    #[test]
    fn test_unknown_alias_is_unresolved() {
        let err = parse("a: *missing\n", &ParseOptions::default()).unwrap_err();
        assert_eq!(
            err,
            Error::UnresolvedAlias {
                name: "missing".into(),
                range: Some(Range::new(3, 11)),
            }
        );
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = parse("a: [1, 2\n", &ParseOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Parse { range: Some(_), .. }));
    }

    #[test]
    fn test_comment_and_blank_line_events() {
        let events = scan_events("# head\na: 1 # one\n\n# lead\nb: 2\n").unwrap();
        assert_eq!(
            comments(&events),
            vec![(" head", false), (" one", true), (" lead", false)]
        );
        assert!(events.contains(&Event::BlankLine));
    }

    #[test]
    fn test_comment_inside_quotes_is_content() {
        let events = scan_events("a: 'not # a comment'\n").unwrap();
        assert!(comments(&events).is_empty());
    }

    #[test]
    fn test_comment_at_collection_end() {
        let doc = parse_default("outer:\n  inner: 1\n  # closing\nnext: 2\n");
        let root = doc.root().unwrap();
        let outer = doc.get(root, &Item::from("outer"), false).unwrap().as_node().unwrap();
        assert_eq!(doc.node(outer).meta.comment.as_deref(), Some(" closing"));
    }

    #[test]
    fn test_flow_and_block_notation() {
        let doc = parse_default("a: [1, {b: 2}]\nc:\n  - 3\n");
        let root = doc.root().unwrap();
        let a = doc.get(root, &Item::from("a"), false).unwrap().as_node().unwrap();
        let c = doc.get(root, &Item::from("c"), false).unwrap().as_node().unwrap();
        assert_eq!(doc.node(root).as_map().unwrap().notation, Some(Notation::Block));
        assert_eq!(doc.node(a).as_seq().unwrap().notation, Some(Notation::Flow));
        assert_eq!(doc.node(c).as_seq().unwrap().notation, Some(Notation::Block));

        let range = doc.node(a).meta.range.unwrap();
        assert_eq!(range, Range::new(3, 14));
    }

    #[test]
    fn test_block_map_with_flow_key() {
        let doc = parse_default("{x: 1}: v\n");
        let root = doc.root().unwrap();
        assert_eq!(doc.node(root).as_map().unwrap().notation, Some(Notation::Block));
        let pair = doc.node(root).as_map().unwrap().items[0];
        let key = doc.node(pair).as_pair().unwrap().key.as_node().unwrap();
        assert_eq!(doc.node(key).as_map().unwrap().notation, Some(Notation::Flow));
    }

    #[test]
    fn test_tags_and_styles() {
        let doc = parse_default("a: !!str 12\nb: |\n  text\nc: !!binary aGVsbG8=\n");
        let value = doc.to_value().unwrap();
        assert_eq!(value.get("a"), Some(Value::from("12")));
        assert_eq!(value.get("b"), Some(Value::from("text\n")));
        assert_eq!(value.get("c"), Some(Value::from(ScalarValue::Binary(b"hello".to_vec()))));
    }

    #[test]
    fn test_implicit_null_values() {
        let doc = parse_default("a:\nb: ~\n");
        assert_eq!(
            doc.to_value().unwrap(),
            Value::map([("a", Value::Null), ("b", Value::Null)])
        );
    }

    #[test]
    fn test_merge_keys_option() {
        let text = "base: &b {x: 1, y: 2}\nderived:\n  <<: *b\n  x: 9\n";
        let doc = parse(text, &ParseOptions { merge_keys: true }).unwrap();
        assert_eq!(
            doc.to_value().unwrap().get("derived"),
            Some(Value::map([("x", Value::Int(9)), ("y", Value::Int(2))]))
        );
    }
}
