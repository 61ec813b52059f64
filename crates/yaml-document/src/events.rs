//! Structural events consumed by the composer.
//!
//! Any front-end that can produce this stream can build a [`Document`]
//! through [`compose`](crate::compose). The bundled one is
//! [`parse`](crate::parse), which drives `yaml-rust2`.
//!
//! Events must be well nested: every `*Start` has its matching `*End`, and
//! everything except comments and blank lines sits between a
//! `DocumentStart`/`DocumentEnd` pair. Comments are attached to nodes by
//! position in the stream:
//!
//! - a trailing comment belongs to the node completed just before it;
//! - leading comments and blank lines belong to the node started next;
//! - leading comments still pending when a collection ends become that
//!   collection's own comment.
//!
//! [`Document`]: crate::Document

use crate::notation::Notation;
use crate::range::Range;
use crate::scalar::ScalarType;

/// Anchor, tag and location of a node event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeProps {
    /// Anchor name defined on this node, without the `&`
    pub anchor: Option<String>,
    /// Tag as written or fully qualified; it is normalized when composed
    pub tag: Option<String>,
    /// Start of the node (end too, for scalars)
    pub range: Option<Range>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    DocumentStart,
    DocumentEnd,
    MappingStart {
        props: NodeProps,
        notation: Notation,
    },
    MappingEnd {
        /// Offset just past the closing `}` of a flow map
        end: Option<usize>,
    },
    SequenceStart {
        props: NodeProps,
        notation: Notation,
    },
    SequenceEnd {
        /// Offset just past the closing `]` of a flow sequence
        end: Option<usize>,
    },
    Scalar {
        /// Scalar content with escapes and folding already applied
        value: String,
        style: ScalarType,
        props: NodeProps,
        /// An empty plain scalar with nothing written for it (`key:`)
        implicit: bool,
    },
    Alias {
        name: String,
        range: Option<Range>,
    },
    /// A `#` comment, without the `#`
    Comment { text: String, trailing: bool },
    BlankLine,
}

impl Event {
    /// A plain scalar with no props.
    pub fn plain(value: impl Into<String>) -> Event {
        Event::Scalar {
            value: value.into(),
            style: ScalarType::Plain,
            props: NodeProps::default(),
            implicit: false,
        }
    }

    pub fn map_start(notation: Notation) -> Event {
        Event::MappingStart {
            props: NodeProps::default(),
            notation,
        }
    }

    pub fn seq_start(notation: Notation) -> Event {
        Event::SequenceStart {
            props: NodeProps::default(),
            notation,
        }
    }

    pub fn alias(name: impl Into<String>) -> Event {
        Event::Alias {
            name: name.into(),
            range: None,
        }
    }

    pub fn comment(text: impl Into<String>) -> Event {
        Event::Comment {
            text: text.into(),
            trailing: false,
        }
    }

    pub fn trailing_comment(text: impl Into<String>) -> Event {
        Event::Comment {
            text: text.into(),
            trailing: true,
        }
    }

    /// Attach props to a node event. Other events are returned unchanged.
    pub fn with_props(mut self, new_props: NodeProps) -> Event {
        match &mut self {
            Event::MappingStart { props, .. }
            | Event::SequenceStart { props, .. }
            | Event::Scalar { props, .. } => *props = new_props,
            _ => {}
        }
        self
    }

    /// Set the anchor of a node event.
    pub fn anchored(self, anchor: &str) -> Event {
        let props = NodeProps {
            anchor: Some(anchor.to_string()),
            ..self.props().cloned().unwrap_or_default()
        };
        self.with_props(props)
    }

    /// Set the tag of a node event.
    pub fn tagged(self, tag: &str) -> Event {
        let props = NodeProps {
            tag: Some(tag.to_string()),
            ..self.props().cloned().unwrap_or_default()
        };
        self.with_props(props)
    }

    pub fn props(&self) -> Option<&NodeProps> {
        match self {
            Event::MappingStart { props, .. }
            | Event::SequenceStart { props, .. }
            | Event::Scalar { props, .. } => Some(props),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders_set_props() {
        let event = Event::plain("x").anchored("a").tagged("!!str");
        assert_eq!(
            event.props(),
            Some(&NodeProps {
                anchor: Some("a".into()),
                tag: Some("!!str".into()),
                range: None,
            })
        );
    }

    #[test]
    fn test_props_ignored_on_non_node_events() {
        let event = Event::alias("a").anchored("b");
        assert_eq!(event, Event::alias("a"));
        assert_eq!(event.props(), None);
    }
}
