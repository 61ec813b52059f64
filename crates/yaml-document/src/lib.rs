//! # yaml-document
//!
//! A round-trippable YAML document model.
//!
//! A [`Document`] owns an arena of nodes (scalars, maps, sequences, pairs,
//! aliases and `<<` merges) that keep what a plain value tree loses: anchors,
//! tags, comments, blank lines, scalar styles and flow/block notation.
//! Documents can be edited through keyed accessors, materialized into
//! shared [`Value`]s and written back out as YAML.
//!
//! ## Design
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. An
//! alias is a node holding the id of its source, so the same subtree can be
//! reached several times and cycles need no reference counting. Host-side
//! [`Value`] collections are `Rc<RefCell<_>>`, which lets materialization
//! reproduce aliasing and self references faithfully.
//!
//! ## Example
//!
//! ```rust
//! use yaml_document::{parse, Item, ParseOptions, StringifyOptions};
//!
//! let mut doc = parse("base: &b {x: 1}\nother: *b\n", &ParseOptions::default()).unwrap();
//! doc.set_path(&[Item::from("count")], 3).unwrap();
//!
//! let value = doc.to_value().unwrap();
//! assert!(value.get("base").unwrap().same_identity(&value.get("other").unwrap()));
//!
//! let text = doc.to_yaml_string(&StringifyOptions::default()).unwrap();
//! assert_eq!(text, "base: &b { x: 1 }\nother: *b\ncount: 3\n");
//! ```

mod anchors;
mod collection;
mod compose;
mod document;
mod error;
mod events;
mod factory;
mod materialize;
mod merge;
mod node;
mod notation;
mod options;
mod parser;
mod range;
mod scalar;
mod stringify;
mod tags;
mod value;

pub use anchors::{AnchorNames, AnchorScope};
pub use compose::compose;
pub use document::Document;
pub use error::{Error, Result};
pub use events::{Event, NodeProps};
pub use node::{Alias, Item, MERGE_KEY, Merge, Node, NodeId, NodeKind, NodeMeta, Pair, YamlMap, YamlSeq};
pub use notation::{CollectionStyle, Notation, Position, select_notation};
pub use options::{CreateNodeOptions, MaterializeOptions, ParseOptions, StringifyOptions};
pub use parser::{parse, parse_all, parse_all_with, parse_with, scan_events};
pub use range::Range;
pub use scalar::{Scalar, ScalarFormat, ScalarType, ScalarValue};
pub use tags::{CoreSchema, TagKind, TagResolver, YAML_TAG_PREFIX, normalize_tag, short_tag};
pub use value::{MapRef, PairsRef, SeqRef, Shape, Value};
