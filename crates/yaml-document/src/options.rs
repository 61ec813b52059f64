//! Explicit configuration for parsing, building, materializing and stringifying.
//!
//! There is no process-wide default state: every entry point takes one of
//! these structs, and each `Default` impl is the single place where defaults
//! are defined.

use crate::notation::CollectionStyle;
use serde::{Deserialize, Serialize};

/// Options for composing documents from source text or events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Recognize `<<` keys as merge pairs (YAML 1.1 extension). Default: `false`.
    pub merge_keys: bool,
}

/// Options for producing YAML text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringifyOptions {
    /// Spaces per nesting level. Values below 2 are treated as 2. Default: `2`.
    pub indent: usize,

    /// Document-wide override of per-collection flow/block hints. Default: `Any`.
    pub collection_style: CollectionStyle,

    /// Maximum width of wrapped `!!binary` lines. Default: `80`.
    pub line_width: usize,

    /// Prefix of generated anchor names (`a1`, `a2`, ...). Default: `"a"`.
    pub anchor_prefix: String,
}

impl Default for StringifyOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            collection_style: CollectionStyle::Any,
            line_width: 80,
            anchor_prefix: "a".to_string(),
        }
    }
}

impl StringifyOptions {
    pub(crate) fn indent_width(&self) -> usize {
        self.indent.max(2)
    }
}

/// Options for building nodes from host values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateNodeOptions {
    /// Wrap leaf values into scalar nodes. Collections are always wrapped.
    /// Default: `true`.
    pub wrap_scalars: bool,

    /// Tag selecting the representation of the top-level value
    /// (e.g. `!!omap`, `!!set`). Default: none.
    pub tag: Option<String>,

    /// Prefix of anchors assigned to repeated values. Default: `"a"`.
    pub anchor_prefix: String,
}

impl Default for CreateNodeOptions {
    fn default() -> Self {
        Self {
            wrap_scalars: true,
            tag: None,
            anchor_prefix: "a".to_string(),
        }
    }
}

impl CreateNodeOptions {
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn unwrapped(mut self) -> Self {
        self.wrap_scalars = false;
        self
    }
}

/// Options for materializing plain values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterializeOptions {
    /// Maximum nesting of collections (default: 256).
    ///
    /// Only deep trees hit this limit; alias cycles are resolved through
    /// identity and never recurse.
    pub max_depth: usize,
}

impl Default for MaterializeOptions {
    fn default() -> Self {
        Self { max_depth: 256 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = StringifyOptions::default();
        assert_eq!(options.indent, 2);
        assert_eq!(options.collection_style, CollectionStyle::Any);
        assert!(!ParseOptions::default().merge_keys);
        assert!(CreateNodeOptions::default().wrap_scalars);
        assert_eq!(MaterializeOptions::default().max_depth, 256);
    }

    #[test]
    fn test_small_indent_is_clamped() {
        let options = StringifyOptions {
            indent: 0,
            ..Default::default()
        };
        assert_eq!(options.indent_width(), 2);
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: StringifyOptions =
            serde_json::from_str(r#"{ "indent": 4, "collection_style": "flow" }"#).unwrap();
        assert_eq!(options.indent, 4);
        assert_eq!(options.collection_style, CollectionStyle::Flow);
        assert_eq!(options.line_width, 80);
        assert_eq!(options.anchor_prefix, "a");

        let options: CreateNodeOptions =
            serde_json::from_str(r#"{ "tag": "!!set", "anchor_prefix": "ref" }"#).unwrap();
        assert_eq!(options.tag.as_deref(), Some("!!set"));
        assert_eq!(options.anchor_prefix, "ref");
        assert!(options.wrap_scalars);

        let options: ParseOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ParseOptions::default());
    }

    #[test]
    fn test_unknown_collection_style_is_rejected() {
        let err = serde_json::from_str::<StringifyOptions>(r#"{ "collection_style": "sideways" }"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown variant `sideways`"), "{}", err);
    }
}
