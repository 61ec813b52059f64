//! Block vs flow selection for collections.
//!
//! The choice is a pure function of the collection's declared hint, the mode
//! its ancestors were rendered in, and whether it sits in an implicit-key
//! position. Content size and depth play no part.

use serde::{Deserialize, Serialize};

/// Textual rendering of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notation {
    /// One entry per line (`key: value`, `- item`)
    Block,
    /// Inline (`{ key: value }`, `[ item ]`)
    Flow,
}

/// Document-wide override of the per-node hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollectionStyle {
    /// Use each collection's own hint, block when unset
    #[default]
    Any,
    /// Render every collection in flow notation
    Flow,
    /// Render every collection in block notation where the syntax allows it
    Block,
}

/// Where a collection is about to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Some ancestor was already rendered in flow notation
    pub in_flow: bool,
    /// The collection is the key of a map entry
    pub implicit_key: bool,
}

impl Position {
    /// Position of a child of a collection rendered with `notation`.
    pub fn child(self, notation: Notation) -> Position {
        Position {
            in_flow: self.in_flow || notation == Notation::Flow,
            implicit_key: false,
        }
    }

    /// Position of a map key under a collection rendered with `notation`.
    pub fn key(self, notation: Notation) -> Position {
        Position {
            in_flow: self.in_flow || notation == Notation::Flow,
            implicit_key: true,
        }
    }
}

/// Decide how a collection is rendered.
///
/// Flow is forced inside flow ancestors and in implicit-key positions, where
/// block notation is not valid syntax; the document-wide style cannot
/// override that. Otherwise the document-wide style wins over the node hint,
/// and an unhinted collection is rendered in block notation.
pub fn select_notation(
    declared: Option<Notation>,
    position: Position,
    style: CollectionStyle,
) -> Notation {
    if position.in_flow || position.implicit_key {
        return Notation::Flow;
    }
    match style {
        CollectionStyle::Flow => Notation::Flow,
        CollectionStyle::Block => Notation::Block,
        CollectionStyle::Any => declared.unwrap_or(Notation::Block),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOP: Position = Position {
        in_flow: false,
        implicit_key: false,
    };

    #[test]
    fn test_declared_hint_is_used_at_top_level() {
        assert_eq!(
            select_notation(Some(Notation::Flow), TOP, CollectionStyle::Any),
            Notation::Flow
        );
        assert_eq!(
            select_notation(Some(Notation::Block), TOP, CollectionStyle::Any),
            Notation::Block
        );
        assert_eq!(select_notation(None, TOP, CollectionStyle::Any), Notation::Block);
    }

    #[test]
    fn test_flow_is_inherited() {
        let inside = TOP.child(Notation::Flow);
        assert!(inside.in_flow);
        assert_eq!(select_notation(None, inside, CollectionStyle::Any), Notation::Flow);
        assert_eq!(
            select_notation(Some(Notation::Block), inside, CollectionStyle::Block),
            Notation::Flow
        );
        // transitively
        assert!(inside.child(Notation::Block).in_flow);
    }

    #[test]
    fn test_implicit_key_forces_flow() {
        let key = TOP.key(Notation::Block);
        assert_eq!(
            select_notation(Some(Notation::Block), key, CollectionStyle::Block),
            Notation::Flow
        );
    }

    #[test]
    fn test_document_style_overrides_hint() {
        assert_eq!(
            select_notation(Some(Notation::Block), TOP, CollectionStyle::Flow),
            Notation::Flow
        );
        assert_eq!(
            select_notation(Some(Notation::Flow), TOP, CollectionStyle::Block),
            Notation::Block
        );
    }

    #[test]
    fn test_block_child_stays_free() {
        let child = TOP.child(Notation::Block);
        assert_eq!(child, TOP);
    }
}
