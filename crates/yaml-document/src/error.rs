//! Error types for document model operations.

use crate::range::Range;
use thiserror::Error;

/// Result type alias for yaml-document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while composing, editing, materializing or
/// stringifying a document.
///
/// Every variant carries the offending key, path or tag so callers can branch
/// on the kind of failure instead of parsing messages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A key was added to a map that already contains it.
    #[error("Map keys must be unique; \"{key}\" is repeated")]
    DuplicateKey {
        /// The repeated key, rendered as text
        key: String,
    },

    /// A mutating path operation walked into something that is not a collection.
    #[error("Expected a collection at \"{key}\" (path: {})", path.join("."))]
    NotACollection {
        /// The path key that did not resolve to a collection
        key: String,
        /// The full path that was being walked
        path: Vec<String>,
    },

    /// An alias refers to an anchor that was not defined before it.
    #[error("Aliased anchor not found: {name}")]
    UnresolvedAlias {
        /// The anchor name used by the alias
        name: String,
        /// Where the alias appeared, when parsed
        range: Option<Range>,
    },

    /// A merge key whose value is not a sequence of aliases to maps.
    #[error("Invalid merge key: {reason}")]
    InvalidMerge {
        /// What was wrong with the merge value
        reason: String,
        /// Where the merge appeared, when parsed
        range: Option<Range>,
    },

    /// The tag resolver has no entry for this tag.
    #[error("The tag {tag} is unavailable")]
    UnknownTag {
        /// The tag as written or stored
        tag: String,
    },

    /// A tag was applied to a node of the wrong shape (e.g. `!!seq` on a scalar).
    #[error("Tag {tag} cannot be applied to a {found}")]
    TagMismatch {
        /// The tag that was applied
        tag: String,
        /// The kind of node or value it was applied to
        found: &'static str,
    },

    /// Something other than a key/value pair was added to a map.
    #[error("Expected a key/value pair, found a {found}")]
    NotAPair {
        /// The kind of item that was passed instead
        found: &'static str,
    },

    /// A sequence was indexed with a key that is not a non-negative integer.
    #[error("Expected a valid sequence index, not \"{key}\"")]
    InvalidIndex {
        /// The rejected key, rendered as text
        key: String,
    },

    /// A cyclic value was handed to a host representation without identity (JSON).
    #[error("Circular structure at \"{}\" cannot be represented without shared identity", path.join("."))]
    CircularWithoutIdentity {
        /// Path at which the cycle closes
        path: Vec<String>,
    },

    /// Materialization exceeded the configured nesting depth.
    #[error("Nesting exceeds maximum depth of {max_depth}")]
    NestingTooDeep {
        /// The configured limit
        max_depth: usize,
    },

    /// The source text could not be parsed, or a scalar could not be
    /// constructed for its explicit tag.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the failure
        message: String,
        /// Where the failure occurred, when known
        range: Option<Range>,
    },
}

impl Error {
    /// Source range associated with this error, if any.
    pub fn range(&self) -> Option<Range> {
        match self {
            Error::UnresolvedAlias { range, .. }
            | Error::InvalidMerge { range, .. }
            | Error::Parse { range, .. } => *range,
            _ => None,
        }
    }

    pub(crate) fn invalid_merge(reason: impl Into<String>, range: Option<Range>) -> Self {
        Error::InvalidMerge {
            reason: reason.into(),
            range,
        }
    }

    pub(crate) fn parse(message: impl Into<String>, range: Option<Range>) -> Self {
        Error::Parse {
            message: message.into(),
            range,
        }
    }
}

impl From<yaml_rust2::ScanError> for Error {
    fn from(err: yaml_rust2::ScanError) -> Self {
        Error::Parse {
            message: err.info().to_string(),
            range: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_a_collection_message_names_path() {
        let err = Error::NotACollection {
            key: "b".into(),
            path: vec!["a".into(), "b".into(), "c".into()],
        };
        assert_eq!(
            err.to_string(),
            "Expected a collection at \"b\" (path: a.b.c)"
        );
    }

    #[test]
    fn test_range_is_exposed_for_located_errors() {
        let err = Error::UnresolvedAlias {
            name: "x".into(),
            range: Some(Range::new(3, 5)),
        };
        assert_eq!(err.range(), Some(Range::new(3, 5)));
        assert_eq!(Error::UnknownTag { tag: "!x".into() }.range(), None);
    }
}
