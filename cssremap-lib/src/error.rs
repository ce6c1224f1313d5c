//! Error types for the remap pipeline.

use thiserror::Error;

/// Errors surfaced to callers of the remap pipeline.
#[derive(Debug, Error)]
pub enum RemapError {
    /// LightningCSS could not parse a source stylesheet.
    #[error("failed to parse CSS: {message}")]
    Parse { message: String },

    /// An ignore-selector pattern is not a valid regular expression.
    #[error("invalid ignore-selector pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The mapping document is not valid JSON.
    #[error("invalid mapping document: {0}")]
    MappingJson(#[from] serde_json::Error),

    /// The mapping document is valid JSON but not an object.
    #[error("mapping document must be a JSON object of strings")]
    MappingShape,

    /// A mapping value is not a string.
    #[error("mapping '{key}' must map to a string")]
    MappingValue { key: String },
}

/// Reasons the media-query evaluator can give up on a query.
///
/// These never reach callers: the matcher treats them as "the query matches".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediaError {
    /// The device width is not a length.
    #[error("invalid device width '{0}'")]
    InvalidLength(String),

    /// A width bound with no pixel value, e.g. `(min-width: 10vw)`.
    #[error("cannot resolve width in {0}")]
    UnresolvedLength(String),
}
