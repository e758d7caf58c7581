//! Error types for the manifest crate

use plb_core::ResourceKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading a manifest
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Path does not exist
    #[error("manifest does not exist: {}", .0.display())]
    PathNotFound(PathBuf),

    /// The document is not valid TOML
    #[error("invalid manifest: {0}")]
    Parse(#[from] toml::de::Error),

    /// Top-level table is not a known resource kind
    #[error("unknown resource kind `{0}`")]
    UnknownKind(String),

    /// Top-level entry is not an array of tables
    #[error("`{0}` must be an array of tables ([[{0}]])")]
    NotAnArray(String),

    /// An identity field is absent or not a string
    #[error("{kind} #{index}: missing identity field `{field}`")]
    MissingField {
        kind: ResourceKind,
        index: usize,
        field: &'static str,
    },

    /// A property value has the wrong shape for its kind
    #[error("{kind} #{index}: bad value for `{property}`: {reason}")]
    BadValue {
        kind: ResourceKind,
        index: usize,
        property: String,
        reason: String,
    },

    /// Two entries of one kind share an identity
    #[error("duplicate {kind} `{identity}`")]
    DuplicateIdentity { kind: ResourceKind, identity: String },

    /// The descriptor itself was rejected (unknown property, bad arity)
    #[error("{kind} #{index}: {source}")]
    Resource {
        kind: ResourceKind,
        index: usize,
        #[source]
        source: plb_core::Error,
    },
}

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;
