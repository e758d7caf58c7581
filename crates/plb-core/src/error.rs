//! Error types for reconciliation
//!
//! Only device failures abort a resource. A property the platform cannot set
//! is skipped, and a descriptor without a live object is simply created, so
//! neither has a variant here.

use crate::schema::{GroupId, ResourceKind};
use crate::store::ObjectKey;
use std::fmt;
use thiserror::Error;

/// Device primitive that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Enumerate,
    Get,
    Set,
    DefaultLookup,
    Construct,
    Destroy,
    GroupSubmit(GroupId),
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enumerate => f.write_str("enumerate"),
            Self::Get => f.write_str("get"),
            Self::Set => f.write_str("set"),
            Self::DefaultLookup => f.write_str("default lookup"),
            Self::Construct => f.write_str("construct"),
            Self::Destroy => f.write_str("destroy"),
            Self::GroupSubmit(group) => write!(f, "{group} submit"),
        }
    }
}

/// Errors raised by the reconciliation engine
#[derive(Debug, Error)]
pub enum Error {
    /// A device primitive failed; remaining work for this resource is abandoned
    #[error("{operation} failed on {key}{}{}: {source}",
        .property.as_ref().map(|p| format!(" property `{p}`")).unwrap_or_default(),
        .value.as_ref().map(|v| format!(" = {v}")).unwrap_or_default())]
    Device {
        key: ObjectKey,
        operation: Operation,
        property: Option<String>,
        value: Option<String>,
        #[source]
        source: anyhow::Error,
    },

    /// Enumerating a kind failed before any object could be bound
    #[error("failed to enumerate {kind} objects: {source}")]
    Enumerate {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    /// Two descriptors in one pass share an identity
    #[error("duplicate {kind} identity `{identity}`")]
    DuplicateIdentity { kind: ResourceKind, identity: String },

    /// Descriptor names a property its kind does not have
    #[error("{kind} has no property `{property}`")]
    UnknownProperty { kind: ResourceKind, property: String },

    /// Descriptor was handed to a provider of another kind
    #[error("expected a {expected} descriptor, got {actual}")]
    KindMismatch {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    #[error("identity for {kind} needs {expected} fields, got {actual}")]
    IdentityArity {
        kind: ResourceKind,
        expected: usize,
        actual: usize,
    },

    #[error("unknown resource kind `{0}`")]
    UnknownKind(String),

    #[error("unknown platform `{0}`")]
    UnknownPlatform(String),

    /// Composition was attempted without the device abstraction layer
    #[error("device abstraction layer is not available on this host")]
    DeviceApiUnavailable,

    #[error("invalid schema for {kind}: {reason}")]
    InvalidSchema { kind: ResourceKind, reason: String },

    /// A composite payload lacked a member the device call needs
    #[error("{group} payload for {key} is missing `{member}`")]
    IncompleteGroup {
        key: ObjectKey,
        group: GroupId,
        member: &'static str,
    },
}

/// Result type for reconciliation
pub type Result<T> = std::result::Result<T, Error>;
