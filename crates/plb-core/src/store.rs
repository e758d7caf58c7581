//! Device Object Store contract
//!
//! The transport that actually talks to the appliance lives outside this
//! crate. The engine only sees the [`DeviceStore`] trait: enumerate objects
//! of a kind, read and write single properties, look up device defaults,
//! submit composite groups, construct and destroy objects.
//!
//! Implementations return `anyhow::Result`; the engine wraps failures into
//! [`crate::Error::Device`] with the object, property and value in context.

use crate::schema::ResourceKind;
use crate::value::Value;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity key of a device object, one entry per key field of its kind
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(Vec<String>);

impl Identity {
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

/// Fully-qualified reference to one device object
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: ResourceKind,
    pub identity: Identity,
}

impl ObjectKey {
    pub fn new(kind: ResourceKind, identity: Identity) -> Self {
        Self { kind, identity }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.identity)
    }
}

/// Resolved member values for one composite call, keyed by property name
pub type GroupPayload = BTreeMap<String, Value>;

/// Primitives the engine needs from the device
///
/// This trait abstracts the device transport, enabling:
/// - Real CLI / NX-API execution against an appliance
/// - The in-memory [`crate::memory::MemoryStore`] for tests and offline runs
///
/// Whether a property has a standalone setter is not asked here; that is the
/// job of [`crate::capability::Capabilities`].
pub trait DeviceStore {
    /// Identities of every existing object of `kind`
    fn enumerate(&self, kind: ResourceKind) -> Result<Vec<Identity>>;

    /// Current value of a property, `None` when the device reports nothing
    fn get(&self, key: &ObjectKey, property: &str) -> Result<Option<Value>>;

    /// Write a single property
    fn set(&mut self, key: &ObjectKey, property: &str, value: &Value) -> Result<()>;

    /// The device's built-in default for a property
    fn default_for(&self, key: &ObjectKey, property: &str) -> Result<Value>;

    /// Submit every probe setting in one call
    fn probe_set(&mut self, key: &ObjectKey, attrs: &GroupPayload) -> Result<()>;

    /// Submit every load-balance setting in one call
    fn load_balance_set(&mut self, key: &ObjectKey, attrs: &GroupPayload) -> Result<()>;

    /// Submit hot-standby and weight together
    fn hot_standby_weight_set(
        &mut self,
        key: &ObjectKey,
        hot_standby: &Value,
        weight: &Value,
    ) -> Result<()>;

    /// Create an empty object with the given identity
    fn construct(&mut self, key: &ObjectKey) -> Result<()>;

    /// Remove the object
    fn destroy(&mut self, key: &ObjectKey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display_joins_fields() {
        let id = Identity::composite(["udpGroup", "1.1.1.1", "ip"]);
        assert_eq!(id.to_string(), "udpGroup 1.1.1.1 ip");
        assert_eq!(id.len(), 3);

        let key = ObjectKey::new(ResourceKind::DeviceGroupNode, id);
        assert_eq!(key.to_string(), "device_group_node udpGroup 1.1.1.1 ip");
    }

    #[test]
    fn test_identity_equality_is_exact_across_fields() {
        let a = Identity::composite(["g", "1.1.1.1", "ip"]);
        let b = Identity::composite(["g", "1.1.1.1", "ipv6"]);
        assert_ne!(a, b);
        assert_eq!(a, Identity::composite(["g", "1.1.1.1", "ip"]));
    }
}
