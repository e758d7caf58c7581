//! Resource descriptors: the declared side of a reconciliation

use crate::error::{Error, Result};
use crate::kinds;
use crate::schema::ResourceKind;
use crate::store::{Identity, ObjectKey};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Desired lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ensure {
    #[default]
    Present,
    Absent,
}

impl fmt::Display for Ensure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Present => "present",
            Self::Absent => "absent",
        })
    }
}

/// A declared property value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Desired {
    /// Use whatever the device reports as its built-in default
    Default,
    Value(Value),
}

impl Desired {
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }

    /// Turn a literal `default` token into the sentinel
    pub fn normalized(self) -> Self {
        match self {
            Self::Value(v) if v.is_default_token() => Self::Default,
            other => other,
        }
    }

    pub fn literal(&self) -> Option<&Value> {
        match self {
            Self::Default => None,
            Self::Value(v) => Some(v),
        }
    }
}

impl fmt::Display for Desired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Value(v) => write!(f, "{v}"),
        }
    }
}

impl From<Value> for Desired {
    fn from(value: Value) -> Self {
        Self::Value(value).normalized()
    }
}

/// Declared state of one resource, immutable for the pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    key: ObjectKey,
    ensure: Ensure,
    properties: BTreeMap<String, Desired>,
}

impl ResourceDescriptor {
    /// Start a descriptor; the identity must match the kind's key fields
    pub fn new(kind: ResourceKind, identity: Identity) -> Result<Self> {
        let expected = kinds::schema(kind).key_fields().len();
        if identity.len() != expected {
            return Err(Error::IdentityArity {
                kind,
                expected,
                actual: identity.len(),
            });
        }
        Ok(Self {
            key: ObjectKey::new(kind, identity),
            ensure: Ensure::Present,
            properties: BTreeMap::new(),
        })
    }

    pub fn with_ensure(mut self, ensure: Ensure) -> Self {
        self.ensure = ensure;
        self
    }

    /// Declare a property; rejects names the kind does not have
    pub fn with(mut self, property: &str, desired: impl Into<Desired>) -> Result<Self> {
        let kind = self.key.kind;
        let spec = kinds::schema(kind)
            .property(property)
            .ok_or_else(|| Error::UnknownProperty {
                kind,
                property: property.to_string(),
            })?;
        self.properties
            .insert(spec.name.to_string(), desired.into().normalized());
        Ok(self)
    }

    /// Declare a property as `default`
    pub fn with_default(self, property: &str) -> Result<Self> {
        self.with(property, Desired::Default)
    }

    pub fn kind(&self) -> ResourceKind {
        self.key.kind
    }

    pub fn identity(&self) -> &Identity {
        &self.key.identity
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn ensure(&self) -> Ensure {
        self.ensure
    }

    /// Desired value, `None` when the property is not declared
    pub fn get(&self, property: &str) -> Option<&Desired> {
        self.properties.get(property)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &Desired)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }
}
