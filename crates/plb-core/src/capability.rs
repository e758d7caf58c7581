//! Static capability tables
//!
//! Which properties have a standalone setter depends on the platform and
//! software version of the device. The answer is computed once, when the
//! provider set is composed, and is only queried afterwards.

use crate::error::{Error, Result};
use crate::kinds;
use crate::schema::{PropertyKind, ResourceKind, Schema};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

/// Device platform profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    pub name: String,
    /// Properties with no setter on this platform, per kind
    #[serde(default)]
    pub unsupported: BTreeMap<ResourceKind, BTreeSet<String>>,
}

impl Platform {
    /// Profile with every property supported
    pub fn generic(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            unsupported: BTreeMap::new(),
        }
    }

    /// Mark an extra property unsupported
    pub fn without(mut self, kind: ResourceKind, property: impl Into<String>) -> Self {
        self.unsupported
            .entry(kind)
            .or_default()
            .insert(property.into());
        self
    }

    pub fn supports(&self, kind: ResourceKind, property: &str) -> bool {
        !self
            .unsupported
            .get(&kind)
            .is_some_and(|props| props.contains(property))
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "n7k" | "generic" => Ok(Self::generic(s)),
            "n9k" => Ok(Self::generic(s).without(ResourceKind::Service, "nat_destination")),
            other => Err(Error::UnknownPlatform(other.to_string())),
        }
    }
}

/// Capability of one property
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capability {
    pub kind: PropertyKind,
    /// The platform implements the property at all
    pub supported: bool,
    /// A single-property setter exists (group members only go through their
    /// composite call)
    pub standalone_setter: bool,
}

/// Capability table for one resource kind
#[derive(Debug, Clone)]
pub struct Capabilities {
    kind: ResourceKind,
    table: BTreeMap<&'static str, Capability>,
}

impl Capabilities {
    pub fn build(schema: &Schema, platform: &Platform) -> Self {
        let table = schema
            .properties()
            .iter()
            .map(|spec| {
                let supported = platform.supports(schema.kind(), spec.name);
                (
                    spec.name,
                    Capability {
                        kind: spec.kind,
                        supported,
                        standalone_setter: supported && !spec.is_composite_member(),
                    },
                )
            })
            .collect();
        Self {
            kind: schema.kind(),
            table,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn get(&self, property: &str) -> Option<&Capability> {
        self.table.get(property)
    }

    /// Whether a single-property write may be issued
    pub fn can_set(&self, property: &str) -> bool {
        self.get(property).is_some_and(|c| c.standalone_setter)
    }
}

/// How the provider set is composed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Whether the device abstraction layer is present on this host
    pub device_api: bool,
    pub platform: Platform,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            device_api: true,
            platform: Platform::generic("generic"),
        }
    }
}

/// Capability tables for every kind, built once per run
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    platform: Platform,
    tables: BTreeMap<ResourceKind, Capabilities>,
}

impl CapabilityRegistry {
    /// Check the device layer once and build every table
    pub fn compose(config: &ProviderConfig) -> Result<Self> {
        if !config.device_api {
            return Err(Error::DeviceApiUnavailable);
        }
        let tables = ResourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Capabilities::build(kinds::schema(kind), &config.platform)))
            .collect();
        log::debug!("composed capability tables for platform {}", config.platform.name);
        Ok(Self {
            platform: config.platform.clone(),
            tables,
        })
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    pub fn for_kind(&self, kind: ResourceKind) -> &Capabilities {
        // compose() fills every kind
        &self.tables[&kind]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_n9k_lacks_nat_destination() {
        let registry = CapabilityRegistry::compose(&ProviderConfig {
            device_api: true,
            platform: "n9k".parse().unwrap(),
        })
        .unwrap();
        let service = registry.for_kind(ResourceKind::Service);
        assert!(!service.can_set("nat_destination"));
        assert!(service.can_set("access_list"));
        assert!(!service.get("nat_destination").unwrap().supported);
    }

    #[test]
    fn test_group_members_have_no_standalone_setter() {
        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let service = registry.for_kind(ResourceKind::Service);
        assert!(!service.can_set("load_bal_buckets"));
        assert!(service.get("load_bal_buckets").unwrap().supported);
        assert!(service.can_set("shutdown"));
    }

    #[test]
    fn test_unknown_property_cannot_be_set() {
        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        assert!(!registry.for_kind(ResourceKind::DeviceGroup).can_set("colour"));
    }

    #[test]
    fn test_compose_requires_device_api() {
        let config = ProviderConfig {
            device_api: false,
            ..ProviderConfig::default()
        };
        assert!(matches!(
            CapabilityRegistry::compose(&config),
            Err(Error::DeviceApiUnavailable)
        ));
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!("n3k".parse::<Platform>().is_err());
    }
}
