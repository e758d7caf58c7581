//! Matching declared resources to live device objects

use crate::capability::Capabilities;
use crate::descriptor::ResourceDescriptor;
use crate::error::{Error, Operation, Result};
use crate::flush::Provider;
use crate::kinds;
use crate::schema::{ResourceKind, Schema};
use crate::store::{DeviceStore, Identity, ObjectKey};
use crate::value::{TriState, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Snapshot of one device object, read once per pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveObject {
    key: ObjectKey,
    values: BTreeMap<&'static str, Option<Value>>,
}

impl LiveObject {
    /// Read every schema property of an object
    pub fn read<S: DeviceStore + ?Sized>(
        store: &S,
        schema: &Schema,
        identity: Identity,
    ) -> Result<Self> {
        let key = ObjectKey::new(schema.kind(), identity);
        log::debug!("Checking instance, {key}");
        let mut values = BTreeMap::new();
        for spec in schema.properties() {
            let value = store
                .get(&key, spec.name)
                .map_err(|source| Error::Device {
                    key: key.clone(),
                    operation: Operation::Get,
                    property: Some(spec.name.to_string()),
                    value: None,
                    source,
                })?
                .map(|v| v.coerce_to(spec.kind));
            values.insert(spec.name, value);
        }
        Ok(Self { key, values })
    }

    pub fn key(&self) -> &ObjectKey {
        &self.key
    }

    pub fn identity(&self) -> &Identity {
        &self.key.identity
    }

    /// Current value, `None` when the device reported nothing
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property).and_then(Option::as_ref)
    }

    /// Tri-state view of a flag property
    pub fn flag(&self, property: &str) -> TriState {
        self.get(property).map_or(TriState::Unknown, Value::as_tristate)
    }

    pub fn values(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> {
        self.values.iter().map(|(k, v)| (*k, v.as_ref()))
    }
}

/// Every live object of a kind
pub fn instances<S: DeviceStore + ?Sized>(store: &S, kind: ResourceKind) -> Result<Vec<LiveObject>> {
    let schema = kinds::schema(kind);
    let identities = store
        .enumerate(kind)
        .map_err(|source| Error::Enumerate { kind, source })?;
    identities
        .into_iter()
        .map(|identity| LiveObject::read(store, schema, identity))
        .collect()
}

/// Bind each descriptor to the live object with the same identity
///
/// Descriptors with no match stay unbound and will be created. Live objects
/// nobody declared are left alone. When the store reports the same identity
/// twice, the first one enumerated is used.
pub fn prefetch<'a, S: DeviceStore + ?Sized>(
    store: &S,
    caps: &'a Capabilities,
    descriptors: Vec<ResourceDescriptor>,
) -> Result<Vec<Provider<'a>>> {
    let kind = caps.kind();

    let mut seen = BTreeSet::new();
    for descriptor in &descriptors {
        if descriptor.kind() != kind {
            return Err(Error::KindMismatch {
                expected: kind,
                actual: descriptor.kind(),
            });
        }
        if !seen.insert(descriptor.identity()) {
            return Err(Error::DuplicateIdentity {
                kind,
                identity: descriptor.identity().to_string(),
            });
        }
    }

    let mut pool: Vec<Option<LiveObject>> = Vec::new();
    for live in instances(store, kind)? {
        if pool.iter().flatten().any(|l| l.identity() == live.identity()) {
            log::warn!("{} reported twice; keeping the first", live.key());
            continue;
        }
        pool.push(Some(live));
    }

    descriptors
        .into_iter()
        .map(|descriptor| {
            let live = pool
                .iter_mut()
                .find(|slot| {
                    slot.as_ref()
                        .is_some_and(|l| l.identity() == descriptor.identity())
                })
                .and_then(Option::take);
            if live.is_none() {
                log::debug!("{} not found on device", descriptor.key());
            }
            Provider::new(caps, descriptor, live)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityRegistry, ProviderConfig};
    use crate::memory::MemoryStore;

    fn node(group: &str, node: &str, node_type: &str) -> Identity {
        Identity::composite([group, node, node_type])
    }

    #[test]
    fn test_instances_reads_every_property() {
        let mut store = MemoryStore::new();
        store.insert(
            ResourceKind::DeviceGroup,
            Identity::single("g1"),
            [("probe_control", Value::text("true"))],
        );
        let live = instances(&store, ResourceKind::DeviceGroup).unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].flag("probe_control"), TriState::True);
        assert_eq!(live[0].flag("probe_type"), TriState::Unknown);
        assert!(live[0].get("probe_port").is_none());
    }

    #[test]
    fn test_prefetch_ignores_undeclared_live_objects() {
        let mut store = MemoryStore::new();
        store
            .insert(ResourceKind::DeviceGroupNode, node("g", "1.1.1.1", "ip"), [])
            .insert(ResourceKind::DeviceGroupNode, node("g", "2.2.2.2", "ip"), [])
            .insert(ResourceKind::DeviceGroupNode, node("g", "3.3.3.3", "ip"), []);

        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let caps = registry.for_kind(ResourceKind::DeviceGroupNode);
        let declared = vec![
            ResourceDescriptor::new(ResourceKind::DeviceGroupNode, node("g", "1.1.1.1", "ip"))
                .unwrap(),
            ResourceDescriptor::new(ResourceKind::DeviceGroupNode, node("g", "9.9.9.9", "ip"))
                .unwrap(),
        ];

        let providers = prefetch(&store, caps, declared).unwrap();
        assert_eq!(providers.len(), 2);
        assert!(providers[0].exists());
        assert!(!providers[1].exists());
    }

    #[test]
    fn test_prefetch_matches_on_every_key_field() {
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::DeviceGroupNode, node("g", "1.1.1.1", "ip"), []);

        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let caps = registry.for_kind(ResourceKind::DeviceGroupNode);
        let declared = vec![
            ResourceDescriptor::new(ResourceKind::DeviceGroupNode, node("g", "1.1.1.1", "ipv6"))
                .unwrap(),
        ];

        let providers = prefetch(&store, caps, declared).unwrap();
        assert!(!providers[0].exists());
    }

    #[test]
    fn test_prefetch_rejects_duplicate_descriptors() {
        let store = MemoryStore::new();
        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let caps = registry.for_kind(ResourceKind::DeviceGroup);
        let declared = vec![
            ResourceDescriptor::new(ResourceKind::DeviceGroup, Identity::single("g")).unwrap(),
            ResourceDescriptor::new(ResourceKind::DeviceGroup, Identity::single("g")).unwrap(),
        ];

        let err = prefetch(&store, caps, declared).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity { .. }));
    }

    #[test]
    fn test_prefetch_rejects_other_kinds() {
        let store = MemoryStore::new();
        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let caps = registry.for_kind(ResourceKind::Service);
        let declared =
            vec![ResourceDescriptor::new(ResourceKind::DeviceGroup, Identity::single("g")).unwrap()];

        assert!(matches!(
            prefetch(&store, caps, declared),
            Err(Error::KindMismatch { .. })
        ));
    }

    #[test]
    fn test_duplicate_live_identity_binds_first() {
        let mut store = MemoryStore::new();
        store
            .insert(
                ResourceKind::DeviceGroup,
                Identity::single("g"),
                [("probe_port", Value::Int(1))],
            )
            .insert(
                ResourceKind::DeviceGroup,
                Identity::single("g"),
                [("probe_port", Value::Int(2))],
            );

        let registry = CapabilityRegistry::compose(&ProviderConfig::default()).unwrap();
        let caps = registry.for_kind(ResourceKind::DeviceGroup);
        let declared =
            vec![ResourceDescriptor::new(ResourceKind::DeviceGroup, Identity::single("g")).unwrap()];

        let providers = prefetch(&store, caps, declared).unwrap();
        assert_eq!(providers[0].get("probe_port"), Some(&Value::Int(1)));
    }
}
