//! In-memory device store
//!
//! Holds a snapshot of device objects and answers the [`DeviceStore`]
//! contract against it. Every write is recorded as a [`DeviceCall`] so tests
//! can assert exactly what reached the device, and a failure can be injected
//! on any operation. The snapshot is serde-serializable, which lets the CLI
//! plan and apply against a JSON file instead of a live appliance.

use crate::error::Operation;
use crate::kinds;
use crate::schema::{GroupId, PropertyKind, ResourceKind};
use crate::store::{DeviceStore, GroupPayload, Identity, ObjectKey};
use crate::value::Value;
use anyhow::{Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One object held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObject {
    pub kind: ResourceKind,
    pub identity: Identity,
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
}

/// A write that reached the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    Construct(ObjectKey),
    Destroy(ObjectKey),
    Set {
        key: ObjectKey,
        property: String,
        value: Value,
    },
    Group {
        key: ObjectKey,
        group: GroupId,
        attrs: GroupPayload,
    },
}

impl DeviceCall {
    pub fn key(&self) -> &ObjectKey {
        match self {
            Self::Construct(key) | Self::Destroy(key) => key,
            Self::Set { key, .. } | Self::Group { key, .. } => key,
        }
    }

    /// Property name for single writes
    pub fn property(&self) -> Option<&str> {
        match self {
            Self::Set { property, .. } => Some(property),
            _ => None,
        }
    }

    /// Every value carried by the call
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Set { value, .. } => vec![value],
            Self::Group { attrs, .. } => attrs.values().collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: Operation,
    property: Option<String>,
}

/// Device snapshot plus call log
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryStore {
    #[serde(default)]
    objects: Vec<StoredObject>,
    /// Overrides for the built-in defaults, per kind
    #[serde(default)]
    defaults: BTreeMap<ResourceKind, BTreeMap<String, Value>>,
    #[serde(skip)]
    calls: Vec<DeviceCall>,
    #[serde(skip)]
    failure: Option<InjectedFailure>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object without recording a call
    pub fn insert(
        &mut self,
        kind: ResourceKind,
        identity: Identity,
        values: impl IntoIterator<Item = (&'static str, Value)>,
    ) -> &mut Self {
        let values = values
            .into_iter()
            .map(|(name, value)| (name.to_string(), normalize(kind, name, value)))
            .collect();
        self.objects.push(StoredObject {
            kind,
            identity,
            values,
        });
        self
    }

    /// Override the default the device reports for a property
    pub fn set_default(&mut self, kind: ResourceKind, property: &str, value: Value) -> &mut Self {
        self.defaults
            .entry(kind)
            .or_default()
            .insert(property.to_string(), value);
        self
    }

    /// Make the next matching operation fail
    ///
    /// With a property, only calls touching that property fail.
    pub fn fail_on(&mut self, operation: Operation, property: Option<&str>) -> &mut Self {
        self.failure = Some(InjectedFailure {
            operation,
            property: property.map(str::to_string),
        });
        self
    }

    pub fn objects(&self) -> &[StoredObject] {
        &self.objects
    }

    pub fn object(&self, key: &ObjectKey) -> Option<&StoredObject> {
        self.objects
            .iter()
            .find(|o| o.kind == key.kind && o.identity == key.identity)
    }

    /// Value currently held for a property
    pub fn value(&self, key: &ObjectKey, property: &str) -> Option<&Value> {
        self.object(key).and_then(|o| o.values.get(property))
    }

    /// Writes recorded so far
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    fn check(&self, operation: Operation, property: Option<&str>) -> Result<()> {
        if let Some(failure) = &self.failure
            && failure.operation == operation
            && (failure.property.is_none() || failure.property.as_deref() == property)
        {
            bail!("injected {operation} failure");
        }
        Ok(())
    }

    fn object_mut(&mut self, key: &ObjectKey) -> Result<&mut StoredObject> {
        self.objects
            .iter_mut()
            .find(|o| o.kind == key.kind && o.identity == key.identity)
            .ok_or_else(|| anyhow!("no such object: {key}"))
    }

    fn write_group(&mut self, key: &ObjectKey, group: GroupId, attrs: GroupPayload) -> Result<()> {
        let object = self.object_mut(key)?;
        for (name, value) in &attrs {
            let value = normalize(key.kind, name, value.clone());
            object.values.insert(name.clone(), value);
        }
        log::debug!("{key}: {group} <- {} members", attrs.len());
        self.calls.push(DeviceCall::Group {
            key: key.clone(),
            group,
            attrs,
        });
        Ok(())
    }
}

/// Store flags as flags even when they arrive as device tokens
fn normalize(kind: ResourceKind, property: &str, value: Value) -> Value {
    match kinds::schema(kind).property(property).map(|p| p.kind) {
        Some(PropertyKind::Flag) => Value::Flag(value.as_tristate()),
        _ => value,
    }
}

/// Factory default reported for a property
fn builtin_default(kind: ResourceKind, property: &str) -> Option<Value> {
    let spec = kinds::schema(kind).property(property)?;
    let value = match (property, spec.kind) {
        ("shutdown", _) => Value::flag(true),
        (_, PropertyKind::Flag) => Value::flag(false),
        (_, PropertyKind::TupleList) => Value::Tuples(Vec::new()),
        ("probe_frequency", _) => Value::Int(10),
        ("probe_retry_down" | "probe_retry_up", _) => Value::Int(1),
        ("probe_timeout", _) => Value::Int(5),
        ("probe_type", _) => Value::text("icmp"),
        ("weight", _) => Value::Int(1),
        (_, PropertyKind::Scalar) => Value::text(""),
    };
    Some(value)
}

impl DeviceStore for MemoryStore {
    fn enumerate(&self, kind: ResourceKind) -> Result<Vec<Identity>> {
        self.check(Operation::Enumerate, None)?;
        Ok(self
            .objects
            .iter()
            .filter(|o| o.kind == kind)
            .map(|o| o.identity.clone())
            .collect())
    }

    fn get(&self, key: &ObjectKey, property: &str) -> Result<Option<Value>> {
        self.check(Operation::Get, Some(property))?;
        let object = self
            .object(key)
            .ok_or_else(|| anyhow!("no such object: {key}"))?;
        Ok(object.values.get(property).cloned())
    }

    fn set(&mut self, key: &ObjectKey, property: &str, value: &Value) -> Result<()> {
        self.check(Operation::Set, Some(property))?;
        let normalized = normalize(key.kind, property, value.clone());
        self.object_mut(key)?
            .values
            .insert(property.to_string(), normalized);
        self.calls.push(DeviceCall::Set {
            key: key.clone(),
            property: property.to_string(),
            value: value.clone(),
        });
        Ok(())
    }

    fn default_for(&self, key: &ObjectKey, property: &str) -> Result<Value> {
        self.check(Operation::DefaultLookup, Some(property))?;
        self.defaults
            .get(&key.kind)
            .and_then(|d| d.get(property))
            .cloned()
            .or_else(|| builtin_default(key.kind, property))
            .ok_or_else(|| anyhow!("{} has no default for `{property}`", key.kind))
    }

    fn probe_set(&mut self, key: &ObjectKey, attrs: &GroupPayload) -> Result<()> {
        self.check(Operation::GroupSubmit(GroupId::Probe), None)?;
        self.write_group(key, GroupId::Probe, attrs.clone())
    }

    fn load_balance_set(&mut self, key: &ObjectKey, attrs: &GroupPayload) -> Result<()> {
        self.check(Operation::GroupSubmit(GroupId::LoadBalance), None)?;
        self.write_group(key, GroupId::LoadBalance, attrs.clone())
    }

    fn hot_standby_weight_set(
        &mut self,
        key: &ObjectKey,
        hot_standby: &Value,
        weight: &Value,
    ) -> Result<()> {
        self.check(Operation::GroupSubmit(GroupId::HotStandbyWeight), None)?;
        let attrs = GroupPayload::from([
            ("hot_standby".to_string(), hot_standby.clone()),
            ("weight".to_string(), weight.clone()),
        ]);
        self.write_group(key, GroupId::HotStandbyWeight, attrs)
    }

    fn construct(&mut self, key: &ObjectKey) -> Result<()> {
        self.check(Operation::Construct, None)?;
        if self.object(key).is_some() {
            bail!("{key} already exists");
        }
        self.objects.push(StoredObject {
            kind: key.kind,
            identity: key.identity.clone(),
            values: BTreeMap::new(),
        });
        self.calls.push(DeviceCall::Construct(key.clone()));
        Ok(())
    }

    fn destroy(&mut self, key: &ObjectKey) -> Result<()> {
        self.check(Operation::Destroy, None)?;
        let before = self.objects.len();
        self.objects
            .retain(|o| !(o.kind == key.kind && o.identity == key.identity));
        if self.objects.len() == before {
            bail!("no such object: {key}");
        }
        self.calls.push(DeviceCall::Destroy(key.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_key() -> ObjectKey {
        ObjectKey::new(ResourceKind::DeviceGroup, Identity::single("udpGroup"))
    }

    #[test]
    fn test_set_records_call_and_updates_value() {
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::DeviceGroup, Identity::single("udpGroup"), []);
        let key = group_key();

        store.set(&key, "probe_port", &Value::Int(80)).unwrap();
        assert_eq!(store.value(&key, "probe_port"), Some(&Value::Int(80)));
        assert_eq!(store.calls().len(), 1);
        assert_eq!(store.calls()[0].property(), Some("probe_port"));
    }

    #[test]
    fn test_group_write_normalizes_flag_tokens() {
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::DeviceGroup, Identity::single("udpGroup"), []);
        let key = group_key();
        let attrs = GroupPayload::from([("probe_control".to_string(), Value::text("true"))]);

        store.probe_set(&key, &attrs).unwrap();
        assert_eq!(store.value(&key, "probe_control"), Some(&Value::flag(true)));
    }

    #[test]
    fn test_defaults_prefer_overrides() {
        let mut store = MemoryStore::new();
        let key = group_key();
        assert_eq!(store.default_for(&key, "probe_frequency").unwrap(), Value::Int(10));

        store.set_default(ResourceKind::DeviceGroup, "probe_frequency", Value::Int(30));
        assert_eq!(store.default_for(&key, "probe_frequency").unwrap(), Value::Int(30));
        assert!(store.default_for(&key, "nonsense").is_err());
    }

    #[test]
    fn test_injected_failure_is_scoped_to_property() {
        let mut store = MemoryStore::new();
        store.insert(ResourceKind::DeviceGroup, Identity::single("udpGroup"), []);
        store.fail_on(Operation::Set, Some("probe_port"));
        let key = group_key();

        assert!(store.set(&key, "probe_port", &Value::Int(80)).is_err());
        assert!(store.set(&key, "probe_type", &Value::text("tcp")).is_ok());
    }

    #[test]
    fn test_construct_twice_fails() {
        let mut store = MemoryStore::new();
        let key = group_key();
        store.construct(&key).unwrap();
        assert!(store.construct(&key).is_err());
        store.destroy(&key).unwrap();
        assert!(store.destroy(&key).is_err());
    }

    #[test]
    fn test_snapshot_round_trip_through_json() {
        let mut store = MemoryStore::new();
        store.insert(
            ResourceKind::DeviceGroupNode,
            Identity::composite(["udpGroup", "1.1.1.1", "ip"]),
            [("weight", Value::Int(5)), ("hot_standby", Value::flag(false))],
        );
        let json = serde_json::to_string(&store).unwrap();
        let back: MemoryStore = serde_json::from_str(&json).unwrap();
        assert_eq!(back.objects(), store.objects());
        assert!(back.calls().is_empty());
    }
}
