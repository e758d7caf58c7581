//! Pending changes and composite payloads
//!
//! Setters compare a desired value with the live one and stage the property
//! only when they differ. The staged set is consumed once by
//! [`crate::flush::Provider::flush`].

use crate::descriptor::{Desired, ResourceDescriptor};
use crate::error::{Error, Operation, Result};
use crate::kinds;
use crate::matcher::LiveObject;
use crate::schema::{CompositeGroup, PropertyKind, PropertySpec};
use crate::store::{DeviceStore, GroupPayload, ObjectKey};
use crate::value::{TriState, Value};
use std::collections::BTreeMap;
use std::fmt;

/// A staged value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged {
    Value(Value),
    /// Composite member declared as `default`; resolved when the payload is built
    Default,
}

impl fmt::Display for Staged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Default => f.write_str("(device default)"),
        }
    }
}

/// Properties waiting to be written, keyed by property name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingDiff {
    entries: BTreeMap<&'static str, Staged>,
}

impl PendingDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, property: &'static str, staged: Staged) {
        self.entries.insert(property, staged);
    }

    pub fn get(&self, property: &str) -> Option<&Staged> {
        self.entries.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Staged)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }
}

/// One property that will be written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChange {
    pub property: &'static str,
    pub current: Option<Value>,
    pub desired: Desired,
    /// Value the device will end up with (`default` already resolved)
    pub resolved: Value,
}

/// Device default for a property
pub fn resolve_default<S: DeviceStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
    property: &str,
) -> Result<Value> {
    store
        .default_for(key, property)
        .map_err(|source| Error::Device {
            key: key.clone(),
            operation: Operation::DefaultLookup,
            property: Some(property.to_string()),
            value: None,
            source,
        })
}

/// Whether writing `new` would change what the device reports
fn differs(current: Option<&Value>, new: &Value) -> bool {
    match current {
        Some(current) => !current.matches(new),
        // nothing reported reads as an unknown flag
        None => !matches!(new, Value::Flag(TriState::Unknown)),
    }
}

/// Setter: stage a property when its desired value differs from `current`
///
/// A `default` on a standalone property is resolved right away and the
/// resolved value is staged. A `default` on a composite member is resolved
/// only to decide whether it differs; the member is staged as
/// [`Staged::Default`] and resolved again when its payload is built.
///
/// A literal `default` token is read as the sentinel, so it is never staged.
///
/// With `unconditional` set (bootstrap of a new object) the property is
/// staged even if it matches.
pub fn stage_property<S: DeviceStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
    spec: &PropertySpec,
    desired: &Desired,
    current: Option<&Value>,
    unconditional: bool,
    pending: &mut PendingDiff,
) -> Result<Option<PropertyChange>> {
    let desired = desired.clone().normalized();
    let (resolved, staged) = match &desired {
        Desired::Default => {
            let resolved = resolve_default(store, key, spec.name)?.coerce_to(spec.kind);
            let staged = if spec.is_composite_member() {
                Staged::Default
            } else {
                Staged::Value(resolved.clone())
            };
            (resolved, staged)
        }
        Desired::Value(value) => {
            let value = value.clone().coerce_to(spec.kind);
            (value.clone(), Staged::Value(value))
        }
    };

    if !unconditional && !differs(current, &resolved) {
        return Ok(None);
    }

    pending.record(spec.name, staged);
    Ok(Some(PropertyChange {
        property: spec.name,
        current: current.cloned(),
        desired,
        resolved,
    }))
}

/// Full payload for a composite group, or `None` when no member is staged
///
/// Every member carries a value. In order of preference: the staged value,
/// the device default when the descriptor says `default`, the descriptor
/// literal, the live value, and the device default when nothing is known.
pub fn group_payload<S: DeviceStore + ?Sized>(
    store: &S,
    key: &ObjectKey,
    group: &CompositeGroup,
    descriptor: &ResourceDescriptor,
    pending: &PendingDiff,
    live: Option<&LiveObject>,
) -> Result<Option<GroupPayload>> {
    if !group.members.iter().any(|m| pending.contains(m)) {
        return Ok(None);
    }

    let mut payload = GroupPayload::new();
    for &member in &group.members {
        let value = match (pending.get(member), descriptor.get(member)) {
            (Some(Staged::Value(v)), _) => v.clone(),
            (Some(Staged::Default), _) | (None, Some(Desired::Default)) => {
                resolve_default(store, key, member)?
            }
            (None, Some(Desired::Value(v))) => {
                let kind = kinds::schema(key.kind)
                    .property(member)
                    .map_or(PropertyKind::Scalar, |p| p.kind);
                v.clone().coerce_to(kind)
            }
            (None, None) => match live.and_then(|l| l.get(member)) {
                Some(v) => v.clone(),
                None => resolve_default(store, key, member)?,
            },
        };
        payload.insert(member.to_string(), value.to_device_form());
    }
    Ok(Some(payload))
}
