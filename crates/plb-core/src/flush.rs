//! Per-resource flush state machine
//!
//! A [`Provider`] pairs one declared resource with at most one live object.
//! Setters stage changes into its [`PendingDiff`]; [`Provider::flush`] turns
//! the staged set into device calls:
//!
//! - **absent**: destroy the bound object and unbind it
//! - **create**: construct, stage every declared property unconditionally,
//!   then apply
//! - **update**: apply what the setters staged
//!
//! Applying follows the ordering policy in [`crate::ordering`]. Plain
//! properties are written one by one where the platform has a setter, and
//! each triggered composite group is submitted in exactly one call. The
//! first device failure aborts the rest of the flush.

use crate::capability::Capabilities;
use crate::descriptor::{Desired, Ensure, ResourceDescriptor};
use crate::diff::{self, PendingDiff, PropertyChange, Staged};
use crate::error::{Error, Operation, Result};
use crate::kinds;
use crate::matcher::LiveObject;
use crate::ordering::{self, Activation, Phase};
use crate::schema::{CompositeGroup, GroupId, PropertySpec, Schema};
use crate::store::{DeviceStore, GroupPayload, ObjectKey};
use crate::value::Value;
use std::fmt;

/// Where a provider stands before flushing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState<'p> {
    /// Not on the device and not wanted
    Absent,
    PendingCreate,
    PendingDestroy,
    PendingUpdate(&'p PendingDiff),
}

/// What a flush did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    Updated { writes: usize },
    Destroyed,
    NoChange,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Updated { writes } => write!(f, "updated ({writes} writes)"),
            Self::Destroyed => f.write_str("destroyed"),
            Self::NoChange => f.write_str("no change"),
        }
    }
}

/// Planned action for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanAction {
    Create,
    Update,
    Destroy,
    Unchanged,
}

/// Preview of a flush, computed without writing
#[derive(Debug, Clone)]
pub struct Plan {
    pub key: ObjectKey,
    pub action: PlanAction,
    pub changes: Vec<PropertyChange>,
    /// Properties that would be skipped for lack of a setter
    pub skipped: Vec<&'static str>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.action != PlanAction::Unchanged
    }
}

/// One declared resource bound to zero or one live object
#[derive(Debug)]
pub struct Provider<'a> {
    schema: &'static Schema,
    caps: &'a Capabilities,
    descriptor: ResourceDescriptor,
    live: Option<LiveObject>,
    pending: PendingDiff,
    ensure: Option<Ensure>,
}

impl<'a> Provider<'a> {
    pub fn new(
        caps: &'a Capabilities,
        descriptor: ResourceDescriptor,
        live: Option<LiveObject>,
    ) -> Result<Self> {
        if descriptor.kind() != caps.kind() {
            return Err(Error::KindMismatch {
                expected: caps.kind(),
                actual: descriptor.kind(),
            });
        }
        Ok(Self {
            schema: kinds::schema(descriptor.kind()),
            caps,
            descriptor,
            live,
            pending: PendingDiff::new(),
            ensure: None,
        })
    }

    pub fn key(&self) -> &ObjectKey {
        self.descriptor.key()
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    pub fn live(&self) -> Option<&LiveObject> {
        self.live.as_ref()
    }

    /// A live object is bound
    pub fn exists(&self) -> bool {
        self.live.is_some()
    }

    /// Request the object be present
    pub fn create(&mut self) {
        self.ensure = Some(Ensure::Present);
    }

    /// Request the object be removed
    pub fn destroy(&mut self) {
        self.ensure = Some(Ensure::Absent);
    }

    /// Explicit request if any, else what the descriptor declares
    fn wanted(&self) -> Ensure {
        self.ensure.unwrap_or_else(|| self.descriptor.ensure())
    }

    pub fn state(&self) -> FlushState<'_> {
        match (self.wanted(), self.exists()) {
            (Ensure::Absent, true) => FlushState::PendingDestroy,
            (Ensure::Absent, false) => FlushState::Absent,
            (Ensure::Present, false) => FlushState::PendingCreate,
            (Ensure::Present, true) => FlushState::PendingUpdate(&self.pending),
        }
    }

    /// Current value read through to the live object
    pub fn get(&self, property: &str) -> Option<&Value> {
        self.live.as_ref().and_then(|l| l.get(property))
    }

    pub fn pending(&self) -> &PendingDiff {
        &self.pending
    }

    fn spec(&self, property: &str) -> Result<&'static PropertySpec> {
        self.schema
            .property(property)
            .ok_or_else(|| Error::UnknownProperty {
                kind: self.schema.kind(),
                property: property.to_string(),
            })
    }

    /// Setter: stage `desired` for a property if it differs from the live value
    pub fn set<S: DeviceStore + ?Sized>(
        &mut self,
        store: &S,
        property: &str,
        desired: &Desired,
    ) -> Result<Option<PropertyChange>> {
        let spec = self.spec(property)?;
        let current = self.live.as_ref().and_then(|l| l.get(spec.name));
        diff::stage_property(
            store,
            self.descriptor.key(),
            spec,
            desired,
            current,
            false,
            &mut self.pending,
        )
    }

    /// Run the setter for every declared property
    pub fn stage_changes<S: DeviceStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> Result<Vec<PropertyChange>> {
        let mut pending = std::mem::take(&mut self.pending);
        let changes = self.stage_declared(store, self.live.as_ref(), false, &mut pending);
        self.pending = pending;
        changes
    }

    /// Stage changes and flush in one go
    pub fn converge<S: DeviceStore + ?Sized>(&mut self, store: &mut S) -> Result<Outcome> {
        if matches!(self.state(), FlushState::PendingUpdate(_)) {
            self.stage_changes(&*store)?;
        }
        self.flush(store)
    }

    /// Compute what [`Provider::converge`] would do, without writing
    pub fn preview<S: DeviceStore + ?Sized>(&self, store: &S) -> Result<Plan> {
        let key = self.key().clone();
        let (action, changes) = match self.state() {
            FlushState::Absent => (PlanAction::Unchanged, Vec::new()),
            FlushState::PendingDestroy => (PlanAction::Destroy, Vec::new()),
            FlushState::PendingCreate => {
                let mut scratch = PendingDiff::new();
                let changes = self.stage_declared(store, None, true, &mut scratch)?;
                (PlanAction::Create, changes)
            }
            FlushState::PendingUpdate(_) => {
                let mut scratch = PendingDiff::new();
                let changes =
                    self.stage_declared(store, self.live.as_ref(), false, &mut scratch)?;
                let action = if changes.is_empty() {
                    PlanAction::Unchanged
                } else {
                    PlanAction::Update
                };
                (action, changes)
            }
        };
        // group members travel in their composite call even when unsupported
        let skipped = changes
            .iter()
            .map(|c| c.property)
            .filter(|p| {
                self.caps.get(p).is_some_and(|c| !c.supported)
                    && self.spec(p).is_ok_and(|s| !s.is_composite_member())
            })
            .collect();
        Ok(Plan {
            key,
            action,
            changes,
            skipped,
        })
    }

    fn stage_declared<S: DeviceStore + ?Sized>(
        &self,
        store: &S,
        live: Option<&LiveObject>,
        unconditional: bool,
        pending: &mut PendingDiff,
    ) -> Result<Vec<PropertyChange>> {
        let mut changes = Vec::new();
        for (name, desired) in self.descriptor.properties() {
            let spec = self.spec(name)?;
            let current = live.and_then(|l| l.get(spec.name));
            if let Some(change) = diff::stage_property(
                store,
                self.descriptor.key(),
                spec,
                desired,
                current,
                unconditional,
                pending,
            )? {
                changes.push(change);
            }
        }
        Ok(changes)
    }

    /// Turn the pending diff into device calls
    ///
    /// The pending diff is consumed whatever the result.
    pub fn flush<S: DeviceStore + ?Sized>(&mut self, store: &mut S) -> Result<Outcome> {
        let mut pending = std::mem::take(&mut self.pending);
        let key = self.descriptor.key().clone();

        match (self.wanted(), self.exists()) {
            (Ensure::Absent, false) => return Ok(Outcome::NoChange),
            (Ensure::Absent, true) => {
                log::info!("Destroying {key}");
                store.destroy(&key).map_err(|source| Error::Device {
                    key: key.clone(),
                    operation: Operation::Destroy,
                    property: None,
                    value: None,
                    source,
                })?;
                self.live = None;
                return Ok(Outcome::Destroyed);
            }
            (Ensure::Present, _) => {}
        }

        let new_object = !self.exists();
        if new_object {
            log::info!("Creating {key}");
            store.construct(&key).map_err(|source| Error::Device {
                key: key.clone(),
                operation: Operation::Construct,
                property: None,
                value: None,
                source,
            })?;
            pending = PendingDiff::new();
            self.stage_declared(&*store, None, true, &mut pending)?;
        }

        let writes = self.apply(store, &key, &pending, new_object)?;

        if new_object || writes > 0 {
            self.live = Some(LiveObject::read(
                &*store,
                self.schema,
                key.identity.clone(),
            )?);
        }

        Ok(if new_object {
            Outcome::Created
        } else if writes > 0 {
            Outcome::Updated { writes }
        } else {
            Outcome::NoChange
        })
    }

    fn apply<S: DeviceStore + ?Sized>(
        &self,
        store: &mut S,
        key: &ObjectKey,
        pending: &PendingDiff,
        new_object: bool,
    ) -> Result<usize> {
        let gate = self.schema.activation_gate();
        let current = gate
            .and_then(|g| self.live.as_ref().map(|l| l.flag(g.name)))
            .map_or(Activation::Unknown, Activation::from);
        let desired = gate.and_then(|g| self.desired_activation(g, pending));

        let mut writes = 0;
        for phase in ordering::apply_phases(gate.is_some(), new_object, current, desired) {
            match phase {
                Phase::Activation => {
                    if let Some(gate) = gate
                        && let Some(staged) = pending.get(gate.name)
                    {
                        writes += usize::from(self.write_plain(store, key, gate, staged)?);
                    }
                }
                Phase::Properties => {
                    for spec in self.schema.plain_properties() {
                        if let Some(staged) = pending.get(spec.name) {
                            writes += usize::from(self.write_plain(store, key, spec, staged)?);
                        }
                    }
                }
                Phase::Groups => {
                    for group in self.schema.groups() {
                        let payload = diff::group_payload(
                            &*store,
                            key,
                            group,
                            &self.descriptor,
                            pending,
                            self.live.as_ref(),
                        )?;
                        if let Some(payload) = payload {
                            submit_group(store, key, group, &payload)?;
                            writes += 1;
                        }
                    }
                }
            }
        }
        Ok(writes)
    }

    /// Desired gate state: staged value first, then the descriptor literal
    fn desired_activation(&self, gate: &PropertySpec, pending: &PendingDiff) -> Option<Activation> {
        match pending.get(gate.name) {
            Some(Staged::Value(v)) => Some(v.as_tristate().into()),
            _ => self
                .descriptor
                .get(gate.name)
                .and_then(Desired::literal)
                .map(|v| v.as_tristate().into()),
        }
    }

    /// Single-property write; returns false when the platform has no setter
    fn write_plain<S: DeviceStore + ?Sized>(
        &self,
        store: &mut S,
        key: &ObjectKey,
        spec: &PropertySpec,
        staged: &Staged,
    ) -> Result<bool> {
        if !self.caps.can_set(spec.name) {
            log::debug!("{key}: no setter for `{}` on this platform, skipping", spec.name);
            return Ok(false);
        }
        let value = match staged {
            Staged::Value(v) => v.clone(),
            Staged::Default => diff::resolve_default(&*store, key, spec.name)?,
        };
        log::debug!("{key}: {} = {value}", spec.name);
        store
            .set(key, spec.name, &value)
            .map_err(|source| Error::Device {
                key: key.clone(),
                operation: Operation::Set,
                property: Some(spec.name.to_string()),
                value: Some(value.to_string()),
                source,
            })?;
        Ok(true)
    }
}

/// One call per group, carrying every member
fn submit_group<S: DeviceStore + ?Sized>(
    store: &mut S,
    key: &ObjectKey,
    group: &CompositeGroup,
    payload: &GroupPayload,
) -> Result<()> {
    log::info!("{key}: submitting {} settings", group.id);
    let result = match group.id {
        GroupId::Probe => store.probe_set(key, payload),
        GroupId::LoadBalance => store.load_balance_set(key, payload),
        GroupId::HotStandbyWeight => {
            let member = |name: &'static str| {
                payload.get(name).ok_or_else(|| Error::IncompleteGroup {
                    key: key.clone(),
                    group: group.id,
                    member: name,
                })
            };
            let hot_standby = member("hot_standby")?;
            let weight = member("weight")?;
            store.hot_standby_weight_set(key, hot_standby, weight)
        }
    };
    result.map_err(|source| Error::Device {
        key: key.clone(),
        operation: Operation::GroupSubmit(group.id),
        property: None,
        value: Some(describe_payload(payload)),
        source,
    })
}

fn describe_payload(payload: &GroupPayload) -> String {
    payload
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}
