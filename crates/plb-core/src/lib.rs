//! # PLB Core
//!
//! Reconciliation engine for PLB load-balancing objects.
//!
//! This crate compares the declared state of services, device groups and
//! device-group nodes with what a device reports, and issues only the writes
//! needed to converge them.
//!
//! ## Core Concepts
//!
//! - **Schema**: Static property table per resource kind (scalars, flags,
//!   tuple lists, composite groups, the activation gate)
//! - **ResourceDescriptor**: Declared state of one object, possibly using the
//!   `default` sentinel
//! - **Provider**: A descriptor bound to zero or one live object, with a
//!   pending diff and a flush state machine
//! - **DeviceStore**: The device transport, as a trait
//!
//! ## Example
//!
//! ```ignore
//! use plb_core::{
//!     CapabilityRegistry, Identity, MemoryStore, ProviderConfig,
//!     ResourceDescriptor, ResourceKind, Value, prefetch,
//! };
//!
//! let mut store = MemoryStore::new();
//! let registry = CapabilityRegistry::compose(&ProviderConfig::default())?;
//!
//! let web = ResourceDescriptor::new(ResourceKind::Service, Identity::single("web"))?
//!     .with("access_list", Value::text("iap"))?
//!     .with_default("peer_local")?
//!     .with("shutdown", Value::flag(false))?;
//!
//! let caps = registry.for_kind(ResourceKind::Service);
//! for mut provider in prefetch(&store, caps, vec![web])? {
//!     let outcome = provider.converge(&mut store)?;
//!     println!("{}: {outcome}", provider.key());
//! }
//! ```
//!
//! ## Provider Traits
//!
//! [`DeviceStore`] is the only seam. [`MemoryStore`] implements it over an
//! in-memory snapshot and records every write, so the engine can be tested
//! and driven offline without a device.

pub mod capability;
pub mod descriptor;
pub mod diff;
pub mod error;
pub mod flush;
pub mod kinds;
pub mod matcher;
pub mod memory;
pub mod ordering;
pub mod schema;
pub mod store;
pub mod value;

pub use capability::{Capabilities, Capability, CapabilityRegistry, Platform, ProviderConfig};
pub use descriptor::{Desired, Ensure, ResourceDescriptor};
pub use diff::{PendingDiff, PropertyChange, Staged};
pub use error::{Error, Operation, Result};
pub use flush::{FlushState, Outcome, Plan, PlanAction, Provider};
pub use matcher::{LiveObject, instances, prefetch};
pub use memory::{DeviceCall, MemoryStore, StoredObject};
pub use ordering::{Activation, Phase};
pub use schema::{GroupId, PropertyKind, PropertySpec, ResourceKind, Schema};
pub use store::{DeviceStore, GroupPayload, Identity, ObjectKey};
pub use value::{TriState, Value};
