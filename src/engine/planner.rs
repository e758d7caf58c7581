//! Pass ordering
//!
//! Objects reference each other: a node names its device group, a service
//! names a device group. Present objects are converged parents first, absent
//! ones children first.

use manifest::Manifest;
use plb_core::{Ensure, ResourceDescriptor, ResourceKind};

/// One kind, one lifecycle direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pass {
    pub kind: ResourceKind,
    pub ensure: Ensure,
}

impl Pass {
    /// Descriptors of the manifest handled by this pass
    pub fn descriptors(&self, manifest: &Manifest) -> Vec<ResourceDescriptor> {
        manifest.of_kind_ensure(self.kind, self.ensure)
    }
}

/// Every pass, in execution order, optionally limited to one kind
pub fn passes(only: Option<ResourceKind>) -> Vec<Pass> {
    let mut kinds = ResourceKind::ALL.to_vec();
    kinds.sort_by_key(|k| k.rank());
    kinds.retain(|k| only.is_none_or(|o| o == *k));

    let present = kinds.iter().map(|&kind| Pass {
        kind,
        ensure: Ensure::Present,
    });
    let absent = kinds.iter().rev().map(|&kind| Pass {
        kind,
        ensure: Ensure::Absent,
    });
    present.chain(absent).collect()
}
