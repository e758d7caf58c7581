//! Data types for the manifest crate

use plb_core::{Ensure, ResourceDescriptor, ResourceKind};

/// Every resource declared in one manifest, in document order per kind
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    resources: Vec<ResourceDescriptor>,
}

impl Manifest {
    pub(crate) fn push(&mut self, descriptor: ResourceDescriptor) {
        self.resources.push(descriptor);
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    /// Descriptors of one kind
    pub fn of_kind(&self, kind: ResourceKind) -> Vec<ResourceDescriptor> {
        self.resources
            .iter()
            .filter(|d| d.kind() == kind)
            .cloned()
            .collect()
    }

    /// Descriptors of one kind with the given lifecycle state
    pub fn of_kind_ensure(&self, kind: ResourceKind, ensure: Ensure) -> Vec<ResourceDescriptor> {
        self.resources
            .iter()
            .filter(|d| d.kind() == kind && d.ensure() == ensure)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Counts per kind, for summaries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManifestStats {
    pub services: usize,
    pub device_groups: usize,
    pub nodes: usize,
    /// Entries with `ensure = "absent"`
    pub absent: usize,
}

impl From<&Manifest> for ManifestStats {
    fn from(manifest: &Manifest) -> Self {
        let mut stats = Self::default();
        for d in manifest.resources() {
            match d.kind() {
                ResourceKind::Service => stats.services += 1,
                ResourceKind::DeviceGroup => stats.device_groups += 1,
                ResourceKind::DeviceGroupNode => stats.nodes += 1,
            }
            if d.ensure() == Ensure::Absent {
                stats.absent += 1;
            }
        }
        stats
    }
}
