//! Device snapshots on disk
//!
//! Offline runs plan and apply against a JSON snapshot of the device held in
//! a [`MemoryStore`].

use anyhow::{Context, Result};
use plb_core::MemoryStore;
use std::fs;
use std::path::Path;

/// Load a snapshot; a missing file is an empty device
pub fn load(path: &Path) -> Result<MemoryStore> {
    if !path.exists() {
        log::info!("{} does not exist, starting from an empty device", path.display());
        return Ok(MemoryStore::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid device snapshot in {}", path.display()))
}

/// Write the snapshot back
pub fn save(path: &Path, store: &MemoryStore) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Could not create {}", parent.display()))?;
    }
    let content = serde_json::to_string_pretty(store)?;
    fs::write(path, content).with_context(|| format!("Could not write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plb_core::{Identity, ResourceKind, Value};
    use tempfile::TempDir;

    #[test]
    fn test_missing_snapshot_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = load(&tmp.path().join("device.json")).unwrap();
        assert!(store.objects().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("device.json");
        let mut store = MemoryStore::new();
        store.insert(
            ResourceKind::DeviceGroup,
            Identity::single("udpGroup"),
            [("probe_port", Value::Int(53))],
        );

        save(&path, &store).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back.objects(), store.objects());
    }

    #[test]
    fn test_corrupt_snapshot_names_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("device.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("device.json"));
    }
}
