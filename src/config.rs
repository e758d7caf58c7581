use anyhow::{Context, Result};
use plb_core::{Platform, ProviderConfig, ResourceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_PLATFORM: &str = "generic";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".config").join("plbsync"))
}

// ============================================================================
// Settings
// ============================================================================

/// Contents of `~/.config/plbsync/config.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Default device snapshot
    #[serde(default)]
    pub device: Option<String>,
    /// Platform profile name
    #[serde(default)]
    pub platform: Option<String>,
    /// Whether the device abstraction layer is installed
    #[serde(default = "default_true")]
    pub device_api: bool,
    /// Extra unsupported properties, keyed by resource kind
    #[serde(default)]
    pub unsupported: BTreeMap<String, Vec<String>>,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            platform: None,
            device_api: true,
            unsupported: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load config.toml, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Snapshot path: the flag wins over the config file
    pub fn device_path(&self, flag: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = flag {
            return Ok(path.to_path_buf());
        }
        let device = self
            .device
            .as_deref()
            .context("No device snapshot given (use --device, PLBSYNC_DEVICE or `device` in config.toml)")?;
        let expanded = shellexpand::tilde(device);
        Ok(PathBuf::from(expanded.as_ref()))
    }

    /// Provider composition: platform profile plus configured exclusions
    pub fn provider_config(&self, platform_flag: Option<&str>) -> Result<ProviderConfig> {
        let name = platform_flag
            .or(self.platform.as_deref())
            .unwrap_or(DEFAULT_PLATFORM);
        let mut platform: Platform = name
            .parse()
            .with_context(|| format!("Invalid platform `{name}`"))?;

        for (kind, properties) in &self.unsupported {
            let kind: ResourceKind = kind
                .parse()
                .with_context(|| format!("Invalid [unsupported] entry `{kind}`"))?;
            for property in properties {
                platform = platform.without(kind, property.as_str());
            }
        }

        Ok(ProviderConfig {
            device_api: self.device_api,
            platform,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_from(&tmp.path().join("config.toml")).unwrap();
        assert!(settings.device_api);
        assert!(settings.device.is_none());
    }

    #[test]
    fn test_config_file_is_parsed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        fs::write(
            &path,
            r#"
device = "~/plb/device.json"
platform = "n7k"

[unsupported]
plb_service = ["fail_action"]
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        let config = settings.provider_config(None).unwrap();
        assert!(config.device_api);
        assert_eq!(config.platform.name, "n7k");
        assert!(!config.platform.supports(ResourceKind::Service, "fail_action"));
        assert!(config.platform.supports(ResourceKind::Service, "nat_destination"));

        let device = settings.device_path(None).unwrap();
        assert!(device.ends_with("plb/device.json"));
        assert!(!device.starts_with("~"));
    }

    #[test]
    fn test_flags_override_config() {
        let settings = Settings {
            device: Some("/srv/device.json".into()),
            platform: Some("n7k".into()),
            ..Settings::default()
        };
        let config = settings.provider_config(Some("n9k")).unwrap();
        assert!(!config.platform.supports(ResourceKind::Service, "nat_destination"));
        assert_eq!(
            settings.device_path(Some(Path::new("other.json"))).unwrap(),
            PathBuf::from("other.json")
        );
    }

    #[test]
    fn test_missing_device_is_an_error() {
        assert!(Settings::default().device_path(None).is_err());
    }

    #[test]
    fn test_bad_platform_is_an_error() {
        assert!(Settings::default().provider_config(Some("n3k")).is_err());
    }
}
