//! Tool configuration from YAML

use crate::core::features::FeatureOverrides;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "preupgrade";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Top-level configuration loaded from YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Directory holding the `*.repo` files
    #[serde(default = "default_repos_dir")]
    pub repos_dir: PathBuf,

    /// Timeout applied to every command (in seconds)
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,

    /// Installer binary run by `installer_run`
    #[serde(default = "default_installer")]
    pub installer: String,

    /// Overrides for detected host features
    #[serde(default)]
    pub features: FeatureOverrides,

    /// Extra context per step label
    #[serde(default)]
    pub context: BTreeMap<String, StepContextConfig>,
}

/// Context bound to one step before execution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepContextConfig {
    /// Extra command-line arguments for the step
    #[serde(default)]
    pub arguments: Vec<String>,
}

fn default_repos_dir() -> PathBuf {
    PathBuf::from("/etc/yum.repos.d")
}

fn default_installer() -> String {
    "satellite-installer".to_string()
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            repos_dir: default_repos_dir(),
            command_timeout_secs: None,
            installer: default_installer(),
            features: FeatureOverrides::default(),
            context: BTreeMap::new(),
        }
    }
}

impl ToolConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ToolConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.repos_dir.as_os_str().is_empty() {
            anyhow::bail!("repos_dir must not be empty");
        }
        if self.installer.trim().is_empty() {
            anyhow::bail!("installer must not be empty");
        }
        if self.command_timeout_secs == Some(0) {
            anyhow::bail!("command_timeout_secs must be greater than zero");
        }
        for label in self.context.keys() {
            if label.trim().is_empty() {
                anyhow::bail!("context entries need a step label");
            }
        }
        Ok(())
    }

    /// `<config dir>/preupgrade/config.yaml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load an explicit file, or the default one if it exists, or defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Configured extra arguments for a step label
    pub fn arguments_for(&self, label: &str) -> &[String] {
        self.context
            .get(label)
            .map(|entry| entry.arguments.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ToolConfig::from_yaml("").unwrap();
        assert_eq!(config.repos_dir, PathBuf::from("/etc/yum.repos.d"));
        assert_eq!(config.installer, "satellite-installer");
        assert_eq!(config.command_timeout(), None);
        assert!(config.context.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
repos_dir: /tmp/repos
command_timeout_secs: 30
installer: foreman-installer
features:
  downstream: true
context:
  installer_run:
    arguments:
      - "--verbose"
      - "--disable-system-checks"
"#;

        let config = ToolConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.repos_dir, PathBuf::from("/tmp/repos"));
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.installer, "foreman-installer");
        assert_eq!(config.features.downstream, Some(true));
        assert_eq!(config.features.server, None);
        assert_eq!(
            config.arguments_for("installer_run"),
            ["--verbose", "--disable-system-checks"]
        );
        assert!(config.arguments_for("other").is_empty());
    }

    #[test]
    fn test_zero_timeout_fails() {
        assert!(ToolConfig::from_yaml("command_timeout_secs: 0").is_err());
    }

    #[test]
    fn test_empty_repos_dir_fails() {
        assert!(ToolConfig::from_yaml("repos_dir: \"\"").is_err());
    }

    #[test]
    fn test_unknown_field_type_fails() {
        assert!(ToolConfig::from_yaml("command_timeout_secs: soon").is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "installer: custom-installer\n").unwrap();

        let config = ToolConfig::load(Some(&path)).unwrap();
        assert_eq!(config.installer, "custom-installer");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ToolConfig::load(Some(&dir.path().join("absent.yaml")));
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("absent.yaml"));
    }
}
