//! Configuration file handling
//!
//! Two files feed a snapshot run:
//! - `config.toml` in the platform config directory: tool settings
//! - the main YAML file named on the command line: hosts, test files and
//!   store options

use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use super::paths::{self, config_path};
use super::{Error, Result};

/// Tool settings loaded from `config.toml`
#[derive(Debug, Deserialize, Default)]
pub struct Settings {
    /// Path settings
    #[serde(default)]
    pub paths: PathSettings,

    /// Snapshot store settings
    #[serde(default)]
    pub store: StoreSettings,
}

/// Path settings
#[derive(Debug, Deserialize)]
pub struct PathSettings {
    /// Directory where snapshot files and store databases are written
    #[serde(default = "default_snapshot_dir")]
    pub snapshot_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            snapshot_dir: default_snapshot_dir(),
        }
    }
}

fn default_snapshot_dir() -> PathBuf {
    PathBuf::from(paths::SNAPSHOT_DIR)
}

/// Store settings
#[derive(Debug, Deserialize, Default)]
pub struct StoreSettings {
    /// Database used when the main config enables the store without naming one
    pub database_name: Option<String>,
}

impl Settings {
    /// Load settings from the default config file
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load settings from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Main config file
///
/// ```yaml
/// hosts:
///   - devices: r1
///   - include: devices.yml
///     group: MX, EX
/// tests:
///   - test_interfaces.yml
/// sqlite:
///   - store_in_sqlite: true
///     database_name: snapshots.db
/// ```
#[derive(Debug, Deserialize, Default)]
pub struct MainConfig {
    /// Devices to snapshot
    #[serde(default)]
    pub hosts: Vec<HostEntry>,

    /// Test definition files
    #[serde(default)]
    pub tests: Vec<String>,

    /// Store options; only the first entry is used
    #[serde(default)]
    pub sqlite: Vec<SqliteEntry>,
}

/// A host entry in the main config
///
/// Either a single device or a device-group file under `configs/`. Login
/// fields such as `username` and `passwd` are ignored.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HostEntry {
    /// Hostname or address of a single device
    #[serde(default, alias = "device")]
    pub devices: Option<String>,

    /// Device-group file, looked up under `configs/`
    pub include: Option<String>,

    /// Comma-separated groups to take from `include`; `all` when unset
    pub group: Option<String>,
}

/// Store options in the main config
#[derive(Debug, Deserialize, Default, Clone)]
pub struct SqliteEntry {
    #[serde(default)]
    pub store_in_sqlite: bool,
    pub database_name: Option<String>,
}

impl MainConfig {
    /// Load and parse the main config file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Config(format!(
                "main config file '{}' not found",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse main config content
    pub fn parse(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))
    }

    /// Database to store snapshots in, if the store is enabled
    ///
    /// `fallback` comes from the tool settings. Enabling the store without
    /// any database name is a configuration error.
    pub fn store_database(&self, fallback: Option<&str>) -> Result<Option<String>> {
        let Some(entry) = self.sqlite.first() else {
            return Ok(None);
        };
        if !entry.store_in_sqlite {
            return Ok(None);
        }
        entry
            .database_name
            .clone()
            .or_else(|| fallback.map(str::to_string))
            .map(Some)
            .ok_or_else(|| {
                Error::Config("store_in_sqlite is set but no database_name is given".to_string())
            })
    }

    /// Hostnames to snapshot, optionally narrowed to a single host
    ///
    /// Device-group files named by `include` are resolved against
    /// `<base>/configs/`.
    pub fn host_names(&self, base: &Path, only: Option<&str>) -> Result<Vec<String>> {
        if let Some(host) = only {
            return Ok(vec![host.to_string()]);
        }

        let mut hosts = Vec::new();
        for entry in &self.hosts {
            match (&entry.include, &entry.devices) {
                (Some(include), _) => {
                    let path = base.join(paths::CONFIGS_DIR).join(include);
                    hosts.extend(group_hosts(&path, entry.group.as_deref())?);
                }
                (None, Some(device)) => hosts.push(device.clone()),
                (None, None) => {
                    return Err(Error::Config(
                        "host entry needs either 'devices' or 'include'".to_string(),
                    ))
                }
            }
        }
        Ok(hosts)
    }
}

/// Hostnames from a device-group file
///
/// ```yaml
/// MX:
///   - 10.209.16.203:
///       username: lab
///       passwd: lab123
/// EX:
///   - sw1: {}
/// ```
fn group_hosts(path: &Path, group: Option<&str>) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })?;
    let groups: serde_yaml::Mapping = serde_yaml::from_str(&content)
        .map_err(|e| Error::ConfigParse(format!("{}: {}", path.display(), e)))?;

    let wanted: Vec<&str> = group.unwrap_or("all").split(',').map(str::trim).collect();
    let all = wanted
        .first()
        .is_some_and(|g| g.eq_ignore_ascii_case("all"));

    let mut hosts = Vec::new();
    for (name, members) in &groups {
        let Some(name) = name.as_str() else {
            continue;
        };
        if !all && !wanted.contains(&name) {
            continue;
        }
        let Some(members) = members.as_sequence() else {
            tracing::warn!("Device group '{}' in {} is not a list", name, path.display());
            continue;
        };
        for member in members {
            let host = match member {
                Value::String(host) => Some(host.clone()),
                Value::Mapping(login) => login
                    .keys()
                    .next()
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            };
            match host {
                Some(host) => hosts.push(host),
                None => tracing::warn!("Skipping malformed entry in device group '{}'", name),
            }
        }
    }
    Ok(hosts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.paths.snapshot_dir, PathBuf::from("snapshots"));
        assert!(settings.store.database_name.is_none());
    }

    #[test]
    fn test_settings_override() {
        let settings: Settings = toml::from_str(
            r#"
[paths]
snapshot_dir = "/var/lib/netsnap"

[store]
database_name = "snaps.db"
"#,
        )
        .unwrap();
        assert_eq!(settings.paths.snapshot_dir, PathBuf::from("/var/lib/netsnap"));
        assert_eq!(settings.store.database_name.as_deref(), Some("snaps.db"));
    }

    #[test]
    fn test_main_config_parse() {
        let config = MainConfig::parse(
            r#"
hosts:
  - devices: r1
  - device: r2
    username: lab
    passwd: lab123
tests:
  - test_interfaces.yml
sqlite:
  - store_in_sqlite: true
    database_name: jsnap.db
"#,
        )
        .unwrap();
        assert_eq!(
            config.host_names(Path::new("."), None).unwrap(),
            vec!["r1", "r2"]
        );
        assert_eq!(config.tests, vec!["test_interfaces.yml"]);
        assert_eq!(
            config.store_database(None).unwrap().as_deref(),
            Some("jsnap.db")
        );
    }

    #[test]
    fn test_store_disabled_without_sqlite_section() {
        let config = MainConfig::parse("hosts: []\n").unwrap();
        assert!(config.store_database(Some("x.db")).unwrap().is_none());
    }

    #[test]
    fn test_store_enabled_without_name_is_error() {
        let config = MainConfig::parse("sqlite:\n  - store_in_sqlite: true\n").unwrap();
        assert!(matches!(config.store_database(None), Err(Error::Config(_))));
        assert_eq!(
            config.store_database(Some("fallback.db")).unwrap().as_deref(),
            Some("fallback.db")
        );
    }

    #[test]
    fn test_host_override() {
        let config = MainConfig::parse("hosts:\n  - devices: r1\n").unwrap();
        assert_eq!(
            config.host_names(Path::new("."), Some("lab-mx")).unwrap(),
            vec!["lab-mx"]
        );
    }

    const DEVICE_GROUPS: &str = r#"
MX:
  - 10.209.16.203:
      username: lab
      passwd: lab123
  - mx2:
      username: lab
EX:
  - sw1:
      username: lab
QFX:
  - qfx1: {}
"#;

    fn with_device_groups() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("configs")).unwrap();
        std::fs::write(dir.path().join("configs/devices.yml"), DEVICE_GROUPS).unwrap();
        dir
    }

    #[test]
    fn test_include_selects_named_groups() {
        let dir = with_device_groups();
        let config = MainConfig::parse(
            "hosts:\n  - include: devices.yml\n    group: MX, QFX\n",
        )
        .unwrap();
        assert_eq!(
            config.host_names(dir.path(), None).unwrap(),
            vec!["10.209.16.203", "mx2", "qfx1"]
        );
    }

    #[test]
    fn test_include_without_group_takes_all() {
        let dir = with_device_groups();
        let config = MainConfig::parse("hosts:\n  - include: devices.yml\n").unwrap();
        assert_eq!(
            config.host_names(dir.path(), None).unwrap(),
            vec!["10.209.16.203", "mx2", "sw1", "qfx1"]
        );

        let config =
            MainConfig::parse("hosts:\n  - include: devices.yml\n    group: All\n").unwrap();
        assert_eq!(config.host_names(dir.path(), None).unwrap().len(), 4);
    }

    #[test]
    fn test_include_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = MainConfig::parse("hosts:\n  - include: devices.yml\n").unwrap();
        assert!(matches!(
            config.host_names(dir.path(), None),
            Err(Error::FileRead { .. })
        ));
    }

    #[test]
    fn test_host_entry_without_device_is_error() {
        let config = MainConfig::parse("hosts:\n  - username: lab\n").unwrap();
        assert!(matches!(
            config.host_names(Path::new("."), None),
            Err(Error::Config(_))
        ));
    }
}
