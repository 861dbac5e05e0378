//! `netsnap init`: working-directory scaffolding

use std::path::Path;

use crate::common::{paths, Result};

const SAMPLE_MAIN: &str = r#"# Devices to snapshot
hosts:
  - devices: r1

# Test definition files, looked up under configs/ when not a path
tests:
  - test_sample.yml

# Store snapshots in snapshots/<database_name> as well as in files
sqlite:
  - store_in_sqlite: false
    database_name: snapshots.db
"#;

const SAMPLE_TESTS: &str = r#"tests_include:
  - check_version
  - check_interfaces
  - check_config

check_version:
  - command: show version

check_interfaces:
  - rpc: get-interface-information
  - args:
      terse: true

check_config:
  - rpc: get-config
  - args:
      filter_xml: configuration/interfaces
"#;

/// Create `snapshots/`, `configs/`, a sample `main.yml` and a sample test file
pub fn generate(base: &Path, force: bool) -> Result<()> {
    paths::ensure_dir(&base.join(paths::SNAPSHOT_DIR))?;
    let configs = base.join(paths::CONFIGS_DIR);
    paths::ensure_dir(&configs)?;

    write_sample(&base.join("main.yml"), SAMPLE_MAIN, force)?;
    write_sample(&configs.join("test_sample.yml"), SAMPLE_TESTS, force)?;
    Ok(())
}

fn write_sample(path: &Path, content: &str, force: bool) -> Result<()> {
    if path.exists() && !force {
        tracing::info!("Keeping existing {}", path.display());
        return Ok(());
    }
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::MainConfig;
    use crate::snapshot::TestDefinition;

    #[test]
    fn test_generate_scaffolding() {
        let dir = tempfile::tempdir().unwrap();
        generate(dir.path(), false).unwrap();

        assert!(dir.path().join("snapshots").is_dir());
        let main = MainConfig::load(&dir.path().join("main.yml")).unwrap();
        assert_eq!(main.host_names(dir.path(), None).unwrap(), vec!["r1"]);
        assert!(main.store_database(None).unwrap().is_none());

        let tests = TestDefinition::load(&dir.path().join("configs/test_sample.yml")).unwrap();
        assert_eq!(tests.selection().len(), 3);
    }

    #[test]
    fn test_generate_keeps_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.yml"), "hosts: []\n").unwrap();
        generate(dir.path(), false).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.yml")).unwrap(),
            "hosts: []\n"
        );

        generate(dir.path(), true).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.yml")).unwrap(),
            SAMPLE_MAIN
        );
    }
}
