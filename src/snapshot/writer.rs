//! Snapshot file output
//!
//! File names follow `<host>_<tag>_<name>.<format>` inside the snapshot
//! directory unless the caller points at an existing file.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::common::{paths, Error, Result};

use super::definition::Format;
use super::reply::Reply;
use super::validate::{self, ValidationError};

/// Result of writing a reply
#[derive(Debug)]
pub enum WriteOutcome {
    /// The reply was valid and written
    Written(String),
    /// The reply failed validation; nothing was written
    Rejected(ValidationError),
    /// The reply was valid but the file could not be written
    Failed { serialized: String, error: Error },
}

/// Snapshot file name for a host, tag and test name
pub fn snapshot_file_name(host: &str, tag: &str, name: &str, format: Format) -> String {
    format!("{}_{}_{}.{}", host, tag, name.replace(['/', '\\'], "_"), format)
}

/// File-name component for a CLI command: its words joined by `_`
pub fn command_file_name(command: &str) -> String {
    command.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Resolve where a test's snapshot goes
///
/// An `output_file` that already names an existing file is used as is.
pub fn resolve_path(
    output_file: &str,
    host: &str,
    name: &str,
    format: Format,
    snapshot_dir: &Path,
) -> PathBuf {
    let explicit = Path::new(output_file);
    if explicit.is_file() {
        return explicit.to_path_buf();
    }
    snapshot_dir.join(snapshot_file_name(host, output_file, name, format))
}

/// Validate a reply and write it to `path`
///
/// Rejected replies are logged and leave `path` untouched. A valid reply that
/// can't be written still carries its serialization for the other sinks.
pub fn write(reply: &Reply, format: Format, path: &Path) -> WriteOutcome {
    let serialized = match validate::validate(reply, format) {
        Ok(serialized) => serialized,
        Err(e) => {
            validate::log_rejection(&e, reply);
            return WriteOutcome::Rejected(e);
        }
    };

    match write_atomic(path, serialized.as_bytes()) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), bytes = serialized.len(), "Snapshot written");
            WriteOutcome::Written(serialized)
        }
        Err(error) => WriteOutcome::Failed { serialized, error },
    }
}

/// Write through a temporary file in the destination directory so a failed
/// write never leaves a partial snapshot behind
fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    paths::ensure_dir(dir).map_err(|e| Error::file_write(path, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::file_write(path, e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::file_write(path, e))?;
    tmp.persist(path).map_err(|e| Error::file_write(path, e.error))?;
    Ok(())
}
