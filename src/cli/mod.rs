//! CLI command handling
//!
//! Loads configuration, runs one snapshot task per host and prints a
//! per-host summary.

mod init;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use tokio::task::JoinSet;

use crate::commands::Commands;
use crate::common::config::{MainConfig, Settings};
use crate::common::{paths, Error, Result};
use crate::session::ReplaySession;
use crate::snapshot::{take_snapshot, FailureKind, RunContext, SnapshotReport, TestDefinition};
use crate::store::{SnapshotStore, StoreSink};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Snap {
            tag,
            file,
            replay,
            host,
            snapshot_dir,
            json,
        } => {
            let settings = Settings::load()?;
            let main = MainConfig::load(&file)?;
            let snapshot_dir = snapshot_dir.unwrap_or(settings.paths.snapshot_dir);

            let store = main
                .store_database(settings.store.database_name.as_deref())?
                .map(|db| StoreSink::new(Arc::new(SnapshotStore::new(snapshot_dir.clone())), db));

            let base = std::env::current_dir()?;
            let definitions = Arc::new(load_definitions(&base, &main.tests));

            let hosts = main.host_names(&base, host.as_deref())?;
            if hosts.is_empty() {
                return Err(Error::Config(format!(
                    "no hosts in '{}' and none given with --host",
                    file.display()
                )));
            }

            let mut tasks = JoinSet::new();
            for host in hosts {
                let mut ctx = RunContext::new(host, tag.clone(), snapshot_dir.clone());
                ctx.store = store.clone();
                let definitions = definitions.clone();
                let replay = replay.clone();
                tasks.spawn(async move { snapshot_host(&replay, ctx, &definitions).await });
            }

            let mut reports = Vec::new();
            let mut unopened = Vec::new();
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(report)) => reports.push(report),
                    Ok(Err(e)) => {
                        tracing::error!("{}", e);
                        unopened.push(e);
                    }
                    Err(e) => return Err(Error::Internal(format!("host task failed: {}", e))),
                }
            }
            reports.sort_by(|a, b| a.host.cmp(&b.host));

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                for report in &reports {
                    print_report(report);
                }
            }

            match unopened.into_iter().next() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        Commands::Init { force } => {
            let base = std::env::current_dir()?;
            init::generate(&base, force)?;
            println!("{}", "--init folder created.....".blue());
            Ok(())
        }
    }
}

/// Load every test definition named in the main config
///
/// Files that are missing or invalid are logged and skipped.
fn load_definitions(base: &Path, names: &[String]) -> Vec<TestDefinition> {
    names
        .iter()
        .filter_map(|name| {
            let path: PathBuf = paths::resolve_test_file(base, name);
            if !path.is_file() {
                tracing::error!("ERROR!! File {} is not found", path.display());
                return None;
            }
            TestDefinition::load(&path)
                .map_err(|e| tracing::error!("{}", e))
                .ok()
        })
        .collect()
}

/// Open a session for one host and run every test definition against it
async fn snapshot_host(
    replay_root: &Path,
    ctx: RunContext,
    definitions: &[TestDefinition],
) -> Result<SnapshotReport> {
    tracing::info!(host = %ctx.host, "Connecting to device {} ................", ctx.host);
    let mut session = ReplaySession::open(replay_root, &ctx.host)?;

    let mut report = SnapshotReport::for_host(&ctx.host);
    for definition in definitions {
        report.merge(take_snapshot(definition, &mut session, &ctx).await);
    }
    Ok(report)
}

fn print_report(report: &SnapshotReport) {
    let status = if report.is_clean() {
        "✓".green()
    } else {
        "✗".red()
    };
    println!(
        "{} {}: {} test(s), {} file(s) written, {} record(s) stored",
        status,
        report.host.white().bold(),
        report.executed,
        report.written.len(),
        report.stored
    );
    for path in &report.written {
        println!("    {}", path.display().to_string().dimmed());
    }
    for failure in &report.failures {
        let kind = match failure.kind {
            FailureKind::Selection => "selection",
            FailureKind::Config => "config",
            FailureKind::FilterScope => "filter",
            FailureKind::Invocation => "invocation",
            FailureKind::Validation => "reply",
            FailureKind::Sink => "sink",
        };
        println!(
            "    {} [{}] {}: {}",
            "✗".red(),
            kind,
            failure.test,
            failure.message
        );
    }
}
