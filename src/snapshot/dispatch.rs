//! Test dispatch
//!
//! Runs every selected test case against one device session, in order.
//! A failing test case is logged and recorded in the report; it never stops
//! the remaining test cases.

use std::path::PathBuf;

use serde::Serialize;
use tracing::Instrument;

use crate::common::Error;
use crate::session::{normalize_rpc_name, DeviceSession, RpcArgs, RpcOptions};
use crate::store::{SinkRecord, StoreSink};

use super::definition::{Format, TestAction, TestDefinition};
use super::filter;
use super::reply::Reply;
use super::writer::{self, WriteOutcome};

/// Everything a snapshot run needs besides the session and the tests
#[derive(Debug, Clone)]
pub struct RunContext {
    pub host: String,
    /// Snapshot tag, or the path of an existing file to overwrite
    pub tag: String,
    pub snapshot_dir: PathBuf,
    /// Secondary sink; `None` disables the store
    pub store: Option<StoreSink>,
}

impl RunContext {
    pub fn new(host: impl Into<String>, tag: impl Into<String>, snapshot_dir: impl Into<PathBuf>) -> Self {
        Self {
            host: host.into(),
            tag: tag.into(),
            snapshot_dir: snapshot_dir.into(),
            store: None,
        }
    }

    pub fn with_store(mut self, store: StoreSink) -> Self {
        self.store = Some(store);
        self
    }
}

/// Why a test case produced no snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Test case missing or malformed
    Selection,
    /// Invalid test configuration, such as a bad filter path
    Config,
    /// Filter requested on an RPC that doesn't support one
    FilterScope,
    /// The device call failed
    Invocation,
    /// The reply carried errors or was absent
    Validation,
    /// Writing the file or the store record failed
    Sink,
}

/// A failed test case
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestFailure {
    pub test: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one dispatch sequence
#[derive(Debug, Clone, Default, Serialize)]
pub struct SnapshotReport {
    pub host: String,
    /// Test cases attempted, including failed ones
    pub executed: usize,
    /// Snapshot files written, in dispatch order
    pub written: Vec<PathBuf>,
    /// Store records appended
    pub stored: usize,
    pub failures: Vec<TestFailure>,
}

impl SnapshotReport {
    /// Empty report for a host
    pub fn for_host(host: &str) -> Self {
        Self {
            host: host.to_string(),
            ..Self::default()
        }
    }

    /// Failures of one kind
    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &TestFailure> {
        self.failures.iter().filter(move |f| f.kind == kind)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Fold another report for the same host into this one
    pub fn merge(&mut self, other: SnapshotReport) {
        self.executed += other.executed;
        self.written.extend(other.written);
        self.stored += other.stored;
        self.failures.extend(other.failures);
    }

    fn fail(&mut self, test: &str, kind: FailureKind, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(?kind, "{}", message);
        self.failures.push(TestFailure {
            test: test.to_string(),
            kind,
            message,
        });
    }
}

/// A test case ready to be sent to the device
struct Request {
    /// Name used in the snapshot file and store record
    file_name: String,
    format: Format,
    call: Call,
}

enum Call {
    Command(String),
    Rpc {
        name: String,
        options: RpcOptions,
        args: RpcArgs,
    },
}

/// Run the selected test cases against the session
pub async fn dispatch<S>(
    definition: &TestDefinition,
    selection: &[String],
    session: &mut S,
    ctx: &RunContext,
) -> SnapshotReport
where
    S: DeviceSession + ?Sized,
{
    let mut report = SnapshotReport::for_host(&ctx.host);
    for name in selection {
        report.executed += 1;
        run_test(definition, name, session, ctx, &mut report)
            .instrument(tracing::info_span!("test", name = %name))
            .await;
    }
    tracing::info!(
        executed = report.executed,
        written = report.written.len(),
        stored = report.stored,
        failed = report.failures.len(),
        "Snapshot complete"
    );
    report
}

async fn run_test<S>(
    definition: &TestDefinition,
    name: &str,
    session: &mut S,
    ctx: &RunContext,
    report: &mut SnapshotReport,
) where
    S: DeviceSession + ?Sized,
{
    let Some(case) = definition.case(name) else {
        report.fail(
            name,
            FailureKind::Selection,
            format!("Test case: '{}' not defined", name),
        );
        return;
    };
    let Some(action) = TestAction::from_case(case) else {
        report.fail(
            name,
            FailureKind::Selection,
            format!("Test case: '{}' not defined properly", name),
        );
        return;
    };

    let request = match prepare(action) {
        Ok(request) => request,
        Err((kind, message)) => {
            report.fail(name, kind, message);
            return;
        }
    };

    let reply = match invoke(&request, session).await {
        Ok(reply) => reply,
        Err(e) => {
            report.fail(name, FailureKind::Invocation, format!("ERROR occurred: {}", e));
            tracing::error!("Complete error message: {:?}", e);
            return;
        }
    };

    let path = writer::resolve_path(
        &ctx.tag,
        &ctx.host,
        &request.file_name,
        request.format,
        &ctx.snapshot_dir,
    );
    // File and store are independent sinks for a reply that passed validation
    let serialized = match writer::write(&reply, request.format, &path) {
        WriteOutcome::Written(serialized) => {
            report.written.push(path);
            serialized
        }
        WriteOutcome::Rejected(e) => {
            report.fail(name, FailureKind::Validation, e.to_string());
            return;
        }
        WriteOutcome::Failed { serialized, error } => {
            report.fail(name, FailureKind::Sink, error.to_string());
            serialized
        }
    };

    if let Some(sink) = &ctx.store {
        let record = SinkRecord::new(
            &ctx.host,
            &request.file_name,
            &ctx.tag,
            request.format,
            serialized,
        );
        match sink.persist(record).await {
            Ok(()) => report.stored += 1,
            Err(e) => report.fail(name, FailureKind::Sink, e.to_string()),
        }
    }
}

/// Turn a test action into a device request, checking filter eligibility
fn prepare(action: TestAction) -> Result<Request, (FailureKind, String)> {
    match action {
        TestAction::Command { text, format } => Ok(Request {
            file_name: writer::command_file_name(&text),
            format,
            call: Call::Command(text),
        }),
        TestAction::Rpc {
            name,
            format,
            args,
            filter,
        } => {
            let filter_xml = match filter {
                Some(_) if !filter::supports_filter(&name) => {
                    return Err((
                        FailureKind::FilterScope,
                        format!(
                            "filtering rpc works only for '{}' rpc, not '{}'",
                            filter::FILTER_RPC,
                            name
                        ),
                    ));
                }
                Some(path) => Some(
                    filter::build(&path).map_err(|e| (FailureKind::Config, e.to_string()))?,
                ),
                None => None,
            };
            Ok(Request {
                call: Call::Rpc {
                    name: normalize_rpc_name(&name),
                    options: RpcOptions { format },
                    args: RpcArgs {
                        values: args,
                        filter_xml,
                    },
                },
                file_name: name,
                format,
            })
        }
    }
}

async fn invoke<S>(request: &Request, session: &mut S) -> Result<Reply, Error>
where
    S: DeviceSession + ?Sized,
{
    match &request.call {
        Call::Command(command) => {
            tracing::info!("Taking snapshot for {} ................", command);
            session.run_command(command, request.format).await
        }
        Call::Rpc {
            name,
            options,
            args,
        } => {
            tracing::info!("Taking snapshot of {} ................", request.file_name);
            session.invoke_rpc(name, options, args).await
        }
    }
}
