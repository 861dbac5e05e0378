//! Snapshot capture engine
//!
//! Reads a test definition, runs each selected command or RPC against a
//! device session, and writes every valid reply to a snapshot file and,
//! optionally, the snapshot store.

pub mod definition;
pub mod dispatch;
pub mod filter;
pub mod reply;
pub mod validate;
pub mod writer;

use tracing::Instrument;

use crate::session::DeviceSession;

pub use definition::{Format, TestAction, TestDefinition};
pub use dispatch::{dispatch, FailureKind, RunContext, SnapshotReport, TestFailure};
pub use reply::{Element, Node, Reply};
pub use validate::{validate, ValidationError};
pub use writer::WriteOutcome;

/// Take a snapshot of every selected test case in `definition`
pub async fn take_snapshot<S>(
    definition: &TestDefinition,
    session: &mut S,
    ctx: &RunContext,
) -> SnapshotReport
where
    S: DeviceSession + ?Sized,
{
    let selection = definition.selection();
    dispatch(definition, &selection, session, ctx)
        .instrument(tracing::info_span!("snapshot", host = %ctx.host, tag = %ctx.tag))
        .await
}
