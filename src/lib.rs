//! netsnap - network device snapshot capture
//!
//! This library runs declarative command and RPC test cases against a
//! device session and persists every valid reply to snapshot files and an
//! optional SQLite store.

pub mod cli;
pub mod commands;
pub mod common;
pub mod session;
pub mod snapshot;
pub mod store;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use session::{DeviceSession, ReplaySession, RpcArgs, RpcOptions};
pub use snapshot::{take_snapshot, Format, Reply, RunContext, SnapshotReport, TestDefinition};
