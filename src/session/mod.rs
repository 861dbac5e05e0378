//! Device sessions
//!
//! The snapshot engine only needs two calls from a device: run a CLI command
//! and invoke an RPC. Both take `&mut self`, so a session can never have two
//! requests in flight. Timeouts and retries belong to the implementation.

mod replay;

use async_trait::async_trait;

use crate::common::Result;
use crate::snapshot::{Element, Format, Reply};

pub use replay::ReplaySession;

/// Base options passed with every RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcOptions {
    pub format: Format,
}

/// Keyword arguments for an RPC
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RpcArgs {
    /// Declared arguments with underscore-normalized keys
    pub values: Vec<(String, String)>,
    /// Subtree filter, only ever set for `get-config`
    pub filter_xml: Option<Element>,
}

impl RpcArgs {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.filter_xml.is_none()
    }

    /// Value of a declared argument
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// A connection to one device
#[async_trait]
pub trait DeviceSession: Send {
    /// Host this session talks to
    fn host(&self) -> &str;

    /// Run a CLI command and return its reply in the requested format
    async fn run_command(&mut self, command: &str, format: Format) -> Result<Reply>;

    /// Invoke an RPC by its underscore-normalized name
    async fn invoke_rpc(&mut self, name: &str, options: &RpcOptions, args: &RpcArgs)
        -> Result<Reply>;
}

/// Map a hyphenated RPC identifier to its invocation name
pub fn normalize_rpc_name(rpc: &str) -> String {
    rpc.replace('-', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_rpc_name() {
        assert_eq!(
            normalize_rpc_name("get-interface-information"),
            "get_interface_information"
        );
        assert_eq!(normalize_rpc_name("get_config"), "get_config");
    }

    #[test]
    fn test_rpc_args_lookup() {
        let args = RpcArgs {
            values: vec![("interface_name".to_string(), "ge-0/0/0".to_string())],
            filter_xml: None,
        };
        assert_eq!(args.get("interface_name"), Some("ge-0/0/0"));
        assert!(args.get("missing").is_none());
        assert!(!args.is_empty());
        assert!(RpcArgs::default().is_empty());
    }
}
