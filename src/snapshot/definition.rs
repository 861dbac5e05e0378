//! Test definition documents
//!
//! A test definition is a YAML mapping from test-case name to a sequence.
//! The first element names the action, the optional second element carries
//! RPC arguments:
//!
//! ```yaml
//! tests_include:
//!   - check_interfaces
//!   - check_config
//!
//! check_interfaces:
//!   - command: show interfaces terse
//!     format: text
//!
//! check_config:
//!   - rpc: get-config
//!   - args:
//!       filter_xml: configuration/interfaces
//! ```

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

use crate::common::{Error, Result};

/// Top-level key holding the explicit, ordered test selection
pub const INCLUDE_KEY: &str = "tests_include";

/// Argument key requesting a subtree filter
pub const FILTER_KEY: &str = "filter_xml";

/// Reply format requested from the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Xml,
    Text,
}

impl Format {
    /// Resolve a declared format, falling back to xml for anything unknown
    pub fn resolve(declared: Option<&str>) -> Self {
        match declared {
            None | Some("xml") => Format::Xml,
            Some("text") => Format::Text,
            Some(other) => {
                tracing::warn!("Unsupported format '{}', using xml", other);
                Format::Xml
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Xml => "xml",
            Format::Text => "text",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single test case asks the device to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestAction {
    /// Run a CLI command
    Command { text: String, format: Format },
    /// Invoke an RPC by its hyphenated name
    Rpc {
        name: String,
        format: Format,
        /// Declared arguments, keys hyphen-to-underscore normalized, filter excluded
        args: Vec<(String, String)>,
        /// Slash-separated subtree filter path
        filter: Option<String>,
    },
}

impl TestAction {
    /// Build the action from a raw test case value
    ///
    /// Returns `None` when the case is not a sequence whose first element
    /// names either a `command` or an `rpc`.
    pub fn from_case(case: &Value) -> Option<Self> {
        let steps = case.as_sequence()?;
        let descriptor = steps.first()?.as_mapping()?;
        let format = Format::resolve(descriptor.get("format").and_then(Value::as_str));

        if let Some(command) = descriptor.get("command") {
            return Some(TestAction::Command {
                text: command.as_str()?.to_string(),
                format,
            });
        }

        let name = descriptor.get("rpc")?.as_str()?.to_string();
        let mut args = Vec::new();
        let mut filter = None;
        let declared = steps
            .get(1)
            .and_then(Value::as_mapping)
            .and_then(|m| m.get("args"))
            .and_then(Value::as_mapping);
        for (key, value) in declared.into_iter().flatten() {
            let (Some(key), Some(value)) = (scalar_string(key), scalar_string(value)) else {
                tracing::warn!("Skipping non-scalar argument for rpc '{}'", name);
                continue;
            };
            let key = key.replace('-', "_");
            if key == FILTER_KEY {
                filter = Some(value);
            } else {
                args.push((key, value));
            }
        }

        Some(TestAction::Rpc {
            name,
            format,
            args,
            filter,
        })
    }

    pub fn format(&self) -> Format {
        match self {
            TestAction::Command { format, .. } | TestAction::Rpc { format, .. } => *format,
        }
    }
}

/// A loaded test definition document
#[derive(Debug, Clone, Default)]
pub struct TestDefinition {
    include: Option<Vec<String>>,
    cases: Vec<(String, Value)>,
}

impl TestDefinition {
    /// Load a test definition from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content).map_err(|e| Error::TestDefinition {
            path: path.display().to_string(),
            error: e.to_string(),
        })
    }

    /// Parse a test definition from YAML text
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        match value {
            Value::Mapping(mapping) => Self::from_mapping(mapping),
            Value::Null => Ok(Self::default()),
            _ => Err(Error::ConfigParse(
                "test definition must be a mapping of test cases".to_string(),
            )),
        }
    }

    fn from_mapping(mapping: Mapping) -> Result<Self> {
        let mut include = None;
        let mut cases = Vec::with_capacity(mapping.len());

        for (key, value) in mapping {
            let Some(name) = scalar_string(&key) else {
                return Err(Error::ConfigParse(format!(
                    "test case names must be scalars, got {:?}",
                    key
                )));
            };
            if name == INCLUDE_KEY {
                include = Some(parse_include(value)?);
            } else {
                cases.push((name, value));
            }
        }

        Ok(Self { include, cases })
    }

    /// Test case names to run, in order
    ///
    /// The explicit inclusion list is returned verbatim, duplicates included.
    /// Without one, every defined case runs in definition order.
    pub fn selection(&self) -> Vec<String> {
        match &self.include {
            Some(include) => include.clone(),
            None => self.cases.iter().map(|(name, _)| name.clone()).collect(),
        }
    }

    /// Raw value of a test case
    pub fn case(&self, name: &str) -> Option<&Value> {
        self.cases
            .iter()
            .find(|(case_name, _)| case_name == name)
            .map(|(_, value)| value)
    }

    /// Number of defined test cases
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

fn parse_include(value: Value) -> Result<Vec<String>> {
    let Value::Sequence(items) = value else {
        return Err(Error::ConfigParse(format!(
            "'{}' must be a list of test case names",
            INCLUDE_KEY
        )));
    };
    items
        .iter()
        .map(|item| {
            scalar_string(item).ok_or_else(|| {
                Error::ConfigParse(format!("'{}' entries must be names", INCLUDE_KEY))
            })
        })
        .collect()
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
