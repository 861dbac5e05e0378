//! Replay session backed by recorded replies
//!
//! Each host has a directory of reply files:
//!
//! ```text
//! <root>/<host>/show_version.xml                 command "show version", xml
//! <root>/<host>/show_version.text                command "show version", text
//! <root>/<host>/get-interface-information.xml    rpc get_interface_information
//! ```
//!
//! Text files are returned wrapped in `<output>`, the way devices return
//! text. A `get-config` filter narrows the recorded configuration to the
//! filtered subtree.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::common::{Error, Result};
use crate::snapshot::writer::command_file_name;
use crate::snapshot::{Element, Format, Reply};

use super::{DeviceSession, RpcArgs, RpcOptions};

/// Session that answers from recorded reply files
#[derive(Debug)]
pub struct ReplaySession {
    host: String,
    dir: PathBuf,
    requests: usize,
}

impl ReplaySession {
    /// Open the replay directory for `host` under `root`
    pub fn open(root: &Path, host: &str) -> Result<Self> {
        let dir = root.join(host);
        if !dir.is_dir() {
            return Err(Error::session_open(
                host,
                format!("no recorded replies at '{}'", dir.display()),
            ));
        }
        tracing::info!(host, dir = %dir.display(), "Opened replay session");
        Ok(Self {
            host: host.to_string(),
            dir,
            requests: 0,
        })
    }

    /// Number of requests answered so far
    pub fn requests(&self) -> usize {
        self.requests
    }

    fn answer(&mut self, request: &str, stem: &str, format: Format) -> Result<Reply> {
        self.requests += 1;
        let xml = self.dir.join(format!("{}.xml", stem));
        let text = self.dir.join(format!("{}.text", stem));
        tracing::debug!(host = %self.host, request, %format, "Replaying reply");

        match format {
            Format::Text if text.is_file() => Ok(Reply::text_output(read(&text)?)),
            Format::Text if xml.is_file() => Ok(Reply::Absent),
            Format::Xml if xml.is_file() => Reply::from_xml(&read(&xml)?),
            _ => Err(Error::invocation(
                request,
                format!("no recorded {} reply in '{}'", format, self.dir.display()),
            )),
        }
    }
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

#[async_trait]
impl DeviceSession for ReplaySession {
    fn host(&self) -> &str {
        &self.host
    }

    async fn run_command(&mut self, command: &str, format: Format) -> Result<Reply> {
        self.answer(command, &command_file_name(command), format)
    }

    async fn invoke_rpc(
        &mut self,
        name: &str,
        options: &RpcOptions,
        args: &RpcArgs,
    ) -> Result<Reply> {
        let reply = self.answer(name, &name.replace('_', "-"), options.format)?;
        match (&args.filter_xml, reply) {
            (Some(filter), Reply::Document(document)) => {
                Ok(Reply::Document(apply_filter(&document, filter)))
            }
            (_, reply) => Ok(reply),
        }
    }
}

/// Narrow a document to the subtree selected by a filter
///
/// The filter root is matched anywhere in the document; each filter level
/// keeps only children with the matching name, and the filter leaf keeps its
/// whole subtree. No match yields an empty filter root.
pub fn apply_filter(document: &Element, filter: &Element) -> Element {
    document
        .descendants_and_self()
        .into_iter()
        .find(|e| e.local_name() == filter.local_name())
        .map(|found| project(found, filter))
        .unwrap_or_else(|| Element::new(filter.name.clone()))
}

fn project(element: &Element, filter: &Element) -> Element {
    let Some(selector) = filter.child_elements().next() else {
        return element.clone();
    };
    let mut projected = Element::new(element.name.clone());
    projected.attributes = element.attributes.clone();
    for child in element
        .child_elements()
        .filter(|c| c.local_name() == selector.local_name())
    {
        projected = projected.with_child(project(child, selector));
    }
    projected
}
