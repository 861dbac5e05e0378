//! Reply validation
//!
//! A call can succeed at the transport level and still carry `rpc-error`
//! nodes in its reply. Such replies are never written or stored.

use thiserror::Error;

use super::definition::Format;
use super::reply::{Element, Reply};

/// Local name of an embedded protocol error node
const ERROR_NODE: &str = "rpc-error";

/// Local name of the human-readable message inside an error node
const ERROR_MESSAGE: &str = "error-message";

/// Placeholder for error nodes that carry no message
const NO_MESSAGE: &str = "<no error-message>";

/// Why a reply was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("requested node is not present ({format} reply)")]
    NodeAbsent { format: Format },

    #[error("reply contains {} rpc-error(s): {}", .0.len(), .0.join("; "))]
    RpcErrors(Vec<String>),
}

/// Validate a reply, returning its canonical serialized form on success
pub fn validate(reply: &Reply, format: Format) -> Result<String, ValidationError> {
    let document = match reply {
        Reply::Document(document) => document,
        Reply::Absent => return Err(ValidationError::NodeAbsent { format }),
    };

    let errors = error_messages(document);
    if !errors.is_empty() {
        return Err(ValidationError::RpcErrors(errors));
    }
    Ok(document.to_xml())
}

/// Messages of every error node anywhere in the document
fn error_messages(document: &Element) -> Vec<String> {
    document
        .descendants_and_self()
        .into_iter()
        .filter(|e| e.local_name() == ERROR_NODE)
        .map(|node| {
            node.find_descendant(ERROR_MESSAGE)
                .map(|m| m.text().trim().to_string())
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| NO_MESSAGE.to_string())
        })
        .collect()
}

/// Log a rejected reply: the summary, then one line per embedded error
pub fn log_rejection(error: &ValidationError, reply: &Reply) {
    match error {
        ValidationError::NodeAbsent { .. } => {
            tracing::error!("ERROR!! requested node is not present");
        }
        ValidationError::RpcErrors(messages) => {
            tracing::error!("ERROR: reply contains {} rpc-error(s)", messages.len());
            if let Some(document) = reply.document() {
                tracing::debug!("Complete error reply: {}", document);
            }
            for message in messages {
                tracing::error!("{}", message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_reply_serializes() {
        let reply = Reply::from_xml("<rpc-reply><ok/></rpc-reply>").unwrap();
        assert_eq!(
            validate(&reply, Format::Xml).unwrap(),
            "<rpc-reply><ok/></rpc-reply>"
        );
    }

    #[test]
    fn test_embedded_error_is_failure() {
        let reply = Reply::from_xml(
            r#"<rpc-reply>
                 <rpc-error>
                   <error-severity>error</error-severity>
                   <error-message>
                     syntax error
                   </error-message>
                 </rpc-error>
               </rpc-reply>"#,
        )
        .unwrap();
        assert_eq!(
            validate(&reply, Format::Xml),
            Err(ValidationError::RpcErrors(vec!["syntax error".to_string()]))
        );
    }

    #[test]
    fn test_each_error_message_is_extracted() {
        let reply = Reply::from_xml(
            "<rpc-reply><a><rpc-error><error-message>first</error-message></rpc-error></a>\
             <rpc-error><error-info/></rpc-error>\
             <rpc-error><error-message>third</error-message></rpc-error></rpc-reply>",
        )
        .unwrap();
        assert_eq!(
            validate(&reply, Format::Text),
            Err(ValidationError::RpcErrors(vec![
                "first".to_string(),
                NO_MESSAGE.to_string(),
                "third".to_string(),
            ]))
        );
    }

    #[test]
    fn test_root_error_node_is_detected() {
        let reply =
            Reply::from_xml("<rpc-error><error-message>denied</error-message></rpc-error>")
                .unwrap();
        assert!(validate(&reply, Format::Xml).is_err());
    }

    #[test]
    fn test_absent_reply_is_failure() {
        assert_eq!(
            validate(&Reply::Absent, Format::Text),
            Err(ValidationError::NodeAbsent {
                format: Format::Text
            })
        );
        assert!(validate(&Reply::Absent, Format::Xml).is_err());
    }
}
