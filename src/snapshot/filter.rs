//! Subtree filters for configuration RPCs
//!
//! `configuration/interfaces/interface` becomes
//! `<configuration><interfaces><interface/></interfaces></configuration>`.

use crate::common::{Error, Result};

use super::reply::Element;

/// The only RPC that accepts a subtree filter
pub const FILTER_RPC: &str = "get-config";

/// Build a nested filter element from a slash-separated path
///
/// The last segment becomes the leaf and each preceding segment wraps the
/// element built so far. Empty segments are rejected.
pub fn build(path: &str) -> Result<Element> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(Error::filter_path(path, "empty path segment"));
    }

    let mut filter: Option<Element> = None;
    for segment in segments.into_iter().rev() {
        let element = Element::new(segment.trim());
        filter = Some(match filter {
            Some(inner) => element.with_child(inner),
            None => element,
        });
    }
    filter.ok_or_else(|| Error::filter_path(path, "empty path"))
}

/// Whether an RPC may carry a subtree filter
pub fn supports_filter(rpc: &str) -> bool {
    rpc == FILTER_RPC
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_nested_filter() {
        let filter = build("a/b/c").unwrap();
        assert_eq!(filter.to_xml(), "<a><b><c/></b></a>");
        assert_eq!(filter.depth(), 3);
        assert_eq!(filter.name, "a");
    }

    #[test]
    fn test_single_segment_is_leaf() {
        let filter = build("configuration").unwrap();
        assert_eq!(filter.to_xml(), "<configuration/>");
        assert_eq!(filter.depth(), 1);
    }

    #[test]
    fn test_depth_matches_segment_count() {
        for path in ["x", "x/y", "configuration/interfaces/interface/unit"] {
            let filter = build(path).unwrap();
            assert_eq!(filter.depth(), path.split('/').count(), "{path}");
            let leaf = filter.descendants_and_self().into_iter().last().unwrap();
            assert_eq!(leaf.name, path.rsplit('/').next().unwrap());
            assert!(leaf.children.is_empty());
        }
    }

    #[test]
    fn test_empty_segments_are_rejected() {
        for path in ["", "/a", "a/", "a//b", "a/ /b"] {
            assert!(
                matches!(build(path), Err(Error::FilterPath { .. })),
                "expected rejection for {path:?}"
            );
        }
    }

    #[test]
    fn test_only_get_config_supports_filter() {
        assert!(supports_filter("get-config"));
        assert!(!supports_filter("get-interface-information"));
        assert!(!supports_filter("get_config"));
    }
}
