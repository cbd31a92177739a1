//! Stable, DNS-legal identifiers for filesystem nodes.
//!
//! Every path segment maps to a fixed-width label (the lowercase hex of its
//! 128-bit xxh3 digest). The tree root maps to the sentinel label `root`.
//! A node's [`Chain`] lists its own label first and `root` last, which is the
//! order the labels take inside a query name.

use std::fmt;

use serde::Serialize;
use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

pub const ROOT_LABEL: &str = "root";

/// Width in characters of every non-root label.
pub const LABEL_WIDTH: usize = 32;

/// Label for a single path segment. The empty segment is the tree root.
pub fn label_of(segment: &str) -> String {
    if segment.is_empty() {
        return ROOT_LABEL.to_string();
    }
    format!("{:032x}", xxh3_128(segment.as_bytes()))
}

/// Chain for a path given root-to-leaf, starting with the empty root segment.
pub fn chain_for<S: AsRef<str>>(segments: &[S]) -> Result<Chain> {
    if segments.is_empty() {
        return Err(Error::EmptyChain);
    }
    let labels = segments.iter().rev().map(|s| label_of(s.as_ref())).collect();
    Ok(Chain(labels))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Chain(Vec<String>);

impl Chain {
    pub fn root() -> Self {
        Chain(vec![ROOT_LABEL.to_string()])
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1 && self.0[0] == ROOT_LABEL
    }

    /// The node's own label.
    pub fn head(&self) -> &str {
        &self.0[0]
    }

    /// Ancestor labels, nearest first, `root` last.
    pub fn tail(&self) -> &[String] {
        &self.0[1..]
    }

    /// Ancestor labels without the trailing `root`, as carried in addresses.
    pub fn folder(&self) -> &[String] {
        let tail = self.tail();
        match tail.split_last() {
            Some((last, rest)) if last == ROOT_LABEL => rest,
            _ => tail,
        }
    }

    /// Labels a client sends to address this node as a folder.
    pub fn as_folder(&self) -> &[String] {
        match self.0.split_last() {
            Some((last, rest)) if last == ROOT_LABEL => rest,
            _ => &self.0,
        }
    }

    pub fn parent(&self) -> Option<Chain> {
        if self.0.len() < 2 {
            return None;
        }
        Some(Chain(self.0[1..].to_vec()))
    }

    pub fn labels(&self) -> &[String] {
        &self.0
    }

    /// Lookup key for a label sequence, appending `root` unless already last.
    pub fn key_for<S: AsRef<str>>(labels: &[S]) -> String {
        let mut parts: Vec<&str> = labels.iter().map(|l| l.as_ref()).collect();
        if parts.last() != Some(&ROOT_LABEL) {
            parts.push(ROOT_LABEL);
        }
        parts.join(".")
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_segment_is_sentinel() {
        assert_eq!(label_of(""), ROOT_LABEL);
        assert_eq!(chain_for(&[""]).unwrap(), Chain::root());
    }

    #[test]
    fn labels_have_fixed_width() {
        for name in ["a", "some long file name.txt", "ünïcödé"] {
            let label = label_of(name);
            assert_eq!(label.len(), LABEL_WIDTH);
            assert!(label.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn chain_is_leaf_first() {
        let chain = chain_for(&["", "docs", "readme.txt"]).unwrap();
        assert_eq!(chain.head(), label_of("readme.txt"));
        assert_eq!(chain.tail(), &[label_of("docs"), ROOT_LABEL.to_string()]);
        assert_eq!(chain.folder(), &[label_of("docs")]);
        assert_eq!(
            chain.to_string(),
            format!("{}.{}.root", label_of("readme.txt"), label_of("docs"))
        );
    }

    #[test]
    fn same_name_same_label_different_chain() {
        let a = chain_for(&["", "a", "x.txt"]).unwrap();
        let b = chain_for(&["", "b", "x.txt"]).unwrap();
        assert_eq!(a.head(), b.head());
        assert_ne!(a, b);
    }

    #[test]
    fn empty_segments_have_no_chain() {
        let empty: [&str; 0] = [];
        assert!(matches!(chain_for(&empty), Err(Error::EmptyChain)));
    }

    #[test]
    fn key_appends_root_once() {
        assert_eq!(Chain::key_for::<&str>(&[]), "root");
        assert_eq!(Chain::key_for(&["root"]), "root");
        assert_eq!(Chain::key_for(&["ab", "cd"]), "ab.cd.root");
        assert_eq!(Chain::key_for(&["ab", "root"]), "ab.root");
    }

    #[test]
    fn parent_strips_head() {
        let chain = chain_for(&["", "a", "b"]).unwrap();
        let parent = chain.parent().unwrap();
        assert_eq!(parent, chain_for(&["", "a"]).unwrap());
        assert_eq!(parent.parent().unwrap(), Chain::root());
        assert!(Chain::root().parent().is_none());
    }
}
