use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::Chain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    Text,
    Href,
    TorrentRef,
}

impl ContentKind {
    /// Two-digit wire code.
    pub fn code(self) -> &'static str {
        match self {
            ContentKind::Text => "00",
            ContentKind::Href => "01",
            ContentKind::TorrentRef => "02",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(ContentKind::Text),
            "01" => Some(ContentKind::Href),
            "02" => Some(ContentKind::TorrentRef),
            _ => None,
        }
    }

    /// Content kind served for a file extension, without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "txt" => Some(ContentKind::Text),
            "href" => Some(ContentKind::Href),
            "torrent" => Some(ContentKind::TorrentRef),
            _ => None,
        }
    }
}

/// Unreserved URI characters stay literal in magnet display names.
const MAGNET_NAME: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// File payload, served byte for byte. For torrents `body` is the uppercase
/// hex info hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContent {
    pub kind: ContentKind,
    pub body: Vec<u8>,
}

impl FileContent {
    pub fn new(kind: ContentKind, body: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Tagged wire form: `<code> <body>`.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.body.len() + 3);
        out.extend_from_slice(self.kind.code().as_bytes());
        out.push(b' ');
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(raw: &[u8]) -> Result<Self> {
        let malformed = || Error::MalformedContent(String::from_utf8_lossy(raw).into_owned());
        let kind = raw
            .get(..2)
            .and_then(|code| std::str::from_utf8(code).ok())
            .and_then(ContentKind::from_code)
            .ok_or_else(malformed)?;
        let body = raw
            .get(2..)
            .and_then(|rest| rest.strip_prefix(b" "))
            .ok_or_else(malformed)?;
        Ok(Self::new(kind, body))
    }

    /// Magnet URI for a torrent reference.
    pub fn magnet(&self, display_name: &str) -> Option<String> {
        if self.kind != ContentKind::TorrentRef {
            return None;
        }
        let hash = std::str::from_utf8(&self.body).ok()?;
        Some(format!(
            "magnet:?xt=urn:btih:{}&dn={}",
            hash,
            utf8_percent_encode(display_name, MAGNET_NAME)
        ))
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum NodeKind {
    Dir { children: Vec<NodeId> },
    File { content: FileContent },
}

#[derive(Debug, Clone, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub path: std::path::PathBuf,
    pub name: String,
    pub chain: Chain,
    pub kind: NodeKind,
}

impl TreeNode {
    pub fn is_dir(&self) -> bool {
        matches!(self.kind, NodeKind::Dir { .. })
    }

    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Dir { children } => children,
            NodeKind::File { .. } => &[],
        }
    }

    pub fn content(&self) -> Option<&FileContent> {
        match &self.kind {
            NodeKind::Dir { .. } => None,
            NodeKind::File { content } => Some(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_prefix_roundtrip() {
        let c = FileContent::new(ContentKind::Text, "hello");
        assert_eq!(c.encode(), b"00 hello");
        assert_eq!(FileContent::decode(b"00 hello").unwrap(), c);
        assert_eq!(
            FileContent::decode(b"01 https://example.com").unwrap().kind,
            ContentKind::Href
        );
    }

    #[test]
    fn empty_body_is_allowed() {
        assert!(FileContent::decode(b"00 ").unwrap().body.is_empty());
    }

    #[test]
    fn non_utf8_body_is_kept() {
        let raw = b"00 caf\xe9";
        let c = FileContent::decode(raw).unwrap();
        assert_eq!(c.body, b"caf\xe9");
        assert_eq!(c.encode(), raw);
    }

    #[test]
    fn bad_prefix_is_rejected() {
        assert!(FileContent::decode(b"07 x").is_err());
        assert!(FileContent::decode(b"00x").is_err());
        assert!(FileContent::decode(b"0").is_err());
        assert!(FileContent::decode(b"\xff\xfe x").is_err());
    }

    #[test]
    fn magnet_only_for_torrents() {
        let t = FileContent::new(ContentKind::TorrentRef, "ABCDEF");
        assert_eq!(
            t.magnet("my file+1.torrent").unwrap(),
            "magnet:?xt=urn:btih:ABCDEF&dn=my%20file%2B1.torrent"
        );
        assert!(FileContent::new(ContentKind::Text, "x").magnet("a").is_none());
    }
}
