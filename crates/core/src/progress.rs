use bytesize::ByteSize;
use serde::Serialize;

use crate::model::ContentKind;

/// Counters collected while the tree is built.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildStats {
    pub dirs: u64,
    pub files: u64,
    pub bytes: u64,
    pub text: u64,
    pub hrefs: u64,
    pub torrents: u64,
}

impl BuildStats {
    pub(crate) fn record_file(&mut self, kind: ContentKind, bytes: u64) {
        self.files += 1;
        self.bytes = self.bytes.saturating_add(bytes);
        match kind {
            ContentKind::Text => self.text += 1,
            ContentKind::Href => self.hrefs += 1,
            ContentKind::TorrentRef => self.torrents += 1,
        }
    }

    pub fn human_bytes(&self) -> String {
        ByteSize::b(self.bytes).to_string()
    }
}
