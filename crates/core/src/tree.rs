use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::identity::{chain_for, Chain};
use crate::model::*;
use crate::progress::BuildStats;
use crate::torrent;

/// Immutable snapshot of a directory tree, addressable by label chains.
#[derive(Debug)]
pub struct VirtualTree {
    root: NodeId,
    nodes: Vec<TreeNode>,
    dirs: HashMap<String, NodeId>,
    files: HashMap<String, NodeId>,
    stats: BuildStats,
}

impl VirtualTree {
    /// Walks `root` once and indexes every directory and file below it.
    pub fn build(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut tree = VirtualTree {
            root: NodeId(0),
            nodes: Vec::with_capacity(1024),
            dirs: HashMap::new(),
            files: HashMap::new(),
            stats: BuildStats::default(),
        };

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
            let mut segments = vec![String::new()];
            segments.extend(
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned()),
            );
            let chain = chain_for(&segments)?;
            let name = entry.file_name().to_string_lossy().into_owned();

            let kind = if entry.file_type().is_dir() {
                tree.stats.dirs += 1;
                NodeKind::Dir {
                    children: Vec::new(),
                }
            } else {
                let content = read_content(entry.path())?;
                tree.stats
                    .record_file(content.kind, content.body.len() as u64);
                NodeKind::File { content }
            };
            tree.insert(entry.path().to_path_buf(), name, chain, kind)?;
        }

        info!(
            dirs = tree.stats.dirs,
            files = tree.stats.files,
            size = %tree.stats.human_bytes(),
            "indexed {}",
            root.display()
        );
        Ok(tree)
    }

    fn insert(&mut self, path: PathBuf, name: String, chain: Chain, kind: NodeKind) -> Result<()> {
        let id = NodeId(self.nodes.len() as u64);
        let key = chain.to_string();
        debug!(%key, path = %path.display(), "register");

        let parent = match chain.parent() {
            None => {
                self.root = id;
                None
            }
            Some(parent_chain) => {
                let parent_key = parent_chain.to_string();
                let pid = self.dirs.get(&parent_key).copied().ok_or_else(|| {
                    Error::MissingParent {
                        path: path.clone(),
                        parent: parent_key,
                    }
                })?;
                if let NodeKind::Dir { children } = &mut self.nodes[pid.0 as usize].kind {
                    children.push(id);
                }
                Some(pid)
            }
        };

        match kind {
            NodeKind::Dir { .. } => self.dirs.insert(key, id),
            NodeKind::File { .. } => self.files.insert(key, id),
        };
        self.nodes.push(TreeNode {
            id,
            parent,
            path,
            name,
            chain,
            kind,
        });
        Ok(())
    }

    /// Directory whose chain is `labels`, with `root` appended when missing.
    pub fn get_dir<S: AsRef<str>>(&self, labels: &[S]) -> Option<&TreeNode> {
        self.dirs
            .get(&Chain::key_for(labels))
            .map(|id| self.node(*id))
    }

    /// File labelled `label` inside the folder given by `ancestors`.
    pub fn get_file<S: AsRef<str>>(&self, label: &str, ancestors: &[S]) -> Option<&TreeNode> {
        let mut labels = Vec::with_capacity(ancestors.len() + 1);
        labels.push(label);
        labels.extend(ancestors.iter().map(|a| a.as_ref()));
        self.files
            .get(&Chain::key_for(&labels))
            .map(|id| self.node(*id))
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0 as usize]
    }

    pub fn root(&self) -> &TreeNode {
        self.node(self.root)
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn children<'a>(&'a self, dir: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> + 'a {
        dir.children().iter().map(|id| self.node(*id))
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }
}

fn read_content(path: &Path) -> Result<FileContent> {
    let kind = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(ContentKind::from_extension)
        .ok_or_else(|| Error::UnsupportedExtension(path.to_path_buf()))?;
    let data = std::fs::read(path)?;
    let body = match kind {
        ContentKind::Text | ContentKind::Href => data,
        ContentKind::TorrentRef => torrent::info_hash(&data)
            .map_err(|reason| Error::Torrent {
                path: path.to_path_buf(),
                reason,
            })?
            .into_bytes(),
    };
    Ok(FileContent::new(kind, body))
}
