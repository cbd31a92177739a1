use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::address::Address;
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::message::{FolderInfo, FolderPage, ItemKind, ItemRef, Payload, ServerInfo};
use crate::model::{NodeId, TreeNode};
use crate::paginate::paginate;
use crate::tree::VirtualTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType {
    Txt,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    /// Query name without the trailing root dot.
    pub name: String,
    pub qtype: QuestionType,
}

impl Question {
    pub fn txt(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qtype: QuestionType::Txt,
        }
    }
}

/// Raw TXT payloads answering one query. Empty means the name does not exist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub primary: Option<Vec<u8>>,
    pub supplementary: Vec<Vec<u8>>,
}

impl Reply {
    fn primary(text: impl Into<Vec<u8>>) -> Self {
        Self {
            primary: Some(text.into()),
            supplementary: Vec::new(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.primary.is_none() && self.supplementary.is_empty()
    }
}

struct Listing {
    items: usize,
    pages: Vec<Vec<u8>>,
}

/// Answers queries against a tree snapshot. Holds no per-query state.
pub struct Dispatcher {
    tree: Arc<VirtualTree>,
    config: ServerConfig,
    listings: HashMap<NodeId, Listing>,
}

impl Dispatcher {
    /// Paginates every folder up front; oversized or unencodable entries fail here.
    pub fn new(tree: Arc<VirtualTree>, config: ServerConfig) -> Result<Self> {
        let mut listings = HashMap::new();
        for node in tree.nodes().iter().filter(|n| n.is_dir()) {
            let items = item_refs(&tree, node)?;
            let pages = paginate(&items, config.limits)?;
            listings.insert(
                node.id,
                Listing {
                    items: items.len(),
                    pages: pages.iter().map(|p| p.encode().into_bytes()).collect(),
                },
            );
        }
        info!(
            folders = listings.len(),
            base = %config.base_name,
            "page cache ready"
        );
        Ok(Self {
            tree,
            config,
            listings,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn tree(&self) -> &VirtualTree {
        &self.tree
    }

    pub fn answer(&self, questions: &[Question]) -> Reply {
        let [question] = questions else {
            debug!(count = questions.len(), "rejecting multi-question query");
            return Reply::default();
        };
        if question.qtype != QuestionType::Txt {
            debug!(name = %question.name, "rejecting non-TXT query");
            return Reply::default();
        }
        self.resolve(&question.name)
    }

    /// Reply for a single TXT query name.
    pub fn resolve(&self, name: &str) -> Reply {
        let Some(address) = Address::decode(&self.config.base_name, name) else {
            debug!(%name, "unknown address");
            return Reply::default();
        };
        debug!(%name, kind = ?address.kind(), "query");

        match address {
            Address::ServerInfo => Reply::primary(
                ServerInfo {
                    base_name: self.config.base_name.clone(),
                    features: self.config.features.clone(),
                }
                .encode(),
            ),
            Address::ListPage { page, folder } => self
                .listing(&folder)
                .and_then(|l| l.pages.get(page))
                .map(|p| Reply::primary(p.clone()))
                .unwrap_or_default(),
            Address::FolderInfo { folder } => match self.listing(&folder) {
                Some(listing) => Reply {
                    primary: Some(
                        FolderInfo {
                            pages: listing.pages.len(),
                            items: listing.items,
                        }
                        .encode()
                        .into_bytes(),
                    ),
                    supplementary: listing.pages.clone(),
                },
                None => Reply::default(),
            },
            Address::Item { item, folder } => self
                .tree
                .get_file(&item, &folder)
                .and_then(TreeNode::content)
                .map(|c| Reply::primary(c.encode()))
                .unwrap_or_default(),
        }
    }

    fn listing(&self, folder: &[String]) -> Option<&Listing> {
        let dir = self.tree.get_dir(folder)?;
        self.listings.get(&dir.id)
    }
}

fn item_refs(tree: &VirtualTree, dir: &TreeNode) -> Result<Vec<ItemRef>> {
    tree.children(dir)
        .map(|child| {
            if !ItemRef::is_encodable_name(&child.name) {
                return Err(Error::ReservedCharacter(child.name.clone()));
            }
            Ok(ItemRef {
                kind: if child.is_dir() {
                    ItemKind::Dir
                } else {
                    ItemKind::File
                },
                name: child.name.clone(),
                label: child.chain.head().to_string(),
            })
        })
        .collect()
}
