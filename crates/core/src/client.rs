use async_trait::async_trait;
use tracing::debug;

use crate::address::{encode_folder_info, encode_item, encode_list_page};
use crate::dispatch::{Dispatcher, Reply};
use crate::error::{Error, Result};
use crate::message::{FolderInfo, FolderPage, ItemKind, ItemRef, Payload, ServerInfo};
use crate::model::FileContent;

/// Sends one TXT query and returns the records of the response.
///
/// A name-not-found response is an empty [`Reply`], not an error.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exchange(&self, name: &str) -> Result<Reply>;
}

#[async_trait]
impl Transport for Dispatcher {
    async fn exchange(&self, name: &str) -> Result<Reply> {
        Ok(self.resolve(name))
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn exchange(&self, name: &str) -> Result<Reply> {
        (**self).exchange(name).await
    }
}

/// Protocol messages are ASCII apart from entry names, which are UTF-8.
fn text(raw: Option<&[u8]>) -> Result<&str> {
    Ok(std::str::from_utf8(raw.unwrap_or_default())?)
}

/// Folder chain of a child of `parent`.
pub fn child_path(parent: &[String], label: &str) -> Vec<String> {
    let mut path = Vec::with_capacity(parent.len() + 1);
    path.push(label.to_string());
    path.extend_from_slice(parent);
    path
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Dir { folder: Vec<String> },
    File { item: ItemRef, folder: Vec<String> },
}

pub struct QueryClient<T> {
    transport: T,
    info: ServerInfo,
}

impl<T: Transport> QueryClient<T> {
    /// Asks `init_name` for server info and adopts the base name it reports.
    pub async fn connect(transport: T, init_name: &str) -> Result<Self> {
        let name = init_name.trim_end_matches('.');
        let reply = transport.exchange(name).await?;
        let info = reply
            .primary
            .as_deref()
            .and_then(|raw| std::str::from_utf8(raw).ok())
            .map(ServerInfo::decode)
            .filter(|info| !info.base_name.is_empty())
            .ok_or_else(|| Error::NoServerInfo(name.to_string()))?;
        debug!(base = %info.base_name, features = ?info.features, "connected");
        Ok(Self { transport, info })
    }

    pub fn base_name(&self) -> &str {
        &self.info.base_name
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.info
    }

    async fn query(&self, name: &str) -> Result<Reply> {
        let reply = self.transport.exchange(name).await?;
        if reply.is_not_found() {
            return Err(Error::NotFound(name.to_string()));
        }
        Ok(reply)
    }

    pub async fn folder_info(&self, folder: &[String]) -> Result<(FolderInfo, Vec<FolderPage>)> {
        let reply = self
            .query(&encode_folder_info(self.base_name(), folder))
            .await?;
        let info = FolderInfo::decode(text(reply.primary.as_deref())?);
        let pages = reply
            .supplementary
            .iter()
            .map(|p| text(Some(p.as_slice())).map(FolderPage::decode))
            .collect::<Result<_>>()?;
        Ok((info, pages))
    }

    pub async fn list_page(&self, page: usize, folder: &[String]) -> Result<FolderPage> {
        let reply = self
            .query(&encode_list_page(self.base_name(), page, folder))
            .await?;
        Ok(FolderPage::decode(text(reply.primary.as_deref())?))
    }

    /// Every entry of a folder. Any failed page query fails the whole listing.
    pub async fn list_dir(&self, folder: &[String]) -> Result<Vec<ItemRef>> {
        let (info, pages) = self.folder_info(folder).await?;
        let bundled = pages.len();
        let mut items: Vec<ItemRef> = pages.into_iter().flat_map(|p| p.items).collect();
        if bundled == info.pages && items.len() == info.items {
            return Ok(items);
        }

        debug!(
            bundled,
            expected = info.pages,
            "supplementary pages incomplete, fetching per page"
        );
        items.clear();
        for page in 0..info.pages {
            items.extend(self.list_page(page, folder).await?.items);
        }
        if items.len() != info.items {
            return Err(Error::IncompleteListing {
                expected: info.items,
                got: items.len(),
            });
        }
        Ok(items)
    }

    pub async fn fetch_file(&self, item: &str, folder: &[String]) -> Result<FileContent> {
        let reply = self
            .query(&encode_item(self.base_name(), item, folder))
            .await?;
        FileContent::decode(reply.primary.as_deref().unwrap_or_default())
    }

    /// Walks a slash-separated path of entry names from the root folder.
    pub async fn resolve(&self, path: &str) -> Result<Resolved> {
        let mut folder: Vec<String> = Vec::new();
        let mut segments = path.split('/').filter(|s| !s.is_empty()).peekable();

        while let Some(segment) = segments.next() {
            let entry = self
                .list_dir(&folder)
                .await?
                .into_iter()
                .find(|i| i.name == segment)
                .ok_or_else(|| Error::NotFound(path.to_string()))?;
            let kind = entry.kind;
            match kind {
                ItemKind::Dir => folder = child_path(&folder, &entry.label),
                ItemKind::File if segments.peek().is_none() => {
                    return Ok(Resolved::File {
                        item: entry,
                        folder,
                    })
                }
                ItemKind::File => return Err(Error::NotFound(path.to_string())),
            }
        }
        Ok(Resolved::Dir { folder })
    }
}
