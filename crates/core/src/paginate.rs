use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::message::{FolderPage, ItemRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLimits {
    /// Largest encoded size of a single item.
    pub item_max: usize,
    /// Largest encoded size of a page, separators included.
    pub page_max: usize,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            item_max: 200,
            page_max: 240,
        }
    }
}

/// Splits `items` into pages whose encoding fits `limits.page_max`.
///
/// Order is preserved and no item is split. An item larger than
/// `limits.item_max` is an error.
pub fn paginate(items: &[ItemRef], limits: PageLimits) -> Result<Vec<FolderPage>> {
    let mut pages = Vec::new();
    let mut page = FolderPage::default();
    let mut used = 0usize;

    for item in items {
        let len = item.encoded_len();
        if len > limits.item_max || len > limits.page_max {
            return Err(Error::ItemTooLarge {
                entry: item.encode(),
                len,
                max: limits.item_max.min(limits.page_max),
            });
        }

        let sep = usize::from(!page.items.is_empty());
        if used + sep + len > limits.page_max {
            pages.push(std::mem::take(&mut page));
            used = 0;
        }
        used += usize::from(!page.items.is_empty()) + len;
        page.items.push(item.clone());
    }

    if !page.items.is_empty() {
        pages.push(page);
    }
    Ok(pages)
}
