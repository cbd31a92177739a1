//! Text payloads carried in TXT records.
//!
//! Fields are joined with `;`. Server and folder info use `KEY value`
//! fields; folder pages carry item refs of the form `FDname|label` or
//! `ITname|label`. Decoding skips any field it does not recognise.

use serde::{Deserialize, Serialize};

const FIELD_SEP: char = ';';
const REF_SEP: char = '|';

pub trait Payload: Sized {
    fn encode(&self) -> String;
    fn decode(raw: &str) -> Self;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub base_name: String,
    pub features: Vec<String>,
}

impl Payload for ServerInfo {
    fn encode(&self) -> String {
        format!("SRV {};FEAT {}", self.base_name, self.features.join(","))
    }

    fn decode(raw: &str) -> Self {
        let mut info = ServerInfo::default();
        for (key, value) in key_values(raw) {
            match key {
                "SRV" => info.base_name = value.to_string(),
                "FEAT" => {
                    info.features = value
                        .split(',')
                        .filter(|f| !f.is_empty())
                        .map(str::to_string)
                        .collect()
                }
                _ => {}
            }
        }
        info
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    pub pages: usize,
    pub items: usize,
}

impl Payload for FolderInfo {
    fn encode(&self) -> String {
        format!("PAGES {};ITEMS {}", self.pages, self.items)
    }

    fn decode(raw: &str) -> Self {
        let mut info = FolderInfo::default();
        for (key, value) in key_values(raw) {
            let Ok(n) = value.parse() else { continue };
            match key {
                "PAGES" => info.pages = n,
                "ITEMS" => info.items = n,
                _ => {}
            }
        }
        info
    }
}

fn key_values(raw: &str) -> impl Iterator<Item = (&str, &str)> {
    raw.split(FIELD_SEP)
        .filter_map(|field| field.split_once(' '))
        .filter(|(_, value)| !value.contains(' '))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Dir,
    File,
}

impl ItemKind {
    pub fn tag(self) -> &'static str {
        match self {
            ItemKind::Dir => "FD",
            ItemKind::File => "IT",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "FD" => Some(ItemKind::Dir),
            "IT" => Some(ItemKind::File),
            _ => None,
        }
    }
}

/// One listing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKind,
    pub name: String,
    pub label: String,
}

impl ItemRef {
    pub fn encode(&self) -> String {
        format!("{}{}{}{}", self.kind.tag(), self.name, REF_SEP, self.label)
    }

    /// Length of [`ItemRef::encode`] without allocating.
    pub fn encoded_len(&self) -> usize {
        2 + self.name.len() + 1 + self.label.len()
    }

    pub fn decode(field: &str) -> Option<Self> {
        let kind = field.get(..2).and_then(ItemKind::from_tag)?;
        let mut parts = field[2..].split(REF_SEP);
        let (name, label) = (parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }
        Some(ItemRef {
            kind,
            name: name.to_string(),
            label: label.to_string(),
        })
    }

    /// Whether `name` survives the page encoding.
    pub fn is_encodable_name(name: &str) -> bool {
        !name.contains(FIELD_SEP) && !name.contains(REF_SEP)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderPage {
    pub items: Vec<ItemRef>,
}

impl Payload for FolderPage {
    fn encode(&self) -> String {
        let fields: Vec<String> = self.items.iter().map(ItemRef::encode).collect();
        fields.join(";")
    }

    fn decode(raw: &str) -> Self {
        FolderPage {
            items: raw.split(FIELD_SEP).filter_map(ItemRef::decode).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(kind: ItemKind, name: &str, label: &str) -> ItemRef {
        ItemRef {
            kind,
            name: name.into(),
            label: label.into(),
        }
    }

    #[test]
    fn server_info_wire_format() {
        let info = ServerInfo {
            base_name: "svc.example".into(),
            features: vec!["FOLDER".into(), "HREF".into(), "TXT".into()],
        };
        assert_eq!(info.encode(), "SRV svc.example;FEAT FOLDER,HREF,TXT");
        assert_eq!(ServerInfo::decode(&info.encode()), info);
    }

    #[test]
    fn folder_info_wire_format() {
        let info = FolderInfo { pages: 1, items: 2 };
        assert_eq!(info.encode(), "PAGES 1;ITEMS 2");
        assert_eq!(FolderInfo::decode("PAGES 1;ITEMS 2"), info);
    }

    #[test]
    fn folder_page_wire_format() {
        let page = FolderPage {
            items: vec![
                item(ItemKind::Dir, "docs", "aa"),
                item(ItemKind::File, "a b.txt", "bb"),
            ],
        };
        assert_eq!(page.encode(), "FDdocs|aa;ITa b.txt|bb");
        assert_eq!(FolderPage::decode(&page.encode()), page);
        assert_eq!(page.items[1].encoded_len(), page.items[1].encode().len());
    }

    #[test]
    fn unknown_fields_are_skipped() {
        assert_eq!(
            FolderInfo::decode("PAGES 3;GARBAGE;X y;ITEMS nope"),
            FolderInfo { pages: 3, items: 0 }
        );
        assert_eq!(
            ServerInfo::decode("SRV a.b;;;what is this").base_name,
            "a.b"
        );
        assert_eq!(
            FolderPage::decode("ZZx|y;ITa|b;FDno-separator;FDa|b|c;I").items,
            vec![item(ItemKind::File, "a", "b")]
        );
    }

    #[test]
    fn empty_payloads() {
        assert!(FolderPage::decode("").items.is_empty());
        assert_eq!(FolderPage::default().encode(), "");
        let bare = ServerInfo {
            base_name: "x".into(),
            features: vec![],
        };
        assert_eq!(ServerInfo::decode(&bare.encode()), bare);
    }

    #[test]
    fn reserved_characters() {
        assert!(ItemRef::is_encodable_name("plain name.txt"));
        assert!(!ItemRef::is_encodable_name("a;b"));
        assert!(!ItemRef::is_encodable_name("a|b"));
    }
}
