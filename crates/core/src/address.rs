//! Query-name grammar.
//!
//! Relative to a base name `B`, four request shapes exist:
//!
//! ```text
//! B                               server info
//! [<folder>.]list.B               folder info
//! <page>.[<folder>.]list.B        one listing page
//! <item>[.<folder>].B             file content
//! ```
//!
//! `<folder>` is a folder chain without the `root` sentinel, nearest label
//! first. An empty folder chain addresses the tree root.

/// Maximum length of a single DNS label.
pub const MAX_LABEL_LEN: usize = 63;

const LIST_LABEL: &str = "list";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    ServerInfo,
    ListPage,
    FolderInfo,
    Item,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    ServerInfo,
    ListPage { page: usize, folder: Vec<String> },
    FolderInfo { folder: Vec<String> },
    Item { item: String, folder: Vec<String> },
}

impl Address {
    pub fn kind(&self) -> AddressKind {
        match self {
            Address::ServerInfo => AddressKind::ServerInfo,
            Address::ListPage { .. } => AddressKind::ListPage,
            Address::FolderInfo { .. } => AddressKind::FolderInfo,
            Address::Item { .. } => AddressKind::Item,
        }
    }

    /// Parses `name` relative to `base`. `None` when neither grammar matches.
    pub fn decode(base: &str, name: &str) -> Option<Address> {
        if name == base {
            return Some(Address::ServerInfo);
        }
        let labels = relative_labels(base, name)?;

        if let Some((last, prefix)) = labels.split_last() {
            if *last == LIST_LABEL {
                return Some(decode_listing(prefix));
            }
        }

        let (item, folder) = labels.split_first()?;
        Some(Address::Item {
            item: item.to_string(),
            folder: owned(folder),
        })
    }

    pub fn encode(&self, base: &str) -> String {
        match self {
            Address::ServerInfo => base.to_string(),
            Address::ListPage { page, folder } => encode_list_page(base, *page, folder),
            Address::FolderInfo { folder } => encode_folder_info(base, folder),
            Address::Item { item, folder } => encode_item(base, item, folder),
        }
    }
}

fn decode_listing(prefix: &[&str]) -> Address {
    if let Some((first, folder)) = prefix.split_first() {
        if first.bytes().all(|b| b.is_ascii_digit()) {
            // Hash labels made only of digits overflow usize and stay folder labels.
            if let Ok(page) = first.parse::<usize>() {
                return Address::ListPage {
                    page,
                    folder: owned(folder),
                };
            }
        }
    }
    Address::FolderInfo {
        folder: owned(prefix),
    }
}

/// Labels in front of `.base`, or `None` if any label is empty or illegal.
fn relative_labels<'a>(base: &str, name: &'a str) -> Option<Vec<&'a str>> {
    let rest = name.strip_suffix(base)?.strip_suffix('.')?;
    let labels: Vec<&str> = rest.split('.').collect();
    labels.iter().all(|l| is_label(l)).then_some(labels)
}

fn is_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn owned(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|l| l.to_string()).collect()
}

pub fn classify(base: &str, name: &str) -> AddressKind {
    Address::decode(base, name)
        .map(|a| a.kind())
        .unwrap_or(AddressKind::Unknown)
}

fn with_folder<S: AsRef<str>>(head: String, folder: &[S], tail: &str) -> String {
    let mut out = head;
    for label in folder {
        out.push('.');
        out.push_str(label.as_ref());
    }
    out.push('.');
    out.push_str(tail);
    out
}

pub fn encode_list_page<S: AsRef<str>>(base: &str, page: usize, folder: &[S]) -> String {
    with_folder(page.to_string(), folder, &format!("{}.{}", LIST_LABEL, base))
}

pub fn encode_folder_info<S: AsRef<str>>(base: &str, folder: &[S]) -> String {
    match folder.split_first() {
        None => format!("{}.{}", LIST_LABEL, base),
        Some((first, rest)) => with_folder(
            first.as_ref().to_string(),
            rest,
            &format!("{}.{}", LIST_LABEL, base),
        ),
    }
}

pub fn encode_item<S: AsRef<str>>(base: &str, item: &str, folder: &[S]) -> String {
    with_folder(item.to_string(), folder, base)
}

/// Page and folder of a listing-page name; `(0, [])` if `name` is not one.
pub fn decode_list_page(base: &str, name: &str) -> (usize, Vec<String>) {
    match Address::decode(base, name) {
        Some(Address::ListPage { page, folder }) => (page, folder),
        _ => (0, Vec::new()),
    }
}

/// Folder of a folder-info name; empty if `name` is not one.
pub fn decode_folder_info(base: &str, name: &str) -> Vec<String> {
    match Address::decode(base, name) {
        Some(Address::FolderInfo { folder }) => folder,
        _ => Vec::new(),
    }
}

/// Item label and folder of an item name; empty values if `name` is not one.
pub fn decode_item(base: &str, name: &str) -> (String, Vec<String>) {
    match Address::decode(base, name) {
        Some(Address::Item { item, folder }) => (item, folder),
        _ => (String::new(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "svc.example";
    const A: &str = "0123456789abcdef0123456789abcdef";
    const B: &str = "fedcba9876543210fedcba9876543210";

    #[test]
    fn classifies_each_shape() {
        assert_eq!(classify(BASE, "svc.example"), AddressKind::ServerInfo);
        assert_eq!(classify(BASE, "list.svc.example"), AddressKind::FolderInfo);
        assert_eq!(classify(BASE, "3.list.svc.example"), AddressKind::ListPage);
        assert_eq!(
            classify(BASE, &format!("{A}.{B}.list.svc.example")),
            AddressKind::FolderInfo
        );
        assert_eq!(classify(BASE, &format!("{A}.svc.example")), AddressKind::Item);
        assert_eq!(
            classify(BASE, &format!("{A}.{B}.svc.example")),
            AddressKind::Item
        );
    }

    #[test]
    fn rejects_malformed_names() {
        for name in [
            "other.example",
            "xsvc.example",
            ".svc.example",
            "a..b.svc.example",
            "a-b.svc.example",
            "a b.svc.example",
            "",
        ] {
            assert_eq!(classify(BASE, name), AddressKind::Unknown, "{name:?}");
        }
        let long = "a".repeat(MAX_LABEL_LEN + 1);
        assert_eq!(
            classify(BASE, &format!("{long}.svc.example")),
            AddressKind::Unknown
        );
    }

    #[test]
    fn empty_folder_omits_segment() {
        let empty: [&str; 0] = [];
        assert_eq!(encode_list_page(BASE, 0, &empty), "0.list.svc.example");
        assert_eq!(encode_folder_info(BASE, &empty), "list.svc.example");
        assert_eq!(encode_item(BASE, A, &empty), format!("{A}.svc.example"));
    }

    #[test]
    fn encodes_folder_chain_in_order() {
        assert_eq!(
            encode_list_page(BASE, 2, &[A, B]),
            format!("2.{A}.{B}.list.svc.example")
        );
        assert_eq!(
            encode_folder_info(BASE, &[A, B]),
            format!("{A}.{B}.list.svc.example")
        );
        assert_eq!(encode_item(BASE, A, &[B]), format!("{A}.{B}.svc.example"));
    }

    #[test]
    fn decodes_parameters() {
        assert_eq!(
            decode_list_page(BASE, &format!("7.{A}.list.svc.example")),
            (7, vec![A.to_string()])
        );
        assert_eq!(
            decode_folder_info(BASE, &format!("{A}.{B}.list.svc.example")),
            vec![A.to_string(), B.to_string()]
        );
        assert_eq!(
            decode_item(BASE, &format!("{A}.{B}.svc.example")),
            (A.to_string(), vec![B.to_string()])
        );
    }

    #[test]
    fn tolerant_decode_yields_zero_values() {
        assert_eq!(decode_list_page(BASE, "list.svc.example"), (0, vec![]));
        assert!(decode_folder_info(BASE, "1.list.svc.example").is_empty());
        assert_eq!(decode_item(BASE, "nope"), (String::new(), vec![]));
    }

    #[test]
    fn all_digit_hash_label_is_a_folder() {
        let digits = "12345678901234567890123456789012";
        assert_eq!(
            Address::decode(BASE, &format!("{digits}.list.svc.example")),
            Some(Address::FolderInfo {
                folder: vec![digits.to_string()]
            })
        );
    }

    #[test]
    fn explicit_root_label_is_preserved() {
        assert_eq!(
            decode_folder_info(BASE, "root.list.svc.example"),
            vec!["root".to_string()]
        );
    }
}
