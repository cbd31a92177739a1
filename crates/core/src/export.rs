use crate::address::{encode_folder_info, encode_item};
use crate::config::ServerConfig;
use crate::model::NodeKind;
use crate::tree::VirtualTree;

/// Every node with the query name that reaches it.
pub fn to_json(tree: &VirtualTree, config: &ServerConfig) -> serde_json::Value {
    let base = &config.base_name;
    serde_json::json!({
        "config": config,
        "stats": tree.stats(),
        "root": tree.root().id.0,
        "nodes": tree.nodes().iter().map(|n| {
            let (kind, query, content) = match &n.kind {
                NodeKind::Dir { .. } => ("dir", encode_folder_info(base, n.chain.as_folder()), None),
                NodeKind::File { content } => (
                    "file",
                    encode_item(base, n.chain.head(), n.chain.folder()),
                    Some(content.kind),
                ),
            };
            serde_json::json!({
                "id": n.id.0,
                "parent": n.parent.as_ref().map(|p| p.0),
                "path": n.path,
                "name": n.name,
                "kind": kind,
                "content": content,
                "chain": n.chain.to_string(),
                "query": query,
                "children": n.children().iter().map(|c| c.0).collect::<Vec<_>>()
            })
        }).collect::<Vec<_>>()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::label_of;

    #[test]
    fn lists_query_names() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub/a.href"), "https://x").unwrap();
        let tree = VirtualTree::build(dir.path()).unwrap();
        let config = ServerConfig::with_base_name("svc.example");
        let json = to_json(&tree, &config);

        let nodes = json["nodes"].as_array().unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0]["query"], "list.svc.example");
        assert_eq!(
            nodes[1]["query"],
            format!("{}.list.svc.example", label_of("sub"))
        );
        assert_eq!(
            nodes[2]["query"],
            format!("{}.{}.svc.example", label_of("a.href"), label_of("sub"))
        );
        assert_eq!(nodes[2]["content"], "Href");
        assert_eq!(json["config"]["base_name"], "svc.example");
    }
}
