//! Inward and outward walks over the link cache.

use async_trait::async_trait;
use std::sync::Arc;
use xiuxian_suyuan::{
    DocumentId, DocumentStore, LinkCache, LinkCacheOptions, LinkExtractor, LinkHierarchyConfig,
    LinkHierarchyEngine, LinkHierarchyError, MemoryStore, ParsedLinks, ResolvedLinkIndex,
    StoreError, build_inlink_hierarchy, build_outlink_hierarchy,
};

fn store_of(notes: &[(&str, &str)]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (path, content) in notes {
        store.insert(path, *content);
    }
    store
}

fn cache_over(store: Arc<dyn DocumentStore>) -> LinkCache {
    LinkCache::new(
        Arc::new(LinkExtractor::new(store, true)),
        LinkCacheOptions::default(),
    )
}

fn inlink_order(hierarchy: &xiuxian_suyuan::InlinkHierarchy) -> Vec<(&str, usize)> {
    hierarchy
        .nodes
        .iter()
        .map(|node| (node.name.as_str(), node.depth))
        .collect()
}

/// Wraps a memory store and fails every metadata read for one document.
struct BrokenDocumentStore {
    inner: Arc<MemoryStore>,
    broken: DocumentId,
}

#[async_trait]
impl DocumentStore for BrokenDocumentStore {
    fn resolve_document_by_name(&self, name: &str, context: &DocumentId) -> Option<DocumentId> {
        self.inner.resolve_document_by_name(name, context)
    }

    async fn resolved_link_index(&self) -> Result<Arc<ResolvedLinkIndex>, StoreError> {
        self.inner.resolved_link_index().await
    }

    async fn parsed_links(&self, doc: &DocumentId) -> Result<Option<ParsedLinks>, StoreError> {
        if *doc == self.broken {
            return Err(StoreError::Backend(format!("cannot read {doc}")));
        }
        self.inner.parsed_links(doc).await
    }

    async fn read_raw_content(&self, doc: &DocumentId) -> Result<String, StoreError> {
        self.inner.read_raw_content(doc).await
    }

    async fn list_canvas_boards(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.inner.list_canvas_boards().await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>, StoreError> {
        self.inner.list_documents().await
    }
}

#[tokio::test]
async fn test_inlinks_are_ordered_farthest_first() -> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "# A\n"),
        ("B.md", "Up to [[A]].\n"),
        ("C.md", "Up to [[B]].\n"),
    ]);
    let cache = cache_over(store);

    let hierarchy = build_inlink_hierarchy(&cache, &DocumentId::new("A.md"), 2).await?;

    assert_eq!(inlink_order(&hierarchy), vec![("C", 2), ("B", 1)]);
    assert_eq!(hierarchy.max_depth, 2);
    let b = &hierarchy.nodes[1];
    assert_eq!(b.document, DocumentId::new("B.md"));
    assert_eq!(b.outlinks.as_slice(), ["A".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_inward_walk_respects_depth_bound() -> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "# A\n"),
        ("B.md", "[[A]]\n"),
        ("C.md", "[[B]]\n"),
        ("D.md", "[[C]]\n"),
    ]);
    let cache = cache_over(store);
    let a = DocumentId::new("A.md");

    let shallow = build_inlink_hierarchy(&cache, &a, 2).await?;
    assert_eq!(inlink_order(&shallow), vec![("C", 2), ("B", 1)]);

    let deep = build_inlink_hierarchy(&cache, &a, 3).await?;
    assert_eq!(inlink_order(&deep), vec![("D", 3), ("C", 2), ("B", 1)]);

    let none = build_inlink_hierarchy(&cache, &a, 0).await?;
    assert!(none.nodes.is_empty());
    assert_eq!(none.max_depth, 0);
    Ok(())
}

#[tokio::test]
async fn test_cycles_terminate_and_record_each_document_once()
-> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "[[B]] [[C]]\n"),
        ("B.md", "[[A]] [[C]]\n"),
        ("C.md", "[[A]] [[B]]\n"),
    ]);
    let cache = cache_over(store);
    let a = DocumentId::new("A.md");

    let inward = build_inlink_hierarchy(&cache, &a, 10).await?;
    assert_eq!(inlink_order(&inward), vec![("B", 1), ("C", 1)]);

    let outward = build_outlink_hierarchy(&cache, &a, 10).await?;
    let names: Vec<&str> = outward.nodes.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
    assert_eq!(outward.depth_reached(), 1);
    Ok(())
}

#[tokio::test]
async fn test_outward_tree_attaches_shared_targets_once() -> Result<(), Box<dyn std::error::Error>>
{
    let store = store_of(&[
        ("A.md", "[[B]] [[C]]\n\n![[cover.png]]\n"),
        ("B.md", "[[D]]\n"),
        ("C.md", "[[D]]\n"),
        ("D.md", "[[E]]\n\n![[diagram.svg]]\n"),
        ("E.md", "# E\n"),
    ]);
    store.insert_attachment("assets/cover.png");
    store.insert_attachment("assets/diagram.svg");
    let cache = cache_over(store);

    let tree = build_outlink_hierarchy(&cache, &DocumentId::new("A.md"), 2).await?;

    let root = tree.root().ok_or("missing root")?;
    assert_eq!(root.attachments.as_slice(), ["cover.png".to_string()]);
    let children: Vec<&str> = tree.children_of(0).map(|node| node.name.as_str()).collect();
    assert_eq!(children, vec!["B", "C"]);
    let grandchildren: Vec<&str> = tree.children_of(1).map(|node| node.name.as_str()).collect();
    assert_eq!(grandchildren, vec!["D"]);
    assert_eq!(tree.children_of(2).count(), 0);

    // D sits on the depth bound: attached, never expanded.
    let d = tree
        .descendants()
        .find(|node| node.name == "D")
        .ok_or("missing D")?;
    assert_eq!(d.depth, 2);
    assert!(d.attachments.is_empty());
    assert!(d.children.is_empty());
    assert_eq!(tree.descendants().count(), 3);

    let branch = serde_json::to_value(tree.to_branch())?;
    assert_eq!(branch["name"], "A");
    assert_eq!(branch["children"][0]["children"][0]["name"], "D");
    assert!(branch["children"][1].get("children").is_none());
    Ok(())
}

#[tokio::test]
async fn test_canvas_boards_are_never_expanded() -> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "# A\n\n[[B]]\n"),
        ("B.md", "# B\n"),
        (
            "Board.canvas",
            r#"{"nodes":[{"id":"1","type":"file","file":"A.md"}],"edges":[]}"#,
        ),
    ]);
    let engine = LinkHierarchyEngine::new(store, LinkHierarchyConfig::default());

    let board = engine
        .outlink_hierarchy(&DocumentId::new("Board.canvas"), Some(3))
        .await?;
    assert_eq!(board.nodes.len(), 1);

    let view = engine.build_hierarchy(&DocumentId::new("A.md")).await?;
    assert!(view.inlinks.nodes.is_empty());
    assert_eq!(view.canvas_links.as_slice(), ["Board".to_string()]);
    let outlinks: Vec<&str> = view
        .outlinks
        .descendants()
        .map(|node| node.name.as_str())
        .collect();
    assert_eq!(outlinks, vec!["B"]);
    Ok(())
}

#[tokio::test]
async fn test_outward_depth_is_what_inward_walk_left() -> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "#focus [[X]]\n"),
        ("B.md", "[[A]]\n"),
        ("C.md", "[[B]]\n"),
        ("X.md", "[[Y]]\n"),
        ("Y.md", "[[Z]]\n"),
        ("Z.md", "# Z\n"),
    ]);
    let config = LinkHierarchyConfig {
        max_depth: 3,
        ..LinkHierarchyConfig::default()
    };
    let engine = LinkHierarchyEngine::new(store, config);
    let a = DocumentId::new("A.md");

    let view = engine.build_hierarchy(&a).await?;
    assert_eq!(view.name, "A");
    assert_eq!(view.inlinks.max_depth, 2);
    assert_eq!(view.outlinks.max_depth, 1);
    assert_eq!(view.outlinks.depth_reached(), 1);
    assert_eq!(view.tags.as_slice(), ["focus".to_string()]);

    engine.set_max_depth(5);
    let view = engine.build_hierarchy(&a).await?;
    assert_eq!(view.outlinks.max_depth, 3);
    assert_eq!(view.outlinks.depth_reached(), 3);

    let direct = engine.inlink_hierarchy(&a, Some(1)).await?;
    assert_eq!(inlink_order(&direct), vec![("B", 1)]);
    Ok(())
}

#[tokio::test]
async fn test_unknown_start_document_is_an_error() {
    let store = store_of(&[("A.md", "# A\n")]);
    let engine = LinkHierarchyEngine::new(store, LinkHierarchyConfig::default());

    let result = engine.build_hierarchy(&DocumentId::new("Ghost.md")).await;

    assert!(matches!(
        result,
        Err(LinkHierarchyError::Extraction { .. })
    ));
}

#[tokio::test]
async fn test_failure_below_start_truncates_branch() -> Result<(), Box<dyn std::error::Error>> {
    let inner = store_of(&[
        ("A.md", "# A\n\n[[B]]\n"),
        ("B.md", "[[A]] [[D]]\n"),
        ("C.md", "[[B]]\n"),
        ("D.md", "# D\n"),
    ]);
    let broken = DocumentId::new("B.md");
    let store = Arc::new(BrokenDocumentStore {
        inner,
        broken: broken.clone(),
    });
    let cache = cache_over(store);
    let a = DocumentId::new("A.md");

    let inward = build_inlink_hierarchy(&cache, &a, 5).await?;
    assert_eq!(inlink_order(&inward), vec![("B", 1)]);
    assert!(inward.nodes[0].outlinks.is_empty());

    let outward = build_outlink_hierarchy(&cache, &a, 5).await?;
    let names: Vec<&str> = outward.nodes.iter().map(|node| node.name.as_str()).collect();
    assert_eq!(names, vec!["A", "B"]);

    let err = build_outlink_hierarchy(&cache, &broken, 5).await.err();
    assert_eq!(err.as_ref().map(LinkHierarchyError::document), Some(&broken));
    Ok(())
}

#[tokio::test]
async fn test_walk_orders_mixed_depths_farthest_first() -> Result<(), Box<dyn std::error::Error>>
{
    let store = store_of(&[
        ("A.md", "# A\n"),
        ("B1.md", "[[A]]\n"),
        ("B2.md", "[[A]]\n"),
        ("C.md", "[[B1]]\n"),
        ("D.md", "[[C]]\n"),
    ]);
    let cache = cache_over(store);

    let hierarchy = build_inlink_hierarchy(&cache, &DocumentId::new("A.md"), 3).await?;

    assert_eq!(
        inlink_order(&hierarchy),
        vec![("D", 3), ("C", 2), ("B1", 1), ("B2", 1)]
    );
    assert_eq!(hierarchy.max_depth, 3);
    Ok(())
}

#[tokio::test]
async fn test_notes_with_any_markdown_extension_are_walked()
-> Result<(), Box<dyn std::error::Error>> {
    let store = store_of(&[
        ("A.md", "# A\n"),
        ("B.mdx", "[A](A.md)\n"),
        ("C.markdown", "[B](B.mdx)\n"),
    ]);
    let engine = LinkHierarchyEngine::new(store, LinkHierarchyConfig::default());
    let a = DocumentId::new("A.md");
    let c = DocumentId::new("C.markdown");

    let inward = engine.inlink_hierarchy(&a, Some(3)).await?;
    let documents: Vec<&str> = inward
        .nodes
        .iter()
        .map(|node| node.document.as_str())
        .collect();
    assert_eq!(documents, vec!["C.markdown", "B.mdx"]);

    let outward = engine.outlink_hierarchy(&c, Some(3)).await?;
    let documents: Vec<&str> = outward
        .nodes
        .iter()
        .map(|node| node.document.as_str())
        .collect();
    assert_eq!(documents, vec!["C.markdown", "B.mdx", "A.md"]);

    assert_eq!(
        engine.open_target("B", &a),
        Some(DocumentId::new("B.mdx"))
    );
    assert_eq!(engine.open_target("C", &a), Some(c));
    Ok(())
}
