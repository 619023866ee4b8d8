use super::walk::BoundedWalk;
use crate::cache::LinkCache;
use crate::error::LinkHierarchyError;
use crate::models::{DocumentId, DocumentKind, NameSet};
use serde::Serialize;
use tracing::debug;

/// Arena node of the outlink tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlinkNode {
    /// Resolved document.
    pub document: DocumentId,
    /// Display name as stored in the parent's link set.
    pub name: String,
    /// Distance from the start document (0 = root).
    pub depth: usize,
    /// Child indices into [`OutlinkTree::nodes`].
    pub children: Vec<usize>,
    /// Attachments of this document; empty for nodes that were not expanded.
    pub attachments: NameSet,
}

/// Outlink tree stored as an arena; `nodes[0]` is the start document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlinkTree {
    /// Nodes in discovery order.
    pub nodes: Vec<OutlinkNode>,
    /// Depth bound the tree was built with.
    pub max_depth: usize,
}

/// Nested rendering of an [`OutlinkTree`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlinkBranch {
    /// Display name.
    pub name: String,
    /// Resolved document.
    pub document: DocumentId,
    /// Distance from the root.
    pub depth: usize,
    /// Attachments of this document.
    #[serde(skip_serializing_if = "NameSet::is_empty")]
    pub attachments: NameSet,
    /// Child branches.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlinkBranch>,
}

impl OutlinkTree {
    /// Root node.
    #[must_use]
    pub fn root(&self) -> Option<&OutlinkNode> {
        self.nodes.first()
    }

    /// Children of the node at `index`.
    pub fn children_of(&self, index: usize) -> impl Iterator<Item = &OutlinkNode> {
        self.nodes
            .get(index)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.nodes.get(*child))
    }

    /// Every node below the root.
    pub fn descendants(&self) -> impl Iterator<Item = &OutlinkNode> {
        self.nodes.iter().skip(1)
    }

    /// Deepest level present in the tree.
    #[must_use]
    pub fn depth_reached(&self) -> usize {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Nested view for rendering and serialization.
    #[must_use]
    pub fn to_branch(&self) -> Option<OutlinkBranch> {
        self.root().map(|_| self.branch_at(0))
    }

    fn branch_at(&self, index: usize) -> OutlinkBranch {
        let Some(node) = self.nodes.get(index) else {
            return OutlinkBranch {
                name: String::new(),
                document: DocumentId::new(""),
                depth: 0,
                attachments: NameSet::new(),
                children: Vec::new(),
            };
        };
        OutlinkBranch {
            name: node.name.clone(),
            document: node.document.clone(),
            depth: node.depth,
            attachments: node.attachments.clone(),
            children: node
                .children
                .iter()
                .map(|child| self.branch_at(*child))
                .collect(),
        }
    }
}

/// Outward depth budget left after the inward walk, never less than one.
#[must_use]
pub fn effective_outlink_depth(configured_max_depth: usize, inlink_depth: usize) -> usize {
    configured_max_depth.saturating_sub(inlink_depth).max(1)
}

/// Breadth-first walk over outlinks, bounded by `max_depth`.
///
/// Canvas boards are attached but never expanded. A document reachable
/// through several paths is attached and expanded once.
///
/// # Errors
///
/// Returns the cache error when the start document's link set cannot be
/// fetched.
pub async fn build_outlink_hierarchy(
    cache: &LinkCache,
    start: &DocumentId,
    max_depth: usize,
) -> Result<OutlinkTree, LinkHierarchyError> {
    let store = cache.extractor().store();
    let mut nodes = vec![OutlinkNode {
        document: start.clone(),
        name: start.display_name().to_string(),
        depth: 0,
        children: Vec::new(),
        attachments: NameSet::new(),
    }];
    let mut walk = BoundedWalk::new(start.clone(), 0_usize, max_depth);

    while let Some((doc, depth, index)) = walk.next_expandable() {
        if store.document_kind(&doc) == DocumentKind::Canvas {
            continue;
        }
        let link_set = match cache.get(&doc, false).await {
            Ok(link_set) => link_set,
            Err(err) if doc == *start => return Err(err),
            Err(err) => {
                debug!(
                    event = "suyuan.hierarchy.outward.truncated",
                    document = %doc,
                    depth,
                    error = %err,
                );
                continue;
            }
        };
        if let Some(node) = nodes.get_mut(index) {
            node.attachments = link_set.attachments.clone();
        }

        for name in &link_set.outlinks {
            let Some(target) = store.resolve_document_by_name(name, &doc) else {
                continue;
            };
            if !walk.discover(&target) {
                continue;
            }
            let child = nodes.len();
            nodes.push(OutlinkNode {
                document: target.clone(),
                name: name.clone(),
                depth: depth + 1,
                children: Vec::new(),
                attachments: NameSet::new(),
            });
            if let Some(parent) = nodes.get_mut(index) {
                parent.children.push(child);
            }
            walk.enqueue(target, depth + 1, child);
        }
    }

    debug!(
        event = "suyuan.hierarchy.outward.done",
        start = %start,
        nodes = nodes.len(),
        state = ?walk.state(),
    );
    Ok(OutlinkTree { nodes, max_depth })
}
