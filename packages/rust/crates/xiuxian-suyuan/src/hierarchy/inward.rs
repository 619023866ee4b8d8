use super::walk::BoundedWalk;
use crate::cache::LinkCache;
use crate::error::LinkHierarchyError;
use crate::models::{DocumentId, NameSet};
use serde::Serialize;
use tracing::debug;

/// One document that links, directly or transitively, to the start document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlinkNode {
    /// Resolved document.
    pub document: DocumentId,
    /// Display name as stored in the referencing link set.
    pub name: String,
    /// Distance from the start document (1 = direct inlink).
    pub depth: usize,
    /// Snapshot of this document's own outlinks.
    pub outlinks: NameSet,
}

/// Result of the inward walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlinkHierarchy {
    /// Nodes ordered farthest-first; equal depths keep discovery order.
    pub nodes: Vec<InlinkNode>,
    /// Deepest level reached (0 when there are no inlinks).
    pub max_depth: usize,
}

/// Order nodes by depth descending, stable on discovery order.
pub fn sort_farthest_first(nodes: &mut [InlinkNode]) {
    nodes.sort_by(|left, right| right.depth.cmp(&left.depth));
}

/// Breadth-first walk over inlinks, bounded by `max_depth`.
///
/// Each discovered document is recorded once, with a snapshot of its own
/// outlinks. A failed lookup below the start document only truncates that
/// branch.
///
/// # Errors
///
/// Returns the cache error when the start document's link set cannot be
/// fetched.
pub async fn build_inlink_hierarchy(
    cache: &LinkCache,
    start: &DocumentId,
    max_depth: usize,
) -> Result<InlinkHierarchy, LinkHierarchyError> {
    let store = cache.extractor().store();
    let mut walk = BoundedWalk::new(start.clone(), (), max_depth);
    let mut nodes: Vec<InlinkNode> = Vec::new();
    let mut deepest = 0;

    while let Some((doc, depth, ())) = walk.next_expandable() {
        let link_set = match cache.get(&doc, false).await {
            Ok(link_set) => link_set,
            Err(err) if doc == *start => return Err(err),
            Err(err) => {
                debug!(
                    event = "suyuan.hierarchy.inward.truncated",
                    document = %doc,
                    depth,
                    error = %err,
                );
                continue;
            }
        };

        for name in &link_set.inlinks {
            let Some(source) = store.resolve_document_by_name(name, &doc) else {
                continue;
            };
            if !walk.discover(&source) {
                continue;
            }
            let outlinks = match cache.get(&source, false).await {
                Ok(snapshot) => snapshot.outlinks.clone(),
                Err(err) => {
                    debug!(
                        event = "suyuan.hierarchy.inward.snapshot_failed",
                        document = %source,
                        error = %err,
                    );
                    NameSet::new()
                }
            };
            let node_depth = depth + 1;
            deepest = deepest.max(node_depth);
            nodes.push(InlinkNode {
                document: source.clone(),
                name: name.clone(),
                depth: node_depth,
                outlinks,
            });
            walk.enqueue(source, node_depth, ());
        }
    }

    sort_farthest_first(&mut nodes);
    debug!(
        event = "suyuan.hierarchy.inward.done",
        start = %start,
        nodes = nodes.len(),
        max_depth = deepest,
        state = ?walk.state(),
    );
    Ok(InlinkHierarchy {
        nodes,
        max_depth: deepest,
    })
}
