//! Bounded breadth-first walks over the link cache.
//!
//! The inward walk collects documents linking to the start document, ordered
//! farthest-first. The outward walk builds a tree of outlinks. Each walk keeps
//! its own visited set, so cyclic graphs terminate.

mod inward;
mod outward;
mod walk;

pub use inward::{InlinkHierarchy, InlinkNode, build_inlink_hierarchy, sort_farthest_first};
pub use outward::{
    OutlinkBranch, OutlinkNode, OutlinkTree, build_outlink_hierarchy, effective_outlink_depth,
};
pub use walk::WalkState;

use crate::cache::LinkCache;
use crate::error::LinkHierarchyError;
use crate::models::{DocumentId, NameSet};
use serde::Serialize;

/// Combined hierarchy for one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyView {
    /// Start document.
    pub start: DocumentId,
    /// Start document display name.
    pub name: String,
    /// Inlinks, farthest-first.
    pub inlinks: InlinkHierarchy,
    /// Outlink tree, bounded by [`effective_outlink_depth`].
    pub outlinks: OutlinkTree,
    /// Canvas boards of the start document; flat, never walked.
    pub canvas_links: NameSet,
    /// Attachments of the start document.
    pub attachments: NameSet,
    /// Tags of the start document.
    pub tags: NameSet,
}

/// Run both walks for `start`.
///
/// The outward walk gets whatever depth the inward walk left over, but at
/// least one level.
///
/// # Errors
///
/// Returns the cache error when the start document cannot be extracted.
pub async fn build_hierarchy(
    cache: &LinkCache,
    start: &DocumentId,
    max_depth: usize,
) -> Result<HierarchyView, LinkHierarchyError> {
    let links = cache.get(start, false).await?;
    let inlinks = build_inlink_hierarchy(cache, start, max_depth).await?;
    let outward_depth = effective_outlink_depth(max_depth, inlinks.max_depth);
    let outlinks = build_outlink_hierarchy(cache, start, outward_depth).await?;
    Ok(HierarchyView {
        start: start.clone(),
        name: start.display_name().to_string(),
        inlinks,
        outlinks,
        canvas_links: links.canvas_links.clone(),
        attachments: links.attachments.clone(),
        tags: links.tags.clone(),
    })
}
