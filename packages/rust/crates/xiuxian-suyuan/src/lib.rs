//! xiuxian-suyuan - link hierarchy traversal and caching.
//!
//! Module layout (by domain):
//! - `models`: document identifiers, link sets, parsed link metadata
//! - `parser`: markdown and canvas parsing into `ParsedLinks`
//! - `store`: `DocumentStore` boundary plus `MemoryStore` / `VaultStore`
//! - `extractor`: per-document inlinks, outlinks, canvas links, attachments, tags
//! - `cache`: TTL link cache with eviction, dirty marking and request coalescing
//! - `hierarchy`: bounded inward and outward walks over the cache
//! - `engine`: owning facade with runtime depth and background cleanup
//! - `config`: YAML + environment settings
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use xiuxian_suyuan::{DocumentId, LinkHierarchyConfig, LinkHierarchyEngine, MemoryStore};
//!
//! # async fn demo() -> Result<(), xiuxian_suyuan::LinkHierarchyError> {
//! let store = Arc::new(MemoryStore::new());
//! store.insert("A.md", "# A");
//! store.insert("B.md", "see [[A]]");
//!
//! let engine = LinkHierarchyEngine::new(store, LinkHierarchyConfig::default());
//! let view = engine.build_hierarchy(&DocumentId::new("A.md")).await?;
//! assert_eq!(view.inlinks.nodes[0].name, "B");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod engine;
mod error;
pub mod extractor;
pub mod hierarchy;
pub mod models;
pub mod parser;
pub mod store;

pub use cache::{
    CLEANUP_NOTICE_COOLDOWN, CacheCleanupNotice, CacheStats, EXTRACTION_TIMEOUT, LinkCache,
    LinkCacheOptions, RebuildReport, spawn_cleanup_task,
};
pub use config::{
    ConfigError, LinkHierarchyConfig, resolve_link_hierarchy_config,
    resolve_link_hierarchy_config_with_env,
};
pub use engine::LinkHierarchyEngine;
pub use error::LinkHierarchyError;
pub use extractor::LinkExtractor;
pub use hierarchy::{
    HierarchyView, InlinkHierarchy, InlinkNode, OutlinkBranch, OutlinkNode, OutlinkTree,
    WalkState, build_hierarchy, build_inlink_hierarchy, build_outlink_hierarchy,
    effective_outlink_depth,
};
pub use models::{
    DocumentId, DocumentKind, LinkReference, LinkSet, NameSet, ParsedLinks, ResolvedLinkIndex,
};
pub use store::{DocumentStore, MemoryStore, StoreError, VaultStore};
