//! Per-document link extraction over a [`DocumentStore`].

mod patterns;

use crate::error::LinkHierarchyError;
use crate::models::{DocumentId, DocumentKind, LinkSet, ParsedLinks};
use crate::parser::{frontmatter_link_targets, frontmatter_tags};
use crate::store::DocumentStore;
use patterns::{canvas_reference_regex, raw_attachment_names};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

pub use patterns::ATTACHMENT_EXTENSIONS;

/// Builds a [`LinkSet`] for one document from a point-in-time read of the store.
///
/// Extraction never mutates shared state; the only knob is the canvas
/// cross-reference scan, which can be toggled at runtime.
pub struct LinkExtractor {
    store: Arc<dyn DocumentStore>,
    search_canvas_links: AtomicBool,
}

impl std::fmt::Debug for LinkExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkExtractor")
            .field("search_canvas_links", &self.search_canvas_links_enabled())
            .finish_non_exhaustive()
    }
}

impl LinkExtractor {
    /// Create an extractor over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, search_canvas_links: bool) -> Self {
        Self {
            store,
            search_canvas_links: AtomicBool::new(search_canvas_links),
        }
    }

    /// Underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Whether canvas boards are scanned for `[[Name]]` references.
    #[must_use]
    pub fn search_canvas_links_enabled(&self) -> bool {
        self.search_canvas_links.load(Ordering::Relaxed)
    }

    /// Toggle the canvas board scan.
    pub fn set_search_canvas_links(&self, enabled: bool) {
        self.search_canvas_links.store(enabled, Ordering::Relaxed);
    }

    /// Extract inlinks, outlinks, canvas links, attachments and tags for `doc`.
    ///
    /// Dangling links are dropped silently.
    ///
    /// # Errors
    ///
    /// Returns [`LinkHierarchyError::Extraction`] when any store read fails.
    pub async fn extract(&self, doc: &DocumentId) -> Result<LinkSet, LinkHierarchyError> {
        let mut link_set = LinkSet::default();
        let kind = self.store.document_kind(doc);

        self.collect_inlinks(doc, &mut link_set).await?;

        let parsed = self
            .store
            .parsed_links(doc)
            .await
            .map_err(|err| LinkHierarchyError::extraction(doc, err))?;
        if let Some(parsed) = parsed.as_ref() {
            self.collect_outlinks(doc, parsed, &mut link_set);
            link_set.tags.extend(parsed.tags.iter().cloned());
            link_set
                .tags
                .extend(frontmatter_tags(parsed.frontmatter.as_ref()));
        }

        if self.search_canvas_links_enabled() {
            self.collect_canvas_references(doc, &mut link_set).await?;
        }

        if kind != DocumentKind::Attachment {
            let raw = self
                .store
                .read_raw_content(doc)
                .await
                .map_err(|err| LinkHierarchyError::extraction(doc, err))?;
            link_set.attachments.extend(raw_attachment_names(&raw));
        }

        debug!(
            event = "suyuan.extractor.extracted",
            document = %doc,
            inlinks = link_set.inlinks.len(),
            outlinks = link_set.outlinks.len(),
            canvas_links = link_set.canvas_links.len(),
            attachments = link_set.attachments.len(),
            tags = link_set.tags.len(),
        );
        Ok(link_set)
    }

    async fn collect_inlinks(
        &self,
        doc: &DocumentId,
        link_set: &mut LinkSet,
    ) -> Result<(), LinkHierarchyError> {
        let index = self
            .store
            .resolved_link_index()
            .await
            .map_err(|err| LinkHierarchyError::extraction(doc, err))?;
        for (source, targets) in index.iter() {
            if !targets.contains_key(doc) {
                continue;
            }
            match self.store.document_kind(source) {
                DocumentKind::Canvas => link_set.canvas_links.insert(source.display_name()),
                _ => link_set.inlinks.insert(source.display_name()),
            };
        }
        Ok(())
    }

    fn collect_outlinks(&self, doc: &DocumentId, parsed: &ParsedLinks, link_set: &mut LinkSet) {
        let frontmatter_targets = parsed
            .frontmatter
            .as_ref()
            .map(frontmatter_link_targets)
            .unwrap_or_default();
        let references = parsed
            .links
            .iter()
            .map(|reference| reference.link.as_str())
            .chain(frontmatter_targets.iter().map(String::as_str));
        for raw in references {
            self.route_target(doc, raw, link_set);
        }
        for embed in &parsed.embeds {
            self.route_target(doc, &embed.link, link_set);
        }
    }

    fn route_target(&self, doc: &DocumentId, raw: &str, link_set: &mut LinkSet) {
        let Some(target) = self.store.resolve_document_by_name(raw, doc) else {
            return;
        };
        match self.store.document_kind(&target) {
            DocumentKind::Canvas => link_set.canvas_links.insert(target.display_name()),
            DocumentKind::Note => link_set.outlinks.insert(target.display_name()),
            DocumentKind::Attachment => link_set.attachments.insert(target.file_name()),
        };
    }

    async fn collect_canvas_references(
        &self,
        doc: &DocumentId,
        link_set: &mut LinkSet,
    ) -> Result<(), LinkHierarchyError> {
        let boards = self
            .store
            .list_canvas_boards()
            .await
            .map_err(|err| LinkHierarchyError::extraction(doc, err))?;
        let pattern = canvas_reference_regex(doc.display_name());
        for board in boards.iter().filter(|board| *board != doc) {
            let content = self
                .store
                .read_raw_content(board)
                .await
                .map_err(|err| LinkHierarchyError::extraction(doc, err))?;
            if pattern.is_match(&content) {
                link_set.canvas_links.insert(board.display_name());
            }
        }
        Ok(())
    }
}
