//! Document store boundary consumed by the link extractor.
//!
//! The store owns documents, name resolution and the corpus-wide resolved
//! link index. Two implementations ship with the crate: [`MemoryStore`] for
//! embedding and tests, and [`VaultStore`] for a directory of markdown notes
//! and canvas boards.

mod corpus;
mod memory;
mod vault;

pub use memory::MemoryStore;
pub use vault::VaultStore;

use crate::models::{DocumentId, DocumentKind, ParsedLinks, ResolvedLinkIndex};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Document is not part of the corpus.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Reading a file from disk failed.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that could not be read.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Backend-specific failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Read-only view of the host corpus.
///
/// Every call is fallible except name resolution, where a miss is `None`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Resolve a link target (`Note A`, `notes/Note A.md`, `../x`) to a
    /// document, relative to `context`. First match wins.
    fn resolve_document_by_name(&self, name: &str, context: &DocumentId) -> Option<DocumentId>;

    /// Corpus-wide resolved link index: source → target → link count.
    async fn resolved_link_index(&self) -> Result<Arc<ResolvedLinkIndex>, StoreError>;

    /// Pre-parsed links, embeds, frontmatter and tags; `None` when the store
    /// has no metadata for the document.
    async fn parsed_links(&self, doc: &DocumentId) -> Result<Option<ParsedLinks>, StoreError>;

    /// Raw text content.
    async fn read_raw_content(&self, doc: &DocumentId) -> Result<String, StoreError>;

    /// Every canvas board in the corpus.
    async fn list_canvas_boards(&self) -> Result<Vec<DocumentId>, StoreError>;

    /// Every note and canvas board in the corpus.
    async fn list_documents(&self) -> Result<Vec<DocumentId>, StoreError>;

    /// Document kind; derived from the extension unless overridden.
    fn document_kind(&self, doc: &DocumentId) -> DocumentKind {
        doc.kind()
    }
}
