use super::corpus::Corpus;
use super::{DocumentStore, StoreError};
use crate::models::{DocumentId, DocumentKind, ParsedLinks, ResolvedLinkIndex};
use crate::parser::{parse_canvas, parse_note};
use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory corpus for hosts that already hold their documents, and for tests.
///
/// Notes and canvas boards are parsed on insert. Mutations invalidate the
/// resolved link index but never touch any link cache built on top.
#[derive(Debug, Default)]
pub struct MemoryStore {
    corpus: RwLock<Corpus>,
}

impl MemoryStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Corpus> {
        self.corpus.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace a document; notes and canvas boards are parsed by
    /// kind, anything else is kept as an attachment.
    pub fn insert(&self, path: impl AsRef<str>, content: impl Into<String>) -> DocumentId {
        let doc = DocumentId::new(path);
        let content = content.into();
        let parsed = match doc.kind() {
            DocumentKind::Note => Some(parse_note(&content)),
            DocumentKind::Canvas => Some(parse_canvas(&content)),
            DocumentKind::Attachment => None,
        };
        self.write().insert(doc.clone(), parsed, Some(content));
        doc
    }

    /// Insert a binary attachment with no readable content.
    pub fn insert_attachment(&self, path: impl AsRef<str>) -> DocumentId {
        let doc = DocumentId::new(path);
        self.write().insert(doc.clone(), None, None);
        doc
    }

    /// Insert a document with host-supplied metadata instead of parsing.
    pub fn insert_parsed(
        &self,
        path: impl AsRef<str>,
        parsed: ParsedLinks,
        raw: impl Into<String>,
    ) -> DocumentId {
        let doc = DocumentId::new(path);
        self.write()
            .insert(doc.clone(), Some(parsed), Some(raw.into()));
        doc
    }

    /// Remove a document; returns `false` when it was unknown.
    pub fn remove(&self, doc: &DocumentId) -> bool {
        self.write().remove(doc)
    }

    /// Whether the document exists.
    #[must_use]
    pub fn contains(&self, doc: &DocumentId) -> bool {
        self.read().contains(doc)
    }

    /// Number of documents, attachments included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn resolve_document_by_name(&self, name: &str, context: &DocumentId) -> Option<DocumentId> {
        self.read().resolve(name, context)
    }

    async fn resolved_link_index(&self) -> Result<Arc<ResolvedLinkIndex>, StoreError> {
        Ok(self.read().link_index())
    }

    async fn parsed_links(&self, doc: &DocumentId) -> Result<Option<ParsedLinks>, StoreError> {
        self.read().parsed(doc)
    }

    async fn read_raw_content(&self, doc: &DocumentId) -> Result<String, StoreError> {
        self.read().raw(doc)
    }

    async fn list_canvas_boards(&self) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self.read().canvas_boards())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self.read().documents())
    }
}
