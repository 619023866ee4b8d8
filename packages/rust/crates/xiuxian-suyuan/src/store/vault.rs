use super::corpus::Corpus;
use super::{DocumentStore, StoreError};
use crate::models::{DocumentId, DocumentKind, ParsedLinks, ResolvedLinkIndex};
use crate::parser::{parse_canvas, parse_note};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::{debug, info};
use walkdir::WalkDir;

const DEFAULT_EXCLUDED_DIR_NAMES: &[&str] = &[
    ".git",
    ".cache",
    ".obsidian",
    ".trash",
    ".venv",
    "venv",
    "target",
    "node_modules",
];

fn relative_doc_id(path: &Path, root: &Path) -> Option<DocumentId> {
    let relative = path.strip_prefix(root).ok()?;
    let value = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<String>>()
        .join("/");
    if value.is_empty() {
        return None;
    }
    Some(DocumentId::new(value))
}

fn should_skip_entry(path: &Path, is_dir: bool, root: &Path) -> bool {
    if !is_dir || path == root {
        return false;
    }
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
        return false;
    };
    name.starts_with('.') || DEFAULT_EXCLUDED_DIR_NAMES.contains(&name.as_str())
}

fn parse_by_kind(kind: DocumentKind, content: &str) -> Option<ParsedLinks> {
    match kind {
        DocumentKind::Note => Some(parse_note(content)),
        DocumentKind::Canvas => Some(parse_canvas(content)),
        DocumentKind::Attachment => None,
    }
}

fn scan_vault(root: &Path) -> Result<Corpus, StoreError> {
    let mut corpus = Corpus::default();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !should_skip_entry(entry.path(), entry.file_type().is_dir(), root))
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(doc) = relative_doc_id(path, root) else {
            continue;
        };
        if doc.file_name().starts_with('.') {
            continue;
        }
        let kind = doc.kind();
        let parsed = if kind.is_document() {
            let content = std::fs::read_to_string(path).map_err(|source| StoreError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            parse_by_kind(kind, &content)
        } else {
            None
        };
        corpus.insert(doc, parsed, None);
    }
    Ok(corpus)
}

/// Filesystem vault: a directory of markdown notes, `.canvas` boards and
/// attachments.
///
/// Metadata is parsed once on [`VaultStore::open`] and on
/// [`VaultStore::rescan`]; raw content is always read fresh from disk.
#[derive(Debug)]
pub struct VaultStore {
    root: PathBuf,
    corpus: RwLock<Corpus>,
}

impl VaultStore {
    /// Index every document under `root`, skipping hidden and build folders.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when the root is missing or a note cannot
    /// be read.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        std::fs::metadata(&root).map_err(|source| StoreError::Read {
            path: root.clone(),
            source,
        })?;
        let corpus = scan_vault(&root)?;
        info!(
            event = "suyuan.vault.opened",
            root = %root.display(),
            documents = corpus.len(),
            "vault indexed"
        );
        Ok(Self {
            root,
            corpus: RwLock::new(corpus),
        })
    }

    /// Vault root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of indexed files, attachments included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the vault has no indexed files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Re-walk the vault and replace the index.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when a note cannot be read.
    pub fn rescan(&self) -> Result<usize, StoreError> {
        let corpus = scan_vault(&self.root)?;
        let count = corpus.len();
        self.corpus
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_all(corpus);
        debug!(event = "suyuan.vault.rescanned", documents = count);
        Ok(count)
    }

    fn read(&self) -> RwLockReadGuard<'_, Corpus> {
        self.corpus.read().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for VaultStore {
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
        let known = self.read().contains(doc);
        if !known {
            return Err(StoreError::NotFound(doc.clone()));
        }
        let path = self.root.join(doc.as_str());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| StoreError::Read { path, source })
    }

    async fn list_canvas_boards(&self) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self.read().canvas_boards())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>, StoreError> {
        Ok(self.read().documents())
    }
}
