use crate::models::{DocumentId, DocumentKind, NOTE_EXTENSIONS, ParsedLinks, ResolvedLinkIndex};
use crate::parser::{frontmatter_link_targets, join_relative, strip_link_subpath};
use crate::store::StoreError;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

#[derive(Debug, Clone)]
struct CorpusEntry {
    parsed: Option<ParsedLinks>,
    raw: Option<String>,
}

/// Document table shared by the bundled stores.
///
/// Holds parsed metadata per document, resolves link names, and memoizes the
/// resolved link index until the next mutation.
#[derive(Debug, Default)]
pub(crate) struct Corpus {
    entries: BTreeMap<DocumentId, CorpusEntry>,
    link_index: OnceLock<Arc<ResolvedLinkIndex>>,
}

impl Corpus {
    pub(crate) fn insert(
        &mut self,
        doc: DocumentId,
        parsed: Option<ParsedLinks>,
        raw: Option<String>,
    ) {
        self.entries.insert(doc, CorpusEntry { parsed, raw });
        self.link_index = OnceLock::new();
    }

    pub(crate) fn remove(&mut self, doc: &DocumentId) -> bool {
        let removed = self.entries.remove(doc).is_some();
        if removed {
            self.link_index = OnceLock::new();
        }
        removed
    }

    pub(crate) fn replace_all(&mut self, other: Self) {
        self.entries = other.entries;
        self.link_index = OnceLock::new();
    }

    pub(crate) fn contains(&self, doc: &DocumentId) -> bool {
        self.entries.contains_key(doc)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn parsed(&self, doc: &DocumentId) -> Result<Option<ParsedLinks>, StoreError> {
        self.entries
            .get(doc)
            .map(|entry| entry.parsed.clone())
            .ok_or_else(|| StoreError::NotFound(doc.clone()))
    }

    pub(crate) fn raw(&self, doc: &DocumentId) -> Result<String, StoreError> {
        let entry = self
            .entries
            .get(doc)
            .ok_or_else(|| StoreError::NotFound(doc.clone()))?;
        Ok(entry.raw.clone().unwrap_or_default())
    }

    pub(crate) fn documents(&self) -> Vec<DocumentId> {
        self.entries
            .keys()
            .filter(|doc| doc.kind().is_document())
            .cloned()
            .collect()
    }

    pub(crate) fn canvas_boards(&self) -> Vec<DocumentId> {
        self.entries
            .keys()
            .filter(|doc| doc.kind() == DocumentKind::Canvas)
            .cloned()
            .collect()
    }

    fn lookup_path(&self, path: &str) -> Option<DocumentId> {
        let id = DocumentId::new(path);
        if self.entries.contains_key(&id) {
            return Some(id);
        }
        let lower = id.as_str().to_lowercase();
        self.entries
            .keys()
            .find(|candidate| candidate.as_str().to_lowercase() == lower)
            .cloned()
    }

    fn lookup_exact(&self, path: &str) -> Option<DocumentId> {
        self.lookup_path(path).or_else(|| {
            NOTE_EXTENSIONS
                .iter()
                .find_map(|ext| self.lookup_path(&format!("{path}.{ext}")))
        })
    }

    fn lookup_suffix(&self, target: &str, context: &DocumentId) -> Option<DocumentId> {
        let lower = target.to_lowercase();
        let names: Vec<String> = std::iter::once(lower.clone())
            .chain(NOTE_EXTENSIONS.iter().map(|ext| format!("{lower}.{ext}")))
            .collect();
        let context_dir = context.parent_dir();
        self.entries
            .keys()
            .filter(|candidate| {
                let path = candidate.as_str().to_lowercase();
                names.iter().any(|name| {
                    path == *name
                        || path
                            .strip_suffix(name.as_str())
                            .is_some_and(|prefix| prefix.ends_with('/'))
                })
            })
            .min_by(|left, right| rank_candidates(left, right, context_dir))
            .cloned()
    }

    /// Resolve a link target relative to `context`.
    ///
    /// Order: explicit relative path, exact vault path (bare or with a note
    /// extension), path under the context folder, then basename or path suffix.
    /// Suffix matches prefer the context folder, then the shortest path, then
    /// lexicographic order.
    pub(crate) fn resolve(&self, name: &str, context: &DocumentId) -> Option<DocumentId> {
        let normalized = strip_link_subpath(name).replace('\\', "/");
        let target = normalized.trim_start_matches('/');
        if target.is_empty() {
            return None;
        }
        if target.starts_with("./") || target.starts_with("../") {
            return self.lookup_exact(&join_relative(context.parent_dir(), target));
        }
        if let Some(found) = self.lookup_exact(target) {
            return Some(found);
        }
        let context_dir = context.parent_dir();
        if target.contains('/')
            && !context_dir.is_empty()
            && let Some(found) = self.lookup_exact(&join_relative(context_dir, target))
        {
            return Some(found);
        }
        self.lookup_suffix(target, context)
    }

    fn build_link_index(&self) -> ResolvedLinkIndex {
        let mut index = ResolvedLinkIndex::new();
        for (source, entry) in &self.entries {
            let Some(parsed) = entry.parsed.as_ref() else {
                continue;
            };
            let frontmatter_targets = parsed
                .frontmatter
                .as_ref()
                .map(frontmatter_link_targets)
                .unwrap_or_default();
            let targets = parsed
                .links
                .iter()
                .chain(parsed.embeds.iter())
                .map(|reference| reference.link.as_str())
                .chain(frontmatter_targets.iter().map(String::as_str));
            for raw in targets {
                let Some(target) = self.resolve(raw, source) else {
                    continue;
                };
                *index
                    .entry(source.clone())
                    .or_default()
                    .entry(target)
                    .or_insert(0) += 1;
            }
        }
        index
    }

    pub(crate) fn link_index(&self) -> Arc<ResolvedLinkIndex> {
        Arc::clone(
            self.link_index
                .get_or_init(|| Arc::new(self.build_link_index())),
        )
    }
}

fn rank_candidates(left: &DocumentId, right: &DocumentId, context_dir: &str) -> Ordering {
    let left_away = left.parent_dir() != context_dir;
    let right_away = right.parent_dir() != context_dir;
    left_away
        .cmp(&right_away)
        .then_with(|| left.as_str().len().cmp(&right.as_str().len()))
        .then_with(|| left.as_str().cmp(right.as_str()))
}
