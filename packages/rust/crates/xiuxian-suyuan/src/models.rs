//! Shared models for link extraction, caching and hierarchy traversal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

pub(crate) const NOTE_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];
const CANVAS_EXTENSION: &str = "canvas";

/// Stable vault-relative path of a note, canvas board or attachment.
///
/// Identifiers always use `/` separators and never carry a leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Build an identifier from a raw vault path.
    #[must_use]
    pub fn new(path: impl AsRef<str>) -> Self {
        let normalized = path.as_ref().trim().replace('\\', "/");
        Self(normalized.trim_start_matches('/').to_string())
    }

    /// Raw path string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basename including extension (`Note A.md`).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Human-readable name: basename without extension (`Note A`).
    #[must_use]
    pub fn display_name(&self) -> &str {
        let file_name = self.file_name();
        match file_name.rsplit_once('.') {
            Some((stem, _ext)) if !stem.is_empty() => stem,
            _ => file_name,
        }
    }

    /// Lowercased extension without the dot.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        let file_name = self.file_name();
        let (stem, ext) = file_name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }

    /// Folder part of the path (empty for vault-root documents).
    #[must_use]
    pub fn parent_dir(&self) -> &str {
        self.0.rsplit_once('/').map_or("", |(dir, _)| dir)
    }

    /// Kind derived from the extension.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_extension(self.extension().as_deref())
    }
}

impl Display for DocumentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DocumentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Document type as seen by the link extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// Markdown note.
    Note,
    /// Freeform canvas board (`.canvas`).
    Canvas,
    /// Any other file (image, audio, pdf, ...).
    Attachment,
}

impl DocumentKind {
    /// Classify a lowercased extension.
    #[must_use]
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext {
            None => Self::Note,
            Some(ext) if NOTE_EXTENSIONS.contains(&ext) => Self::Note,
            Some(CANVAS_EXTENSION) => Self::Canvas,
            Some(_) => Self::Attachment,
        }
    }

    /// Whether this kind is a linkable document (note or canvas board).
    #[must_use]
    pub const fn is_document(self) -> bool {
        matches!(self, Self::Note | Self::Canvas)
    }
}

/// Insertion-ordered set of display names.
///
/// Order is extraction order, which keeps traversal output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NameSet(Vec<String>);

impl NameSet {
    /// Empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a name; returns `false` when it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() || self.0.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    /// Whether the name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|item| item == name)
    }

    /// Number of names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    /// Names as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a NameSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

impl<S: Into<String>> Extend<S> for NameSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name);
        }
    }
}

/// Per-document link sets produced by the link extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkSet {
    /// Documents whose links resolve to this document.
    pub inlinks: NameSet,
    /// Notes this document links to or embeds.
    pub outlinks: NameSet,
    /// Canvas boards linked from, linking to, or mentioning this document.
    pub canvas_links: NameSet,
    /// Binary attachments (basename with extension).
    pub attachments: NameSet,
    /// Inline and frontmatter tags, without the leading `#`.
    pub tags: NameSet,
}

impl LinkSet {
    /// Whether the document has no links, attachments or tags at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inlinks.is_empty()
            && self.outlinks.is_empty()
            && self.canvas_links.is_empty()
            && self.attachments.is_empty()
            && self.tags.is_empty()
    }
}

/// One link or embed as written in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkReference {
    /// Link path, possibly with a `#header` subpath (alias already removed).
    pub link: String,
    /// Alias text after `|`, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl LinkReference {
    /// Reference without alias.
    #[must_use]
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            display: None,
        }
    }

    /// Link path with the `#header` subpath removed.
    #[must_use]
    pub fn target(&self) -> &str {
        crate::parser::strip_link_subpath(&self.link)
    }
}

/// Pre-parsed per-document metadata supplied by the document store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedLinks {
    /// Regular links from the main content.
    #[serde(default)]
    pub links: Vec<LinkReference>,
    /// Embeds (`![[...]]`, markdown images).
    #[serde(default)]
    pub embeds: Vec<LinkReference>,
    /// Frontmatter block, loosely typed.
    #[serde(default)]
    pub frontmatter: Option<serde_json::Value>,
    /// Inline tags from content, without the leading `#`.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Corpus-wide resolved link index: source → (target → link count).
pub type ResolvedLinkIndex = BTreeMap<DocumentId, BTreeMap<DocumentId, usize>>;
