use serde::Deserialize;

use super::paths::normalize_slashes;
use crate::models::{DocumentId, LinkReference, ParsedLinks};

#[derive(Debug, Default, Deserialize)]
struct CanvasDocument {
    #[serde(default)]
    nodes: Vec<CanvasNode>,
}

#[derive(Debug, Deserialize)]
struct CanvasNode {
    #[serde(rename = "type", default)]
    node_type: String,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    subpath: Option<String>,
}

/// File nodes of a `.canvas` board become its links; attachment files become
/// embeds. Text nodes are left to the raw-content scan. Invalid JSON yields an
/// empty result.
#[must_use]
pub fn parse_canvas(content: &str) -> ParsedLinks {
    let board: CanvasDocument = serde_json::from_str(content).unwrap_or_default();
    let mut parsed = ParsedLinks::default();
    for node in board.nodes {
        if node.node_type != "file" {
            continue;
        }
        let Some(file) = node.file.map(|raw| normalize_slashes(raw.trim())) else {
            continue;
        };
        if file.is_empty() {
            continue;
        }
        let is_document = DocumentId::new(&file).kind().is_document();
        let link = match node.subpath.as_deref().map(str::trim) {
            Some(subpath) if subpath.starts_with('#') => format!("{file}{subpath}"),
            _ => file,
        };
        let reference = LinkReference::new(link);
        let bucket = if is_document {
            &mut parsed.links
        } else {
            &mut parsed.embeds
        };
        if !bucket.contains(&reference) {
            bucket.push(reference);
        }
    }
    parsed
}
