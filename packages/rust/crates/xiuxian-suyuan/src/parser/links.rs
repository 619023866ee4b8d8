use comrak::{Arena, Options, nodes::NodeValue, parse_document};
use regex::Regex;
use std::sync::LazyLock;

use super::content::compile_regex;
use super::paths::{is_external_target, normalize_slashes, percent_decode};
use crate::models::LinkReference;

static WIKILINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(!?)\[\[([^\[\]\n]+?)\]\]"));

#[derive(Debug, Default)]
pub(super) struct ExtractedLinks {
    pub(super) links: Vec<LinkReference>,
    pub(super) embeds: Vec<LinkReference>,
}

impl ExtractedLinks {
    fn push(&mut self, embed: bool, reference: LinkReference) {
        let bucket = if embed {
            &mut self.embeds
        } else {
            &mut self.links
        };
        if !bucket.contains(&reference) {
            bucket.push(reference);
        }
    }
}

fn wikilink_reference(inner: &str) -> Option<LinkReference> {
    let (link, display) = match inner.split_once('|') {
        Some((link, alias)) => {
            let alias = alias.trim();
            (link, (!alias.is_empty()).then(|| alias.to_string()))
        }
        None => (inner, None),
    };
    let link = normalize_slashes(link.trim());
    if link.is_empty() {
        return None;
    }
    Some(LinkReference { link, display })
}

fn markdown_reference(url: &str) -> Option<LinkReference> {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') || is_external_target(trimmed) {
        return None;
    }
    let decoded = normalize_slashes(&percent_decode(trimmed));
    if decoded.is_empty() {
        return None;
    }
    Some(LinkReference::new(decoded))
}

fn extract_wikilinks(stripped_body: &str, out: &mut ExtractedLinks) {
    for caps in WIKILINK_REGEX.captures_iter(stripped_body) {
        let embed = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let Some(reference) = caps.get(2).and_then(|m| wikilink_reference(m.as_str())) else {
            continue;
        };
        out.push(embed, reference);
    }
}

fn extract_markdown_links_with_comrak(body: &str, out: &mut ExtractedLinks) {
    let options = Options::default();
    let arena = Arena::new();
    let root_node = parse_document(&arena, body, &options);

    for node in root_node.descendants() {
        let (embed, reference) = match &node.data().value {
            NodeValue::Link(link) => (false, markdown_reference(&link.url)),
            NodeValue::Image(link) => (true, markdown_reference(&link.url)),
            _ => continue,
        };
        if let Some(reference) = reference {
            out.push(embed, reference);
        }
    }
}

/// Wikilinks come from the code-stripped body; markdown links and images come
/// from the comrak AST, which already ignores code.
pub(super) fn extract_links(body: &str, stripped_body: &str) -> ExtractedLinks {
    let mut out = ExtractedLinks::default();
    extract_wikilinks(stripped_body, &mut out);
    extract_markdown_links_with_comrak(body, &mut out);
    out
}
