//! Markdown and canvas parsing into [`ParsedLinks`].
//!
//! Markdown links and images come from the comrak AST. Wikilinks, inline tags
//! and frontmatter links are matched with regexes over code-stripped text.

mod canvas;
mod content;
mod links;
mod paths;

pub use canvas::parse_canvas;
pub use content::{frontmatter_link_targets, frontmatter_tags};
pub use paths::strip_link_subpath;

pub(crate) use content::compile_regex;
pub(crate) use paths::join_relative;

use crate::models::ParsedLinks;

/// Parse one markdown note.
#[must_use]
pub fn parse_note(content: &str) -> ParsedLinks {
    let (frontmatter, body) = content::parse_frontmatter(content);
    let stripped = content::strip_code(body);
    let extracted = links::extract_links(body, &stripped);
    ParsedLinks {
        links: extracted.links,
        embeds: extracted.embeds,
        frontmatter,
        tags: content::extract_inline_tags(&stripped),
    }
}
