use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

static FRONTMATTER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?s)\A---\s*\n(.*?)\n(?:---|\.\.\.)\s*(?:\n|\z)"));

static INLINE_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"`[^`\n]*`"));

static INLINE_TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(?m)(?:^|\s)#([\p{L}\p{N}_/\-]+)"));

static BRACKET_LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\[\[([^\[\]\n]+?)\]\]"));

/// Split a `---` YAML block off the top of a note and convert it to JSON.
pub(super) fn parse_frontmatter(content: &str) -> (Option<Value>, &str) {
    let Some(caps) = FRONTMATTER_REGEX.captures(content) else {
        return (None, content);
    };
    let body = caps.get(0).map_or(content, |m| &content[m.end()..]);
    let parsed = caps
        .get(1)
        .and_then(|m| serde_yaml::from_str::<serde_yaml::Value>(m.as_str()).ok())
        .and_then(|yaml| serde_json::to_value(yaml).ok())
        .filter(|value| !value.is_null());
    (parsed, body)
}

/// Blank out fenced code blocks and inline code spans.
pub(super) fn strip_code(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut in_code_fence = false;
    for line in body.lines() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_fence = !in_code_fence;
            out.push('\n');
            continue;
        }
        if !in_code_fence {
            out.push_str(&INLINE_CODE_REGEX.replace_all(line, " "));
        }
        out.push('\n');
    }
    out
}

fn normalize_tag(raw: &str) -> Option<String> {
    let cleaned = raw.trim().trim_start_matches('#').trim();
    if cleaned.is_empty() || cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(cleaned.to_string())
}

/// Inline `#tags` from code-stripped body text.
pub(super) fn extract_inline_tags(stripped_body: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in INLINE_TAG_REGEX.captures_iter(stripped_body) {
        let Some(tag) = caps.get(1).and_then(|m| normalize_tag(m.as_str())) else {
            continue;
        };
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// Tags declared in frontmatter: single string (comma separated) or a list.
#[must_use]
pub fn frontmatter_tags(frontmatter: Option<&Value>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let Some(tags_val) = frontmatter.and_then(|value| value.get("tags")) else {
        return out;
    };
    let mut push = |raw: &str| {
        if let Some(tag) = normalize_tag(raw)
            && !out.contains(&tag)
        {
            out.push(tag);
        }
    };
    match tags_val {
        Value::String(single) => single.split(',').for_each(&mut push),
        Value::Array(items) => {
            for item in items {
                if let Some(tag) = item.as_str() {
                    push(tag);
                }
            }
        }
        _ => {}
    }
    out
}

/// Bracket-link targets found anywhere in serialized frontmatter.
///
/// Returned paths are raw (`Note#Header|Alias` is kept intact); callers strip
/// subpath and alias before resolution.
#[must_use]
pub fn frontmatter_link_targets(frontmatter: &Value) -> Vec<String> {
    let Ok(serialized) = serde_json::to_string(frontmatter) else {
        return Vec::new();
    };
    BRACKET_LINK_REGEX
        .captures_iter(&serialized)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|target| !target.is_empty())
        .collect()
}
