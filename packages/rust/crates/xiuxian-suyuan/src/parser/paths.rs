pub(crate) fn normalize_slashes(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Drop `|alias` and `#header` / `#^block` suffixes from a link path.
#[must_use]
pub fn strip_link_subpath(raw: &str) -> &str {
    let without_alias = raw.split_once('|').map_or(raw, |(left, _)| left);
    let without_header = without_alias
        .split_once('#')
        .map_or(without_alias, |(left, _)| left);
    without_header.trim()
}

/// Join a relative link (`./x`, `../x`) onto a folder, collapsing dot segments.
pub(crate) fn join_relative(base_dir: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = base_dir
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    for segment in relative.split('/') {
        let cleaned = segment.trim();
        if cleaned.is_empty() || cleaned == "." {
            continue;
        }
        if cleaned == ".." {
            parts.pop();
            continue;
        }
        parts.push(cleaned);
    }
    parts.join("/")
}

pub(crate) fn is_external_target(raw: &str) -> bool {
    let lower = raw.trim().to_lowercase();
    lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:")
        || lower.starts_with("javascript:")
        || lower.starts_with("obsidian:")
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Decode `%XX` escapes in markdown link destinations (`Note%20A.md`).
pub(crate) fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%'
            && idx + 2 < bytes.len()
            && let (Some(high), Some(low)) = (hex_value(bytes[idx + 1]), hex_value(bytes[idx + 2]))
        {
            out.push(high * 16 + low);
            idx += 3;
            continue;
        }
        out.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8(out).unwrap_or_else(|_| raw.to_string())
}
