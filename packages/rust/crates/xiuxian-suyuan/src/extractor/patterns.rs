use crate::parser::compile_regex;
use regex::Regex;
use std::sync::LazyLock;

/// Extensions treated as binary attachments when referenced from raw content.
pub const ATTACHMENT_EXTENSIONS: &[&str] = &[
    // images
    "png", "jpg", "jpeg", "gif", "bmp", "svg", "webp", "avif", "ico", "tif", "tiff",
    // audio
    "mp3", "wav", "m4a", "ogg", "flac", "3gp",
    // video
    "mp4", "webm", "ogv", "mov", "mkv",
    // documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "odp", "epub",
    // archives
    "zip", "rar", "7z", "tar", "gz",
    // code
    "js", "ts", "py", "rs", "go", "java", "c", "cpp", "h", "css", "html", "sh", "json",
    "yaml", "yml", "toml", "sql",
];

static ATTACHMENT_REFERENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(&format!(
        r"(?i)!?\[\[([^\[\]|#\n]+\.(?:{}))(?:[#|][^\]\n]*)?\]\]",
        ATTACHMENT_EXTENSIONS.join("|")
    ))
});

/// Bracket references to attachments in raw text, as basenames with extension.
pub(crate) fn raw_attachment_names(content: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for caps in ATTACHMENT_REFERENCE_REGEX.captures_iter(content) {
        let Some(path) = caps.get(1) else {
            continue;
        };
        let path = path.as_str().trim().replace('\\', "/");
        let name = path.rsplit('/').next().unwrap_or(&path).to_string();
        if !name.is_empty() && !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

/// `name` as it appears inside a JSON string literal, without the quotes.
fn json_escaped(name: &str) -> String {
    serde_json::to_string(name)
        .ok()
        .and_then(|quoted| {
            quoted
                .strip_prefix('"')
                .and_then(|inner| inner.strip_suffix('"'))
                .map(str::to_string)
        })
        .unwrap_or_else(|| name.to_string())
}

/// `[[Name]]`, `[[Name#Header]]`, `[[Name|Alias]]` inside raw canvas JSON.
///
/// `Name` is matched literally in its JSON-escaped form, so names holding
/// quotes or backslashes still match the serialized board text.
pub(crate) fn canvas_reference_regex(display_name: &str) -> Regex {
    compile_regex(&format!(
        r"\[\[{}(#[^\]|]*)?(\|[^\]]*)?\]\]",
        regex::escape(&json_escaped(display_name))
    ))
}
