//! Plain-text conversion and newline handling for card sides

use std::sync::OnceLock;

use regex::Regex;

struct TextPatterns {
    script: Regex,
    style: Regex,
    comment: Regex,
    block: Regex,
    tag: Regex,
    numeric_entity: Regex,
    hex_entity: Regex,
    spaces: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static TextPatterns {
    static PATTERNS: OnceLock<TextPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TextPatterns {
        script: Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("script pattern"),
        style: Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("style pattern"),
        comment: Regex::new(r"(?s)<!--.*?-->").expect("comment pattern"),
        block: Regex::new(
            r"(?i)</?(div|p|br|h[1-6]|li|ul|ol|tr|blockquote|figure|details|summary|pre|hr)[^>]*>",
        )
        .expect("block pattern"),
        tag: Regex::new(r"<[^>]+>").expect("tag pattern"),
        numeric_entity: Regex::new(r"&#(\d+);").expect("numeric entity pattern"),
        hex_entity: Regex::new(r"&#x([0-9a-fA-F]+);").expect("hex entity pattern"),
        spaces: Regex::new(r"[ \t]+").expect("space pattern"),
        blank_lines: Regex::new(r"\n\s*\n+").expect("blank line pattern"),
    })
}

/// Reduce rendered card markup to readable plain text.
///
/// Block elements become line breaks, remaining tags are stripped,
/// entities decoded and whitespace collapsed.
pub fn markup_to_text(markup: &str) -> String {
    let p = patterns();
    let mut text = p.script.replace_all(markup, "").to_string();
    text = p.style.replace_all(&text, "").to_string();
    text = p.comment.replace_all(&text, "").to_string();
    text = p.block.replace_all(&text, "\n").to_string();
    text = p.tag.replace_all(&text, "").to_string();

    text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&#x27;", "'");

    text = p
        .numeric_entity
        .replace_all(&text, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_default()
        })
        .to_string();
    text = p
        .hex_entity
        .replace_all(&text, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_default()
        })
        .to_string();
    // last, so "&amp;lt;" decodes to "&lt;" and not "<"
    text = text.replace("&amp;", "&");

    text = p.spaces.replace_all(&text, " ").to_string();
    text = p.blank_lines.replace_all(&text, "\n").to_string();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Turn literal newlines into line breaks when the policy asks for it
pub fn preserve_newlines(text: &str, enabled: bool) -> String {
    if enabled {
        text.replace("\r\n", "\n").replace('\n', "<br />")
    } else {
        text.to_string()
    }
}
