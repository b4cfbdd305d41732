//! Cloze and input marker conventions
//!
//! Both work on the rendered front: every inline code span is a candidate.
//! A span already written as `cN::text` keeps its own number; others are
//! numbered in order of appearance. A span starting with `?` holds the
//! answer of an input card.

use std::sync::OnceLock;

use regex::{Captures, Regex};

fn code_span() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?s)<code>(.*?)</code>").expect("code span pattern"))
}

fn numbered_cloze() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^c\d+::").expect("cloze number pattern"))
}

/// Placeholder shown where an input card's answer is typed
pub const INPUT_BLANK: &str = "_____";

/// Rewrite code spans as cloze deletions; `None` when there are none
pub fn apply_cloze(front: &str) -> Option<String> {
    if !code_span().is_match(front) {
        return None;
    }
    let mut next = 1;
    let out = code_span().replace_all(front, |caps: &Captures| {
        let content = &caps[1];
        if numbered_cloze().is_match(content) {
            format!("{{{{{}}}}}", content)
        } else {
            let deletion = format!("{{{{c{}::{}}}}}", next, content);
            next += 1;
            deletion
        }
    });
    Some(out.into_owned())
}

/// Split an input card into its prompt and typed answer.
///
/// The first code span starting with `?` is replaced by a blank; `None`
/// when no span carries the marker.
pub fn apply_input(front: &str) -> Option<(String, String)> {
    let caps = code_span()
        .captures_iter(front)
        .find(|caps| caps[1].trim_start().starts_with('?'))?;
    let whole = caps.get(0)?;
    let answer = caps[1].trim_start().trim_start_matches('?').trim().to_string();

    let mut prompt = String::with_capacity(front.len());
    prompt.push_str(&front[..whole.start()]);
    prompt.push_str(INPUT_BLANK);
    prompt.push_str(&front[whole.end()..]);
    Some((prompt, answer))
}
