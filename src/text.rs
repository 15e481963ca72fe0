use std::sync::LazyLock;

use regex::{Captures, Regex};

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*(>|$)").unwrap());
static RE_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[a-zA-Z]+);").unwrap());
static RE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Turn GLPI rich-text task content into plain text.
///
/// GLPI stores task content HTML-escaped, so tags can survive one round of
/// entity decoding. Tags are stripped on both sides of the decode.
pub fn strip_html(s: &str) -> String {
    let without_tags = RE_TAG.replace_all(s, " ");
    let decoded = decode_entities(&without_tags);
    let without_tags = RE_TAG.replace_all(&decoded, " ");
    RE_SPACE.replace_all(&without_tags, " ").trim().to_string()
}

fn decode_entities(s: &str) -> String {
    RE_ENTITY
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                _ => numeric_entity(name),
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn numeric_entity(name: &str) -> Option<char> {
    let digits = name.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse().ok()?,
    };
    char::from_u32(code)
}
