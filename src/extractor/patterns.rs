//! Pattern-based markup scanning.
//!
//! No DOM is built. Tags are located with cached regular expressions and
//! attributes are parsed out of the raw open-tag text, which keeps every
//! field extractor a pure `&str -> T` function.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Elements whose block regexes are compiled once and shared.
const CACHED_ELEMENTS: &[&str] = &[
    "title", "head", "p", "script", "style", "nav", "header", "footer", "noscript", "svg", "template",
    "label", "form", "a", "body", "iframe",
];

fn open_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<([a-z][a-z0-9:-]*)\b([^>]*)>").unwrap())
}

fn attribute_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)([^\s"'<>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .unwrap()
    })
}

fn comment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<!--.*?-->").unwrap())
}

fn any_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)</?[a-zA-Z!][^>]*>").unwrap())
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").unwrap())
}

fn whitespace_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn build_block_regex(name: &str) -> Regex {
    let name = regex::escape(name);
    Regex::new(&format!(r"(?is)<{name}\b([^>]*)>(.*?)</{name}\s*>")).unwrap()
}

fn block_regex(name: &str) -> Option<&'static Regex> {
    static CACHE: OnceLock<HashMap<&'static str, Regex>> = OnceLock::new();
    CACHE
        .get_or_init(|| {
            CACHED_ELEMENTS
                .iter()
                .map(|name| (*name, build_block_regex(name)))
                .collect()
        })
        .get(name)
}

/// Attributes of one open tag, names lowercased, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    pub fn parse(raw: &str) -> Self {
        let attrs = attribute_regex()
            .captures_iter(raw)
            .map(|caps| {
                let name = caps[1].to_ascii_lowercase();
                let value = caps
                    .get(2)
                    .or_else(|| caps.get(3))
                    .or_else(|| caps.get(4))
                    .map(|m| decode_entities(m.as_str()))
                    .unwrap_or_default();
                (name, value)
            })
            .collect();
        Self(attrs)
    }

    /// First value of `name`, trimmed.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.trim())
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    /// True when `name` holds `token` as one of its whitespace-separated,
    /// case-insensitive values (e.g. `rel="preload stylesheet"`).
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get(name)
            .map(|v| v.split_whitespace().any(|t| t.eq_ignore_ascii_case(token)))
            .unwrap_or(false)
    }

    pub fn value_eq(&self, name: &str, expected: &str) -> bool {
        self.get(name)
            .map(|v| v.eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    }
}

/// One open tag found in the markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub attrs: Attributes,
    pub offset: usize,
}

/// One paired element: its open-tag attributes and raw inner markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    pub attrs: Attributes,
    pub inner: &'a str,
    pub offset: usize,
}

/// Every open tag named `name` (case-insensitive), in document order.
pub fn open_tags<'a>(html: &'a str, name: &'a str) -> impl Iterator<Item = Tag> + 'a {
    open_tag_regex()
        .captures_iter(html)
        .filter(move |caps| caps[1].eq_ignore_ascii_case(name))
        .map(|caps| Tag {
            name: caps[1].to_ascii_lowercase(),
            attrs: Attributes::parse(&caps[2]),
            offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
        })
}

/// Every open tag regardless of name, in document order.
pub fn all_open_tags(html: &str) -> impl Iterator<Item = Tag> + '_ {
    open_tag_regex().captures_iter(html).map(|caps| Tag {
        name: caps[1].to_ascii_lowercase(),
        attrs: Attributes::parse(&caps[2]),
        offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
    })
}

/// Every `<name ...>...</name>` block, in document order. Nested blocks of
/// the same name close at the first closing tag.
pub fn elements<'a>(html: &'a str, name: &str) -> Vec<Element<'a>> {
    let collect = |re: &Regex| -> Vec<Element<'a>> {
        re.captures_iter(html)
            .map(|caps| Element {
                attrs: Attributes::parse(caps.get(1).map(|m| m.as_str()).unwrap_or("")),
                inner: caps.get(2).map(|m| m.as_str()).unwrap_or(""),
                offset: caps.get(0).map(|m| m.start()).unwrap_or(0),
            })
            .collect()
    };
    match block_regex(name) {
        Some(re) => collect(re),
        None => collect(&build_block_regex(name)),
    }
}

/// Removes every `<name>...</name>` block for each of `names`, in order.
pub fn remove_elements(html: &str, names: &[&str]) -> String {
    let mut out = comment_regex().replace_all(html, " ").into_owned();
    for name in names {
        out = match block_regex(name) {
            Some(re) => re.replace_all(&out, " ").into_owned(),
            None => build_block_regex(name).replace_all(&out, " ").into_owned(),
        };
    }
    out
}

/// Flattens a markup fragment into plain text: tags stripped, entities
/// decoded, whitespace collapsed and trimmed.
pub fn strip_tags(fragment: &str) -> String {
    let without_comments = comment_regex().replace_all(fragment, " ");
    let without_tags = any_tag_regex().replace_all(&without_comments, " ");
    collapse_whitespace(&decode_entities(&without_tags))
}

pub fn collapse_whitespace(text: &str) -> String {
    whitespace_regex().replace_all(text, " ").trim().to_string()
}

pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    entity_regex()
        .replace_all(text, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity.to_ascii_lowercase().as_str() {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    "ndash" => Some('-'),
                    "mdash" => Some('-'),
                    "hellip" => Some('…'),
                    "copy" => Some('©'),
                    "reg" => Some('®'),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Cuts `text` to at most `limit` characters on a char boundary.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
