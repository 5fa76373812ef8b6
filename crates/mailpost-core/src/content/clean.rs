//! Targeted rewrites that make newsletter HTML safe to embed in a page.

use std::sync::OnceLock;

use regex::{Captures, NoExpand, Regex};

use super::compile;

/// Class of the outer table emitted by the newsletter template.
pub const CONTAINER_CLASS: &str = "nl-container";

/// Theme variable substituted for the container's background colour.
pub const BACKGROUND_VARIABLE: &str = "var(--wp--preset--color--background)";

const FORCED_TEXT_COLOR: &str = "color: #000000;";

fn anchor_open_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)<a\b[^>]*>"))
}

fn anchor_close_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)</a\s*>"))
}

fn tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?s)<[^>]*>"))
}

fn unsubscribe_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r"(?i)\bunsubscribe\b"))
}

/// Any opening tag carrying a class attribute.
fn classed_tag_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        compile(r#"(?i)<[a-z][a-z0-9]*\b[^>]*\bclass\s*=\s*(?:"([^"]*)"|'([^']*)')[^>]*>"#)
    })
}

fn style_attr_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r#"(?i)\bstyle\s*=\s*(?:"([^"]*)"|'([^']*)')"#))
}

fn background_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| compile(r#"(?i)background-color\s*:\s*[^;"']*;?"#))
}

/// Rewrites newsletter HTML for embedding.
///
/// Anchors whose visible text contains the word "unsubscribe" are removed
/// along with their text. On the [`CONTAINER_CLASS`] element, the inline
/// `background-color` becomes [`BACKGROUND_VARIABLE`] and a black text
/// colour is prepended to the style. Everything else passes through.
#[must_use]
pub fn clean_html(html: &str) -> String {
    let html = remove_unsubscribe_links(html);
    restyle_container(&html)
}

/// Anchors never nest, so an anchor opened before the current one closes
/// means the current one was left unclosed and is kept as is.
fn remove_unsubscribe_links(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut search = 0;

    while let Some(open) = anchor_open_regex().find_at(html, search) {
        let Some(close) = anchor_close_regex().find_at(html, open.end()) else {
            break;
        };
        if let Some(next) = anchor_open_regex().find_at(html, open.end())
            && next.start() < close.start()
        {
            search = next.start();
            continue;
        }

        let text = tag_regex().replace_all(&html[open.end()..close.start()], "");
        if unsubscribe_regex().is_match(&text) {
            out.push_str(&html[copied..open.start()]);
            copied = close.end();
        }
        search = close.end();
    }

    out.push_str(&html[copied..]);
    out
}

fn restyle_container(html: &str) -> String {
    classed_tag_regex()
        .replace_all(html, |caps: &Captures<'_>| {
            let tag = &caps[0];
            let classes = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            if classes.split_whitespace().any(|c| c == CONTAINER_CLASS) {
                rewrite_style(tag)
            } else {
                tag.to_string()
            }
        })
        .into_owned()
}

fn rewrite_style(tag: &str) -> String {
    let Some(caps) = style_attr_regex().captures(tag) else {
        let (head, tail) = if let Some(head) = tag.strip_suffix("/>") {
            (head.trim_end(), " />")
        } else {
            (&tag[..tag.len() - 1], ">")
        };
        return format!("{head} style=\"{FORCED_TEXT_COLOR}\"{tail}");
    };

    let (value, quote) = match (caps.get(1), caps.get(2)) {
        (Some(v), _) => (v.as_str(), '"'),
        (None, Some(v)) => (v.as_str(), '\''),
        (None, None) => ("", '"'),
    };

    let replacement = format!("background-color: {BACKGROUND_VARIABLE};");
    let value = background_regex().replace_all(value, NoExpand(&replacement));
    let value = value.trim();
    let style = if value.is_empty() {
        format!("style={quote}{FORCED_TEXT_COLOR}{quote}")
    } else {
        format!("style={quote}{FORCED_TEXT_COLOR} {value}{quote}")
    };

    let Some(whole) = caps.get(0) else {
        return tag.to_string();
    };
    format!("{}{style}{}", &tag[..whole.start()], &tag[whole.end()..])
}
