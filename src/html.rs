//! String-level HTML helpers used while assembling an item page.
//!
//! Nothing here parses HTML into a tree. Item bodies come from arbitrary
//! feeds and are passed through to the viewer mostly untouched, so the
//! transforms are targeted regex and substring rewrites.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::cache::DiskCache;

// ---------------------------------------------------------------------------
// Compiled regexes
// ---------------------------------------------------------------------------

fn re_img_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<img[^>]*>").unwrap())
}

// Attribute names must follow whitespace (or `/`), otherwise `data-src=`
// would match as `src=`.
fn re_src_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)[\s/]src\s*=\s*["']([^"']*)["']"#).unwrap())
}

fn re_video_preload() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(<video[^>]*)(preload=".*?")"#).unwrap())
}

fn re_protocol_relative_attr() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(?i)([\s/](?:src|href|poster)\s*=\s*")//"#).unwrap())
}

// ---------------------------------------------------------------------------
// Escaping
// ---------------------------------------------------------------------------

/// Escape text for embedding in element content or a double-quoted attribute.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Image links
// ---------------------------------------------------------------------------

/// Collect the `src` of every `<img>` tag, in document order.
///
/// Duplicates are kept. Tags without a `src` attribute are skipped.
pub fn extract_image_links(html: &str) -> Vec<String> {
    re_img_tag()
        .find_iter(html)
        .filter_map(|tag| {
            re_src_attr()
                .captures(tag.as_str())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Replace image URLs that are present in `cache` with `file://` paths.
///
/// Each link is trimmed and the trimmed form is used both as the cache key and
/// as the text that gets replaced. Every literal occurrence is rewritten, not
/// only the one inside the `<img>` tag. A failed lookup is logged and the
/// remote URL stays in place.
pub fn localize_images(html: &str, cache: &dyn DiskCache) -> String {
    let mut text = html.to_string();

    for link in extract_image_links(html) {
        let link = link.trim();
        if link.is_empty() {
            continue;
        }

        match cache.lookup(link) {
            Ok(Some(path)) => {
                let local = format!("file://{}", path.display());
                text = text.replace(link, &local);
            }
            Ok(None) => {
                tracing::trace!(url = link, "image not cached");
            }
            Err(err) => {
                tracing::warn!(url = link, error = %err, "image cache lookup failed; keeping remote url");
            }
        }
    }

    text
}

// ---------------------------------------------------------------------------
// Video preload
// ---------------------------------------------------------------------------

/// Force `preload="none"` on `<video>` tags so the viewer doesn't start
/// downloading media when the page opens.
///
/// Returns the input unchanged (borrowed) when there is no match.
pub fn strip_video_preload(html: &str) -> Cow<'_, str> {
    re_video_preload().replace_all(html, r#"${1}preload="none""#)
}

// ---------------------------------------------------------------------------
// Protocol-relative URLs
// ---------------------------------------------------------------------------

/// How `//host/path` URLs in the finished page are rewritten to `https://`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolFix {
    /// Every `"//` in the page becomes `"https://`, wherever it appears.
    #[default]
    Global,
    /// Only `src`, `href` and `poster` attribute values are rewritten.
    /// Prefixed names such as `data-src` are left alone.
    AttributesOnly,
    /// Leave the page alone.
    Off,
}

/// Apply the protocol-relative URL rewrite selected by `mode`.
pub fn fix_protocol_relative(page: String, mode: ProtocolFix) -> String {
    match mode {
        ProtocolFix::Global => page.replace("\"//", "\"https://"),
        ProtocolFix::AttributesOnly => re_protocol_relative_attr()
            .replace_all(&page, "${1}https://")
            .into_owned(),
        ProtocolFix::Off => page,
    }
}
