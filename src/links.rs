//! Link normalization between raw source paths and public URLs.
//!
//! The scan stage records raw paths exactly as they sit on disk:
//!
//! ```text
//! /001-guide/README.md
//! /001-guide/002-getting-started.md
//! ```
//!
//! Readers see two derived forms:
//!
//! | raw                              | user link                | full path                      |
//! |----------------------------------|--------------------------|--------------------------------|
//! | `/001-guide/README.md`           | `/guide/`                | `/guide/README`                |
//! | `/001-guide/002-getting-started.md` | `/guide/getting-started` | `/guide/getting-started`    |
//!
//! Both forms are URL-encoded and rank-stripped unless display-rank mode is
//! on. Applying either function to its own output returns it unchanged.

use crate::naming::{is_index_file, link_segment};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Bytes escaped in path links. `%` is left alone so encoding is idempotent.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Encode a request path the way route patterns are encoded.
pub fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Drop a trailing `.md` (any case) from a path.
fn strip_md_extension(path: &str) -> &str {
    let len = path.len();
    if len >= 3 && path.is_char_boundary(len - 3) && path[len - 3..].eq_ignore_ascii_case(".md") {
        &path[..len - 3]
    } else {
        path
    }
}

/// Full resolved path: extension stripped, encoded, rank-stripped per segment.
///
/// Ranks are stripped until none remain, so `/001-2020-review.md` becomes
/// `/review`.
///
/// Index files keep their explicit segment: `/001-guide/README.md` becomes
/// `/guide/README`.
pub fn link_path(origin: &str, display_rank: bool) -> String {
    let encoded = encode_path(strip_md_extension(origin));
    if display_rank {
        return encoded;
    }
    encoded
        .split('/')
        .map(link_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Canonical user path: like [`link_path`] but an index file collapses to
/// its directory with a trailing slash.
pub fn user_link(origin: &str, display_rank: bool) -> String {
    match origin.rsplit_once('/') {
        Some((parent, filename)) if is_index_file(filename) => {
            link_path(&format!("{parent}/"), display_rank)
        }
        _ => link_path(origin, display_rank),
    }
}

/// Where the Markdown source of a page is served from: `/{lang}{origin}`.
pub fn md_path(origin: &str, lang: Option<&str>) -> String {
    match lang {
        Some(lang) if !lang.is_empty() => format!("/{lang}{origin}"),
        _ => origin.to_string(),
    }
}

/// Uppercase the first character when it is a word character.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphanumeric() || first == '_' => {
            first.to_uppercase().chain(chars).collect()
        }
        _ => s.to_string(),
    }
}

/// Page title for the browser tab: `"{Page} - {Book}"`, or just the book
/// title when the page has none.
pub fn route_title(page_title: &str, book_title: &str) -> String {
    if page_title.is_empty() {
        book_title.to_string()
    } else {
        format!("{} - {book_title}", capitalize(page_title))
    }
}

/// Whether a link leaves the site (`https://...`, `mailto:`...).
pub fn is_external(link: &str) -> bool {
    link.contains("://") || link.starts_with("mailto:")
}
