//! Rank-prefix parsing for the `NNN-name` convention.
//!
//! Files and directories may carry a numeric rank prefix that only controls
//! ordering:
//!
//! - `001-introduction.md` → rank `1`, name `introduction.md`
//! - `020-guide/` → rank `20`, name `guide`
//! - `faq.md` → no rank, name `faq.md`
//!
//! The rank is stripped from everything a reader sees (titles, URLs) unless
//! display-rank mode is on, in which case the raw name is kept verbatim.
//!
//! Sibling ordering is: the index file (`README.md`) first, then ascending
//! rank, then unranked entries. Ties keep the incoming (byte-sorted) order.

use std::cmp::Ordering;

/// Filename of the per-directory home document.
pub const INDEX_FILE: &str = "README.md";

/// Result of parsing an entry name like `002-getting-started.md`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    /// Numeric rank if the name starts with `digits-`.
    pub rank: Option<u32>,
    /// The remainder after `NNN-`. For unranked names, the full input.
    pub name: String,
}

/// Split a file or directory name into its optional rank and the remainder.
///
/// Only a run of ASCII digits immediately followed by `-` counts as a rank;
/// `2024` or `v1-notes` are left alone.
pub fn parse_entry_name(name: &str) -> ParsedName {
    if let Some(dash) = name.find('-') {
        let prefix = &name[..dash];
        if !prefix.is_empty()
            && prefix.bytes().all(|b| b.is_ascii_digit())
            && let Ok(rank) = prefix.parse::<u32>()
        {
            return ParsedName {
                rank: Some(rank),
                name: name[dash + 1..].to_string(),
            };
        }
    }
    ParsedName {
        rank: None,
        name: name.to_string(),
    }
}

/// Strip the rank prefix from a single path segment.
pub fn strip_rank(segment: &str) -> String {
    parse_entry_name(segment).name
}

/// Strip every leading rank from a segment, for use in links.
///
/// `001-2020-review` becomes `review`, not `2020-review`: a link segment
/// never starts with `digits-`, so stripping a stripped link is a no-op.
pub fn link_segment(segment: &str) -> String {
    let mut current = strip_rank(segment);
    loop {
        let next = strip_rank(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether `filename` is the directory home document.
pub fn is_index_file(filename: &str) -> bool {
    filename.eq_ignore_ascii_case(INDEX_FILE)
}

/// The user-visible name of an entry: rank-stripped unless `display_rank`.
pub fn display_name(name: &str, display_rank: bool) -> String {
    if display_rank {
        name.to_string()
    } else {
        strip_rank(name)
    }
}

/// Sibling comparator: index file first, then rank ascending, unranked last.
pub fn compare_entries(a: &str, b: &str) -> Ordering {
    match (is_index_file(a), is_index_file(b)) {
        (true, false) => return Ordering::Less,
        (false, true) => return Ordering::Greater,
        _ => {}
    }
    let ra = parse_entry_name(a).rank;
    let rb = parse_entry_name(b).rank;
    match (ra, rb) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort sibling names in place using [`compare_entries`].
///
/// The sort is stable, so callers should pass names already in byte order.
pub fn sort_entries<T, F>(entries: &mut [T], name_of: F)
where
    F: Fn(&T) -> &str,
{
    entries.sort_by(|a, b| compare_entries(name_of(a), name_of(b)));
}
