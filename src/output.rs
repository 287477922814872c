//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Every entity leads with its positional index and title; the raw source
//! path follows as an indented `Source:` line. The output reads as a table
//! of contents while still tracing each node back to a file.
//!
//! # Output Format
//!
//! ## Scan
//!
//! ```text
//! Sidebar
//! 001 Welcome
//!     Source: /README.md
//! 002 guide/
//!     Source: /001-guide/
//!     001 Guide
//!         Source: /001-guide/README.md
//!     002 Installation
//!         Source: /001-guide/001-install.md
//!         #requirements Requirements
//! 003 Reference/ [nav: API]
//!     Source: /002-reference/
//! ```
//!
//! ## Routes
//!
//! ```text
//! Routes
//!     /reference/          → /reference/cli
//!     /guide/install       page /001-guide/001-install.md (Installation - Book)
//!     /001-guide/001-install → /guide/install
//!     *                    not found
//! ```
//!
//! ## Build
//!
//! ```text
//! Generated 9 pages, 14 redirects, 12 source files → dist
//!     Stylesheet: style.3f9a1c2e.css
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::generate::BuildSummary;
use crate::resolve::{PageRef, ResolvedBook, ResolvedItem, RouteTarget};
use crate::types::{NavFlags, NavItem, SidebarConfig};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Flag markers appended to a header line.
fn flag_markers(flags: &NavFlags) -> String {
    let mut out = String::new();
    if flags.is_nav {
        match flags.nav_title.as_deref() {
            Some(title) => out.push_str(&format!(" [nav: {title}]")),
            None => out.push_str(" [nav]"),
        }
    }
    if flags.sidebar_ignore {
        out.push_str(" [sidebar-ignore]");
    }
    out
}

/// Pad a column to `width` characters (by char count).
fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    format!("{text}{}", " ".repeat(width.saturating_sub(len)))
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Scan
// ============================================================================

fn format_nav_items(items: &[NavItem], depth: usize, lines: &mut Vec<String>) {
    let base = indent(depth);
    for (i, item) in items.iter().enumerate() {
        match item {
            NavItem::File(file) => {
                lines.push(format!(
                    "{base}{} {}{}",
                    format_index(i + 1),
                    file.title,
                    flag_markers(&file.flags)
                ));
                lines.push(format!("{base}    Source: {}", file.link));
                for heading in &file.headings {
                    lines.push(format!("{base}    {} {}", heading.link, heading.title));
                }
            }
            NavItem::Dir(dir) => {
                lines.push(format!(
                    "{base}{} {}/{}",
                    format_index(i + 1),
                    dir.title,
                    flag_markers(&dir.flags)
                ));
                if let Some(link) = &dir.link {
                    lines.push(format!("{base}    Source: {link}"));
                }
                format_nav_items(&dir.children, depth + 1, lines);
            }
            NavItem::Heading(heading) => {
                lines.push(format!("{base}{} {}", heading.link, heading.title));
            }
        }
    }
}

/// Format a scanned sidebar as an indexed tree, one block per language.
pub fn format_scan_output(sidebar: &SidebarConfig) -> Vec<String> {
    let mut lines = Vec::new();
    match sidebar {
        SidebarConfig::Flat(items) => {
            lines.push("Sidebar".to_string());
            format_nav_items(items, 0, &mut lines);
        }
        SidebarConfig::I18n(languages) => {
            for (i, (code, language)) in languages.iter().enumerate() {
                if i > 0 {
                    lines.push(String::new());
                }
                lines.push(format!("Sidebar {code} ({})", language.name));
                format_nav_items(&language.data, 0, &mut lines);
            }
        }
    }
    lines
}

/// Print scan output to stdout.
pub fn print_scan_output(sidebar: &SidebarConfig) {
    for line in format_scan_output(sidebar) {
        println!("{}", line);
    }
}

// ============================================================================
// Routes
// ============================================================================

/// Format the route table and navigation bar of a resolved book.
pub fn format_routes(book: &ResolvedBook) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(lang) = &book.lang {
        lines.push(format!("Language {lang}"));
    }

    lines.push("Nav".to_string());
    for entry in &book.nav {
        let target = entry
            .landing
            .as_deref()
            .or(entry.link.as_deref())
            .unwrap_or("-");
        let external = if entry.external { " (external)" } else { "" };
        lines.push(format!("    {} → {target}{external}", entry.title));
    }

    lines.push(String::new());
    lines.push("Routes".to_string());
    let width = book
        .routes
        .iter()
        .map(|r| r.pattern.chars().count())
        .max()
        .unwrap_or(0);
    for route in &book.routes {
        let pattern = pad(&route.pattern, width);
        let line = match &route.target {
            RouteTarget::Redirect(to) => format!("    {pattern} → {to}"),
            RouteTarget::Content(PageRef::Markdown { origin_link, .. }) => match &route.title {
                Some(title) => format!("    {pattern} page {origin_link} ({title})"),
                None => format!("    {pattern} page {origin_link}"),
            },
            RouteTarget::Content(PageRef::NotFound) => format!("    {pattern} not found"),
        };
        lines.push(line.trim_end().to_string());
    }

    lines.push(String::new());
    if book.home_page.is_empty() {
        lines.push("Home: (none)".to_string());
    } else {
        lines.push(format!("Home: {}", book.home_page));
    }
    lines
}

fn format_sidebar_items(items: &[ResolvedItem], current: &str, depth: usize, lines: &mut Vec<String>) {
    let base = indent(depth);
    for item in items {
        match item {
            ResolvedItem::Page(page) => {
                let marker = if page.link == current { "* " } else { "" };
                lines.push(format!("{base}{marker}{} {}", page.title, page.link));
            }
            ResolvedItem::Section(section) => {
                lines.push(format!("{base}{}/", section.title));
                format_sidebar_items(&section.children, current, depth + 1, lines);
            }
            ResolvedItem::Anchor(heading) => {
                lines.push(format!("{base}{} {}", heading.title, heading.link));
            }
        }
    }
}

/// Format what a reader sees at `path`: matched route, sidebar, prev/next.
pub fn format_location(book: &ResolvedBook, path: &str) -> Vec<String> {
    let mut lines = vec![format!("Location {path}")];
    match book.match_route(path) {
        Some(route) => match &route.target {
            RouteTarget::Redirect(to) => lines.push(format!("    Route: {} → {to}", route.pattern)),
            RouteTarget::Content(PageRef::Markdown { origin_link, .. }) => {
                lines.push(format!("    Route: {} page {origin_link}", route.pattern))
            }
            RouteTarget::Content(PageRef::NotFound) => {
                lines.push(format!("    Route: {} not found", route.pattern))
            }
        },
        None => lines.push("    Route: (none)".to_string()),
    }

    lines.push("    Sidebar".to_string());
    format_sidebar_items(&book.current_sidebar(path), path, 2, &mut lines);

    let neighbours = book.neighbours(path);
    if let Some(prev) = &neighbours.prev {
        lines.push(format!("    Previous: {} {}", prev.title, prev.link));
    }
    if let Some(next) = &neighbours.next {
        lines.push(format!("    Next: {} {}", next.title, next.link));
    }
    lines
}

/// Print routes (and an optional location) to stdout.
pub fn print_routes(book: &ResolvedBook, path: Option<&str>) {
    for line in format_routes(book) {
        println!("{}", line);
    }
    if let Some(path) = path {
        println!();
        for line in format_location(book, path) {
            println!("{}", line);
        }
    }
}

// ============================================================================
// Build and check
// ============================================================================

/// Format the result of a site build.
pub fn format_build_summary(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Generated {}, {}, {} → {}",
        plural(summary.pages, "page"),
        plural(summary.redirects, "redirect"),
        plural(summary.sources, "source file"),
        summary.output.display()
    )];
    if !summary.languages.is_empty() {
        lines.push(format!("    Languages: {}", summary.languages.join(", ")));
    }
    lines.push(format!("    Stylesheet: {}", summary.stylesheet));
    lines
}

pub fn print_build_summary(summary: &BuildSummary) {
    for line in format_build_summary(summary) {
        println!("{}", line);
    }
}

/// Format a successful `check`: counts per resolved language.
pub fn format_check(books: &[ResolvedBook]) -> Vec<String> {
    books
        .iter()
        .map(|book| {
            let label = book.lang.as_deref().map_or(String::new(), |l| format!("{l}: "));
            format!(
                "{label}{}, {}",
                plural(book.links().len(), "page"),
                plural(book.routes.len(), "route")
            )
        })
        .chain(std::iter::once("OK".to_string()))
        .collect()
}

pub fn print_check(books: &[ResolvedBook]) {
    for line in format_check(books) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BookConfig, DirItem, FileItem, HeadingItem, LanguageSidebar};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn file(title: &str, link: &str) -> FileItem {
        FileItem {
            title: title.to_string(),
            link: link.to_string(),
            flags: NavFlags::default(),
            headings: vec![],
            hero: None,
            features: vec![],
        }
    }

    fn sample_tree() -> Vec<NavItem> {
        let mut install = file("Installation", "/001-guide/001-install.md");
        install.headings = vec![HeadingItem {
            title: "Steps".to_string(),
            link: "#steps".to_string(),
        }];
        vec![
            NavItem::File(file("Welcome", "/README.md")),
            NavItem::Dir(DirItem {
                title: "Reference".to_string(),
                link: Some("/002-reference/".to_string()),
                flags: NavFlags {
                    is_nav: true,
                    nav_title: Some("API".to_string()),
                    sidebar_ignore: false,
                },
                children: vec![NavItem::File(install)],
            }),
        ]
    }

    // =========================================================================
    // Helper tests
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(100), "100");
    }

    #[test]
    fn flag_markers_list_set_flags() {
        assert_eq!(flag_markers(&NavFlags::default()), "");
        let flags = NavFlags {
            is_nav: true,
            nav_title: None,
            sidebar_ignore: true,
        };
        assert_eq!(flag_markers(&flags), " [nav] [sidebar-ignore]");
    }

    #[test]
    fn pad_counts_chars() {
        assert_eq!(pad("指南", 4), "指南  ");
        assert_eq!(pad("long", 2), "long");
    }

    // =========================================================================
    // Command output tests
    // =========================================================================

    #[test]
    fn scan_output_is_an_indexed_tree() {
        let lines = format_scan_output(&SidebarConfig::Flat(sample_tree()));
        assert_eq!(
            lines,
            vec![
                "Sidebar",
                "001 Welcome",
                "    Source: /README.md",
                "002 Reference/ [nav: API]",
                "    Source: /002-reference/",
                "    001 Installation",
                "        Source: /001-guide/001-install.md",
                "        #steps Steps",
            ]
        );
    }

    #[test]
    fn scan_output_groups_languages() {
        let mut languages = BTreeMap::new();
        for (code, name) in [("en", "English"), ("zh", "中文")] {
            languages.insert(
                code.to_string(),
                LanguageSidebar {
                    name: name.to_string(),
                    data: vec![NavItem::File(file("Intro", "/intro.md"))],
                },
            );
        }
        let lines = format_scan_output(&SidebarConfig::I18n(languages));
        assert_eq!(lines[0], "Sidebar en (English)");
        assert!(lines.contains(&"Sidebar zh (中文)".to_string()));
        assert!(lines.contains(&String::new()));
    }

    #[test]
    fn routes_output_lists_every_route() {
        let book = ResolvedBook::resolve(
            &BookConfig {
                title: "Book".to_string(),
                sidebar: SidebarConfig::Flat(vec![NavItem::File(file(
                    "intro",
                    "/001-intro.md",
                ))]),
                ..Default::default()
            },
            None,
        );
        let lines = format_routes(&book);
        assert!(lines.contains(&"Routes".to_string()));
        assert!(lines.iter().any(|l| l.contains("/intro") && l.contains("page /001-intro.md (Intro - Book)")));
        assert!(lines.iter().any(|l| l.contains("/001-intro") && l.ends_with("→ /intro")));
        assert!(lines.iter().any(|l| l.ends_with("not found")));
        assert_eq!(lines.last().map(String::as_str), Some("Home: /intro"));
    }

    #[test]
    fn build_summary_pluralises() {
        let summary = BuildSummary {
            output: PathBuf::from("dist"),
            languages: vec![],
            pages: 1,
            redirects: 2,
            sources: 3,
            stylesheet: "style.abcd1234.css".to_string(),
        };
        assert_eq!(
            format_build_summary(&summary),
            vec![
                "Generated 1 page, 2 redirects, 3 source files → dist",
                "    Stylesheet: style.abcd1234.css",
            ]
        );
    }
}
