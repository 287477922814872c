//! Shared test utilities for the quire test suite.
//!
//! Lookup helpers walk the whole navigation tree and panic with the list of
//! available titles on a miss, so a failing test says what it did find.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = setup_fixtures();
//! let items = scan_flat(tmp.path(), &ScanOptions::default());
//!
//! let guide = find_dir(&items, "guide");
//! assert_eq!(titles(&guide.children), vec!["Guide", "Installation", "configure"]);
//! ```

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use crate::resolve::RouteItem;
use crate::scan::{ScanOptions, scan};
use crate::types::{BookConfig, DirItem, FileItem, NavItem, SidebarConfig};

// =========================================================================
// Fixture setup
// =========================================================================

/// Copy `fixtures/docs/` to a temp directory and return it.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/docs");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `(relative path, content)` pairs under `root`, creating parents.
pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }
}

// =========================================================================
// Scanning
// =========================================================================

/// Scan a non-i18n tree and return its items. Panics on an i18n result.
pub fn scan_flat(root: &Path, options: &ScanOptions) -> Vec<NavItem> {
    match scan(root, options).unwrap() {
        SidebarConfig::Flat(items) => items,
        SidebarConfig::I18n(languages) => {
            let codes: Vec<&String> = languages.keys().collect();
            panic!("expected a flat sidebar, got languages {codes:?}")
        }
    }
}

/// The fixture tree as a book titled "Fixture Book", home mode off.
pub fn fixture_book(root: &Path) -> BookConfig {
    BookConfig {
        title: "Fixture Book".to_string(),
        sidebar: SidebarConfig::Flat(scan_flat(root, &ScanOptions::default())),
        ..Default::default()
    }
}

// =========================================================================
// Tree lookups: panic with a clear message on miss
// =========================================================================

/// Titles of one level of items.
pub fn titles(items: &[NavItem]) -> Vec<&str> {
    items.iter().map(|i| i.title()).collect()
}

/// Every title in the tree, depth first.
pub fn all_titles(items: &[NavItem]) -> Vec<String> {
    let mut out = Vec::new();
    fn walk(items: &[NavItem], out: &mut Vec<String>) {
        for item in items {
            out.push(item.title().to_string());
            match item {
                NavItem::Dir(dir) => walk(&dir.children, out),
                NavItem::File(_) | NavItem::Heading(_) => {}
            }
        }
    }
    walk(items, &mut out);
    out
}

fn find_item<'a, T>(
    items: &'a [NavItem],
    title: &str,
    kind: &str,
    pick: fn(&'a NavItem) -> Option<&'a T>,
) -> &'a T {
    fn walk<'a, T>(
        items: &'a [NavItem],
        title: &str,
        pick: fn(&'a NavItem) -> Option<&'a T>,
    ) -> Option<&'a T> {
        items.iter().find_map(|item| {
            pick(item).filter(|_| item.title() == title).or_else(|| match item {
                NavItem::Dir(dir) => walk(&dir.children, title, pick),
                _ => None,
            })
        })
    }
    walk(items, title, pick).unwrap_or_else(|| {
        let available = all_titles(items);
        panic!("{kind} '{title}' not found. Available: {available:?}")
    })
}

/// Find a directory by title anywhere in the tree. Panics if not found.
pub fn find_dir<'a>(items: &'a [NavItem], title: &str) -> &'a DirItem {
    find_item(items, title, "directory", |item| match item {
        NavItem::Dir(dir) => Some(dir),
        _ => None,
    })
}

/// Find a page by title anywhere in the tree. Panics if not found.
pub fn find_file<'a>(items: &'a [NavItem], title: &str) -> &'a FileItem {
    find_item(items, title, "page", |item| match item {
        NavItem::File(file) => Some(file),
        _ => None,
    })
}

/// Find a route by pattern. Panics if not found.
pub fn find_route<'a>(routes: &'a [RouteItem], pattern: &str) -> &'a RouteItem {
    routes
        .iter()
        .find(|r| r.pattern == pattern)
        .unwrap_or_else(|| {
            let patterns: Vec<&str> = routes.iter().map(|r| r.pattern.as_str()).collect();
            panic!("route '{pattern}' not found. Available: {patterns:?}")
        })
}
