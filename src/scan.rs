//! Filesystem scanning and `book.json` generation.
//!
//! Stage 1 of the quire pipeline. Walks a directory of Markdown and produces
//! the navigation tree that every later stage consumes.
//!
//! ## Directory Structure
//!
//! ```text
//! docs/                            # Docs root
//! ├── quire.toml                   # Project config (optional)
//! ├── README.md                    # Home page (index file sorts first)
//! ├── 001-guide/                   # Directory → dir node, rank 1
//! │   ├── README.md                # Directory home → /guide/
//! │   ├── 001-install.md           # → /guide/install
//! │   └── 002-configuration.md     # → /guide/configuration
//! ├── 002-reference/
//! │   ├── config.yml               # Sidecar: title / isNav / navTitle / sidebarIgnore
//! │   └── 001-cli.md
//! ├── faq.md                       # Unranked → sorts after ranked siblings
//! ├── assets/                      # No Markdown → not in the tree
//! └── .drafts/                     # Hidden → skipped
//! ```
//!
//! In i18n mode every top-level directory is a language code (`en/`, `zh/`)
//! holding one such tree, and the result is keyed by code.
//!
//! ## Validation
//!
//! Outside display-rank mode two siblings that differ only by rank
//! (`001-intro.md`, `002-intro.md`) would share a URL. The scanner collects
//! every such group across the whole tree and fails once, naming them all.

use crate::i18n;
use crate::metadata::{self, resolve};
use crate::naming::{self, display_name, is_index_file};
use crate::types::{BookConfig, DirItem, FileItem, LanguageSidebar, NavItem, SidebarConfig};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default name of the generated config file.
pub const BOOK_FILE: &str = "book.json";

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("i18n mode needs at least one language directory with Markdown in {0}")]
    NoLanguages(PathBuf),
    #[error(
        "Entries collide once rank prefixes are stripped:\n{}\nRename them or enable display-rank mode.",
        format_collisions(.0)
    )]
    DuplicateNames(Vec<Collision>),
}

/// Siblings sharing a URL after rank stripping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collision {
    pub dir: PathBuf,
    /// Raw entry names, in sorted sibling order.
    pub names: Vec<String>,
}

fn format_collisions(collisions: &[Collision]) -> String {
    let mut out = String::new();
    for c in collisions {
        let _ = writeln!(out, "  {}: {}", c.dir.display(), c.names.join(", "));
    }
    out.trim_end().to_string()
}

/// Knobs that change the shape of the scanned tree.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Keep rank prefixes in titles and skip collision checks.
    pub display_rank: bool,
    /// Treat top-level directories as language codes.
    pub i18n: bool,
    /// Paths never descended into (e.g. a build output inside the docs root).
    pub exclude: Vec<PathBuf>,
}

/// Scan a docs root into a sidebar: one tree, or one per language.
pub fn scan(root: &Path, options: &ScanOptions) -> Result<SidebarConfig, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut collisions = Vec::new();
    let sidebar = if options.i18n {
        let mut languages = BTreeMap::new();
        for entry in collect_entries(root, options)? {
            if !entry.is_dir {
                debug!("i18n: ignoring top-level file {}", entry.name);
                continue;
            }
            let data = scan_directory(&entry.path, "/", options, &mut collisions)?;
            if data.is_empty() {
                debug!("i18n: skipping {}: no Markdown", entry.name);
                continue;
            }
            let name = i18n::language_name(&entry.name).to_string();
            languages.insert(entry.name, LanguageSidebar { name, data });
        }
        if languages.is_empty() && collisions.is_empty() {
            return Err(ScanError::NoLanguages(root.to_path_buf()));
        }
        SidebarConfig::I18n(languages)
    } else {
        SidebarConfig::Flat(scan_directory(root, "/", options, &mut collisions)?)
    };

    if !collisions.is_empty() {
        return Err(ScanError::DuplicateNames(collisions));
    }
    Ok(sidebar)
}

/// Where `book.json` goes: an explicit `.json` path, a directory, or the
/// docs root by default.
pub fn book_output_path(docs_dir: &Path, output: Option<&Path>) -> PathBuf {
    match output {
        Some(out)
            if out
                .extension()
                .is_some_and(|e| e.eq_ignore_ascii_case("json")) =>
        {
            out.to_path_buf()
        }
        Some(out) => out.join(BOOK_FILE),
        None => docs_dir.join(BOOK_FILE),
    }
}

/// Write a book config as pretty JSON with a trailing newline.
pub fn write_book(book: &BookConfig, path: &Path) -> Result<(), ScanError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(book)?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

/// Read a `book.json` back.
pub fn read_book(path: &Path) -> Result<BookConfig, ScanError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

struct Entry {
    path: PathBuf,
    name: String,
    is_dir: bool,
}

/// Directory entries that can contribute to the tree, in sibling order.
fn collect_entries(dir: &Path, options: &ScanOptions) -> Result<Vec<Entry>, ScanError> {
    let mut entries: Vec<Entry> = fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let path = e.path();
            let name = e.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || options.exclude.iter().any(|x| x == &path) {
                return None;
            }
            let is_dir = path.is_dir();
            (is_dir || is_markdown(&path)).then_some(Entry { path, name, is_dir })
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    naming::sort_entries(&mut entries, |e| e.name.as_str());
    Ok(entries)
}

fn is_markdown(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("md"))
}

fn scan_directory(
    dir: &Path,
    link_prefix: &str,
    options: &ScanOptions,
    collisions: &mut Vec<Collision>,
) -> Result<Vec<NavItem>, ScanError> {
    let entries = collect_entries(dir, options)?;
    let mut kept = Vec::new();
    let mut nested = Vec::new();

    let mut items = Vec::new();
    for entry in entries {
        if entry.is_dir {
            let link = format!("{link_prefix}{}/", entry.name);
            let children = scan_directory(&entry.path, &link, options, &mut nested)?;
            if children.is_empty() {
                debug!("skipping {}: no Markdown", entry.path.display());
                continue;
            }
            let meta = metadata::read_dir_meta(&entry.path);
            let fallback = display_name(&entry.name, options.display_rank);
            items.push(NavItem::Dir(DirItem {
                title: resolve(&[meta.title.as_deref(), Some(fallback.as_str())]).unwrap_or(fallback),
                link: Some(link),
                flags: meta.flags(),
                children,
            }));
        } else {
            let stem = entry.name[..entry.name.len() - ".md".len()].to_string();
            let fallback = display_name(&stem, options.display_rank);
            let page = metadata::read_page_metadata(&entry.path, &fallback)?;
            debug!("page {}{} → {:?}", link_prefix, entry.name, page.title);
            items.push(NavItem::File(FileItem {
                title: page.title,
                link: format!("{link_prefix}{}", entry.name),
                flags: page.flags,
                headings: page.headings,
                hero: page.hero,
                features: page.features,
            }));
        }
        kept.push(entry);
    }

    // Only entries that reach the tree can clash.
    if !options.display_rank {
        collisions.extend(find_collisions(dir, &kept));
    }
    collisions.append(&mut nested);
    Ok(items)
}

/// Group siblings by the URL segment they produce once ranks are stripped.
fn find_collisions(dir: &Path, entries: &[Entry]) -> Vec<Collision> {
    let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
    let mut order = Vec::new();
    for entry in entries {
        let key = if entry.is_dir {
            format!("{}/", naming::link_segment(&entry.name).to_lowercase())
        } else if is_index_file(&entry.name) {
            String::new()
        } else {
            naming::link_segment(&entry.name[..entry.name.len() - ".md".len()]).to_lowercase()
        };
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(&entry.name);
    }

    order
        .into_iter()
        .filter_map(|key| {
            let names = groups.remove(&key)?;
            (names.len() > 1).then(|| Collision {
                dir: dir.to_path_buf(),
                names: names.into_iter().map(String::from).collect(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    // =========================================================================
    // Tree shape
    // =========================================================================

    #[test]
    fn fixture_tree_top_level_order() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert_eq!(
            titles(&items),
            vec!["Welcome", "guide", "Reference", "Changelog", "FAQ"]
        );
    }

    #[test]
    fn index_file_sorts_first_in_directory() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        let guide = find_dir(&items, "guide");
        assert_eq!(
            titles(&guide.children),
            vec!["Guide", "Installation", "configure"]
        );
        assert_eq!(guide.link.as_deref(), Some("/001-guide/"));
        assert_eq!(guide.children[0].link(), Some("/001-guide/README.md"));
    }

    #[test]
    fn files_carry_raw_links_and_headings() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        let install = find_file(&items, "Installation");
        assert_eq!(install.link, "/001-guide/001-install.md");
        let anchors: Vec<&str> = install.headings.iter().map(|h| h.link.as_str()).collect();
        assert_eq!(anchors, vec!["#requirements", "#steps"]);
    }

    #[test]
    fn repeated_headings_get_suffixed_anchors() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        let config = find_file(&items, "configure");
        let anchors: Vec<&str> = config.headings.iter().map(|h| h.link.as_str()).collect();
        assert_eq!(anchors, vec!["#options", "#options-1", "#theme-colors"]);
    }

    #[test]
    fn sidecar_overrides_directory_metadata() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        let reference = find_dir(&items, "Reference");
        assert!(reference.flags.is_nav);
        assert_eq!(reference.flags.nav_title.as_deref(), Some("API"));
    }

    #[test]
    fn front_matter_flags_reach_the_tree() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert!(find_file(&items, "Changelog").flags.sidebar_ignore);
        let home = find_file(&items, "Welcome");
        assert_eq!(home.hero.as_ref().map(|h| h.title.as_str()), Some("Fixture Book"));
        assert_eq!(home.features.len(), 2);
    }

    #[test]
    fn hidden_and_markdownless_directories_are_skipped() {
        let tmp = setup_fixtures();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        let all = all_titles(&items);
        assert!(!all.contains(&"Hidden draft".to_string()));
        assert!(!all.contains(&"assets".to_string()));
    }

    #[test]
    fn filename_title_is_rank_stripped() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("002-getting-started.md", "no heading\n")]);
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert_eq!(titles(&items), vec!["getting-started"]);
    }

    #[test]
    fn display_rank_keeps_filename_title() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("002-getting-started.md", "no heading\n")]);
        let options = ScanOptions {
            display_rank: true,
            ..Default::default()
        };
        let items = scan_flat(tmp.path(), &options);
        assert_eq!(titles(&items), vec!["002-getting-started"]);
    }

    #[test]
    fn malformed_front_matter_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("001-intro.md", "---\ntitle: [bad\n---\nbody\n")]);
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert_eq!(titles(&items), vec!["intro"]);
    }

    #[test]
    fn latin1_page_does_not_abort() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("001-intro.md", "# Intro\n")]);
        fs::write(tmp.path().join("002-latin1.md"), b"# Caf\xe9\n").unwrap();
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert_eq!(titles(&items), vec!["Intro", "Caf\u{FFFD}"]);
    }

    #[test]
    fn excluded_paths_are_not_scanned() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[("a.md", "# A\n"), ("_site/index.md", "# Built\n")],
        );
        let options = ScanOptions {
            exclude: vec![tmp.path().join("_site")],
            ..Default::default()
        };
        let items = scan_flat(tmp.path(), &options);
        assert_eq!(titles(&items), vec!["A"]);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn duplicate_names_after_rank_strip_are_fatal() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[
                ("001-intro.md", "# One\n"),
                ("002-intro.md", "# Two\n"),
                ("003-setup.md", "# Setup\n"),
                ("setup.md", "# Setup again\n"),
                ("guide/001-a.md", "# A\n"),
                ("guide/a.md", "# A2\n"),
            ],
        );
        let err = scan(tmp.path(), &ScanOptions::default()).unwrap_err();
        match &err {
            ScanError::DuplicateNames(collisions) => {
                let names: Vec<Vec<String>> =
                    collisions.iter().map(|c| c.names.clone()).collect();
                assert_eq!(
                    names,
                    vec![
                        vec!["001-intro.md".to_string(), "002-intro.md".to_string()],
                        vec!["003-setup.md".to_string(), "setup.md".to_string()],
                        vec!["001-a.md".to_string(), "a.md".to_string()],
                    ]
                );
            }
            other => panic!("expected DuplicateNames, got {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("001-intro.md, 002-intro.md"));
    }

    #[test]
    fn file_and_directory_with_same_name_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[("001-api.md", "# API\n"), ("002-api/README.md", "# API dir\n")],
        );
        assert!(scan(tmp.path(), &ScanOptions::default()).is_ok());
    }

    #[test]
    fn markdownless_directory_does_not_collide() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[("001-img/logo.png", "png"), ("002-img/usage.md", "# Usage\n")],
        );
        let items = scan_flat(tmp.path(), &ScanOptions::default());
        assert_eq!(titles(&items), vec!["img"]);
        assert_eq!(find_dir(&items, "img").link.as_deref(), Some("/002-img/"));
    }

    #[test]
    fn nested_rank_prefixes_collide_with_their_link() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[("001-2020-review.md", "# Old\n"), ("review.md", "# New\n")],
        );
        let err = scan(tmp.path(), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ScanError::DuplicateNames(_)), "got {err:?}");
    }

    #[test]
    fn display_rank_allows_rank_only_differences() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[("001-intro.md", "# One\n"), ("002-intro.md", "# Two\n")],
        );
        let options = ScanOptions {
            display_rank: true,
            ..Default::default()
        };
        assert!(scan(tmp.path(), &options).is_ok());
    }

    #[test]
    fn scanning_a_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("a.md", "# A\n")]);
        let result = scan(&tmp.path().join("a.md"), &ScanOptions::default());
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    // =========================================================================
    // i18n
    // =========================================================================

    #[test]
    fn i18n_builds_one_tree_per_language() {
        let tmp = TempDir::new().unwrap();
        write_files(
            tmp.path(),
            &[
                ("en/README.md", "# Home\n"),
                ("en/001-start.md", "# Start\n"),
                ("zh/README.md", "# 首页\n"),
                ("xx/README.md", "# Unknown\n"),
                ("empty/notes.txt", "nothing"),
                ("root.md", "# Ignored\n"),
            ],
        );
        let options = ScanOptions {
            i18n: true,
            ..Default::default()
        };
        let SidebarConfig::I18n(languages) = scan(tmp.path(), &options).unwrap() else {
            panic!("expected i18n sidebar");
        };
        let codes: Vec<&str> = languages.keys().map(String::as_str).collect();
        assert_eq!(codes, vec!["en", "xx", "zh"]);
        assert_eq!(languages["en"].name, "English");
        assert_eq!(languages["zh"].name, "中文");
        assert_eq!(languages["xx"].name, "xx");
        // Links are relative to the language directory.
        assert_eq!(languages["en"].data[1].link(), Some("/001-start.md"));
    }

    #[test]
    fn i18n_without_languages_is_an_error() {
        let tmp = TempDir::new().unwrap();
        write_files(tmp.path(), &[("root.md", "# Root\n")]);
        let options = ScanOptions {
            i18n: true,
            ..Default::default()
        };
        assert!(matches!(
            scan(tmp.path(), &options),
            Err(ScanError::NoLanguages(_))
        ));
    }

    // =========================================================================
    // book.json
    // =========================================================================

    #[test]
    fn output_path_rules() {
        let docs = Path::new("docs");
        assert_eq!(book_output_path(docs, None), Path::new("docs/book.json"));
        assert_eq!(
            book_output_path(docs, Some(Path::new("out"))),
            Path::new("out/book.json")
        );
        assert_eq!(
            book_output_path(docs, Some(Path::new("cfg/site.json"))),
            Path::new("cfg/site.json")
        );
    }

    #[test]
    fn write_and_read_book() {
        let tmp = setup_fixtures();
        let book = BookConfig {
            title: "Fixture Book".to_string(),
            sidebar: scan(tmp.path(), &ScanOptions::default()).unwrap(),
            ..Default::default()
        };
        let path = tmp.path().join("out/nested/book.json");
        write_book(&book, &path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(raw.contains("\"isNav\": true"));
        assert_eq!(read_book(&path).unwrap(), book);
    }
}
