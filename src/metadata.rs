//! Page and directory metadata extraction.
//!
//! ## Pages
//!
//! A Markdown page may open with a YAML front-matter block:
//!
//! ```text
//! ---
//! title: Getting Started
//! isNav: true
//! navTitle: Start
//! sidebarIgnore: false
//! hero: { title: Quire, desc: Docs from folders, actions: [] }
//! features: [{ title: Fast, desc: Single binary }]
//! ---
//! ```
//!
//! The page title resolves, first non-empty wins:
//!
//! ```text
//! title: front-matter title → first H1 → filename-derived title
//! ```
//!
//! Every H2 becomes an in-page anchor. Anchor ids come from [`Slugger`], the
//! same slugger the site generator uses, so sidebar anchors always land.
//!
//! ## Directories
//!
//! A directory may hold a `config.yml` (or `config.yaml`) sidecar overriding
//! `title`, `navTitle`, `isNav` and `sidebarIgnore` for the directory node.
//!
//! ## Recovery
//!
//! Malformed YAML in either place is never fatal: it is logged at `warn` and
//! the node falls back to its filename-derived metadata.

use crate::types::{Feature, HeadingItem, Hero, NavFlags};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Sidecar filenames checked in each directory, in priority order.
pub const DIR_SIDECARS: &[&str] = &["config.yml", "config.yaml"];

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Front-matter keys understood by quire. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrontMatter {
    pub title: Option<String>,
    pub is_nav: Option<bool>,
    pub nav_title: Option<String>,
    pub sidebar_ignore: Option<bool>,
    pub hero: Option<Hero>,
    pub features: Option<Vec<Feature>>,
}

impl FrontMatter {
    pub fn flags(&self) -> NavFlags {
        NavFlags {
            is_nav: self.is_nav.unwrap_or(false),
            nav_title: self.nav_title.clone(),
            sidebar_ignore: self.sidebar_ignore.unwrap_or(false),
        }
    }
}

/// Directory sidecar keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirMeta {
    pub title: Option<String>,
    pub is_nav: Option<bool>,
    pub nav_title: Option<String>,
    pub sidebar_ignore: Option<bool>,
}

impl DirMeta {
    pub fn flags(&self) -> NavFlags {
        NavFlags {
            is_nav: self.is_nav.unwrap_or(false),
            nav_title: self.nav_title.clone(),
            sidebar_ignore: self.sidebar_ignore.unwrap_or(false),
        }
    }
}

/// Everything the tree builder needs from one Markdown file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub flags: NavFlags,
    pub headings: Vec<HeadingItem>,
    pub hero: Option<Hero>,
    pub features: Vec<Feature>,
}

/// Resolve a field from candidate sources in priority order.
///
/// Returns the first value that is present and non-blank, trimmed.
pub fn resolve(sources: &[Option<&str>]) -> Option<String> {
    sources
        .iter()
        .filter_map(|opt| {
            opt.map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        })
        .next()
}

/// Split a leading `---` front-matter block from a Markdown document.
///
/// Returns `(Some(yaml), body)` when the document opens with a fenced block,
/// otherwise `(None, content)`.
pub fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed == "..." {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, content)
}

/// Parse a front-matter YAML block. Blank input yields the default.
pub fn parse_front_matter(yaml: &str) -> Result<FrontMatter, MetadataError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Parse a directory sidecar. Blank input yields the default.
pub fn parse_dir_meta(yaml: &str) -> Result<DirMeta, MetadataError> {
    if yaml.trim().is_empty() {
        return Ok(DirMeta::default());
    }
    Ok(serde_yaml::from_str(yaml)?)
}

/// Extract page metadata from Markdown source.
///
/// `fallback_title` is used when neither front-matter nor an H1 supplies one.
/// `source` only labels warnings.
pub fn page_metadata(content: &str, fallback_title: &str, source: &str) -> PageMetadata {
    let (yaml, body) = split_front_matter(content);
    let front = match yaml.map(parse_front_matter).transpose() {
        Ok(front) => front.unwrap_or_default(),
        Err(e) => {
            tracing::warn!("{source}: ignoring front-matter: {e}");
            FrontMatter::default()
        }
    };

    let outline = outline(body);
    let title = resolve(&[
        front.title.as_deref(),
        outline.h1.as_deref(),
        Some(fallback_title),
    ])
    .unwrap_or_default();

    PageMetadata {
        title,
        flags: front.flags(),
        headings: outline.h2,
        hero: front.hero,
        features: front.features.unwrap_or_default(),
    }
}

/// Read a Markdown source. Invalid UTF-8 is replaced rather than rejected.
pub fn read_markdown(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::warn!("{}: not valid UTF-8, decoding lossily", path.display());
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Read a Markdown file and extract its metadata.
pub fn read_page_metadata(path: &Path, fallback_title: &str) -> std::io::Result<PageMetadata> {
    let content = read_markdown(path)?;
    Ok(page_metadata(
        &content,
        fallback_title,
        &path.display().to_string(),
    ))
}

/// Read the sidecar of a directory, if any.
pub fn read_dir_meta(dir: &Path) -> DirMeta {
    for name in DIR_SIDECARS {
        let path = dir.join(name);
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        return match parse_dir_meta(&content) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("{}: ignoring sidecar: {e}", path.display());
                DirMeta::default()
            }
        };
    }
    DirMeta::default()
}

/// Markdown parser options shared by metadata extraction and rendering.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

struct Outline {
    h1: Option<String>,
    h2: Vec<HeadingItem>,
}

fn outline(body: &str) -> Outline {
    let mut slugger = Slugger::default();
    let mut h1 = None;
    let mut h2 = Vec::new();
    // (level, explicit id, collected text)
    let mut current: Option<(HeadingLevel, Option<String>, String)> = None;

    for event in Parser::new_ext(body, markdown_options()) {
        match event {
            Event::Start(Tag::Heading { level, id, .. }) => {
                current = Some((level, id.map(|s| s.to_string()), String::new()));
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, _, buf)) = current.as_mut() {
                    buf.push_str(&text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                let Some((level, id, text)) = current.take() else {
                    continue;
                };
                let text = text.trim().to_string();
                // Every heading consumes a slug so ids match the rendered page.
                let id = slugger.id_for(&text, id.as_deref());
                match level {
                    HeadingLevel::H1 if h1.is_none() => h1 = Some(text),
                    HeadingLevel::H2 => h2.push(HeadingItem {
                        title: text,
                        link: format!("#{id}"),
                    }),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Outline { h1, h2 }
}

/// Heading id generator with per-document de-duplication.
///
/// Lowercases, drops punctuation, turns whitespace into `-`. A repeated slug
/// gets `-1`, `-2`, ... appended.
#[derive(Debug, Default)]
pub struct Slugger {
    seen: HashMap<String, usize>,
}

impl Slugger {
    /// Id for a heading: the explicit `{#id}` if present, else a fresh slug.
    pub fn id_for(&mut self, text: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(id) if !id.is_empty() => {
                self.seen.entry(id.to_string()).or_insert(0);
                id.to_string()
            }
            _ => self.slug(text),
        }
    }

    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();
        if self.seen.contains_key(&slug) {
            loop {
                let count = self.seen.entry(base.clone()).or_insert(0);
                *count += 1;
                slug = format!("{base}-{count}");
                if !self.seen.contains_key(&slug) {
                    break;
                }
            }
        }
        self.seen.insert(slug.clone(), 0);
        slug
    }
}

fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !is_slug_punctuation(*c))
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

fn is_slug_punctuation(c: char) -> bool {
    matches!(c, '\u{2000}'..='\u{206F}' | '\u{2E00}'..='\u{2E7F}')
        || "\\'!\"#$%&()*+,./:;<=>?@[]^`{|}~".contains(c)
}
