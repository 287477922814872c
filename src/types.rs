//! Shared types written to `book.json` by the scan stage and read back by the
//! resolver and the site generator.
//!
//! On the wire a navigation node is one loose JSON object
//! (`{title, link?, type?, children?, isNav?, ...}`) so hand-written configs
//! stay terse. In memory it is a sum type with one payload per node kind, so a
//! heading can never carry children and a file always has a link.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flags a node can carry from front-matter or a directory sidecar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavFlags {
    /// Promote the node into the top navigation bar.
    pub is_nav: bool,
    /// Label used in the navigation bar instead of the title.
    pub nav_title: Option<String>,
    /// Keep the page routable but out of the sidebar and prev/next links.
    pub sidebar_ignore: bool,
}

/// Homepage hero block (front-matter `hero`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hero {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub actions: Vec<HeroAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroAction {
    pub text: String,
    pub link: String,
}

/// Homepage feature card (front-matter `features`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub title: String,
    #[serde(default)]
    pub desc: String,
}

/// An in-page anchor (an H2 of a page).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadingItem {
    pub title: String,
    /// Fragment link, e.g. `#installation`.
    pub link: String,
}

/// A Markdown page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub title: String,
    /// Raw source path below the docs root, e.g. `/001-guide/README.md`.
    pub link: String,
    pub flags: NavFlags,
    pub headings: Vec<HeadingItem>,
    pub hero: Option<Hero>,
    pub features: Vec<Feature>,
}

/// A directory, or a hand-written group in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirItem {
    pub title: String,
    /// Raw directory path with a trailing slash; absent for pure containers.
    pub link: Option<String>,
    pub flags: NavFlags,
    pub children: Vec<NavItem>,
}

/// A node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawNavItem", into = "RawNavItem")]
pub enum NavItem {
    File(FileItem),
    Dir(DirItem),
    Heading(HeadingItem),
}

impl NavItem {
    pub fn title(&self) -> &str {
        match self {
            NavItem::File(f) => &f.title,
            NavItem::Dir(d) => &d.title,
            NavItem::Heading(h) => &h.title,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            NavItem::File(f) => Some(&f.link),
            NavItem::Dir(d) => d.link.as_deref(),
            NavItem::Heading(h) => Some(&h.link),
        }
    }

    pub fn flags(&self) -> Option<&NavFlags> {
        match self {
            NavItem::File(f) => Some(&f.flags),
            NavItem::Dir(d) => Some(&d.flags),
            NavItem::Heading(_) => None,
        }
    }

    /// Shorthand for a page with no flags or headings.
    pub fn file(title: impl Into<String>, link: impl Into<String>) -> Self {
        NavItem::File(FileItem {
            title: title.into(),
            link: link.into(),
            flags: NavFlags::default(),
            headings: Vec::new(),
            hero: None,
            features: Vec::new(),
        })
    }

    /// Shorthand for a linkless group.
    pub fn dir(title: impl Into<String>, children: Vec<NavItem>) -> Self {
        NavItem::Dir(DirItem {
            title: title.into(),
            link: None,
            flags: NavFlags::default(),
            children,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum NavKind {
    File,
    Dir,
    Heading,
}

/// Loose wire form of [`NavItem`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNavItem {
    #[serde(default)]
    title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<NavKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    children: Option<Vec<NavItem>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_nav: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nav_title: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    sidebar_ignore: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    hero: Option<Hero>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    features: Vec<Feature>,
}

impl RawNavItem {
    fn infer_kind(&self) -> NavKind {
        if let Some(kind) = self.kind {
            return kind;
        }
        match (&self.link, &self.children) {
            (Some(link), None) if link.starts_with('#') => NavKind::Heading,
            (Some(_), None) => NavKind::File,
            // A page whose children are only its own anchors.
            (Some(_), Some(children))
                if !children.is_empty()
                    && children.iter().all(|c| matches!(c, NavItem::Heading(_))) =>
            {
                NavKind::File
            }
            _ => NavKind::Dir,
        }
    }
}

impl From<RawNavItem> for NavItem {
    fn from(raw: RawNavItem) -> Self {
        let kind = raw.infer_kind();
        let flags = NavFlags {
            is_nav: raw.is_nav,
            nav_title: raw.nav_title,
            sidebar_ignore: raw.sidebar_ignore,
        };
        match kind {
            NavKind::Heading => NavItem::Heading(HeadingItem {
                title: raw.title,
                link: raw.link.unwrap_or_default(),
            }),
            NavKind::File => NavItem::File(FileItem {
                title: raw.title,
                link: raw.link.unwrap_or_default(),
                flags,
                headings: raw
                    .children
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|child| match child {
                        NavItem::Heading(h) => Some(h),
                        _ => None,
                    })
                    .collect(),
                hero: raw.hero,
                features: raw.features,
            }),
            NavKind::Dir => NavItem::Dir(DirItem {
                title: raw.title,
                link: raw.link,
                flags,
                children: raw.children.unwrap_or_default(),
            }),
        }
    }
}

impl From<NavItem> for RawNavItem {
    fn from(item: NavItem) -> Self {
        match item {
            NavItem::Heading(h) => RawNavItem {
                title: h.title,
                link: Some(h.link),
                kind: Some(NavKind::Heading),
                ..Default::default()
            },
            NavItem::File(f) => RawNavItem {
                title: f.title,
                link: Some(f.link),
                kind: Some(NavKind::File),
                children: (!f.headings.is_empty())
                    .then(|| f.headings.into_iter().map(NavItem::Heading).collect()),
                is_nav: f.flags.is_nav,
                nav_title: f.flags.nav_title,
                sidebar_ignore: f.flags.sidebar_ignore,
                hero: f.hero,
                features: f.features,
            },
            NavItem::Dir(d) => RawNavItem {
                title: d.title,
                link: d.link,
                kind: Some(NavKind::Dir),
                children: Some(d.children),
                is_nav: d.flags.is_nav,
                nav_title: d.flags.nav_title,
                sidebar_ignore: d.flags.sidebar_ignore,
                ..Default::default()
            },
        }
    }
}

/// One language's tree in i18n mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSidebar {
    /// Display name, e.g. `English`.
    pub name: String,
    pub data: Vec<NavItem>,
}

/// Either a single tree or one tree per language code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SidebarConfig {
    Flat(Vec<NavItem>),
    I18n(BTreeMap<String, LanguageSidebar>),
}

impl Default for SidebarConfig {
    fn default() -> Self {
        SidebarConfig::Flat(Vec::new())
    }
}

/// The `book.json` document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookConfig {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default)]
    pub sidebar: SidebarConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nav: Vec<NavItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub display_rank: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub home_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

impl BookConfig {
    /// Language codes in config order; empty outside i18n mode.
    pub fn language_codes(&self) -> Vec<&str> {
        match &self.sidebar {
            SidebarConfig::Flat(_) => Vec::new(),
            SidebarConfig::I18n(map) => map.keys().map(String::as_str).collect(),
        }
    }
}
