//! Route and sidebar resolution.
//!
//! Stage 2 of the quire pipeline. Turns a [`BookConfig`] (one language of it)
//! into everything a page needs to render, as a pure function of the config
//! and the current location:
//!
//! ```text
//! BookConfig ──normalize──▶ tree (user links)
//!                             ├─ flatten ──▶ links (pages, depth-first)
//!                             ├─ nav ──────▶ nav entries + nav redirects
//!                             └─ routes ───▶ page routes, aliases, `/`, `*`
//! ```
//!
//! ## Route table order
//!
//! 1. Nav redirects: an `isNav` directory whose link differs from its first
//!    child's link redirects there.
//! 2. Per page, in depth-first order: the primary route, then a redirect from
//!    the full path (`/guide/README`) when it differs, then, outside
//!    display-rank mode, a redirect from the ranked path
//!    (`/001-guide/002-start`) when it differs.
//! 3. If no page route is `/`, a redirect from `/` to the first page route.
//! 4. The catch-all `*`, which renders the not-found view.
//!
//! Matching walks the table in order and the first exact pattern wins, so
//! the catch-all only applies when nothing else does.
//!
//! ## Sidebar scoping
//!
//! While the current page sits inside an `isNav` directory, the sidebar shows
//! only that directory's children. Everywhere else it shows the whole tree
//! minus every `isNav` directory, at any depth.

use crate::i18n::{self, Language};
use crate::links::{self, link_path, md_path, route_title, user_link};
use crate::types::{
    BookConfig, Feature, HeadingItem, Hero, NavFlags, NavItem, SidebarConfig,
};
use serde::Serialize;

/// Pattern of the catch-all route.
pub const CATCH_ALL: &str = "*";

/// A page with its derived links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPage {
    pub title: String,
    /// Canonical user path, e.g. `/guide/`.
    pub link: String,
    /// Full resolved path, e.g. `/guide/README`.
    pub full_path: String,
    /// Raw source path, e.g. `/001-guide/README.md`.
    pub origin_link: String,
    pub flags: NavFlags,
    pub headings: Vec<HeadingItem>,
    pub hero: Option<Hero>,
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSection {
    pub title: String,
    pub link: Option<String>,
    pub flags: NavFlags,
    pub children: Vec<ResolvedItem>,
}

/// A navigation node after link normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedItem {
    Page(ResolvedPage),
    Section(ResolvedSection),
    Anchor(HeadingItem),
}

impl ResolvedItem {
    pub fn title(&self) -> &str {
        match self {
            ResolvedItem::Page(p) => &p.title,
            ResolvedItem::Section(s) => &s.title,
            ResolvedItem::Anchor(h) => &h.title,
        }
    }

    pub fn link(&self) -> Option<&str> {
        match self {
            ResolvedItem::Page(p) => Some(&p.link),
            ResolvedItem::Section(s) => s.link.as_deref(),
            ResolvedItem::Anchor(h) => Some(&h.link),
        }
    }
}

/// An entry of the top navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// First child's link, for entries that point at a directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landing: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
}

/// What a route shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RouteTarget {
    Redirect(String),
    Content(PageRef),
}

/// Content reference of a rendering route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageRef {
    Markdown {
        /// Canonical user path of the page.
        link: String,
        #[serde(rename = "originLink")]
        origin_link: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
    },
    NotFound,
}

/// One row of the route table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteItem {
    pub pattern: String,
    #[serde(flatten)]
    pub target: RouteTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl RouteItem {
    fn redirect(pattern: impl Into<String>, to: impl Into<String>) -> Self {
        RouteItem {
            pattern: pattern.into(),
            target: RouteTarget::Redirect(to.into()),
            title: None,
        }
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match &self.target {
            RouteTarget::Redirect(to) => Some(to),
            RouteTarget::Content(_) => None,
        }
    }
}

/// Previous and next pages around the current one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbours {
    pub prev: Option<ResolvedPage>,
    pub next: Option<ResolvedPage>,
}

/// One language of a book, fully resolved.
#[derive(Debug, Clone)]
pub struct ResolvedBook {
    pub title: String,
    /// Active language; `None` outside i18n mode.
    pub lang: Option<String>,
    pub languages: Vec<Language>,
    pub display_rank: bool,
    pub home_mode: bool,
    pub tree: Vec<ResolvedItem>,
    pub nav: Vec<NavEntry>,
    pub routes: Vec<RouteItem>,
    /// Link of the home page, or empty when the book has no pages.
    pub home_page: String,
}

impl ResolvedBook {
    /// Resolve one language of `config`.
    ///
    /// In i18n mode an unknown or missing `lang` resolves the first language.
    pub fn resolve(config: &BookConfig, lang: Option<&str>) -> Self {
        Self::resolve_with_fallback(config, lang, None)
    }

    /// Like [`ResolvedBook::resolve`], but an unknown or missing `lang`
    /// resolves `fallback` when the book has it.
    pub fn resolve_with_fallback(
        config: &BookConfig,
        lang: Option<&str>,
        fallback: Option<&str>,
    ) -> Self {
        let (items, lang, languages) = select_sidebar(config, lang, fallback);
        let tree = normalize(items, config.display_rank);
        let nav = nav_entries(&tree, &config.nav);

        let mut routes = nav_routes(&nav);
        routes.extend(page_routes(
            &flatten(&tree),
            &config.title,
            lang.as_deref(),
            config.display_rank,
        ));
        let home_page = home_page(&routes);

        ResolvedBook {
            title: config.title.clone(),
            lang,
            languages,
            display_rank: config.display_rank,
            home_mode: config.home_mode,
            tree,
            nav,
            routes,
            home_page,
        }
    }

    /// Every language of `config` in code order, or the one tree of a flat
    /// book.
    pub fn resolve_all(config: &BookConfig) -> Vec<Self> {
        let codes = config.language_codes();
        if codes.is_empty() {
            return vec![Self::resolve(config, None)];
        }
        codes
            .iter()
            .map(|code| Self::resolve(config, Some(code)))
            .collect()
    }

    /// Every page, depth-first in sidebar order.
    pub fn links(&self) -> Vec<&ResolvedPage> {
        flatten(&self.tree)
    }

    /// The page whose canonical link is `link`.
    pub fn page(&self, link: &str) -> Option<&ResolvedPage> {
        self.links().into_iter().find(|p| p.link == link)
    }

    /// First route matching `path`, falling through to the catch-all.
    pub fn match_route(&self, path: &str) -> Option<&RouteItem> {
        let path = links::encode_path(path);
        self.routes
            .iter()
            .find(|r| r.pattern == path)
            .or_else(|| self.routes.iter().find(|r| r.pattern == CATCH_ALL))
    }

    /// Sidebar as shown while viewing `path`.
    pub fn current_sidebar(&self, path: &str) -> Vec<ResolvedItem> {
        current_sidebar(&self.tree, path)
    }

    /// Pages reachable with previous/next links while viewing `path`.
    ///
    /// Skips `sidebarIgnore` pages and, in home mode, the home page.
    pub fn current_links(&self, path: &str) -> Vec<ResolvedPage> {
        flatten(&self.current_sidebar(path))
            .into_iter()
            .filter(|p| !p.flags.sidebar_ignore)
            .filter(|p| !(self.home_mode && p.link == self.home_page))
            .cloned()
            .collect()
    }

    pub fn neighbours(&self, path: &str) -> Neighbours {
        let mut links = self.current_links(path);
        let Some(index) = links.iter().position(|p| p.link == path) else {
            return Neighbours::default();
        };
        let next = links.get(index + 1).cloned();
        let prev = index.checked_sub(1).map(|i| links.swap_remove(i));
        Neighbours { prev, next }
    }

    /// Whether `path` renders the homepage hero layout.
    pub fn is_home(&self, path: &str) -> bool {
        self.home_mode && !self.home_page.is_empty() && path == self.home_page
    }

    /// Where a page's Markdown source is served from.
    pub fn md_path(&self, page: &ResolvedPage) -> String {
        md_path(&page.origin_link, self.lang.as_deref())
    }

    /// Markdown sources worth prefetching: every page, in order.
    pub fn prefetch_hints(&self) -> Vec<String> {
        self.links().into_iter().map(|p| self.md_path(p)).collect()
    }
}

/// "Edit on GitHub" URL for a page, if the book names a repository.
///
/// `{github}/blob/{branch}/{sourceDir}/{lang}{origin}`; the branch defaults
/// to `main`.
pub fn edit_link(config: &BookConfig, lang: Option<&str>, page: &ResolvedPage) -> Option<String> {
    let github = config.github.as_deref()?.trim_end_matches('/');
    if github.is_empty() || links::is_external(&page.origin_link) {
        return None;
    }
    let branch = config
        .source_branch
        .as_deref()
        .filter(|b| !b.is_empty())
        .unwrap_or("main");
    let mut url = format!("{github}/blob/{branch}");
    if let Some(dir) = config
        .source_dir
        .as_deref()
        .map(|d| d.trim_matches('/'))
        .filter(|d| !d.is_empty() && *d != ".")
    {
        url.push('/');
        url.push_str(dir.trim_start_matches("./"));
    }
    url.push_str(&md_path(&page.origin_link, lang));
    Some(url)
}

fn select_sidebar<'a>(
    config: &'a BookConfig,
    lang: Option<&str>,
    fallback: Option<&str>,
) -> (&'a [NavItem], Option<String>, Vec<Language>) {
    match &config.sidebar {
        SidebarConfig::Flat(items) => (items.as_slice(), None, Vec::new()),
        SidebarConfig::I18n(map) => {
            let languages = map
                .iter()
                .map(|(code, sidebar)| Language {
                    code: code.clone(),
                    name: sidebar.name.clone(),
                })
                .collect();
            let codes = config.language_codes();
            let chosen = lang
                .and_then(|want| codes.iter().copied().find(|c| *c == want))
                .or_else(|| i18n::fallback_language(fallback, &codes));
            match chosen.and_then(|code| map.get_key_value(code)) {
                Some((code, sidebar)) => (sidebar.data.as_slice(), Some(code.clone()), languages),
                None => (&[][..], None, languages),
            }
        }
    }
}

/// Derive user links for every node of a tree.
pub fn normalize(items: &[NavItem], display_rank: bool) -> Vec<ResolvedItem> {
    items
        .iter()
        .map(|item| match item {
            NavItem::File(f) => ResolvedItem::Page(ResolvedPage {
                title: f.title.clone(),
                link: user_link(&f.link, display_rank),
                full_path: link_path(&f.link, display_rank),
                origin_link: f.link.clone(),
                flags: f.flags.clone(),
                headings: f.headings.clone(),
                hero: f.hero.clone(),
                features: f.features.clone(),
            }),
            NavItem::Dir(d) => ResolvedItem::Section(ResolvedSection {
                title: d.title.clone(),
                link: d.link.as_deref().map(|l| user_link(l, display_rank)),
                flags: d.flags.clone(),
                children: normalize(&d.children, display_rank),
            }),
            NavItem::Heading(h) => ResolvedItem::Anchor(h.clone()),
        })
        .collect()
}

/// Depth-first list of pages. Anchors are not pages.
pub fn flatten(items: &[ResolvedItem]) -> Vec<&ResolvedPage> {
    let mut out = Vec::new();
    fn walk<'a>(items: &'a [ResolvedItem], out: &mut Vec<&'a ResolvedPage>) {
        for item in items {
            match item {
                ResolvedItem::Page(p) => out.push(p),
                ResolvedItem::Section(s) => walk(&s.children, out),
                ResolvedItem::Anchor(_) => {}
            }
        }
    }
    walk(items, &mut out);
    out
}

/// Tree-derived `isNav` entries followed by the config's own nav entries.
///
/// A flagged directory qualifies only with children. Flagged nodes are not
/// searched further.
pub fn nav_entries(tree: &[ResolvedItem], config_nav: &[NavItem]) -> Vec<NavEntry> {
    let mut nav = Vec::new();
    fn walk(items: &[ResolvedItem], nav: &mut Vec<NavEntry>) {
        for item in items {
            match item {
                ResolvedItem::Page(p) if p.flags.is_nav => nav.push(NavEntry {
                    title: p.flags.nav_title.clone().unwrap_or_else(|| p.title.clone()),
                    link: Some(p.link.clone()),
                    landing: None,
                    external: false,
                }),
                ResolvedItem::Section(s) if s.flags.is_nav => {
                    if !s.children.is_empty() {
                        nav.push(NavEntry {
                            title: s.flags.nav_title.clone().unwrap_or_else(|| s.title.clone()),
                            link: s.link.clone(),
                            landing: s.children[0].link().map(String::from),
                            external: false,
                        });
                    }
                }
                ResolvedItem::Section(s) => walk(&s.children, nav),
                _ => {}
            }
        }
    }
    walk(tree, &mut nav);

    nav.extend(config_nav.iter().map(|item| {
        let title = item
            .flags()
            .and_then(|f| f.nav_title.clone())
            .unwrap_or_else(|| item.title().to_string());
        let link = item.link().map(String::from);
        let landing = match item {
            NavItem::Dir(d) => d.children.first().and_then(|c| c.link()).map(String::from),
            _ => None,
        };
        NavEntry {
            external: link.as_deref().is_some_and(links::is_external),
            title,
            link,
            landing,
        }
    }));
    nav
}

/// Redirects for nav directories that do not land on their own link.
pub fn nav_routes(nav: &[NavEntry]) -> Vec<RouteItem> {
    nav.iter()
        .filter_map(|entry| {
            let link = entry.link.as_deref()?;
            let landing = entry.landing.as_deref()?;
            (link != landing && !entry.external).then(|| RouteItem::redirect(link, landing))
        })
        .collect()
}

/// Page routes with their aliases, the home route, and the catch-all.
pub fn page_routes(
    pages: &[&ResolvedPage],
    book_title: &str,
    lang: Option<&str>,
    display_rank: bool,
) -> Vec<RouteItem> {
    let mut routes = Vec::new();
    for page in pages {
        routes.push(RouteItem {
            pattern: page.link.clone(),
            target: RouteTarget::Content(PageRef::Markdown {
                link: page.link.clone(),
                origin_link: page.origin_link.clone(),
                lang: lang.map(String::from),
            }),
            title: Some(route_title(&page.title, book_title)),
        });

        if page.full_path != page.link {
            routes.push(RouteItem::redirect(&page.full_path, &page.link));
        }

        if !display_rank {
            let ranked = link_path(&page.origin_link, true);
            if ranked != page.link {
                routes.push(RouteItem::redirect(ranked, &page.link));
            }
        }
    }

    if !routes.iter().any(|r| r.pattern == "/")
        && let Some(first) = routes.iter().find(|r| !r.pattern.is_empty())
    {
        let first = first.pattern.clone();
        routes.push(RouteItem::redirect("/", first));
    }

    routes.push(RouteItem {
        pattern: CATCH_ALL.to_string(),
        target: RouteTarget::Content(PageRef::NotFound),
        title: None,
    });
    routes
}

/// The `/` route's redirect target, or `/` itself when a page lives there.
pub fn home_page(routes: &[RouteItem]) -> String {
    routes
        .iter()
        .find(|r| r.pattern == "/")
        .map(|r| r.redirect_target().unwrap_or(&r.pattern).to_string())
        .unwrap_or_default()
}

/// Sidebar scoped to the `isNav` directory holding `path`, or the whole tree
/// without `isNav` directories.
pub fn current_sidebar(tree: &[ResolvedItem], path: &str) -> Vec<ResolvedItem> {
    match active_nav_section(tree, path) {
        Some(section) => section.children.clone(),
        None => without_nav_sections(tree),
    }
}

fn active_nav_section<'a>(items: &'a [ResolvedItem], path: &str) -> Option<&'a ResolvedSection> {
    items.iter().find_map(|item| match item {
        ResolvedItem::Section(s) if s.flags.is_nav && contains_page(&s.children, path) => Some(s),
        ResolvedItem::Section(s) => active_nav_section(&s.children, path),
        _ => None,
    })
}

fn contains_page(items: &[ResolvedItem], path: &str) -> bool {
    flatten(items).iter().any(|p| p.link == path)
}

fn without_nav_sections(items: &[ResolvedItem]) -> Vec<ResolvedItem> {
    items
        .iter()
        .filter_map(|item| match item {
            ResolvedItem::Section(s) if s.flags.is_nav => None,
            ResolvedItem::Section(s) => Some(ResolvedItem::Section(ResolvedSection {
                children: without_nav_sections(&s.children),
                ..s.clone()
            })),
            other => Some(other.clone()),
        })
        .collect()
}
