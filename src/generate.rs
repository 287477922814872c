//! Static site generation.
//!
//! Renders a resolved book to plain HTML files. Every route of every
//! language becomes a file:
//!
//! | Route target | Output |
//! |--------------|--------|
//! | Markdown page | `{lang}/{path}/index.html` with navbar, sidebar, article, prev/next |
//! | Redirect | `{lang}/{path}/index.html` holding a meta refresh |
//! | Catch-all | `{lang}/404.html` |
//!
//! In i18n mode the root `index.html` picks a language from the browser's
//! preferences and redirects, and the root `404.html` is the fallback
//! language's.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                # home route (or language picker)
//! ├── 404.html
//! ├── style.3f9a1c2e.css        # theme variables + base styles, content-hashed
//! ├── book.json
//! ├── guide/
//! │   ├── index.html
//! │   └── install/index.html
//! └── 001-guide/
//!     ├── README.md             # Markdown sources, copied as-is
//!     ├── 001-install.md
//!     └── 001-install/index.html  # ranked alias → /guide/install
//! ```
//!
//! Markdown sources keep their raw paths so `md_path` links and prefetch
//! hints resolve against the output.
//!
//! ## HTML Generation
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating. A
//! `--template` file may replace the outer document; see [`Template`].

use crate::config::{self, CONFIG_FILE, ProjectConfig};
use crate::i18n::{self, UiStrings};
use crate::links::{self, capitalize};
use crate::metadata::{self, Slugger};
use crate::plugins::{PluginContext, PluginError, PluginSet};
use crate::resolve::{self, PageRef, ResolvedBook, ResolvedItem, ResolvedPage, RouteTarget};
use crate::scan::BOOK_FILE;
use crate::types::BookConfig;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use percent_encoding::percent_decode_str;
use pulldown_cmark::{Event, Parser, Tag, TagEnd, html as md_html};
use rayon::prelude::*;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
    #[error(transparent)]
    Plugin(#[from] PluginError),
    #[error("Cannot read {path}: {source}")]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },
}

const CSS_STATIC: &str = include_str!("../static/style.css");

/// Hex digits of the content hash kept in the stylesheet name.
const HASH_LEN: usize = 8;

const GENERATOR_URL: &str = "https://github.com/quire-docs/quire";

/// What a build wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub output: PathBuf,
    /// Language codes rendered; empty outside i18n mode.
    pub languages: Vec<String>,
    pub pages: usize,
    pub redirects: usize,
    /// Source files copied into the output.
    pub sources: usize,
    pub stylesheet: String,
}

/// A user-supplied HTML shell with `{{ title }}`, `{{ head }}` and
/// `{{ body }}` placeholders.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
}

static PLACEHOLDER: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(title|head|body)\s*\}\}"));

impl Template {
    pub fn new(source: impl Into<String>) -> Self {
        Template {
            source: source.into(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let source = fs::read_to_string(path).map_err(|source| GenerateError::Source {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Template::new(source))
    }

    pub fn render(&self, title: &str, head: &Markup, body: &Markup) -> String {
        let Ok(re) = &*PLACEHOLDER else {
            return self.source.clone();
        };
        let title = html! { (title) }.into_string();
        re.replace_all(&self.source, |caps: &regex::Captures| match &caps[1] {
            "title" => title.clone(),
            "head" => head.0.clone(),
            _ => body.0.clone(),
        })
        .into_owned()
    }
}

/// Shared state of one build.
struct Site<'a> {
    config: &'a BookConfig,
    docs_dir: &'a Path,
    plugins: PluginSet,
    stylesheet: String,
    icon: Option<String>,
    template: Option<&'a Template>,
}

enum Job<'a> {
    Page {
        book: &'a ResolvedBook,
        page: &'a ResolvedPage,
        title: &'a str,
    },
    Redirect {
        to: String,
    },
    NotFound {
        book: &'a ResolvedBook,
    },
    LanguagePicker {
        codes: &'a [&'a str],
        fallback: &'a str,
    },
}

/// Render `book` into `output_dir`.
pub fn generate(
    book: &BookConfig,
    project: &ProjectConfig,
    docs_dir: &Path,
    output_dir: &Path,
    template: Option<&Template>,
) -> Result<BuildSummary, GenerateError> {
    fs::create_dir_all(output_dir)?;

    let plugins = PluginSet::load(
        &project.plugins,
        &PluginContext {
            github: book.github.clone(),
            source_branch: book.source_branch.clone(),
            project_root: docs_dir.to_path_buf(),
        },
    )?;
    if !plugins.is_empty() {
        tracing::debug!("plugins: {}", plugins.names().join(", "));
    }

    let css = format!("{}\n\n{}", config::generate_theme_css(&project.theme), CSS_STATIC);
    let stylesheet = format!("style.{}.css", &content_hash(&css)[..HASH_LEN]);
    fs::write(output_dir.join(&stylesheet), &css)?;

    let sources = copy_sources(docs_dir, output_dir)?;
    let icon = icon_href(&book.icon, docs_dir, output_dir)?;
    fs::write(
        output_dir.join(BOOK_FILE),
        serde_json::to_string_pretty(book)? + "\n",
    )?;

    let codes = book.language_codes();
    let fallback = i18n::fallback_language(project.fallback_language.as_deref(), &codes);
    let books = ResolvedBook::resolve_all(book);

    let mut seen = HashSet::new();
    let mut jobs = Vec::new();
    for resolved in &books {
        plan_routes(resolved, output_dir, &mut seen, &mut jobs);
    }
    if let Some(fallback) = fallback {
        jobs.push((
            output_dir.join("index.html"),
            Job::LanguagePicker {
                codes: &codes,
                fallback,
            },
        ));
        if let Some(book) = books.iter().find(|b| b.lang.as_deref() == Some(fallback)) {
            jobs.push((output_dir.join("404.html"), Job::NotFound { book }));
        }
    }

    let site = Site {
        config: book,
        docs_dir,
        plugins,
        stylesheet: format!("/{stylesheet}"),
        icon,
        template,
    };

    jobs.par_iter()
        .map(|(path, job)| {
            let html = site.render(job)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, html)?;
            tracing::debug!("wrote {}", path.display());
            Ok(())
        })
        .collect::<Result<Vec<()>, GenerateError>>()?;

    let summary = BuildSummary {
        output: output_dir.to_path_buf(),
        languages: codes.iter().map(|c| c.to_string()).collect(),
        pages: jobs
            .iter()
            .filter(|(_, job)| matches!(job, Job::Page { .. }))
            .count(),
        redirects: jobs
            .iter()
            .filter(|(_, job)| matches!(job, Job::Redirect { .. }))
            .count(),
        sources,
        stylesheet,
    };
    tracing::info!(
        "generated {} pages and {} redirects in {}",
        summary.pages,
        summary.redirects,
        output_dir.display()
    );
    Ok(summary)
}

/// One job per distinct output file; the first route claiming a path wins.
fn plan_routes<'a>(
    book: &'a ResolvedBook,
    output_dir: &Path,
    seen: &mut HashSet<PathBuf>,
    jobs: &mut Vec<(PathBuf, Job<'a>)>,
) {
    let lang = book.lang.as_deref();
    for route in &book.routes {
        let (path, job) = match &route.target {
            RouteTarget::Redirect(to) => (
                route_file(output_dir, lang, &route.pattern),
                Job::Redirect {
                    to: site_href(lang, to),
                },
            ),
            RouteTarget::Content(PageRef::Markdown { link, .. }) => {
                let Some(page) = book.page(link) else {
                    tracing::warn!("route {} names an unknown page {link}", route.pattern);
                    continue;
                };
                (
                    route_file(output_dir, lang, &route.pattern),
                    Job::Page {
                        book,
                        page,
                        title: route.title.as_deref().unwrap_or(&book.title),
                    },
                )
            }
            RouteTarget::Content(PageRef::NotFound) => {
                let mut path = output_dir.to_path_buf();
                path.extend(lang);
                (path.join("404.html"), Job::NotFound { book })
            }
        };
        if seen.insert(path.clone()) {
            jobs.push((path, job));
        }
    }
}

/// File a route pattern is served from: `/guide/install` →
/// `{out}/{lang}/guide/install/index.html`.
pub fn route_file(output_dir: &Path, lang: Option<&str>, pattern: &str) -> PathBuf {
    let decoded = percent_decode_str(pattern).decode_utf8_lossy();
    let mut path = output_dir.to_path_buf();
    path.extend(lang);
    for segment in decoded
        .split('/')
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    {
        path.push(segment);
    }
    path.join("index.html")
}

/// Public href for an in-book link: language-prefixed unless external or
/// an in-page anchor.
pub fn site_href(lang: Option<&str>, link: &str) -> String {
    match lang {
        Some(lang) if !links::is_external(link) && link.starts_with('/') => {
            format!("/{lang}{link}")
        }
        _ => link.to_string(),
    }
}

fn content_hash(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

/// Copy the docs tree into the output so Markdown sources and assets are
/// served at their raw paths. Hidden entries, the config file and the output
/// directory itself are skipped.
fn copy_sources(docs_dir: &Path, output_dir: &Path) -> Result<usize, GenerateError> {
    let output = output_dir.canonicalize()?;
    let mut copied = 0;
    let walker = WalkDir::new(docs_dir).into_iter().filter_entry(|e| {
        let hidden = e.depth() > 0 && e.file_name().to_string_lossy().starts_with('.');
        let is_output = e.path().canonicalize().is_ok_and(|p| p == output);
        !hidden && !is_output
    });
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || entry.file_name() == CONFIG_FILE {
            continue;
        }
        let Ok(rel) = entry.path().strip_prefix(docs_dir) else {
            continue;
        };
        let dest = output_dir.join(rel);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &dest)?;
        copied += 1;
    }
    Ok(copied)
}

/// Where the icon is served from. A local file outside the docs tree is
/// copied to the output root.
fn icon_href(icon: &str, docs_dir: &Path, output_dir: &Path) -> Result<Option<String>, GenerateError> {
    if icon.is_empty() {
        return Ok(None);
    }
    if links::is_external(icon) || icon.starts_with("data:") {
        return Ok(Some(icon.to_string()));
    }
    let rel = icon.trim_start_matches('/');
    if docs_dir.join(rel).is_file() {
        return Ok(Some(format!("/{rel}")));
    }
    let local = Path::new(icon);
    if let (true, Some(name)) = (local.is_file(), local.file_name()) {
        fs::copy(local, output_dir.join(name))?;
        return Ok(Some(format!("/{}", name.to_string_lossy())));
    }
    tracing::warn!("icon {icon} not found; linking as-is");
    Ok(Some(icon.to_string()))
}

/// Render Markdown with heading ids from [`Slugger`], matching the anchors
/// recorded at scan time.
pub fn render_markdown(markdown: &str) -> String {
    let mut events: Vec<Event> = Parser::new_ext(markdown, metadata::markdown_options()).collect();
    let mut slugger = Slugger::default();

    for i in 0..events.len() {
        let Event::Start(Tag::Heading { id, .. }) = &events[i] else {
            continue;
        };
        let explicit = id.as_ref().map(|id| id.to_string());
        let text: String = events[i + 1..]
            .iter()
            .take_while(|e| !matches!(e, Event::End(TagEnd::Heading(_))))
            .filter_map(|e| match e {
                Event::Text(t) | Event::Code(t) => Some(&**t),
                _ => None,
            })
            .collect();
        let slug = slugger.id_for(text.trim(), explicit.as_deref());
        if let Event::Start(Tag::Heading { id, .. }) = &mut events[i] {
            *id = Some(slug.into());
        }
    }

    let mut out = String::new();
    md_html::push_html(&mut out, events.into_iter());
    out
}

impl Site<'_> {
    fn render(&self, job: &Job) -> Result<String, GenerateError> {
        Ok(match job {
            Job::Page { book, page, title } => self.render_page(book, page, title)?,
            Job::Redirect { to } => render_redirect(to).into_string(),
            Job::NotFound { book } => self.render_not_found(book),
            Job::LanguagePicker { codes, fallback } => {
                render_language_picker(codes, fallback).into_string()
            }
        })
    }

    fn source_path(&self, lang: Option<&str>, page: &ResolvedPage) -> PathBuf {
        let mut path = self.docs_dir.to_path_buf();
        path.extend(lang);
        path.join(page.origin_link.trim_start_matches('/'))
    }

    fn render_page(
        &self,
        book: &ResolvedBook,
        page: &ResolvedPage,
        title: &str,
    ) -> Result<String, GenerateError> {
        let lang = book.lang.as_deref();
        let ui = i18n::ui_strings(lang);
        let path = self.source_path(lang, page);
        let content = metadata::read_markdown(&path).map_err(|source| GenerateError::Source {
            path: path.clone(),
            source,
        })?;
        let (_, body) = metadata::split_front_matter(&content);
        let article = render_markdown(&self.plugins.expand(body));

        let neighbours = book.neighbours(&page.link);
        let edit = resolve::edit_link(self.config, lang, page);
        let hints: Vec<String> = [&neighbours.prev, &neighbours.next]
            .into_iter()
            .flatten()
            .map(|p| book.md_path(p))
            .collect();

        let main = html! {
            @if book.is_home(&page.link) {
                (render_home(page, lang))
            }
            article { (PreEscaped(article)) }
            @if let Some(edit) = edit {
                div.page-meta { a href=(edit) target="_blank" rel="noopener" { (ui.edit_on_github) } }
            }
            nav.page-nav {
                @if let Some(prev) = &neighbours.prev {
                    a.prev href=(site_href(lang, &prev.link)) {
                        small { (ui.previous) }
                        (capitalize(&prev.title))
                    }
                }
                @if let Some(next) = &neighbours.next {
                    a.next href=(site_href(lang, &next.link)) {
                        small { (ui.next) }
                        (capitalize(&next.title))
                    }
                }
            }
        };
        let head = html! {
            @for hint in &hints {
                link rel="prefetch" href=(hint);
            }
        };
        Ok(self.layout(book, &page.link, title, head, main))
    }

    fn render_not_found(&self, book: &ResolvedBook) -> String {
        let lang = book.lang.as_deref();
        let ui = i18n::ui_strings(lang);
        let main = html! {
            div.not-found {
                h1 { "404" }
                p { (ui.not_found) }
                a href=(site_href(lang, "/")) { (ui.back_home) }
            }
        };
        let title = links::route_title(ui.not_found, &book.title);
        self.layout(book, "", &title, html! {}, main)
    }

    fn layout(&self, book: &ResolvedBook, path: &str, title: &str, head: Markup, main: Markup) -> String {
        let lang = book.lang.as_deref();
        let home = book.home_mode.then_some(book.home_page.as_str());
        let body = html! {
            (self.navbar(book, path))
            div.layout {
                aside.sidebar {
                    (render_sidebar(&book.current_sidebar(path), path, lang, home))
                }
                main.content {
                    (main)
                    (self.footer(i18n::ui_strings(lang)))
                }
            }
        };
        self.document(lang, title, head, body)
    }

    fn document(&self, lang: Option<&str>, title: &str, extra_head: Markup, body: Markup) -> String {
        let head = html! {
            meta charset="UTF-8";
            meta name="viewport" content="width=device-width, initial-scale=1.0";
            link rel="stylesheet" href=(self.stylesheet);
            @if let Some(icon) = &self.icon {
                link rel="icon" href=(icon);
            }
            (extra_head)
        };
        match self.template {
            Some(template) => template.render(title, &head, &body),
            None => base_document(lang, title, head, body).into_string(),
        }
    }

    fn navbar(&self, book: &ResolvedBook, path: &str) -> Markup {
        let lang = book.lang.as_deref();
        html! {
            header.navbar {
                a.brand href=(site_href(lang, "/")) {
                    @if let Some(icon) = &self.icon {
                        img src=(icon) alt="";
                    }
                    span { (book.title) }
                }
                nav {
                    @for entry in &book.nav {
                        @let target = entry.landing.as_deref().or(entry.link.as_deref());
                        @let active = !entry.external
                            && entry.link.as_deref().is_some_and(|l| l != "/" && path.starts_with(l));
                        @match target {
                            Some(target) => {
                                a href=(site_href(lang, target)) class=[active.then_some("active")] {
                                    (capitalize(&entry.title))
                                }
                            }
                            None => {
                                span { (capitalize(&entry.title)) }
                            }
                        }
                    }
                }
                (render_language_switcher(book, path))
            }
        }
    }

    fn footer(&self, ui: &UiStrings) -> Markup {
        let content = match self.config.footer.as_deref().filter(|f| !f.trim().is_empty()) {
            Some(footer) => render_markdown(footer),
            None => {
                let link = html! { a href=(GENERATOR_URL) { "quire" } }.into_string();
                ui.footer.replace("$1", &link)
            }
        };
        html! { footer { (PreEscaped(content)) } }
    }
}

// ============================================================================
// HTML Components
// ============================================================================

/// Renders the base HTML document structure
fn base_document(lang: Option<&str>, title: &str, head: Markup, body: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang=(lang.unwrap_or("en")) {
            head {
                title { (title) }
                (head)
            }
            body { (body) }
        }
    }
}

/// Sidebar tree. `sidebarIgnore` pages and, in home mode, the home page are
/// left out; the page at `current` is marked active.
pub fn render_sidebar(
    items: &[ResolvedItem],
    current: &str,
    lang: Option<&str>,
    home: Option<&str>,
) -> Markup {
    html! {
        ul {
            @for item in items {
                (render_sidebar_item(item, current, lang, home))
            }
        }
    }
}

fn render_sidebar_item(item: &ResolvedItem, current: &str, lang: Option<&str>, home: Option<&str>) -> Markup {
    match item {
        ResolvedItem::Page(page) => {
            if page.flags.sidebar_ignore || home == Some(page.link.as_str()) {
                return html! {};
            }
            let active = page.link == current;
            html! {
                li {
                    a href=(site_href(lang, &page.link)) class=[active.then_some("active")] {
                        (capitalize(&page.title))
                    }
                    @if active && !page.headings.is_empty() {
                        ul.anchors {
                            @for heading in &page.headings {
                                li { a href=(heading.link) { (heading.title) } }
                            }
                        }
                    }
                }
            }
        }
        ResolvedItem::Section(section) => {
            if section.flags.sidebar_ignore {
                return html! {};
            }
            html! {
                li {
                    span.section-title { (capitalize(&section.title)) }
                    (render_sidebar(&section.children, current, lang, home))
                }
            }
        }
        ResolvedItem::Anchor(heading) => html! {
            li { a href=(heading.link) { (heading.title) } }
        },
    }
}

fn render_language_switcher(book: &ResolvedBook, path: &str) -> Markup {
    if book.languages.len() < 2 {
        return html! {};
    }
    let codes: Vec<&str> = book.languages.iter().map(|l| l.code.as_str()).collect();
    let current = site_href(book.lang.as_deref(), if path.is_empty() { "/" } else { path });
    let ui = i18n::ui_strings(book.lang.as_deref());
    html! {
        div.languages title=(ui.language) {
            @for language in &book.languages {
                @let active = book.lang.as_deref() == Some(language.code.as_str());
                a href=(i18n::switch_language(&current, &language.code, &codes))
                    hreflang=(language.code)
                    class=[active.then_some("active")] {
                    (language.name)
                }
            }
        }
    }
}

fn render_home(page: &ResolvedPage, lang: Option<&str>) -> Markup {
    html! {
        @if let Some(hero) = &page.hero {
            section.hero {
                h1 { (hero.title) }
                @if !hero.desc.is_empty() {
                    p { (hero.desc) }
                }
                @if !hero.actions.is_empty() {
                    div.actions {
                        @for action in &hero.actions {
                            a href=(site_href(lang, &action.link)) { (action.text) }
                        }
                    }
                }
            }
        }
        @if !page.features.is_empty() {
            section.features {
                @for feature in &page.features {
                    div.feature {
                        @if let Some(icon) = &feature.icon {
                            div.icon { (icon) }
                        }
                        h3 { (feature.title) }
                        p { (feature.desc) }
                    }
                }
            }
        }
    }
}

fn render_redirect(to: &str) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                meta http-equiv="refresh" content=(format!("0; url={to}"));
                link rel="canonical" href=(to);
                title { "Redirecting" }
            }
            body {
                a href=(to) { (to) }
            }
        }
    }
}

/// Root page of an i18n site: redirect to the reader's preferred language,
/// exact code first, then primary subtag, else `fallback`.
fn render_language_picker(codes: &[&str], fallback: &str) -> Markup {
    let list = serde_json::to_string(codes).unwrap_or_else(|_| "[]".to_string());
    let fallback_json = serde_json::to_string(fallback).unwrap_or_else(|_| "\"\"".to_string());
    let script = format!(
        r#"(function () {{
  var codes = {list};
  var prefs = navigator.languages || [navigator.language || ""];
  var lower = codes.map(function (c) {{ return c.toLowerCase(); }});
  var pick = {fallback_json};
  for (var i = 0; i < prefs.length; i++) {{
    var want = (prefs[i] || "").toLowerCase();
    var exact = lower.indexOf(want);
    if (exact >= 0) {{ pick = codes[exact]; break; }}
    var primary = lower.indexOf(want.split("-")[0]);
    if (primary >= 0) {{ pick = codes[primary]; break; }}
  }}
  location.replace("/" + pick + "/" + location.search + location.hash);
}})();"#
    );
    let to = format!("/{fallback}/");
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                title { "Redirecting" }
                script { (PreEscaped(script)) }
                noscript {
                    meta http-equiv="refresh" content=(format!("0; url={to}"));
                }
            }
            body {
                ul {
                    @for code in codes {
                        li { a href=(format!("/{code}/")) hreflang=(code) { (i18n::language_name(code)) } }
                    }
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
