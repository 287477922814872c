//! Content plugins.
//!
//! A plugin expands a custom tag in page Markdown into HTML before the page
//! is rendered:
//!
//! ```text
//! <gbp-raw src="/src/main.rs" lang="rust" range="1-20, -5"></gbp-raw>
//! <gbp-media src="/assets/demo.mp4" width="480"></gbp-media>
//! ```
//!
//! Plugins are looked up by name in a fixed registry and built from a
//! read-only [`PluginContext`]; nothing is shared between them. Tags for
//! plugins that are not enabled are left untouched.

use maud::{Markup, html};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Unknown plugin {name:?} (available: {available})")]
    Unknown { name: String, available: String },
}

/// What a plugin may know about the book.
#[derive(Debug, Clone, Default)]
pub struct PluginContext {
    /// Repository URL, e.g. `https://github.com/owner/repo`.
    pub github: Option<String>,
    pub source_branch: Option<String>,
    /// Directory that `/`-rooted local sources resolve against.
    pub project_root: PathBuf,
}

impl PluginContext {
    /// Raw-content URL for a `/`-rooted source, if the repository is known.
    pub fn raw_github_url(&self, src: &str) -> Option<String> {
        let github = self.github.as_deref()?;
        let branch = self.source_branch.as_deref()?;
        let repo = github
            .split_once("://")
            .map(|(_, rest)| rest)
            .and_then(|rest| rest.split_once('/'))
            .map(|(_, path)| path.trim_end_matches('/'))?;
        Some(format!(
            "https://raw.githubusercontent.com/{repo}/{branch}{src}"
        ))
    }
}

/// Attributes of a plugin tag.
pub type Attributes = HashMap<String, String>;

pub trait Plugin: Send + Sync {
    /// Tag suffix: `raw` handles `<gbp-raw>`.
    fn name(&self) -> &'static str;
    fn render(&self, attrs: &Attributes) -> Markup;
}

type Factory = fn(&PluginContext) -> Box<dyn Plugin>;

const REGISTRY: &[(&str, Factory)] = &[("raw", RawPlugin::create), ("media", MediaPlugin::create)];

pub fn is_registered(name: &str) -> bool {
    REGISTRY.iter().any(|(n, _)| *n == name)
}

pub fn registered_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|(n, _)| *n).collect()
}

/// The enabled plugins of a build.
#[derive(Default)]
pub struct PluginSet {
    plugins: Vec<Box<dyn Plugin>>,
}

static TAG: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"(?s)<gbp-(?P<name>[a-z][a-z0-9-]*)(?P<attrs>[^>]*?)(?:/>|>(?P<body>.*?)</gbp-(?P<close>[a-z][a-z0-9-]*)\s*>)",
    )
});

static ATTR: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
});

impl PluginSet {
    /// Build the named plugins. Unknown names are an error.
    pub fn load(names: &[String], ctx: &PluginContext) -> Result<Self, PluginError> {
        let plugins = names
            .iter()
            .map(|name| {
                REGISTRY
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, factory)| factory(ctx))
                    .ok_or_else(|| PluginError::Unknown {
                        name: name.clone(),
                        available: registered_names().join(", "),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PluginSet { plugins })
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Replace every tag of an enabled plugin with its rendered HTML.
    pub fn expand(&self, markdown: &str) -> String {
        let Some(tag) = self.tag_regex() else {
            return markdown.to_string();
        };
        tag.replace_all(markdown, |caps: &Captures| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            let name = caps.name("name").map_or("", |m| m.as_str());
            if caps.name("close").is_some_and(|c| c.as_str() != name) {
                return whole.to_string();
            }
            match self.plugins.iter().find(|p| p.name() == name) {
                Some(plugin) => {
                    let attrs = parse_attributes(caps.name("attrs").map_or("", |m| m.as_str()));
                    plugin.render(&attrs).into_string()
                }
                None => whole.to_string(),
            }
        })
        .into_owned()
    }

    fn tag_regex(&self) -> Option<&'static Regex> {
        if self.is_empty() {
            return None;
        }
        match &*TAG {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!("plugin tag pattern: {e}");
                None
            }
        }
    }
}

/// Parse `key="value" key='value' key=value flag` into a map.
pub fn parse_attributes(source: &str) -> Attributes {
    let Ok(re) = &*ATTR else {
        return Attributes::new();
    };
    re.captures_iter(source)
        .map(|c| {
            let key = c[1].to_ascii_lowercase();
            let value = c
                .get(2)
                .or_else(|| c.get(3))
                .or_else(|| c.get(4))
                .map_or(String::new(), |m| m.as_str().to_string());
            (key, value)
        })
        .collect()
}

fn error_block(message: &str) -> Markup {
    html! { div class="gbp-error" { (message) } }
}

// =============================================================================
// raw: embed a source file
// =============================================================================

/// `<gbp-raw src lang range>`: a local file as a code block.
pub struct RawPlugin {
    root: PathBuf,
}

impl RawPlugin {
    fn create(ctx: &PluginContext) -> Box<dyn Plugin> {
        Box::new(RawPlugin {
            root: ctx.project_root.clone(),
        })
    }
}

impl Plugin for RawPlugin {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn render(&self, attrs: &Attributes) -> Markup {
        let Some(src) = attrs.get("src").filter(|s| !s.is_empty()) else {
            return error_block("gbp-raw: missing src");
        };
        if src.contains("://") {
            tracing::warn!("gbp-raw: remote sources are not fetched: {src}");
            return error_block(&format!("Cannot embed remote file {src}"));
        }
        let path = self.root.join(src.trim_start_matches('/'));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("gbp-raw: {}: {e}", path.display());
                return error_block(&format!("Cannot read {src}"));
            }
        };

        let lang = attrs
            .get("lang")
            .filter(|l| !l.is_empty())
            .cloned()
            .or_else(|| src.rsplit_once('.').map(|(_, ext)| ext.to_string()))
            .unwrap_or_default();
        let body = match attrs.get("range").filter(|r| !r.trim().is_empty()) {
            Some(range) => select_lines(&text, &parse_ranges(range)),
            None => text,
        };

        html! {
            pre {
                code class=(format!("language-{lang}")) {
                    i class="code-lang-name" { (lang) }
                    (body)
                }
            }
        }
    }
}

/// Parse `2-20, -20, 2-` into 1-based inclusive `(start, end)` pairs; an end
/// of `0` means "to the last line".
pub fn parse_ranges(spec: &str) -> Vec<(usize, usize)> {
    spec.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(|range| {
            let (start, end) = range.split_once('-').unwrap_or((range, range));
            (
                start.trim().parse().ok().filter(|s| *s > 0).unwrap_or(1),
                end.trim().parse().unwrap_or(0),
            )
        })
        .collect()
}

/// Cut the selected line ranges out of `text`, joined with an ellipsis line.
pub fn select_lines(text: &str, ranges: &[(usize, usize)]) -> String {
    let lines: Vec<&str> = text.lines().collect();
    ranges
        .iter()
        .map(|&(start, end)| {
            let end = if end == 0 { lines.len() } else { end.min(lines.len()) };
            let start = start.saturating_sub(1).min(end);
            lines[start..end]
                .iter()
                .map(|line| format!("{line}\n"))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n...\n\n")
}

// =============================================================================
// media: image / video / audio
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Unknown,
}

impl MediaKind {
    /// Explicit `type` attribute, else the file extension.
    pub fn detect(src: &str, explicit: Option<&str>) -> Self {
        match explicit {
            Some("img") | Some("image") => return MediaKind::Image,
            Some("video") => return MediaKind::Video,
            Some("audio") => return MediaKind::Audio,
            _ => {}
        }
        let path = src.split(['?', '#']).next().unwrap_or(src);
        let ext = path
            .rsplit_once('.')
            .map(|(_, e)| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "apng" | "jpg" | "jpeg" | "gif" | "webp" | "avif" | "svg" => MediaKind::Image,
            "mp4" | "webm" | "av1" | "ogv" => MediaKind::Video,
            "mp3" | "ogg" | "wav" | "m4a" | "flac" => MediaKind::Audio,
            _ => MediaKind::Unknown,
        }
    }
}

/// `<gbp-media src type width height>`.
pub struct MediaPlugin {
    ctx: PluginContext,
}

impl MediaPlugin {
    fn create(ctx: &PluginContext) -> Box<dyn Plugin> {
        Box::new(MediaPlugin { ctx: ctx.clone() })
    }

    /// `/`-rooted sources come from the repository when it is known, and
    /// stay site-relative otherwise.
    fn url(&self, src: &str) -> String {
        if src.starts_with('/') && !src.starts_with("//") {
            self.ctx
                .raw_github_url(src)
                .unwrap_or_else(|| src.to_string())
        } else {
            src.to_string()
        }
    }
}

impl Plugin for MediaPlugin {
    fn name(&self) -> &'static str {
        "media"
    }

    fn render(&self, attrs: &Attributes) -> Markup {
        let Some(src) = attrs.get("src").filter(|s| !s.is_empty()) else {
            return error_block("gbp-media: missing src");
        };
        let url = self.url(src);
        let width = attrs.get("width");
        let height = attrs.get("height");
        match MediaKind::detect(src, attrs.get("type").map(String::as_str)) {
            MediaKind::Image => html! {
                img src=(url) width=[width] height=[height] alt=(attrs.get("alt").map_or("", String::as_str));
            },
            MediaKind::Video => html! {
                video src=(url) width=[width] height=[height] controls {}
            },
            MediaKind::Audio => html! {
                audio src=(url) controls {}
            },
            MediaKind::Unknown => html! {
                div class="gbp-unknown" { "Unknown format" }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ctx(root: PathBuf) -> PluginContext {
        PluginContext {
            github: Some("https://github.com/owner/repo".to_string()),
            source_branch: Some("main".to_string()),
            project_root: root,
        }
    }

    fn set(names: &[&str], ctx: &PluginContext) -> PluginSet {
        let names: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        PluginSet::load(&names, ctx).unwrap()
    }

    #[test]
    fn registry_lists_builtins() {
        assert!(is_registered("raw"));
        assert!(is_registered("media"));
        assert!(!is_registered("api"));
        assert_eq!(registered_names(), vec!["raw", "media"]);
    }

    #[test]
    fn unknown_plugin_fails_to_load() {
        let result = PluginSet::load(&["nope".to_string()], &PluginContext::default());
        assert!(matches!(result, Err(PluginError::Unknown { .. })));
    }

    #[test]
    fn attributes_in_all_quote_styles() {
        let attrs = parse_attributes(r#" src="/a b.rs" lang='rust' range=1-3 hidden"#);
        assert_eq!(attrs["src"], "/a b.rs");
        assert_eq!(attrs["lang"], "rust");
        assert_eq!(attrs["range"], "1-3");
        assert_eq!(attrs["hidden"], "");
    }

    // =========================================================================
    // raw
    // =========================================================================

    #[test]
    fn ranges_parse_open_ends() {
        assert_eq!(parse_ranges("2-20, -20, 2-"), vec![(2, 20), (1, 20), (2, 0)]);
        assert_eq!(parse_ranges("5"), vec![(5, 5)]);
    }

    #[test]
    fn select_lines_joins_parts_with_ellipsis() {
        let text = "a\nb\nc\nd\ne\n";
        assert_eq!(select_lines(text, &[(1, 2), (4, 0)]), "a\nb\n\n...\n\nd\ne\n");
        assert_eq!(select_lines(text, &[(4, 99)]), "d\ne\n");
        assert_eq!(select_lines(text, &[(9, 0)]), "");
    }

    #[test]
    fn raw_embeds_escaped_file_content() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("demo.html"), "<b>one</b>\ntwo\nthree\n").unwrap();
        let plugins = set(&["raw"], &ctx(tmp.path().to_path_buf()));

        let out = plugins.expand(r#"<gbp-raw src="/demo.html" range="1-2"></gbp-raw>"#);
        assert_eq!(
            out,
            "<pre><code class=\"language-html\"><i class=\"code-lang-name\">html</i>&lt;b&gt;one&lt;/b&gt;\ntwo\n</code></pre>"
        );
    }

    #[test]
    fn raw_missing_file_renders_error() {
        let tmp = TempDir::new().unwrap();
        let plugins = set(&["raw"], &ctx(tmp.path().to_path_buf()));
        let out = plugins.expand(r#"<gbp-raw src="/missing.rs"></gbp-raw>"#);
        assert!(out.contains("gbp-error"));
        assert!(out.contains("/missing.rs"));
    }

    #[test]
    fn disabled_plugin_tags_are_left_alone() {
        let tmp = TempDir::new().unwrap();
        let plugins = set(&["media"], &ctx(tmp.path().to_path_buf()));
        let src = r#"<gbp-raw src="/x.rs"></gbp-raw>"#;
        assert_eq!(plugins.expand(src), src);
        assert_eq!(PluginSet::default().expand(src), src);
    }

    // =========================================================================
    // media
    // =========================================================================

    #[test]
    fn media_kind_by_extension_or_type() {
        assert_eq!(MediaKind::detect("/a.PNG", None), MediaKind::Image);
        assert_eq!(MediaKind::detect("/a.webm?x=1", None), MediaKind::Video);
        assert_eq!(MediaKind::detect("/a.mp3", None), MediaKind::Audio);
        assert_eq!(MediaKind::detect("/a.bin", None), MediaKind::Unknown);
        assert_eq!(MediaKind::detect("/a.bin", Some("video")), MediaKind::Video);
    }

    #[test]
    fn media_rooted_src_uses_raw_github() {
        let plugins = set(&["media"], &ctx(PathBuf::new()));
        let out = plugins.expand(r#"<gbp-media src="/img/a.png" width="100"/>"#);
        assert_eq!(
            out,
            r#"<img src="https://raw.githubusercontent.com/owner/repo/main/img/a.png" width="100" alt="">"#
        );
    }

    #[test]
    fn media_without_repo_stays_site_relative() {
        let plugins = set(&["media"], &PluginContext::default());
        let out = plugins.expand(r#"<gbp-media src="/v.mp4"></gbp-media>"#);
        assert_eq!(out, r#"<video src="/v.mp4" controls></video>"#);
    }

    #[test]
    fn media_unknown_format_placeholder() {
        let plugins = set(&["media"], &PluginContext::default());
        let out = plugins.expand(r#"<gbp-media src="https://x.test/file.xyz"></gbp-media>"#);
        assert_eq!(out, r#"<div class="gbp-unknown">Unknown format</div>"#);
    }
}
