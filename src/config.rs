//! Project configuration module.
//!
//! Handles loading, validating, and merging `quire.toml`. Configuration is
//! layered, later layers win:
//!
//! ```text
//! stock defaults ← quire.toml ← --theme file ← command-line flags
//! ```
//!
//! ## Config File Location
//!
//! `quire.toml` is read from the docs root, or from the path given with
//! `--config`:
//!
//! ```text
//! docs/
//! ├── quire.toml
//! ├── README.md
//! └── 001-guide/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional
//! title = "My Project"        # Defaults to the docs directory name
//! icon = "/logo.svg"
//! github = "https://github.com/owner/repo"   # Defaults to the git remote
//! source_dir = "docs"         # Defaults to the docs directory argument
//! source_branch = "main"      # Defaults to the current git branch
//! footer = "Released under MIT"
//! i18n = false                # Top-level directories are languages
//! display_rank = false        # Keep `001-` prefixes in URLs and titles
//! home_mode = false           # Render the home page as a hero landing page
//! fallback_language = "en"    # i18n: language when nothing else matches
//! plugins = ["raw", "media"]
//!
//! [[nav]]
//! title = "GitHub"
//! link = "https://github.com/owner/repo"
//!
//! [theme]
//! primary_color = "rgb(38, 192, 227)"
//! sidebar_width = "230px"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want. Tables merge
//! key by key; arrays (`nav`, `plugins`) are replaced as a whole. Unknown keys
//! are rejected to catch typos early.

use crate::git::GitInfo;
use crate::plugins;
use crate::types::{BookConfig, NavItem, SidebarConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config filename looked up in the docs root.
pub const CONFIG_FILE: &str = "quire.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Project configuration loaded from `quire.toml`.
///
/// All fields have sensible defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    /// Book title. Defaults to the docs directory name.
    pub title: Option<String>,
    /// Icon path or URL shown in the navigation bar.
    pub icon: Option<String>,
    /// Repository URL used for edit links.
    pub github: Option<String>,
    /// Docs path inside the repository.
    pub source_dir: Option<String>,
    /// Branch used for edit links.
    pub source_branch: Option<String>,
    /// Footer text (Markdown).
    pub footer: Option<String>,
    /// Treat top-level directories as language codes.
    pub i18n: bool,
    /// Keep rank prefixes in URLs and titles.
    pub display_rank: bool,
    /// Render the home page with its hero and features.
    pub home_mode: bool,
    /// Language used when the reader's preferences match none.
    pub fallback_language: Option<String>,
    /// Enabled plugins, by registry name.
    pub plugins: Vec<String>,
    /// Navigation bar entries appended after `isNav` pages.
    pub nav: Vec<NavLink>,
    /// Theme variables.
    pub theme: ThemeConfig,
}

/// A navigation bar entry from config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavLink {
    pub title: String,
    pub link: String,
}

impl NavLink {
    /// Parse the `--nav "Title,link"` flag form.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        match spec.split_once(',') {
            Some((title, link)) if !title.trim().is_empty() && !link.trim().is_empty() => {
                Ok(NavLink {
                    title: title.trim().to_string(),
                    link: link.trim().to_string(),
                })
            }
            _ => Err(ConfigError::Validation(format!(
                "nav entry must be \"Title,link\", got {spec:?}"
            ))),
        }
    }
}

/// Theme variables, written out as CSS custom properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThemeConfig {
    pub font: String,
    pub sidebar_width: String,
    pub main_width: String,
    pub header_height: String,
    pub background_color: String,
    pub border_color: String,
    pub text_color: String,
    pub primary_color: String,
    pub inline_code_background: String,
    pub table_header_color: String,
    pub table_header_background: String,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            font: "-apple-system,BlinkMacSystemFont,Segoe UI,Roboto,Oxygen,Ubuntu,Cantarell,Fira Sans,Droid Sans,Helvetica Neue,sans-serif".to_string(),
            sidebar_width: "230px".to_string(),
            main_width: "780px".to_string(),
            header_height: "55px".to_string(),
            background_color: "white".to_string(),
            border_color: "#eaeaea".to_string(),
            text_color: "rgb(40, 44, 52)".to_string(),
            primary_color: "rgb(38, 192, 227)".to_string(),
            inline_code_background: "#ffe56433".to_string(),
            table_header_color: "#666".to_string(),
            table_header_background: "#fafafa".to_string(),
        }
    }
}

impl ProjectConfig {
    /// Validate config values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("theme.sidebar_width", &self.theme.sidebar_width),
            ("theme.main_width", &self.theme.main_width),
            ("theme.header_height", &self.theme.header_height),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{name} must not be empty")));
            }
        }
        for entry in &self.nav {
            if entry.title.trim().is_empty() || entry.link.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "nav entries need a title and a link".into(),
                ));
            }
        }
        for name in &self.plugins {
            if !plugins::is_registered(name) {
                return Err(ConfigError::Validation(format!(
                    "unknown plugin {name:?} (available: {})",
                    plugins::registered_names().join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Assemble the `book.json` document around a scanned sidebar.
    ///
    /// Unset `title` and `source_dir` come from the docs directory; unset
    /// `github` and `source_branch` from `git`.
    pub fn book_config(&self, docs_dir: &Path, sidebar: SidebarConfig, git: &GitInfo) -> BookConfig {
        let dir_name = docs_dir
            .canonicalize()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .unwrap_or_else(|| docs_dir.display().to_string());

        BookConfig {
            title: self.title.clone().unwrap_or(dir_name),
            icon: self.icon.clone().unwrap_or_default(),
            sidebar,
            nav: self
                .nav
                .iter()
                .map(|n| NavItem::file(&n.title, &n.link))
                .collect(),
            github: self.github.clone().or_else(|| git.github.clone()),
            source_dir: self
                .source_dir
                .clone()
                .or_else(|| Some(docs_dir.display().to_string())),
            source_branch: self.source_branch.clone().or_else(|| git.branch.clone()),
            display_rank: self.display_rank,
            home_mode: self.home_mode,
            footer: self.footer.clone(),
        }
    }
}

/// Command-line values layered over the config file. Unset fields leave the
/// file's values alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub i18n: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_rank: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_mode: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nav: Vec<NavLink>,
}

impl CliOverrides {
    pub fn to_toml(&self) -> Result<toml::Value, ConfigError> {
        Ok(toml::Value::try_from(self)?)
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ProjectConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a TOML file as a raw value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load a `--theme` file (TOML, or JSON with camelCase keys) as an overlay
/// for the `[theme]` table.
pub fn load_theme_overlay(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let table = if is_json {
        let json: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;
        let mut table = toml::Table::new();
        for (key, value) in json {
            table.insert(snake_case(&key), toml::Value::try_from(value)?);
        }
        table
    } else {
        toml::from_str::<toml::Table>(&content)?
    };

    let mut root = toml::Table::new();
    root.insert("theme".to_string(), toml::Value::Table(table));
    Ok(toml::Value::Table(root))
}

fn snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ProjectConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ProjectConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the project config for a docs root.
///
/// Reads `config_path`, or `quire.toml` in `docs_dir`, merges it over stock
/// defaults, then applies `extra` overlays (theme file, command line).
pub fn load_config(
    docs_dir: &Path,
    config_path: Option<&Path>,
    extra: Vec<toml::Value>,
) -> Result<ProjectConfig, ConfigError> {
    let file = match config_path {
        Some(path) => Some(
            load_raw_config(path)?
                .ok_or_else(|| ConfigError::Validation(format!("{} not found", path.display())))?,
        ),
        None => load_raw_config(&docs_dir.join(CONFIG_FILE))?,
    };
    resolve_config(stock_defaults_value()?, file.into_iter().chain(extra))
}

/// Returns a fully-commented stock `quire.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# quire Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Place this file in the docs root as quire.toml, or pass --config <file>.
# Command-line flags override values set here.
# Unknown keys will cause an error.

# Book title. Defaults to the docs directory name.
# title = "My Project"

# Icon path or URL shown next to the title.
# icon = "/logo.svg"

# Repository used for "Edit this page" links.
# Defaults to the `origin` remote when it points at GitHub.
# github = "https://github.com/owner/repo"

# Docs path inside the repository. Defaults to the docs directory argument.
# source_dir = "docs"

# Branch used for edit links. Defaults to the current git branch.
# source_branch = "main"

# Footer text, Markdown allowed.
# footer = ""

# Treat each top-level directory as a language code (en/, zh/, ...).
i18n = false

# Keep rank prefixes (001-) in URLs and titles.
display_rank = false

# Render the home page as a landing page with hero and features.
home_mode = false

# i18n only: language used when the reader's preferences match none.
# Defaults to the first language directory.
# fallback_language = "en"

# Content plugins: "raw" embeds source files, "media" embeds images/video/audio.
plugins = []

# Extra navigation bar entries, shown after pages flagged isNav.
# [[nav]]
# title = "GitHub"
# link = "https://github.com/owner/repo"

# ---------------------------------------------------------------------------
# Theme
# ---------------------------------------------------------------------------
[theme]
font = "-apple-system,BlinkMacSystemFont,Segoe UI,Roboto,Oxygen,Ubuntu,Cantarell,Fira Sans,Droid Sans,Helvetica Neue,sans-serif"
sidebar_width = "230px"
main_width = "780px"
header_height = "55px"
background_color = "white"
border_color = "#eaeaea"
text_color = "rgb(40, 44, 52)"
primary_color = "rgb(38, 192, 227)"
inline_code_background = "#ffe56433"
table_header_color = "#666"
table_header_background = "#fafafa"
"##
}

/// Generate CSS custom properties from theme config.
pub fn generate_theme_css(theme: &ThemeConfig) -> String {
    format!(
        r#":root {{
    --font: {font};
    --sidebar-width: {sidebar_width};
    --main-width: {main_width};
    --header-height: {header_height};
    --background-color: {background_color};
    --border-color: {border_color};
    --text-color: {text_color};
    --primary-color: {primary_color};
    --inline-code-background: {inline_code_background};
    --table-header-color: {table_header_color};
    --table-header-background: {table_header_background};
}}"#,
        font = theme.font,
        sidebar_width = theme.sidebar_width,
        main_width = theme.main_width,
        header_height = theme.header_height,
        background_color = theme.background_color,
        border_color = theme.border_color,
        text_color = theme.text_color,
        primary_color = theme.primary_color,
        inline_code_background = theme.inline_code_background,
        table_header_color = theme.table_header_color,
        table_header_background = theme.table_header_background,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn default_theme_values() {
        let config = ProjectConfig::default();
        assert_eq!(config.theme.sidebar_width, "230px");
        assert_eq!(config.theme.primary_color, "rgb(38, 192, 227)");
        assert!(config.plugins.is_empty());
        assert!(!config.i18n);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r##"
title = "Docs"

[theme]
primary_color = "#ff0000"
"##;
        let config: ProjectConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.title.as_deref(), Some("Docs"));
        assert_eq!(config.theme.primary_color, "#ff0000");
        // Defaults preserved
        assert_eq!(config.theme.main_width, "780px");
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<ProjectConfig, _> = toml::from_str("titel = \"typo\"\n");
        assert!(result.is_err());
        let result: Result<ProjectConfig, _> = toml::from_str("[theme]\nprimary = \"#000\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn stock_config_toml_parses_to_defaults() {
        let config: ProjectConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    // =========================================================================
    // Merging
    // =========================================================================

    #[test]
    fn merge_overlay_wins_and_base_survives() {
        let base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("a = 2\n[t]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(2));
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn load_config_from_docs_root() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "title = \"From File\"\nplugins = [\"raw\"]\n[[nav]]\ntitle = \"Home\"\nlink = \"/\"\n",
        )
        .unwrap();
        let config = load_config(tmp.path(), None, Vec::new()).unwrap();
        assert_eq!(config.title.as_deref(), Some("From File"));
        assert_eq!(config.plugins, vec!["raw"]);
        assert_eq!(config.nav[0].link, "/");
    }

    #[test]
    fn missing_config_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path(), None, Vec::new()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let result = load_config(tmp.path(), Some(&tmp.path().join("nope.toml")), Vec::new());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn cli_overrides_win_over_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "title = \"From File\"\nfooter = \"kept\"\n",
        )
        .unwrap();
        let cli = CliOverrides {
            title: Some("From CLI".to_string()),
            home_mode: Some(true),
            ..Default::default()
        };
        let config = load_config(tmp.path(), None, vec![cli.to_toml().unwrap()]).unwrap();
        assert_eq!(config.title.as_deref(), Some("From CLI"));
        assert_eq!(config.footer.as_deref(), Some("kept"));
        assert!(config.home_mode);
    }

    #[test]
    fn theme_overlay_from_json_uses_camel_case() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("theme.json");
        fs::write(&path, r##"{"primaryColor": "#123456", "sidebarWidth": "300px"}"##).unwrap();
        let overlay = load_theme_overlay(&path).unwrap();
        let config = load_config(tmp.path(), None, vec![overlay]).unwrap();
        assert_eq!(config.theme.primary_color, "#123456");
        assert_eq!(config.theme.sidebar_width, "300px");
        assert_eq!(config.theme.main_width, "780px");
    }

    #[test]
    fn theme_overlay_from_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("theme.toml");
        fs::write(&path, "text_color = \"black\"\n").unwrap();
        let config = load_config(tmp.path(), None, vec![load_theme_overlay(&path).unwrap()]).unwrap();
        assert_eq!(config.theme.text_color, "black");
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn empty_theme_width_rejected() {
        let config = ProjectConfig {
            theme: ThemeConfig {
                main_width: " ".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn unknown_plugin_rejected() {
        let config = ProjectConfig {
            plugins: vec!["mermaid".to_string()],
            ..Default::default()
        };
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mermaid"));
        assert!(err.contains("raw"));
    }

    #[test]
    fn nav_flag_parsing() {
        assert_eq!(
            NavLink::parse("GitHub, https://github.com/o/r").unwrap(),
            NavLink {
                title: "GitHub".to_string(),
                link: "https://github.com/o/r".to_string(),
            }
        );
        assert!(NavLink::parse("no-comma").is_err());
        assert!(NavLink::parse(",/x").is_err());
    }

    // =========================================================================
    // book.json assembly
    // =========================================================================

    #[test]
    fn book_config_defaults_from_directory_and_git() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("handbook");
        fs::create_dir(&docs).unwrap();
        let git = GitInfo {
            github: Some("https://github.com/o/r".to_string()),
            branch: Some("trunk".to_string()),
        };
        let book = ProjectConfig::default().book_config(&docs, SidebarConfig::default(), &git);
        assert_eq!(book.title, "handbook");
        assert_eq!(book.github.as_deref(), Some("https://github.com/o/r"));
        assert_eq!(book.source_branch.as_deref(), Some("trunk"));
        assert_eq!(book.source_dir, Some(docs.display().to_string()));
    }

    #[test]
    fn book_config_explicit_values_win_over_git() {
        let config = ProjectConfig {
            title: Some("T".to_string()),
            github: Some("https://github.com/mine/repo".to_string()),
            nav: vec![NavLink {
                title: "Blog".to_string(),
                link: "https://blog.example".to_string(),
            }],
            ..Default::default()
        };
        let git = GitInfo {
            github: Some("https://github.com/o/r".to_string()),
            branch: None,
        };
        let book = config.book_config(Path::new("docs"), SidebarConfig::default(), &git);
        assert_eq!(book.title, "T");
        assert_eq!(book.github.as_deref(), Some("https://github.com/mine/repo"));
        assert_eq!(book.source_branch, None);
        assert_eq!(book.nav, vec![NavItem::file("Blog", "https://blog.example")]);
    }

    #[test]
    fn theme_css_has_custom_properties() {
        let css = generate_theme_css(&ThemeConfig::default());
        assert!(css.contains("--sidebar-width: 230px;"));
        assert!(css.contains("--primary-color: rgb(38, 192, 227);"));
        assert!(css.starts_with(":root {"));
    }
}
