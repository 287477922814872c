//! # Quire
//!
//! A documentation site generator. A directory of Markdown files is the data
//! source: directories become sidebar sections, files become pages, and a
//! numeric prefix (`001-`, `020-`) sets the order.
//!
//! # Architecture: Two Stages
//!
//! ```text
//! 1. Scan      docs/      →  book.json   (filesystem → navigation tree)
//! 2. Resolve   book.json  →  routes      (tree → links, redirects, sidebar)
//! ```
//!
//! `book.json` is plain, human-readable JSON and is the only contract
//! between the stages: a hand-written `book.json` resolves exactly like a
//! generated one. The resolver has no filesystem access, so everything
//! about URLs, redirects and sidebar filtering is a pure function of the
//! config and can be unit tested without fixtures.
//!
//! `quire build` runs both stages for every language and renders each route
//! to static HTML; `quire watch` keeps `book.json` current while editing.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | Stage 1: walks the docs directory into a [`types::SidebarConfig`] |
//! | [`resolve`] | Stage 2: links, nav entries, routes, current sidebar, prev/next |
//! | [`generate`] | Renders resolved books to HTML with Maud |
//! | [`types`] | The `book.json` model (`NavItem`, `BookConfig`) |
//! | [`naming`] | `NNN-name` rank prefix parsing and sibling ordering |
//! | [`links`] | Raw path → canonical URL normalization |
//! | [`metadata`] | Front-matter, sidecar `config.yml`, heading slugs |
//! | [`i18n`] | Language names, negotiation, URL language switching, UI strings |
//! | [`config`] | `quire.toml` loading, layering, validation, theme CSS |
//! | [`plugins`] | `<gbp-*>` content tags expanded at build time |
//! | [`git`] | Repository defaults for edit links |
//! | [`watch`] | Debounced rebuild on file changes |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Raw Links In, Canonical Links Out
//!
//! The scanner records links exactly as files sit on disk
//! (`/001-guide/README.md`). Stripping ranks, extensions and index files is
//! the resolver's job, so `book.json` stays a faithful picture of the tree
//! and the old spellings can be turned into redirects instead of 404s.
//!
//! ## Maud Over Template Engines
//!
//! HTML is generated with [Maud](https://maud.lambda.xyz/): templates are
//! checked at compile time and every interpolation is escaped. A `--template`
//! shell can still wrap the output for sites that need custom chrome.
//!
//! ## Config Layering
//!
//! ```text
//! stock defaults  ←  quire.toml  ←  --theme file  ←  command-line flags
//! ```
//!
//! Layers are merged as TOML tables before deserializing, and unknown keys
//! are rejected, so a typo in `quire.toml` is an error rather than a silently
//! ignored setting.

pub mod config;
pub mod generate;
pub mod git;
pub mod i18n;
pub mod links;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod plugins;
pub mod resolve;
pub mod scan;
pub mod types;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
