use clap::{Parser, Subcommand};
use quire::config::{self, CliOverrides, NavLink, ProjectConfig};
use quire::generate::{self, Template};
use quire::git::GitInfo;
use quire::resolve::ResolvedBook;
use quire::scan::{self, ScanOptions};
use quire::types::BookConfig;
use quire::{output, watch};
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("QUIRE_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("QUIRE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Documentation site generator: Markdown directory in, static book out")]
#[command(long_about = "\
Documentation site generator: Markdown directory in, static book out

The docs directory is the data source. Directories become sidebar sections,
Markdown files become pages, and NNN- prefixes set the order.

Docs structure:

  docs/
  ├── quire.toml                   # Project config (optional)
  ├── README.md                    # Home page (front-matter hero/features)
  ├── 001-guide/                   # Section → /guide/
  │   ├── README.md                # Section index, sorted first
  │   ├── 001-install.md           # Page → /guide/install
  │   └── 002-configuration.md
  ├── 002-reference/
  │   ├── config.yml               # Sidecar: title, isNav, navTitle, sidebarIgnore
  │   └── 001-cli.md
  └── .drafts/                     # Dot entries are ignored

Page titles resolve: front-matter title → first H1 → filename.
With --i18n each top-level directory is a language (docs/en, docs/zh).

Run 'quire gen-config' to generate a documented quire.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Log at debug level (otherwise RUST_LOG, default warn)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every command that reads a docs directory.
#[derive(clap::Args, Clone, Debug)]
struct BookArgs {
    /// Docs directory
    #[arg(default_value = ".")]
    dir: PathBuf,

    /// Where to write book.json (file or directory; default: inside the docs directory)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Project config file (default: quire.toml in the docs directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Theme overlay file (TOML or JSON)
    #[arg(long)]
    theme: Option<PathBuf>,

    #[arg(long)]
    title: Option<String>,

    /// Icon path or URL
    #[arg(long)]
    icon: Option<String>,

    /// Docs path inside the repository, for edit links
    #[arg(long)]
    source_dir: Option<String>,

    /// Repository branch, for edit links
    #[arg(long)]
    source_branch: Option<String>,

    /// Repository URL, e.g. https://github.com/owner/repo
    #[arg(long)]
    github: Option<String>,

    /// Footer text (Markdown)
    #[arg(long)]
    footer: Option<String>,

    /// Treat top-level directories as languages
    #[arg(long)]
    i18n: bool,

    /// Keep NNN- prefixes in titles and URLs
    #[arg(long)]
    display_rank: bool,

    /// Render the home page with its hero and features
    #[arg(long)]
    home_mode: bool,

    /// Navigation bar entry as "Title,link" (repeatable)
    #[arg(long = "nav", value_name = "TITLE,LINK")]
    nav: Vec<String>,

    /// Enable a content plugin (repeatable)
    #[arg(long = "plugin", value_name = "NAME")]
    plugins: Vec<String>,

    /// Print JSON instead of the human-readable summary
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Scan the docs directory and write book.json
    Scan(BookArgs),
    /// Show the resolved routes, navigation and sidebar
    Routes {
        #[command(flatten)]
        book: BookArgs,
        /// Show the sidebar and previous/next links at this path
        #[arg(long)]
        path: Option<String>,
        /// Language to resolve (i18n books)
        #[arg(long)]
        lang: Option<String>,
    },
    /// Render the static site
    Build {
        #[command(flatten)]
        book: BookArgs,
        /// Output directory
        #[arg(long, default_value = "dist")]
        dist: PathBuf,
        /// HTML shell with {{ title }}, {{ head }} and {{ body }} placeholders
        #[arg(long)]
        template: Option<PathBuf>,
    },
    /// Validate the docs directory and config without writing anything
    Check(BookArgs),
    /// Rewrite book.json whenever the docs change
    Watch(BookArgs),
    /// Print a stock quire.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match cli.command {
        Command::Scan(args) => {
            let loaded = load(&args, &[])?;
            let path = scan::book_output_path(&args.dir, args.output.as_deref());
            scan::write_book(&loaded.book, &path)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&loaded.book)?);
            } else {
                output::print_scan_output(&loaded.book.sidebar);
                println!("==> Wrote {}", path.display());
            }
        }
        Command::Routes { book: args, path, lang } => {
            let loaded = load(&args, &[])?;
            let resolved = ResolvedBook::resolve_with_fallback(
                &loaded.book,
                lang.as_deref(),
                loaded.project.fallback_language.as_deref(),
            );
            if args.json {
                println!("{}", serde_json::to_string_pretty(&resolved.routes)?);
            } else {
                output::print_routes(&resolved, path.as_deref());
            }
        }
        Command::Build {
            book: args,
            dist,
            template,
        } => {
            let template = template.as_deref().map(Template::load).transpose()?;
            println!("==> Scanning {}", args.dir.display());
            let loaded = load(&args, std::slice::from_ref(&dist))?;
            if let Some(out) = &args.output {
                scan::write_book(&loaded.book, &scan::book_output_path(&args.dir, Some(out)))?;
            }
            println!("==> Generating HTML → {}", dist.display());
            let summary = generate::generate(
                &loaded.book,
                &loaded.project,
                &args.dir,
                &dist,
                template.as_ref(),
            )?;
            output::print_build_summary(&summary);
        }
        Command::Check(args) => {
            println!("==> Checking {}", args.dir.display());
            let loaded = load(&args, &[])?;
            let books = ResolvedBook::resolve_all(&loaded.book);
            output::print_check(&books);
        }
        Command::Watch(args) => {
            let path = scan::book_output_path(&args.dir, args.output.as_deref());
            let rebuild = || -> Result<(), Box<dyn Error>> {
                let loaded = load(&args, &[])?;
                scan::write_book(&loaded.book, &path)?;
                println!("==> Wrote {}", path.display());
                Ok(())
            };
            rebuild()?;
            watch::watch(&args.dir, std::slice::from_ref(&path), |changed| {
                tracing::debug!("changed: {changed:?}");
                if let Err(e) = rebuild() {
                    eprintln!("error: {e}");
                }
            })?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// `--debug` forces debug logging; otherwise `RUST_LOG` decides, default warn.
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

struct Loaded {
    project: ProjectConfig,
    book: BookConfig,
}

/// Layer config, scan the docs directory and assemble the book.
///
/// `outputs` are build destinations never scanned even when they sit inside
/// the docs directory.
fn load(args: &BookArgs, outputs: &[PathBuf]) -> Result<Loaded, Box<dyn Error>> {
    let mut overlays = Vec::new();
    if let Some(theme) = &args.theme {
        overlays.push(config::load_theme_overlay(theme)?);
    }
    overlays.push(overrides(args)?.to_toml()?);
    let project = config::load_config(&args.dir, args.config.as_deref(), overlays)?;

    let options = ScanOptions {
        display_rank: project.display_rank,
        i18n: project.i18n,
        exclude: outputs.iter().filter_map(|o| inside(&args.dir, o)).collect(),
    };
    let sidebar = scan::scan(&args.dir, &options)?;

    let git = if project.github.is_none() || project.source_branch.is_none() {
        GitInfo::detect(&args.dir)
    } else {
        GitInfo::default()
    };
    let book = project.book_config(&args.dir, sidebar, &git);
    Ok(Loaded { project, book })
}

fn overrides(args: &BookArgs) -> Result<CliOverrides, config::ConfigError> {
    Ok(CliOverrides {
        title: args.title.clone(),
        icon: args.icon.clone(),
        github: args.github.clone(),
        source_dir: args.source_dir.clone(),
        source_branch: args.source_branch.clone(),
        footer: args.footer.clone(),
        i18n: args.i18n.then_some(true),
        display_rank: args.display_rank.then_some(true),
        home_mode: args.home_mode.then_some(true),
        plugins: args.plugins.clone(),
        nav: args
            .nav
            .iter()
            .map(|n| NavLink::parse(n))
            .collect::<Result<_, _>>()?,
    })
}

/// `path` as a child of `dir`, spelled the way a directory walk of `dir`
/// produces it, if it lives directly inside `dir`.
fn inside(dir: &Path, path: &Path) -> Option<PathBuf> {
    let parent = path.canonicalize().ok()?.parent()?.to_path_buf();
    let name = path.canonicalize().ok()?.file_name()?.to_owned();
    (dir.canonicalize().ok()? == parent).then(|| dir.join(name))
}

