//! Repository defaults for edit links.
//!
//! Runs `git` in the docs directory the same way the build script does:
//! any failure (no git, not a repository, no remote) just leaves the value
//! unset.

use std::path::Path;
use std::process::Command;

/// What the working copy says about itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
    /// `https://github.com/owner/repo` for a GitHub `origin`.
    pub github: Option<String>,
    /// Currently checked-out branch.
    pub branch: Option<String>,
}

impl GitInfo {
    pub fn detect(dir: &Path) -> Self {
        let git = |args: &[&str]| {
            Command::new("git")
                .args(args)
                .current_dir(dir)
                .output()
                .ok()
                .filter(|o| o.status.success())
                .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let info = GitInfo {
            github: git(&["remote", "get-url", "origin"]).and_then(|url| github_url(&url)),
            branch: git(&["rev-parse", "--abbrev-ref", "HEAD"]).filter(|b| b != "HEAD"),
        };
        tracing::debug!("git defaults: {info:?}");
        info
    }
}

/// Normalise a GitHub remote to its web URL.
///
/// Accepts `git@github.com:o/r.git`, `https://github.com/o/r(.git)`,
/// `ssh://git@github.com/o/r` and `git://github.com/o/r`.
pub fn github_url(remote: &str) -> Option<String> {
    let remote = remote.trim();
    let path = remote
        .strip_prefix("git@github.com:")
        .or_else(|| {
            ["https://", "http://", "ssh://", "git://", "git+https://", "git+ssh://"]
                .iter()
                .find_map(|scheme| remote.strip_prefix(scheme))
                .and_then(|rest| {
                    let rest = rest.strip_prefix("git@").unwrap_or(rest);
                    rest.strip_prefix("github.com/")
                        .or_else(|| rest.strip_prefix("www.github.com/"))
                })
        })?;

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut parts = path.split('/');
    let (owner, repo) = (parts.next()?, parts.next()?);
    if owner.is_empty() || repo.is_empty() || parts.next().is_some() {
        return None;
    }
    Some(format!("https://github.com/{owner}/{repo}"))
}
