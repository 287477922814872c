//! Language selection and UI strings for multi-language books.
//!
//! A book in i18n mode serves each language under its code prefix
//! (`/en/guide/`, `/zh/guide/`). Picking a language follows one order:
//!
//! 1. a language code already in the path wins;
//! 2. otherwise the reader's preferred languages (browser `Accept-Language`)
//!    are tried in order, each as an exact code, then by primary subtag
//!    (`en-GB` matches `en`);
//! 3. otherwise the fallback language.
//!
//! Switching language swaps only the code segment; the rest of the path, the
//! query and the fragment are kept.

/// Display names for language directories. Unknown codes display as-is.
const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("ar", "العربية"),
    ("bn", "বাংলা"),
    ("cs", "Čeština"),
    ("da", "Dansk"),
    ("de", "Deutsch"),
    ("el", "Ελληνικά"),
    ("en", "English"),
    ("es", "Español"),
    ("fa", "فارسی"),
    ("fi", "Suomi"),
    ("fr", "Français"),
    ("he", "עברית"),
    ("hi", "हिन्दी"),
    ("hu", "Magyar"),
    ("id", "Bahasa Indonesia"),
    ("it", "Italiano"),
    ("ja", "日本語"),
    ("ko", "한국어"),
    ("nl", "Nederlands"),
    ("no", "Norsk"),
    ("pl", "Polski"),
    ("pt", "Português"),
    ("pt-br", "Português (Brasil)"),
    ("ro", "Română"),
    ("ru", "Русский"),
    ("sv", "Svenska"),
    ("th", "ไทย"),
    ("tr", "Türkçe"),
    ("uk", "Українська"),
    ("vi", "Tiếng Việt"),
    ("zh", "中文"),
    ("zh-cn", "简体中文"),
    ("zh-tw", "繁體中文"),
];

/// Display name for a language code, falling back to the code itself.
pub fn language_name(code: &str) -> &str {
    LANGUAGE_NAMES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
        .unwrap_or(code)
}

/// A configured language: code plus display name.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// The language used when nothing else matches: the configured one if it
/// exists in the book, else the first code in order.
pub fn fallback_language<'a>(configured: Option<&str>, codes: &[&'a str]) -> Option<&'a str> {
    configured
        .and_then(|want| codes.iter().copied().find(|c| *c == want))
        .or_else(|| codes.first().copied())
}

/// Parse an `Accept-Language` header into tags ordered by preference.
///
/// Entries with `q=0` are dropped; ties keep header order.
pub fn parse_accept_language(header: &str) -> Vec<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = pieces.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let q = pieces
                .find_map(|p| p.trim().strip_prefix("q="))
                .and_then(|q| q.trim().parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then(|| (tag.to_string(), q))
        })
        .collect();
    tags.sort_by(|a, b| b.1.total_cmp(&a.1));
    tags.into_iter().map(|(tag, _)| tag).collect()
}

/// Pick the best available language for a list of preferred tags.
pub fn negotiate_language<'a, S: AsRef<str>>(
    preferred: &[S],
    available: &[&'a str],
    fallback: &'a str,
) -> &'a str {
    preferred
        .iter()
        .find_map(|want| {
            let want = want.as_ref();
            available
                .iter()
                .copied()
                .find(|code| code.eq_ignore_ascii_case(want))
                .or_else(|| {
                    let primary = primary_subtag(want);
                    available
                        .iter()
                        .copied()
                        .find(|code| primary_subtag(code).eq_ignore_ascii_case(primary))
                })
        })
        .unwrap_or(fallback)
}

fn primary_subtag(tag: &str) -> &str {
    tag.split(['-', '_']).next().unwrap_or(tag)
}

/// The language code leading a path, if it is one of `available`.
pub fn language_in_path<'a>(path: &str, available: &[&'a str]) -> Option<&'a str> {
    let first = path.trim_start_matches('/').split('/').next()?;
    available.iter().copied().find(|code| *code == first)
}

/// Language for a request: the path prefix, else negotiation, else fallback.
pub fn select_language<'a, S: AsRef<str>>(
    path: &str,
    preferred: &[S],
    available: &[&'a str],
    fallback: &'a str,
) -> &'a str {
    language_in_path(path, available)
        .unwrap_or_else(|| negotiate_language(preferred, available, fallback))
}

/// Split a language-prefixed URL into its code and the remaining URL.
///
/// `/zh/guide/?a=1#x` with `zh` available yields `(Some("zh"), "/guide/?a=1#x")`;
/// a bare `/zh` yields `/`.
pub fn strip_language<'a, 'b>(url: &'b str, available: &[&'a str]) -> (Option<&'a str>, &'b str) {
    let path_end = url.find(['?', '#']).unwrap_or(url.len());
    let path = &url[..path_end];
    match language_in_path(path, available) {
        Some(code) => {
            let trimmed = url.trim_start_matches('/');
            let rest = trimmed.strip_prefix(code).unwrap_or(trimmed);
            (Some(code), if rest.is_empty() { "/" } else { rest })
        }
        None => (None, url),
    }
}

/// Rewrite a URL for another language, keeping path, query and fragment.
pub fn switch_language(url: &str, target: &str, available: &[&str]) -> String {
    let (_, rest) = strip_language(url, available);
    if rest.starts_with('/') {
        format!("/{target}{rest}")
    } else {
        format!("/{target}/{rest}")
    }
}

/// Built-in interface strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiStrings {
    pub edit_on_github: &'static str,
    /// Footer credit; `$1` is replaced by the generator link.
    pub footer: &'static str,
    pub last_updated: &'static str,
    pub not_found: &'static str,
    pub back_home: &'static str,
    pub previous: &'static str,
    pub next: &'static str,
    pub language: &'static str,
}

const EN: UiStrings = UiStrings {
    edit_on_github: "Edit this page on GitHub",
    footer: "Generated by $1",
    last_updated: "Last updated",
    not_found: "Page not found",
    back_home: "Back to home",
    previous: "Previous",
    next: "Next",
    language: "Language",
};

const ZH: UiStrings = UiStrings {
    edit_on_github: "在 GitHub 上编辑此页",
    footer: "通过 $1 生成",
    last_updated: "最后更新",
    not_found: "页面不存在",
    back_home: "返回首页",
    previous: "上一页",
    next: "下一页",
    language: "语言",
};

/// UI strings for a language code; anything without a translation gets English.
pub fn ui_strings(lang: Option<&str>) -> &'static UiStrings {
    match lang.map(primary_subtag) {
        Some(code) if code.eq_ignore_ascii_case("zh") => &ZH,
        _ => &EN,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_and_unknown_language_names() {
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("ZH"), "中文");
        assert_eq!(language_name("tlh"), "tlh");
    }

    #[test]
    fn fallback_prefers_configured_code() {
        let codes = ["en", "zh"];
        assert_eq!(fallback_language(Some("zh"), &codes), Some("zh"));
        assert_eq!(fallback_language(Some("fr"), &codes), Some("en"));
        assert_eq!(fallback_language(None, &codes), Some("en"));
        assert_eq!(fallback_language(None, &[]), None);
    }

    #[test]
    fn accept_language_ordered_by_quality() {
        assert_eq!(
            parse_accept_language("fr;q=0.5, zh-CN, en;q=0.8, de;q=0"),
            vec!["zh-CN", "en", "fr"]
        );
        assert!(parse_accept_language("").is_empty());
    }

    #[test]
    fn negotiation_per_preference_then_fallback() {
        let available = ["en", "zh"];
        assert_eq!(negotiate_language(&["zh"], &available, "en"), "zh");
        assert_eq!(negotiate_language(&["zh-CN", "en"], &available, "en"), "zh");
        assert_eq!(negotiate_language(&["fr", "en-GB"], &available, "zh"), "en");
        assert_eq!(negotiate_language(&["zh-TW"], &available, "en"), "zh");
        assert_eq!(negotiate_language(&["fr"], &available, "en"), "en");
        let none: [&str; 0] = [];
        assert_eq!(negotiate_language(&none, &available, "zh"), "zh");
    }

    #[test]
    fn path_language_wins_over_preference() {
        let available = ["en", "zh"];
        assert_eq!(select_language("/zh/guide/", &["en"], &available, "en"), "zh");
        assert_eq!(select_language("/guide/", &["zh"], &available, "en"), "zh");
        assert_eq!(select_language("/english/", &["fr"], &available, "en"), "en");
    }

    #[test]
    fn switch_preserves_path_query_and_hash() {
        let available = ["en", "zh"];
        assert_eq!(
            switch_language("/en/guide/install?tab=2#steps", "zh", &available),
            "/zh/guide/install?tab=2#steps"
        );
        assert_eq!(switch_language("/en", "zh", &available), "/zh/");
        assert_eq!(switch_language("/en?x=1", "zh", &available), "/zh/?x=1");
        assert_eq!(switch_language("/guide/", "zh", &available), "/zh/guide/");
    }

    #[test]
    fn strip_language_splits_prefix() {
        let available = ["en", "zh"];
        assert_eq!(strip_language("/zh/guide/", &available), (Some("zh"), "/guide/"));
        assert_eq!(strip_language("/zh", &available), (Some("zh"), "/"));
        assert_eq!(strip_language("/zhx/", &available), (None, "/zhx/"));
    }

    #[test]
    fn strip_language_tolerates_missing_or_doubled_slash() {
        let available = ["en", "zh"];
        assert_eq!(strip_language("zh", &available), (Some("zh"), "/"));
        assert_eq!(strip_language("zh/guide/", &available), (Some("zh"), "/guide/"));
        assert_eq!(strip_language("//zh/x", &available), (Some("zh"), "/x"));
        assert_eq!(switch_language("zh", "en", &available), "/en/");
        assert_eq!(switch_language("//zh/x?q=1", "en", &available), "/en/x?q=1");
    }

    #[test]
    fn ui_strings_fall_back_to_english() {
        assert_eq!(ui_strings(Some("zh-CN")).previous, "上一页");
        assert_eq!(ui_strings(Some("fr")).previous, "Previous");
        assert_eq!(ui_strings(None).edit_on_github, "Edit this page on GitHub");
    }
}
