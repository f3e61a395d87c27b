use std::path::{Component, Path};

use url::Url;

use crate::core::error::{Result, SettingsError};

pub mod slug_rules;

pub use slug_rules::SlugRules;

/// 确保路径以斜杠结尾
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// 解析站点根 URL，只接受 http 与 https
pub fn parse_site_url(site_url: &str) -> Result<Url> {
    let url = Url::parse(site_url).map_err(|source| SettingsError::InvalidUrl {
        url: site_url.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(SettingsError::InvalidUrl {
            url: site_url.to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        }),
    }
}

/// 将站点内路径拼接到根 URL 之后（保留根 URL 中的子路径）
pub fn absolute_url(base: &str, path: &str) -> Result<String> {
    let base = parse_site_url(&ensure_trailing_slash(base))?;
    let joined = base
        .join(path.trim_start_matches('/'))
        .map_err(|source| SettingsError::InvalidUrl {
            url: path.to_string(),
            source,
        })?;
    Ok(joined.to_string())
}

/// 输出文件所在位置到站点根的相对路径，例如 "." 或 "../.."
pub fn relative_root(save_as: &str) -> String {
    let depth = save_as.trim_start_matches('/').matches('/').count();
    if depth == 0 {
        ".".to_string()
    } else {
        vec![".."; depth].join("/")
    }
}

/// 路径是否只由普通组件构成（不含 `..` 或根）
pub fn is_contained(path: &Path) -> bool {
    path.components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slashes() {
        assert_eq!(ensure_trailing_slash("blog"), "blog/");
        assert_eq!(ensure_trailing_slash("blog/"), "blog/");
    }

    #[test]
    fn test_absolute_url_keeps_sub_path() {
        assert_eq!(
            absolute_url("https://example.org/blog", "feeds/all.atom.xml").unwrap(),
            "https://example.org/blog/feeds/all.atom.xml"
        );
        assert_eq!(
            absolute_url("https://example.org/", "/feed.xml").unwrap(),
            "https://example.org/feed.xml"
        );
    }

    #[test]
    fn test_site_url_scheme() {
        assert!(parse_site_url("http://127.0.0.1:8000").is_ok());
        assert!(parse_site_url("ftp://example.org").is_err());
        assert!(parse_site_url("example.org").is_err());
    }

    #[test]
    fn test_relative_root() {
        assert_eq!(relative_root("index.html"), ".");
        assert_eq!(relative_root("2023-04-01/post/index.html"), "../..");
    }

    #[test]
    fn test_is_contained() {
        assert!(is_contained(Path::new("assets/favicon.ico")));
        assert!(!is_contained(Path::new("../outside")));
        assert!(!is_contained(Path::new("/etc")));
    }
}
