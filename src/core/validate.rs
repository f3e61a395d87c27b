use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::core::loader::LoadedSettings;
use crate::core::output::output_safety_issue;
use crate::core::sitemap::SitemapFilter;
use crate::core::urls::UrlTemplate;
use crate::models::{ContentKind, Pagination, Settings};
use crate::plugins::{PluginLocation, PluginRegistry, KNOWN_PLUGINS};
use crate::theme::{Theme, ThemeSource};
use crate::utils::{is_contained, parse_site_url, SlugRules};

/// 必须在配置文件中给出且非空的键
pub const REQUIRED_KEYS: [&str; 4] = ["SITENAME", "SITEURL", "PATH", "THEME"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// 校验发现的问题
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub severity: Severity,
    /// 相关的配置键
    pub key: String,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{}: {}: {}", level, self.key, self.message)
    }
}

/// 校验报告
#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub issues: Vec<Issue>,
}

impl Report {
    fn push(&mut self, severity: Severity, key: impl Into<String>, message: impl Into<String>) {
        let issue = Issue {
            severity,
            key: key.into(),
            message: message.into(),
        };
        debug!("{}", issue);
        self.issues.push(issue);
    }

    pub fn error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Error, key, message);
    }

    pub fn warning(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.push(Severity::Warning, key, message);
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// 是否有针对某个键的问题
    pub fn mentions(&self, key: &str) -> bool {
        self.issues.iter().any(|i| i.key == key)
    }
}

/// 校验加载后的设置
pub fn validate(loaded: &LoadedSettings, site_dir: &Path) -> Report {
    let mut report = Report::default();
    let settings = &loaded.settings;

    check_required(loaded, &mut report);
    check_site_url(settings, &mut report);
    check_slug_rules(settings, &mut report);
    check_templates(loaded, &mut report);
    check_pagination(settings, &mut report);
    check_sitemap(settings, &mut report);
    check_plugins(loaded, site_dir, &mut report);
    check_theme(settings, site_dir, &mut report);
    check_paths(settings, site_dir, &mut report);
    check_output(settings, site_dir, &mut report);
    check_feeds(settings, &mut report);

    info!(
        "校验完成: {} 个错误, {} 个警告",
        report.errors().count(),
        report.warnings().count()
    );
    report
}

fn check_required(loaded: &LoadedSettings, report: &mut Report) {
    for key in REQUIRED_KEYS {
        match loaded.raw_str(key) {
            None => report.error(key, "缺少必填配置"),
            Some(value) if value.trim().is_empty() => report.error(key, "不能为空"),
            Some(_) => {}
        }
    }
}

fn check_site_url(settings: &Settings, report: &mut Report) {
    if settings.siteurl.is_empty() {
        return;
    }
    if let Err(e) = parse_site_url(&settings.siteurl) {
        report.error("SITEURL", format!("必须是 http(s) 绝对地址: {}", e));
    }
}

fn check_slug_rules(settings: &Settings, report: &mut Report) {
    if let Err(e) = SlugRules::from_settings(settings) {
        report.error("SLUG_REGEX_SUBSTITUTIONS", e.to_string());
    }
}

fn check_templates(loaded: &LoadedSettings, report: &mut Report) {
    let settings = &loaded.settings;
    for kind in ContentKind::ALL {
        let url_key = kind.url_key();
        let save_as_key = kind.save_as_key();

        if let Err(e) = UrlTemplate::parse(settings.url_template(kind)) {
            report.error(&url_key, e.to_string());
        }
        let save_as = settings.save_as_template(kind);
        if !save_as.is_empty() {
            if let Err(e) = UrlTemplate::parse(save_as) {
                report.error(&save_as_key, e.to_string());
            }
        }

        // SAVE_AS 为空表示不生成，无需成对设置
        let url_set = loaded.is_set(&url_key);
        let save_as_set = loaded.is_set(&save_as_key);
        let save_as_disabled = loaded.raw_str(&save_as_key) == Some("");
        if url_set && !save_as_set {
            report.warning(
                &url_key,
                format!("设置了 {} 但没有设置 {}, 输出路径将使用默认值", url_key, save_as_key),
            );
        } else if save_as_set && !save_as_disabled && !url_set {
            report.warning(
                &save_as_key,
                format!("设置了 {} 但没有设置 {}, 链接将使用默认值", save_as_key, url_key),
            );
        }
    }
}

fn check_pagination(settings: &Settings, report: &mut Report) {
    match settings.default_pagination {
        Pagination::Flag(true) | Pagination::PerPage(0) => {
            report.error("DEFAULT_PAGINATION", "必须是 false 或正整数")
        }
        _ => {}
    }
}

fn check_sitemap(settings: &Settings, report: &mut Report) {
    if let Some(sitemap) = &settings.sitemap {
        if let Err(e) = SitemapFilter::new(sitemap) {
            report.error("SITEMAP", e.to_string());
        }
    }
}

fn check_plugins(loaded: &LoadedSettings, site_dir: &Path, report: &mut Report) {
    let settings = &loaded.settings;

    for path in &settings.plugin_paths {
        if !site_dir.join(path).is_dir() {
            report.warning("PLUGIN_PATHS", format!("插件目录不存在: {}", path));
        }
    }

    for plugin in PluginRegistry::new(site_dir, settings).resolve() {
        if plugin.location == PluginLocation::Missing {
            report.warning("PLUGINS", format!("找不到插件 {}", plugin.name));
        }
    }

    for info in KNOWN_PLUGINS.iter().filter(|p| !settings.has_plugin(p.name)) {
        for key in info.settings_keys.iter().filter(|k| loaded.is_set(k)) {
            report.warning(
                *key,
                format!("该配置只由 {} 插件使用, 但插件未启用", info.name),
            );
        }
    }
}

fn check_theme(settings: &Settings, site_dir: &Path, report: &mut Report) {
    if settings.theme.trim().is_empty() {
        return;
    }
    let theme = Theme::resolve(site_dir, &settings.theme);
    if let ThemeSource::Directory(dir) = &theme.source {
        if !theme.exists {
            report.warning("THEME", format!("主题目录不存在: {}", dir.display()));
        } else if !theme.has_templates {
            report.warning("THEME", format!("主题缺少 templates 目录: {}", dir.display()));
        }
    }
}

fn check_paths(settings: &Settings, site_dir: &Path, report: &mut Report) {
    let content_dir = site_dir.join(&settings.path);
    if !settings.path.is_empty() && !content_dir.is_dir() {
        report.warning("PATH", format!("内容目录不存在: {}", content_dir.display()));
    } else {
        for static_path in &settings.static_paths {
            if !content_dir.join(static_path).exists() {
                report.warning(
                    "STATIC_PATHS",
                    format!("静态资源路径不存在: {}", static_path),
                );
            }
        }
    }

    for (source, metadata) in &settings.extra_path_metadata {
        if let Some(destination) = &metadata.path {
            if !is_contained(Path::new(destination)) {
                report.error(
                    "EXTRA_PATH_METADATA",
                    format!("{} 的目标 {} 超出输出目录", source, destination),
                );
            }
        }
        let covered = settings.static_paths.iter().any(|sp| {
            let sp = sp.trim_end_matches('/');
            source == sp || source.starts_with(&format!("{}/", sp))
        });
        if !covered {
            report.warning(
                "EXTRA_PATH_METADATA",
                format!("{} 不在任何 STATIC_PATHS 中", source),
            );
        }
    }
}

fn check_output(settings: &Settings, site_dir: &Path, report: &mut Report) {
    if !settings.delete_output_directory {
        return;
    }
    if let Some(reason) = output_safety_issue(settings, site_dir) {
        report.error("OUTPUT_PATH", format!("DELETE_OUTPUT_DIRECTORY 开启时不安全: {}", reason));
    }
}

fn check_feeds(settings: &Settings, report: &mut Report) {
    match settings.feeds.feed_domain.as_deref() {
        Some(domain) => {
            if let Err(e) = parse_site_url(domain) {
                report.error("FEED_DOMAIN", e.to_string());
            }
        }
        None if settings.feeds.any_enabled() && settings.relative_urls => {
            report.warning(
                "FEED_DOMAIN",
                "使用相对链接时生成的订阅源可能无效, 请设置 FEED_DOMAIN",
            );
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;
    use serde_yaml::{Mapping, Value};

    fn loaded(yaml: &str) -> LoadedSettings {
        let raw: Mapping = serde_yaml::from_str(yaml).unwrap();
        let settings: Settings = serde_yaml::from_value(Value::Mapping(raw.clone())).unwrap();
        LoadedSettings {
            settings,
            raw,
            sources: Vec::new(),
            profile: Profile::Development,
        }
    }

    const MINIMAL: &str = "SITENAME: Blog\nSITEURL: https://example.org\nPATH: content\nTHEME: notmyidea\nSTATIC_PATHS: []\n";

    #[test]
    fn test_required_keys() {
        let report = validate(&loaded("SITENAME: ''\nPATH: '  '\n"), Path::new("/nonexistent"));
        assert!(report.has_errors());
        let keys: Vec<_> = report.errors().map(|i| i.key.as_str()).collect();
        assert!(keys.contains(&"SITENAME"));
        assert!(keys.contains(&"SITEURL"));
        assert!(keys.contains(&"PATH"));
        assert!(keys.contains(&"THEME"));
    }

    #[test]
    fn test_minimal_settings_have_no_errors() {
        let report = validate(&loaded(MINIMAL), Path::new("/nonexistent"));
        assert!(!report.has_errors(), "{:?}", report.issues);
    }

    #[test]
    fn test_bad_site_url() {
        let yaml = MINIMAL.replace("https://example.org", "example.org");
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.errors().any(|i| i.key == "SITEURL"));
    }

    #[test]
    fn test_url_without_save_as_warns() {
        let yaml = format!("{}PAGE_URL: '{{slug}}'\nAUTHOR_SAVE_AS: ''\n", MINIMAL);
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.warnings().any(|i| i.key == "PAGE_URL"));
        assert!(!report.mentions("AUTHOR_SAVE_AS"));
    }

    #[test]
    fn test_bad_template_and_rules() {
        let yaml = format!(
            "{}ARTICLE_URL: '{{slug'\nSLUG_REGEX_SUBSTITUTIONS: [['(', '']]\nDEFAULT_PAGINATION: 0\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.errors().any(|i| i.key == "ARTICLE_URL"));
        assert!(report.errors().any(|i| i.key == "SLUG_REGEX_SUBSTITUTIONS"));
        assert!(report.errors().any(|i| i.key == "DEFAULT_PAGINATION"));
    }

    #[test]
    fn test_plugin_settings_without_plugin() {
        let yaml = format!(
            "{}PLUGINS: [readtime, mystery]\nSITEMAP:\n  format: xml\nSUMMARY_USE_FIRST_PARAGRAPH: true\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.warnings().any(|i| i.key == "SITEMAP"));
        assert!(report.warnings().any(|i| i.key == "SUMMARY_USE_FIRST_PARAGRAPH"));
        assert!(report
            .warnings()
            .any(|i| i.key == "PLUGINS" && i.message.contains("mystery")));
    }

    #[test]
    fn test_unsafe_output_and_feeds() {
        let yaml = format!(
            "{}DELETE_OUTPUT_DIRECTORY: true\nOUTPUT_PATH: '.'\nRELATIVE_URLS: true\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("/srv/blog"));
        assert!(report.errors().any(|i| i.key == "OUTPUT_PATH"));
        assert!(report.warnings().any(|i| i.key == "FEED_DOMAIN"));
    }

    #[test]
    fn test_extra_path_metadata_outside_static_paths() {
        let yaml = format!(
            "{}EXTRA_PATH_METADATA:\n  extra/robots.txt: {{path: robots.txt}}\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.warnings().any(|i| i.key == "EXTRA_PATH_METADATA"));
    }

    #[test]
    fn test_parent_of_relative_site_dir_is_unsafe() {
        let yaml = format!(
            "{}DELETE_OUTPUT_DIRECTORY: true\nOUTPUT_PATH: '..'\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("."));
        assert!(report.errors().any(|i| i.key == "OUTPUT_PATH"));
    }

    #[test]
    fn test_extra_path_metadata_escaping_output() {
        let yaml = format!(
            "{}EXTRA_PATH_METADATA:\n  extra/robots.txt: {{path: ../robots.txt}}\n",
            MINIMAL
        );
        let report = validate(&loaded(&yaml), Path::new("/nonexistent"));
        assert!(report.errors().any(|i| i.key == "EXTRA_PATH_METADATA"));
    }
}
