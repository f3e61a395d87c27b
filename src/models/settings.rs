use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

use crate::models::types::{ChangeFreq, Pagination, SitemapFormat, SitemapPageKind};

/// 站点设置，键名与配置文件中的大写键一致
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Settings {
    /// 站点名称
    pub sitename: String,
    /// 站点副标题
    pub subtitle: Option<String>,
    /// 站点作者
    pub author: Option<String>,
    /// 站点根URL，用于生成绝对链接
    pub siteurl: String,
    /// 内容源目录
    pub path: String,
    /// 输出目录
    pub output_path: String,
    /// 静态资源目录（相对于 PATH）
    pub static_paths: Vec<String>,
    /// 额外路径元数据，例如静态文件的输出位置
    pub extra_path_metadata: BTreeMap<String, PathMetadata>,
    /// 主题（内置名称或目录）
    pub theme: String,
    /// 插件搜索路径
    pub plugin_paths: Vec<String>,
    /// 启用的插件
    pub plugins: Vec<String>,
    /// 时区
    pub timezone: Option<String>,
    /// 默认语言
    pub default_lang: String,
    /// 分页设置
    pub default_pagination: Pagination,

    pub article_url: String,
    pub article_save_as: String,
    pub page_url: String,
    pub page_save_as: String,
    pub category_url: String,
    pub category_save_as: String,
    pub tag_url: String,
    pub tag_save_as: String,
    pub author_url: String,
    pub author_save_as: String,
    pub authors_save_as: String,
    pub categories_save_as: String,
    pub tags_save_as: String,
    pub archives_save_as: String,

    /// 是否在菜单显示分类
    pub display_categories_on_menu: bool,
    /// 是否在菜单显示页面
    pub display_pages_on_menu: bool,
    /// 社交链接
    pub social: Vec<(String, String)>,
    /// 友情链接
    pub links: Vec<(String, String)>,

    /// 别名正则替换规则，按顺序执行
    pub slug_regex_substitutions: Vec<(String, String)>,
    /// 别名保留 Unicode 字符
    pub slugify_use_unicode: bool,
    /// 别名保留大小写
    pub slugify_preserve_case: bool,

    /// Markdown 渲染器配置
    pub markdown: MarkdownSettings,
    /// 摘要插件：使用第一段作为摘要
    pub summary_use_first_paragraph: bool,
    /// 摘要插件：最大长度
    pub summary_max_length: Option<u32>,
    /// 站点地图插件配置
    pub sitemap: Option<SitemapSettings>,

    /// 使用相对链接
    pub relative_urls: bool,
    /// 构建前清空输出目录
    pub delete_output_directory: bool,
    /// 清空输出目录时保留的文件
    pub output_retention: Vec<String>,

    /// 订阅源设置
    #[serde(flatten)]
    pub feeds: FeedSettings,

    /// 其他配置（主题自定义键等）
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sitename: String::new(),
            subtitle: None,
            author: None,
            siteurl: String::new(),
            path: "content".to_string(),
            output_path: "output".to_string(),
            static_paths: vec!["images".to_string()],
            extra_path_metadata: BTreeMap::new(),
            theme: "notmyidea".to_string(),
            plugin_paths: Vec::new(),
            plugins: Vec::new(),
            timezone: None,
            default_lang: "en".to_string(),
            default_pagination: Pagination::default(),
            article_url: "{slug}.html".to_string(),
            article_save_as: "{slug}.html".to_string(),
            page_url: "pages/{slug}.html".to_string(),
            page_save_as: "pages/{slug}.html".to_string(),
            category_url: "category/{slug}.html".to_string(),
            category_save_as: "category/{slug}.html".to_string(),
            tag_url: "tag/{slug}.html".to_string(),
            tag_save_as: "tag/{slug}.html".to_string(),
            author_url: "author/{slug}.html".to_string(),
            author_save_as: "author/{slug}.html".to_string(),
            authors_save_as: "authors.html".to_string(),
            categories_save_as: "categories.html".to_string(),
            tags_save_as: "tags.html".to_string(),
            archives_save_as: "archives.html".to_string(),
            display_categories_on_menu: true,
            display_pages_on_menu: true,
            social: Vec::new(),
            links: Vec::new(),
            slug_regex_substitutions: default_slug_substitutions(),
            slugify_use_unicode: false,
            slugify_preserve_case: false,
            markdown: MarkdownSettings::default(),
            summary_use_first_paragraph: false,
            summary_max_length: None,
            sitemap: None,
            relative_urls: false,
            delete_output_directory: false,
            output_retention: Vec::new(),
            feeds: FeedSettings::default(),
            extras: BTreeMap::new(),
        }
    }
}

/// 生成器默认的别名替换规则
pub fn default_slug_substitutions() -> Vec<(String, String)> {
    vec![
        (r"[^\w\s-]".to_string(), String::new()),
        (r"(?u)\A\s*".to_string(), String::new()),
        (r"(?u)\s*\Z".to_string(), String::new()),
        (r"[-\s]+".to_string(), "-".to_string()),
    ]
}

impl Settings {
    /// 是否启用了某个插件
    pub fn has_plugin(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p == name)
    }

    /// 每页文章数，未启用分页时为 None
    pub fn per_page(&self) -> Option<u32> {
        self.default_pagination.per_page()
    }

    /// 获取主题自定义键
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extras.get(key)
    }
}

/// 单个路径的额外元数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathMetadata {
    /// 输出路径
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// 其他元数据
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Markdown 渲染器配置，原样传递给外部渲染器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownSettings {
    pub extension_configs: BTreeMap<String, Value>,
    pub output_format: String,
}

impl Default for MarkdownSettings {
    fn default() -> Self {
        let mut codehilite = serde_yaml::Mapping::new();
        codehilite.insert(Value::from("css_class"), Value::from("highlight"));

        let mut extension_configs = BTreeMap::new();
        extension_configs.insert(
            "markdown.extensions.codehilite".to_string(),
            Value::Mapping(codehilite),
        );
        extension_configs.insert(
            "markdown.extensions.extra".to_string(),
            Value::Mapping(serde_yaml::Mapping::new()),
        );
        extension_configs.insert(
            "markdown.extensions.meta".to_string(),
            Value::Mapping(serde_yaml::Mapping::new()),
        );

        Self {
            extension_configs,
            output_format: "html5".to_string(),
        }
    }
}

/// 站点地图插件配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapSettings {
    /// 输出格式
    pub format: SitemapFormat,
    /// 排除规则（正则，从URL开头匹配）
    pub exclude: Vec<String>,
    /// 各类页面的优先级
    pub priorities: SitemapPriorities,
    /// 各类页面的更新频率
    pub changefreqs: SitemapChangefreqs,
}

impl Default for SitemapSettings {
    fn default() -> Self {
        Self {
            format: SitemapFormat::Xml,
            exclude: Vec::new(),
            priorities: SitemapPriorities::default(),
            changefreqs: SitemapChangefreqs::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapPriorities {
    pub articles: f32,
    pub indexes: f32,
    pub pages: f32,
}

impl Default for SitemapPriorities {
    fn default() -> Self {
        Self {
            articles: 0.5,
            indexes: 0.5,
            pages: 0.5,
        }
    }
}

impl SitemapPriorities {
    pub fn get(&self, kind: SitemapPageKind) -> f32 {
        match kind {
            SitemapPageKind::Article => self.articles,
            SitemapPageKind::Index => self.indexes,
            SitemapPageKind::Page => self.pages,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SitemapChangefreqs {
    pub articles: ChangeFreq,
    pub indexes: ChangeFreq,
    pub pages: ChangeFreq,
}

impl Default for SitemapChangefreqs {
    fn default() -> Self {
        Self {
            articles: ChangeFreq::Monthly,
            indexes: ChangeFreq::Daily,
            pages: ChangeFreq::Monthly,
        }
    }
}

impl SitemapChangefreqs {
    pub fn get(&self, kind: SitemapPageKind) -> ChangeFreq {
        match kind {
            SitemapPageKind::Article => self.articles,
            SitemapPageKind::Index => self.indexes,
            SitemapPageKind::Page => self.pages,
        }
    }
}

/// 订阅源设置，None 表示不生成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct FeedSettings {
    /// 订阅源使用的域名，缺省时使用 SITEURL
    pub feed_domain: Option<String>,
    pub feed_atom: Option<String>,
    pub feed_rss: Option<String>,
    pub feed_all_atom: Option<String>,
    pub feed_all_rss: Option<String>,
    pub category_feed_atom: Option<String>,
    pub category_feed_rss: Option<String>,
    pub author_feed_atom: Option<String>,
    pub author_feed_rss: Option<String>,
    pub tag_feed_atom: Option<String>,
    pub tag_feed_rss: Option<String>,
    /// 每个订阅源的最大条目数
    pub feed_max_items: Option<u32>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            feed_domain: None,
            feed_atom: None,
            feed_rss: None,
            feed_all_atom: Some("feeds/all.atom.xml".to_string()),
            feed_all_rss: None,
            category_feed_atom: Some("feeds/{slug}.atom.xml".to_string()),
            category_feed_rss: None,
            author_feed_atom: Some("feeds/{slug}.atom.xml".to_string()),
            author_feed_rss: Some("feeds/{slug}.rss.xml".to_string()),
            tag_feed_atom: None,
            tag_feed_rss: None,
            feed_max_items: None,
        }
    }
}

impl FeedSettings {
    /// 是否有任何订阅源被启用
    pub fn any_enabled(&self) -> bool {
        [
            &self.feed_atom,
            &self.feed_rss,
            &self.feed_all_atom,
            &self.feed_all_rss,
            &self.category_feed_atom,
            &self.category_feed_rss,
            &self.author_feed_atom,
            &self.author_feed_rss,
            &self.tag_feed_atom,
            &self.tag_feed_rss,
        ]
        .iter()
        .any(|f| f.as_deref().is_some_and(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_for_missing_keys() {
        let settings: Settings = serde_yaml::from_str("SITENAME: Blog\n").unwrap();
        assert_eq!(settings.sitename, "Blog");
        assert_eq!(settings.path, "content");
        assert_eq!(settings.article_url, "{slug}.html");
        assert_eq!(settings.feeds.feed_all_atom.as_deref(), Some("feeds/all.atom.xml"));
        assert!(settings.display_categories_on_menu);
        assert!(settings.extras.is_empty());
    }

    #[test]
    fn test_null_disables_default_feed() {
        let settings: Settings =
            serde_yaml::from_str("FEED_ALL_ATOM: ~\nFEED_ATOM: feed.xml\n").unwrap();
        assert_eq!(settings.feeds.feed_all_atom, None);
        assert_eq!(settings.feeds.feed_atom.as_deref(), Some("feed.xml"));
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let settings: Settings =
            serde_yaml::from_str("GITHUB_URL: https://github.com/someone\nTHEME: themes/Papyrus\n")
                .unwrap();
        assert_eq!(settings.theme, "themes/Papyrus");
        assert_eq!(
            settings.extra("GITHUB_URL").and_then(Value::as_str),
            Some("https://github.com/someone")
        );
        assert!(settings.extra("THEME").is_none());
        assert!(settings.extra("FEED_ALL_ATOM").is_none());
    }

    #[test]
    fn test_pagination_accepts_bool_or_number() {
        let off: Settings = serde_yaml::from_str("DEFAULT_PAGINATION: false\n").unwrap();
        assert_eq!(off.per_page(), None);

        let on: Settings = serde_yaml::from_str("DEFAULT_PAGINATION: 10\n").unwrap();
        assert_eq!(on.per_page(), Some(10));
    }

    #[test]
    fn test_tuples_and_sitemap() {
        let yaml = r#"
SOCIAL:
  - [github, "https://github.com/someone"]
SITEMAP:
  format: xml
  exclude: ["tag/", "category/"]
"#;
        let settings: Settings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.social[0].0, "github");
        let sitemap = settings.sitemap.unwrap();
        assert_eq!(sitemap.format, SitemapFormat::Xml);
        assert_eq!(sitemap.exclude, vec!["tag/", "category/"]);
        assert_eq!(sitemap.changefreqs.indexes, ChangeFreq::Daily);
    }

}
