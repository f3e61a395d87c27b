use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 分页设置：`false` 表示不分页，整数表示每页文章数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pagination {
    Flag(bool),
    PerPage(u32),
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::Flag(false)
    }
}

impl Pagination {
    pub fn per_page(&self) -> Option<u32> {
        match self {
            Pagination::PerPage(n) if *n > 0 => Some(*n),
            _ => None,
        }
    }
}

/// 站点地图输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SitemapFormat {
    #[default]
    Xml,
    Txt,
}

impl SitemapFormat {
    /// 输出文件名
    pub fn file_name(&self) -> &'static str {
        match self {
            SitemapFormat::Xml => "sitemap.xml",
            SitemapFormat::Txt => "sitemap.txt",
        }
    }
}

/// 站点地图中的更新频率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl fmt::Display for ChangeFreq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeFreq::Always => "always",
            ChangeFreq::Hourly => "hourly",
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
            ChangeFreq::Yearly => "yearly",
            ChangeFreq::Never => "never",
        };
        f.write_str(s)
    }
}

/// 站点地图中的页面类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SitemapPageKind {
    Article,
    Index,
    Page,
}

/// 有 URL 模板的内容类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Article,
    Page,
    Category,
    Tag,
    Author,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Article,
        ContentKind::Page,
        ContentKind::Category,
        ContentKind::Tag,
        ContentKind::Author,
    ];

    /// 配置键前缀，例如 ARTICLE
    pub fn key_prefix(&self) -> &'static str {
        match self {
            ContentKind::Article => "ARTICLE",
            ContentKind::Page => "PAGE",
            ContentKind::Category => "CATEGORY",
            ContentKind::Tag => "TAG",
            ContentKind::Author => "AUTHOR",
        }
    }

    pub fn url_key(&self) -> String {
        format!("{}_URL", self.key_prefix())
    }

    pub fn save_as_key(&self) -> String {
        format!("{}_SAVE_AS", self.key_prefix())
    }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "article" => Ok(ContentKind::Article),
            "page" => Ok(ContentKind::Page),
            "category" => Ok(ContentKind::Category),
            "tag" => Ok(ContentKind::Tag),
            "author" => Ok(ContentKind::Author),
            other => Err(format!("未知的内容类别: {}", other)),
        }
    }
}

/// 加载配置时使用的档案
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// 本地开发
    #[default]
    Development,
    /// 正式发布
    Publish,
}
