use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::core::error::Result;
use crate::core::urls::{UrlContext, UrlTemplate};
use crate::models::Settings;
use crate::utils::absolute_url;

/// 订阅源覆盖的内容范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// 所有语言的全部文章
    All,
    /// 默认语言的文章
    Main,
    Category,
    Author,
    Tag,
}

impl FeedKind {
    /// 是否按分类/作者/标签分别生成
    pub fn is_per_item(&self) -> bool {
        matches!(self, FeedKind::Category | FeedKind::Author | FeedKind::Tag)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Atom,
    Rss,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedFormat::Atom => f.write_str("atom"),
            FeedFormat::Rss => f.write_str("rss"),
        }
    }
}

/// 一个启用的订阅源
#[derive(Debug, Clone, Serialize)]
pub struct FeedTarget {
    pub kind: FeedKind,
    pub format: FeedFormat,
    /// 配置键名
    pub key: &'static str,
    /// 输出路径模板
    pub save_as: String,
}

impl FeedTarget {
    /// 按分类/作者/标签的别名渲染输出路径
    pub fn save_as_for(&self, slug: &str) -> Result<String> {
        UrlTemplate::parse(&self.save_as)?.render(&UrlContext::new(slug))
    }
}

/// 所有启用的订阅源
#[derive(Debug, Clone, Serialize)]
pub struct FeedPlan {
    /// 订阅源中链接使用的域名
    pub domain: String,
    pub max_items: Option<u32>,
    pub targets: Vec<FeedTarget>,
}

impl FeedPlan {
    pub fn from_settings(settings: &Settings) -> Self {
        let feeds = &settings.feeds;
        let candidates: [(FeedKind, FeedFormat, &'static str, &Option<String>); 10] = [
            (FeedKind::All, FeedFormat::Atom, "FEED_ALL_ATOM", &feeds.feed_all_atom),
            (FeedKind::All, FeedFormat::Rss, "FEED_ALL_RSS", &feeds.feed_all_rss),
            (FeedKind::Main, FeedFormat::Atom, "FEED_ATOM", &feeds.feed_atom),
            (FeedKind::Main, FeedFormat::Rss, "FEED_RSS", &feeds.feed_rss),
            (FeedKind::Category, FeedFormat::Atom, "CATEGORY_FEED_ATOM", &feeds.category_feed_atom),
            (FeedKind::Category, FeedFormat::Rss, "CATEGORY_FEED_RSS", &feeds.category_feed_rss),
            (FeedKind::Author, FeedFormat::Atom, "AUTHOR_FEED_ATOM", &feeds.author_feed_atom),
            (FeedKind::Author, FeedFormat::Rss, "AUTHOR_FEED_RSS", &feeds.author_feed_rss),
            (FeedKind::Tag, FeedFormat::Atom, "TAG_FEED_ATOM", &feeds.tag_feed_atom),
            (FeedKind::Tag, FeedFormat::Rss, "TAG_FEED_RSS", &feeds.tag_feed_rss),
        ];

        let targets = candidates
            .into_iter()
            .filter_map(|(kind, format, key, value)| match value.as_deref() {
                Some(save_as) if !save_as.is_empty() => Some(FeedTarget {
                    kind,
                    format,
                    key,
                    save_as: save_as.to_string(),
                }),
                _ => None,
            })
            .collect();

        Self {
            domain: feed_domain(settings).to_string(),
            max_items: feeds.feed_max_items,
            targets,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 订阅源的绝对 URL；域名为空时返回站内路径
    pub fn url_for(&self, save_as: &str) -> Result<String> {
        if self.domain.is_empty() {
            warn!("订阅源没有可用的域名, 使用站内路径: {}", save_as);
            return Ok(save_as.to_string());
        }
        absolute_url(&self.domain, save_as)
    }
}

/// FEED_DOMAIN，缺省时使用 SITEURL
pub fn feed_domain(settings: &Settings) -> &str {
    settings
        .feeds
        .feed_domain
        .as_deref()
        .unwrap_or(&settings.siteurl)
}
