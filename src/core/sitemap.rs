use regex::Regex;
use tracing::debug;

use crate::core::error::Result;
use crate::models::{ChangeFreq, Settings, SitemapFormat, SitemapPageKind, SitemapSettings};
use crate::utils::slug_rules::compile_pattern;

/// 站点地图排除规则与输出参数
#[derive(Debug, Clone)]
pub struct SitemapFilter {
    settings: SitemapSettings,
    excludes: Vec<Regex>,
}

impl SitemapFilter {
    pub fn new(settings: &SitemapSettings) -> Result<Self> {
        // 排除规则从 URL 开头匹配
        let excludes = settings
            .exclude
            .iter()
            .map(|pattern| compile_pattern(&format!("^(?:{})", pattern), false))
            .collect::<Result<Vec<_>>>()?;
        debug!("站点地图排除规则: {:?}", settings.exclude);

        Ok(Self {
            settings: settings.clone(),
            excludes,
        })
    }

    /// 按站点设置构建；未启用 sitemap 插件时返回 None
    pub fn from_settings(settings: &Settings) -> Result<Option<Self>> {
        if !settings.has_plugin("sitemap") {
            return Ok(None);
        }
        let sitemap = settings.sitemap.clone().unwrap_or_default();
        Self::new(&sitemap).map(Some)
    }

    /// URL（相对于站点根）是否被排除
    pub fn is_excluded(&self, url: &str) -> bool {
        let url = url.trim_start_matches('/');
        self.excludes.iter().any(|re| re.is_match(url))
    }

    pub fn format(&self) -> SitemapFormat {
        self.settings.format
    }

    /// 站点地图输出文件名
    pub fn file_name(&self) -> &'static str {
        self.settings.format.file_name()
    }

    pub fn priority(&self, kind: SitemapPageKind) -> f32 {
        self.settings.priorities.get(kind)
    }

    pub fn changefreq(&self, kind: SitemapPageKind) -> ChangeFreq {
        self.settings.changefreqs.get(kind)
    }
}
