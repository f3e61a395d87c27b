use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::Settings;

/// 已知插件的描述
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginInfo {
    /// 插件名称
    pub name: &'static str,
    /// 插件描述
    pub description: &'static str,
    /// 插件读取的配置键
    pub settings_keys: &'static [&'static str],
}

/// 生成器生态中常用的可选处理阶段
pub const KNOWN_PLUGINS: [PluginInfo; 5] = [
    PluginInfo {
        name: "readtime",
        description: "估算文章阅读时间",
        settings_keys: &[],
    },
    PluginInfo {
        name: "neighbors",
        description: "为文章链接上一篇与下一篇",
        settings_keys: &[],
    },
    PluginInfo {
        name: "summary",
        description: "从正文提取摘要",
        settings_keys: &["SUMMARY_USE_FIRST_PARAGRAPH", "SUMMARY_MAX_LENGTH"],
    },
    PluginInfo {
        name: "minify",
        description: "压缩生成的 HTML",
        settings_keys: &[],
    },
    PluginInfo {
        name: "sitemap",
        description: "生成站点地图",
        settings_keys: &["SITEMAP"],
    },
];

/// 按名称查找已知插件
pub fn known_plugin(name: &str) -> Option<&'static PluginInfo> {
    KNOWN_PLUGINS.iter().find(|p| p.name == name)
}

/// 插件的定位结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum PluginLocation {
    /// 在 PLUGIN_PATHS 中找到
    Local(PathBuf),
    /// 未在本地找到，但属于已知插件，由生成器环境提供
    Known,
    /// 无法定位
    Missing,
}

/// 定位后的插件
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedPlugin {
    pub name: String,
    pub location: PluginLocation,
    pub info: Option<&'static PluginInfo>,
}

/// 插件注册表，负责在 PLUGIN_PATHS 中定位 PLUGINS
#[derive(Debug, Clone)]
pub struct PluginRegistry {
    /// 插件搜索目录（已拼接站点目录）
    pub search_paths: Vec<PathBuf>,
    /// 启用的插件
    pub enabled: Vec<String>,
}

impl PluginRegistry {
    pub fn new(site_dir: &Path, settings: &Settings) -> Self {
        let search_paths = settings
            .plugin_paths
            .iter()
            .map(|p| site_dir.join(p))
            .collect::<Vec<_>>();
        debug!("插件搜索路径: {:?}", search_paths);

        Self {
            search_paths,
            enabled: settings.plugins.clone(),
        }
    }

    /// 在搜索路径中查找插件目录或单文件插件
    fn locate(&self, name: &str) -> Option<PathBuf> {
        // 插件包名中的连字符在目录名里通常写作下划线
        let alternate = name.replace('-', "_");
        for dir in &self.search_paths {
            for candidate in [name, alternate.as_str()] {
                let path = dir.join(candidate);
                if path.is_dir() {
                    return Some(path);
                }
                if let Some(file) = find_single_file(dir, candidate) {
                    return Some(file);
                }
            }
        }
        None
    }

    /// 定位所有启用的插件
    pub fn resolve(&self) -> Vec<ResolvedPlugin> {
        let resolved: Vec<_> = self
            .enabled
            .iter()
            .map(|name| {
                let info = known_plugin(name);
                let location = match self.locate(name) {
                    Some(path) => PluginLocation::Local(path),
                    None if info.is_some() => PluginLocation::Known,
                    None => {
                        warn!("找不到插件: {}", name);
                        PluginLocation::Missing
                    }
                };
                ResolvedPlugin {
                    name: name.clone(),
                    location,
                    info,
                }
            })
            .collect();

        info!("解析了 {} 个插件", resolved.len());
        resolved
    }
}

/// 目录下以插件名为主干的文件，例如 `readtime.py`
fn find_single_file(dir: &Path, stem: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| p.is_file() && p.file_stem().and_then(|s| s.to_str()) == Some(stem))
}
