use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::core::error::{Result, SettingsError};
use crate::models::Settings;
use crate::utils::is_contained;

/// 清理输出目录的结果
#[derive(Debug, Clone, Default)]
pub struct OutputReport {
    /// 输出目录
    pub output_dir: PathBuf,
    /// 被删除的条目
    pub removed: Vec<PathBuf>,
    /// 按 OUTPUT_RETENTION 保留的条目
    pub retained: Vec<PathBuf>,
}

/// 一个静态文件的复制计划
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaticCopy {
    /// 源文件
    pub source: PathBuf,
    /// 相对于 PATH 的路径
    pub relative: String,
    /// 相对于输出目录的目标路径
    pub destination: String,
}

/// 按词法规则规范化路径（不访问文件系统）
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.file_name().is_some() {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// 解析为绝对路径，路径不存在时按当前目录拼接后规范化
fn resolve(path: &Path) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(path) {
        return resolved;
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

/// 检查清空输出目录是否安全，返回拒绝原因
pub fn output_safety_issue(settings: &Settings, site_dir: &Path) -> Option<String> {
    let site = resolve(site_dir);
    let output = resolve(&site.join(&settings.output_path));
    let content = resolve(&site.join(&settings.path));

    if output.parent().is_none() {
        return Some("输出目录是文件系统根目录".to_string());
    }
    if output == site || site.starts_with(&output) {
        return Some("输出目录包含站点目录".to_string());
    }
    if content.starts_with(&output) {
        return Some("输出目录包含内容目录 PATH".to_string());
    }
    None
}

/// 准备输出目录
///
/// DELETE_OUTPUT_DIRECTORY 开启时删除目录下除 OUTPUT_RETENTION 之外的全部条目，
/// 否则只确保目录存在。
pub fn prepare_output(settings: &Settings, site_dir: &Path) -> Result<OutputReport> {
    let output_dir = site_dir.join(&settings.output_path);
    let mut report = OutputReport {
        output_dir: output_dir.clone(),
        ..OutputReport::default()
    };

    if !settings.delete_output_directory || !output_dir.exists() {
        fs::create_dir_all(&output_dir)?;
        debug!("输出目录已就绪: {}", output_dir.display());
        return Ok(report);
    }

    if let Some(reason) = output_safety_issue(settings, site_dir) {
        return Err(SettingsError::UnsafeOutput {
            path: output_dir,
            reason,
        });
    }
    if !output_dir.is_dir() {
        return Err(SettingsError::UnsafeOutput {
            path: output_dir,
            reason: "不是目录".to_string(),
        });
    }

    info!("清空输出目录: {}", output_dir.display());
    for entry in fs::read_dir(&output_dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if settings.output_retention.iter().any(|kept| kept == &name) {
            debug!("保留: {}", path.display());
            report.retained.push(path);
            continue;
        }

        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        report.removed.push(path);
    }

    info!("删除了 {} 个条目", report.removed.len());
    Ok(report)
}

/// 列出 STATIC_PATHS 下的全部文件及其输出位置
pub fn plan_static(settings: &Settings, site_dir: &Path) -> Result<Vec<StaticCopy>> {
    let content_dir = site_dir.join(&settings.path);
    let mut plan = Vec::new();

    for static_path in &settings.static_paths {
        let root = content_dir.join(static_path);
        if !root.exists() {
            warn!("静态资源目录不存在: {}", root.display());
            continue;
        }

        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = match entry.path().strip_prefix(&content_dir) {
                Ok(rel) => rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                Err(_) => continue,
            };
            let destination = match settings
                .extra_path_metadata
                .get(&relative)
                .and_then(|meta| meta.path.clone())
            {
                Some(path) if is_contained(Path::new(&path)) => path,
                Some(path) => {
                    warn!("EXTRA_PATH_METADATA 目标超出输出目录，已忽略: {}", path);
                    relative.clone()
                }
                None => relative.clone(),
            };

            plan.push(StaticCopy {
                source: entry.path().to_path_buf(),
                relative,
                destination,
            });
        }
    }

    plan.sort_by(|a, b| a.relative.cmp(&b.relative));
    plan.dedup_by(|a, b| a.relative == b.relative);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PathMetadata;
    use tempfile::TempDir;

    fn site_with_output() -> TempDir {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("output");
        fs::create_dir_all(output.join("old")).unwrap();
        fs::write(output.join("old/index.html"), "old").unwrap();
        fs::write(output.join("stale.html"), "stale").unwrap();
        fs::create_dir_all(output.join(".git")).unwrap();
        dir
    }

    #[test]
    fn test_keeps_output_when_not_deleting() {
        let dir = site_with_output();
        let report = prepare_output(&Settings::default(), dir.path()).unwrap();
        assert!(report.removed.is_empty());
        assert!(dir.path().join("output/stale.html").exists());
    }

    #[test]
    fn test_deletes_output_except_retention() {
        let dir = site_with_output();
        let settings = Settings {
            delete_output_directory: true,
            output_retention: vec![".git".to_string()],
            ..Settings::default()
        };
        let report = prepare_output(&settings, dir.path()).unwrap();
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.retained.len(), 1);
        assert!(!dir.path().join("output/old").exists());
        assert!(dir.path().join("output/.git").exists());
    }

    #[test]
    fn test_refuses_to_delete_content() {
        let dir = site_with_output();
        let settings = Settings {
            delete_output_directory: true,
            output_path: ".".to_string(),
            ..Settings::default()
        };
        let err = prepare_output(&settings, dir.path()).unwrap_err();
        assert!(matches!(err, SettingsError::UnsafeOutput { .. }));
        assert!(dir.path().join("output/stale.html").exists());
    }

    #[test]
    fn test_safety_issue() {
        let site = Path::new("/srv/blog");
        let mut settings = Settings::default();
        assert!(output_safety_issue(&settings, site).is_none());

        settings.output_path = "..".to_string();
        assert!(output_safety_issue(&settings, site).is_some());

        settings.output_path = "/".to_string();
        assert!(output_safety_issue(&settings, site).is_some());
    }

    #[test]
    fn test_safety_issue_with_relative_site_dir() {
        let mut settings = Settings {
            delete_output_directory: true,
            ..Settings::default()
        };
        assert!(output_safety_issue(&settings, Path::new(".")).is_none());

        settings.output_path = "..".to_string();
        assert!(output_safety_issue(&settings, Path::new(".")).is_some());

        settings.output_path = "output/../..".to_string();
        assert!(output_safety_issue(&settings, Path::new("")).is_some());
    }

    #[test]
    fn test_safety_issue_with_absolute_ancestor() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("blog");
        fs::create_dir_all(&site).unwrap();

        let settings = Settings {
            delete_output_directory: true,
            output_path: dir.path().to_string_lossy().into_owned(),
            ..Settings::default()
        };
        assert!(output_safety_issue(&settings, &site).is_some());

        let sibling = Settings {
            output_path: dir.path().join("public").to_string_lossy().into_owned(),
            ..settings
        };
        assert!(output_safety_issue(&sibling, &site).is_none());
    }

    #[test]
    fn test_refuses_to_delete_parent_of_site() {
        let dir = TempDir::new().unwrap();
        let site = dir.path().join("blog");
        fs::create_dir_all(site.join("content")).unwrap();
        fs::write(dir.path().join("keep.txt"), "keep").unwrap();

        let settings = Settings {
            delete_output_directory: true,
            output_path: "..".to_string(),
            ..Settings::default()
        };
        let err = prepare_output(&settings, &site).unwrap_err();
        assert!(matches!(err, SettingsError::UnsafeOutput { .. }));
        assert!(dir.path().join("keep.txt").exists());
        assert!(site.join("content").exists());
    }

    #[test]
    fn test_plan_static_ignores_escaping_destination() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("content/assets");
        fs::create_dir_all(&assets).unwrap();
        fs::write(assets.join("robots.txt"), "robots").unwrap();

        let mut settings = Settings {
            static_paths: vec!["assets".to_string()],
            ..Settings::default()
        };
        settings.extra_path_metadata.insert(
            "assets/robots.txt".to_string(),
            PathMetadata {
                path: Some("../robots.txt".to_string()),
                ..PathMetadata::default()
            },
        );

        let plan = plan_static(&settings, dir.path()).unwrap();
        assert_eq!(plan[0].destination, "assets/robots.txt");
    }

    #[test]
    fn test_plan_static_with_extra_path_metadata() {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("content/assets");
        fs::create_dir_all(assets.join("img")).unwrap();
        fs::write(assets.join("favicon.ico"), "ico").unwrap();
        fs::write(assets.join("img/logo.png"), "png").unwrap();

        let mut settings = Settings {
            static_paths: vec!["assets".to_string(), "missing".to_string()],
            ..Settings::default()
        };
        settings.extra_path_metadata.insert(
            "assets/favicon.ico".to_string(),
            PathMetadata {
                path: Some("favicon.ico".to_string()),
                ..PathMetadata::default()
            },
        );

        let plan = plan_static(&settings, dir.path()).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].relative, "assets/favicon.ico");
        assert_eq!(plan[0].destination, "favicon.ico");
        assert_eq!(plan[1].destination, "assets/img/logo.png");
    }
}
