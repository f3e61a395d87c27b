use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

/// 生成器自带的主题
pub const BUILTIN_THEMES: [&str; 2] = ["notmyidea", "simple"];

/// 主题来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ThemeSource {
    /// 内置主题名称
    Builtin(String),
    /// 主题目录
    Directory(PathBuf),
}

/// 解析后的主题
#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub source: ThemeSource,
    /// 目录是否存在（内置主题总为 true）
    pub exists: bool,
    /// 是否包含 templates/ 目录
    pub has_templates: bool,
    /// 是否包含 static/ 目录
    pub has_static: bool,
}

impl Theme {
    /// 解析 THEME：不含路径分隔符的内置名称视为内置主题，其余按站点目录解析
    pub fn resolve(site_dir: &Path, theme: &str) -> Self {
        let is_path = theme.contains('/') || theme.contains('\\') || theme.starts_with('.');
        if !is_path && BUILTIN_THEMES.contains(&theme) {
            debug!("使用内置主题: {}", theme);
            return Self {
                source: ThemeSource::Builtin(theme.to_string()),
                exists: true,
                has_templates: true,
                has_static: true,
            };
        }

        let dir = if Path::new(theme).is_absolute() {
            PathBuf::from(theme)
        } else {
            site_dir.join(theme)
        };
        debug!("主题目录: {}", dir.display());

        Self {
            exists: dir.is_dir(),
            has_templates: dir.join("templates").is_dir(),
            has_static: dir.join("static").is_dir(),
            source: ThemeSource::Directory(dir),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.source, ThemeSource::Builtin(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_theme() {
        let theme = Theme::resolve(Path::new("/srv/blog"), "notmyidea");
        assert!(theme.is_builtin());
        assert!(theme.has_templates);
    }

    #[test]
    fn test_directory_theme() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("themes/Papyrus/templates")).unwrap();

        let theme = Theme::resolve(dir.path(), "themes/Papyrus");
        assert!(!theme.is_builtin());
        assert!(theme.exists);
        assert!(theme.has_templates);
        assert!(!theme.has_static);

        let missing = Theme::resolve(dir.path(), "themes/Nope");
        assert!(!missing.exists);
        assert!(!missing.has_templates);
    }
}
