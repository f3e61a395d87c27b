use std::path::PathBuf;
use thiserror::Error;

/// 设置层的结果类型
pub type Result<T> = std::result::Result<T, SettingsError>;

/// 设置错误类型
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("读取配置文件失败: {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("不支持的配置文件格式: {path}")]
    UnsupportedFormat {
        path: PathBuf,
    },

    #[error("YAML 解析失败: {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("TOML 解析失败: {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("配置文件顶层必须是映射: {path}")]
    NotAMapping {
        path: PathBuf,
    },

    #[error("EXTENDS 形成循环: {}", display_chain(.chain))]
    ExtendsCycle {
        chain: Vec<PathBuf>,
    },

    #[error("EXTENDS 必须是文件路径: {path}")]
    InvalidExtends {
        path: PathBuf,
    },

    #[error("配置项 {key} 的引用形成循环")]
    ReferenceCycle {
        key: String,
    },

    #[error("配置项 {key} 引用了未定义的设置 ${name}")]
    UnknownReference {
        key: String,
        name: String,
    },

    #[error("配置项类型错误: {0}")]
    Invalid(#[source] serde_yaml::Error),

    #[error("无效的正则表达式 {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("无效的 URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("无效的 URL 模板 {template:?}: {message}")]
    Template {
        template: String,
        message: String,
    },

    #[error("URL 模板 {template:?} 缺少字段 {field}")]
    MissingField {
        template: String,
        field: String,
    },

    #[error("拒绝清理输出目录 {path}: {reason}")]
    UnsafeOutput {
        path: PathBuf,
        reason: String,
    },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("遍历目录失败: {0}")]
    Walk(#[from] walkdir::Error),
}

impl SettingsError {
    /// 创建模板错误
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
