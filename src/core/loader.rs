use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};
use tracing::{debug, info};

use crate::core::error::{Result, SettingsError};
use crate::models::{Profile, Settings};

/// 导入其他配置文件的键
pub const EXTENDS_KEY: &str = "EXTENDS";

/// 引用解析的最大跳数
const MAX_REFERENCE_HOPS: usize = 16;

/// 加载完成的设置
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    /// 类型化的设置
    pub settings: Settings,
    /// 合并后的原始键值（用于检查键是否出现在文件中）
    pub raw: Mapping,
    /// 参与合并的文件，从最底层的基础文件开始
    pub sources: Vec<PathBuf>,
    /// 使用的档案
    pub profile: Profile,
}

impl LoadedSettings {
    /// 键是否在配置文件中给出（null 视为未给出）
    pub fn is_set(&self, key: &str) -> bool {
        matches!(self.raw.get(key), Some(v) if !v.is_null())
    }

    /// 键在配置文件中的字符串值
    pub fn raw_str(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(Value::as_str)
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    /// 站点目录
    pub site_dir: PathBuf,
}

impl SettingsLoader {
    pub fn new(site_dir: impl Into<PathBuf>) -> Self {
        Self {
            site_dir: site_dir.into(),
        }
    }

    /// 确定要加载的配置文件路径
    pub fn config_path(&self, profile: Profile, explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.site_dir.join(path),
            None => self.site_dir.join(profile.default_file_name()),
        }
    }

    /// 加载指定档案的默认配置文件
    pub fn load_profile(&self, profile: Profile) -> Result<LoadedSettings> {
        let path = self.config_path(profile, None);
        self.load(&path, profile)
    }

    /// 加载配置文件及其 EXTENDS 链
    pub fn load(&self, path: &Path, profile: Profile) -> Result<LoadedSettings> {
        info!("加载配置: {} ({:?})", path.display(), profile);

        let mut stack = Vec::new();
        let mut sources = Vec::new();
        let mut raw = collect_chain(path, &mut stack, &mut sources)?;

        resolve_references(&mut raw)?;
        profile.apply(&mut raw);

        let settings: Settings =
            serde_yaml::from_value(Value::Mapping(raw.clone())).map_err(SettingsError::Invalid)?;

        debug!("合并了 {} 个配置文件, 共 {} 个键", sources.len(), raw.len());

        Ok(LoadedSettings {
            settings,
            raw,
            sources,
            profile,
        })
    }
}

/// 解析单个配置文件为映射，格式由扩展名决定
pub fn load_mapping(path: &Path) -> Result<Mapping> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    let value: Value = match extension.as_deref() {
        Some("yml") | Some("yaml") => {
            serde_yaml::from_str(&content).map_err(|source| SettingsError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        }
        Some("toml") => toml::from_str(&content).map_err(|source| SettingsError::Toml {
            path: path.to_path_buf(),
            source,
        })?,
        _ => {
            return Err(SettingsError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    match value {
        Value::Mapping(mapping) => Ok(mapping),
        // 空文件
        Value::Null => Ok(Mapping::new()),
        _ => Err(SettingsError::NotAMapping {
            path: path.to_path_buf(),
        }),
    }
}

/// 递归加载 EXTENDS 链，子文件的键覆盖父文件
fn collect_chain(
    path: &Path,
    stack: &mut Vec<PathBuf>,
    sources: &mut Vec<PathBuf>,
) -> Result<Mapping> {
    let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if stack.contains(&canonical) {
        let mut chain = stack.clone();
        chain.push(canonical);
        return Err(SettingsError::ExtendsCycle { chain });
    }
    stack.push(canonical);

    let mut mapping = load_mapping(path)?;

    let base = match mapping.remove(EXTENDS_KEY) {
        Some(Value::String(relative)) => {
            let parent_dir = path.parent().unwrap_or_else(|| Path::new("."));
            let parent_path = parent_dir.join(relative);
            debug!("{} 导入 {}", path.display(), parent_path.display());
            Some(collect_chain(&parent_path, stack, sources)?)
        }
        Some(Value::Null) | None => None,
        Some(_) => {
            return Err(SettingsError::InvalidExtends {
                path: path.to_path_buf(),
            })
        }
    };

    stack.pop();
    sources.push(path.to_path_buf());

    Ok(match base {
        Some(mut base) => {
            for (key, value) in mapping {
                base.insert(key, value);
            }
            base
        }
        None => mapping,
    })
}

/// 形如 `$NAME` 的字符串是对其他设置的引用
fn reference_name(value: &str) -> Option<&str> {
    let name = value.strip_prefix('$')?;
    let mut chars = name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_uppercase() || first == '_') {
        return None;
    }
    if chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        Some(name)
    } else {
        None
    }
}

/// 用合并后的值替换所有引用
fn resolve_references(mapping: &mut Mapping) -> Result<()> {
    let snapshot = mapping.clone();
    for (key, value) in mapping.iter_mut() {
        let key = key.as_str().unwrap_or_default().to_string();
        resolve_value(&key, value, &snapshot)?;
    }
    Ok(())
}

fn resolve_value(key: &str, value: &mut Value, snapshot: &Mapping) -> Result<()> {
    match value {
        Value::String(s) => {
            let mut current = match reference_name(s) {
                Some(name) => name.to_string(),
                None => return Ok(()),
            };
            for _ in 0..MAX_REFERENCE_HOPS {
                let target = snapshot.get(current.as_str()).ok_or_else(|| {
                    SettingsError::UnknownReference {
                        key: key.to_string(),
                        name: current.clone(),
                    }
                })?;
                match target.as_str().and_then(reference_name) {
                    Some(next) => current = next.to_string(),
                    None => {
                        *value = target.clone();
                        return Ok(());
                    }
                }
            }
            Err(SettingsError::ReferenceCycle {
                key: key.to_string(),
            })
        }
        Value::Sequence(items) => {
            for item in items.iter_mut() {
                resolve_value(key, item, snapshot)?;
            }
            Ok(())
        }
        Value::Mapping(inner) => {
            for (_, item) in inner.iter_mut() {
                resolve_value(key, item, snapshot)?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}
