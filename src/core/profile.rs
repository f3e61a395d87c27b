use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::models::Profile;

/// 发布档案强制使用的设置
const PUBLISH_OVERRIDES: [(&str, bool); 2] = [
    ("RELATIVE_URLS", false),
    ("DELETE_OUTPUT_DIRECTORY", true),
];

impl Profile {
    /// 档案对应的默认配置文件名
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Profile::Development => "siteconf.yml",
            Profile::Publish => "publishconf.yml",
        }
    }

    /// 将档案的强制设置写入合并后的映射
    pub fn apply(&self, mapping: &mut Mapping) {
        if *self != Profile::Publish {
            return;
        }

        for (key, forced) in PUBLISH_OVERRIDES {
            match mapping.get(key) {
                Some(Value::Bool(current)) if *current == forced => {
                    debug!("{} 已是 {}", key, forced);
                }
                Some(current) => {
                    warn!("发布档案将 {} 从 {:?} 改为 {}", key, current, forced);
                }
                None => {
                    debug!("发布档案设置 {} = {}", key, forced);
                }
            }
            mapping.insert(Value::from(key), Value::Bool(forced));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_forces_overrides() {
        let mut mapping: Mapping =
            serde_yaml::from_str("RELATIVE_URLS: true\nDELETE_OUTPUT_DIRECTORY: false\n").unwrap();
        Profile::Publish.apply(&mut mapping);
        assert_eq!(mapping.get("RELATIVE_URLS"), Some(&Value::Bool(false)));
        assert_eq!(mapping.get("DELETE_OUTPUT_DIRECTORY"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_development_leaves_mapping_alone() {
        let mut mapping: Mapping = serde_yaml::from_str("RELATIVE_URLS: true\n").unwrap();
        Profile::Development.apply(&mut mapping);
        assert_eq!(mapping.get("RELATIVE_URLS"), Some(&Value::Bool(true)));
        assert!(mapping.get("DELETE_OUTPUT_DIRECTORY").is_none());
    }
}
