use regex::{Regex, RegexBuilder};
use tracing::debug;

use crate::core::error::{Result, SettingsError};
use crate::models::Settings;

/// 编译后的别名规则
#[derive(Debug, Clone)]
pub struct SlugRules {
    substitutions: Vec<(Regex, String)>,
    use_unicode: bool,
    preserve_case: bool,
}

impl SlugRules {
    /// 编译替换规则，模式与替换串接受 Python 风格的写法
    pub fn compile(rules: &[(String, String)], use_unicode: bool, preserve_case: bool) -> Result<Self> {
        let mut substitutions = Vec::with_capacity(rules.len());
        for (pattern, replacement) in rules {
            let regex = compile_pattern(pattern, true)?;
            substitutions.push((regex, translate_replacement(replacement)));
        }
        debug!("编译了 {} 条别名替换规则", substitutions.len());

        Ok(Self {
            substitutions,
            use_unicode,
            preserve_case,
        })
    }

    /// 按站点设置编译
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::compile(
            &settings.slug_regex_substitutions,
            settings.slugify_use_unicode,
            settings.slugify_preserve_case,
        )
    }

    /// 生成别名
    pub fn slugify(&self, text: &str) -> String {
        let mut value = if self.use_unicode {
            text.to_string()
        } else {
            transliterate(text)
        };

        for (regex, replacement) in &self.substitutions {
            value = regex.replace_all(&value, replacement.as_str()).into_owned();
        }

        if !self.preserve_case {
            value = value.to_lowercase();
        }

        value.trim().to_string()
    }
}

/// 编译一条正则，将 Python 专有的 `\Z` 转为 `\z`
pub fn compile_pattern(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(&translate_pattern(pattern))
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| SettingsError::Regex {
            pattern: pattern.to_string(),
            source,
        })
}

fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('Z') => out.push_str("\\z"),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// 将 `\1`、`\g<name>` 形式的反向引用转换为 `${1}`、`${name}`
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(d) if d.is_ascii_digit() => {
                    let mut group = String::new();
                    while let Some(&d) = chars.peek() {
                        if !d.is_ascii_digit() || group.len() == 2 {
                            break;
                        }
                        group.push(d);
                        chars.next();
                    }
                    out.push_str(&format!("${{{}}}", group));
                }
                Some('g') => {
                    chars.next();
                    if chars.peek() == Some(&'<') {
                        chars.next();
                        let name: String = chars.by_ref().take_while(|&c| c != '>').collect();
                        out.push_str(&format!("${{{}}}", name));
                    } else {
                        out.push_str("\\g");
                    }
                }
                Some('\\') => {
                    chars.next();
                    out.push('\\');
                }
                Some('n') => {
                    chars.next();
                    out.push('\n');
                }
                Some('t') => {
                    chars.next();
                    out.push('\t');
                }
                _ => out.push('\\'),
            },
            _ => out.push(c),
        }
    }

    out
}

/// 将非 ASCII 字符音译为 ASCII，保留大小写与空白
fn transliterate(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }
    deunicode::deunicode(text)
}
