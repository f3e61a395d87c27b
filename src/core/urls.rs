use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

use crate::core::error::{Result, SettingsError};
use crate::models::{ContentKind, Settings};
use crate::utils::relative_root;

/// 可带格式说明的日期字段
const DATE_FIELDS: [&str; 2] = ["date", "modified"];

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field { name: String, format: Option<String> },
}

/// 解析后的 URL / 输出路径模板，例如 `{date:%Y}/{slug}/index.html`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl UrlTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut spec = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        spec.push(c);
                    }
                    if !closed {
                        return Err(SettingsError::template(template, "缺少 '}'"));
                    }

                    let (name, format) = match spec.split_once(':') {
                        Some((name, format)) => (name.to_string(), Some(format.to_string())),
                        None => (spec, None),
                    };
                    validate_field(template, &name, format.as_deref())?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field { name, format });
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(SettingsError::template(template, "多余的 '}'")),
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// 原始模板字符串
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 模板引用的字段名
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field { name, .. } => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, context: &UrlContext) -> Result<String> {
        let mut out = String::with_capacity(self.source.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, format } => {
                    let missing = || SettingsError::MissingField {
                        template: self.source.clone(),
                        field: name.clone(),
                    };
                    match context.lookup(name).ok_or_else(missing)? {
                        FieldValue::Text(text) => out.push_str(text),
                        FieldValue::Date(date) => {
                            let format = format.as_deref().unwrap_or("%Y-%m-%d %H:%M:%S");
                            write!(out, "{}", date.format(format)).map_err(|_| {
                                SettingsError::template(self.source.clone(), "日期格式化失败")
                            })?;
                        }
                    }
                }
            }
        }

        Ok(out)
    }
}

fn validate_field(template: &str, name: &str, format: Option<&str>) -> Result<()> {
    if name.is_empty() {
        return Err(SettingsError::template(template, "字段名为空"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
    {
        return Err(SettingsError::template(
            template,
            format!("无效的字段名 {:?}", name),
        ));
    }

    if let Some(format) = format {
        if !DATE_FIELDS.contains(&name) {
            return Err(SettingsError::template(
                template,
                format!("字段 {} 不支持格式说明", name),
            ));
        }
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(SettingsError::template(
                template,
                format!("无效的日期格式 {:?}", format),
            ));
        }
    }

    Ok(())
}

enum FieldValue<'a> {
    Text(&'a str),
    Date(&'a NaiveDateTime),
}

/// 渲染模板时可用的字段
#[derive(Debug, Clone, Default)]
pub struct UrlContext {
    pub slug: Option<String>,
    pub lang: Option<String>,
    pub category: Option<String>,
    pub author: Option<String>,
    pub date: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    /// 其他元数据
    pub extra: BTreeMap<String, String>,
}

impl UrlContext {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    pub fn with_date(mut self, date: NaiveDateTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    fn lookup(&self, name: &str) -> Option<FieldValue<'_>> {
        let text = match name {
            "slug" => self.slug.as_deref(),
            "lang" => self.lang.as_deref(),
            "category" => self.category.as_deref(),
            "author" => self.author.as_deref(),
            "date" => return self.date.as_ref().map(FieldValue::Date),
            "modified" => return self.modified.as_ref().map(FieldValue::Date),
            other => self.extra.get(other).map(String::as_str),
        };
        text.map(FieldValue::Text)
    }
}

/// 渲染后的 URL 与输出路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedUrl {
    pub url: String,
    /// 输出路径，SAVE_AS 为空字符串时不生成
    pub save_as: Option<String>,
}

impl Settings {
    /// 某类内容的 URL 模板
    pub fn url_template(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::Article => &self.article_url,
            ContentKind::Page => &self.page_url,
            ContentKind::Category => &self.category_url,
            ContentKind::Tag => &self.tag_url,
            ContentKind::Author => &self.author_url,
        }
    }

    /// 某类内容的输出路径模板
    pub fn save_as_template(&self, kind: ContentKind) -> &str {
        match kind {
            ContentKind::Article => &self.article_save_as,
            ContentKind::Page => &self.page_save_as,
            ContentKind::Category => &self.category_save_as,
            ContentKind::Tag => &self.tag_save_as,
            ContentKind::Author => &self.author_save_as,
        }
    }

    /// 渲染某类内容的 URL 与输出路径
    pub fn render_url(&self, kind: ContentKind, context: &UrlContext) -> Result<RenderedUrl> {
        let url = UrlTemplate::parse(self.url_template(kind))?.render(context)?;
        let save_as = match self.save_as_template(kind) {
            "" => None,
            template => Some(UrlTemplate::parse(template)?.render(context)?),
        };
        Ok(RenderedUrl { url, save_as })
    }

    /// 生成站内链接
    ///
    /// 相对模式下以当前输出文件的位置为起点（"." 或 "../.."），
    /// 否则以 SITEURL 为前缀。
    pub fn link(&self, target: &str, from_save_as: Option<&str>) -> String {
        let target = target.trim_start_matches('/');
        if self.relative_urls {
            let root = relative_root(from_save_as.unwrap_or(""));
            format!("{}/{}", root, target)
        } else {
            format!("{}/{}", self.siteurl.trim_end_matches('/'), target)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn april_first() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 4, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_date_and_slug_fields() {
        let template = UrlTemplate::parse("{date:%Y}-{date:%m}-{date:%d}/{slug}/index.html").unwrap();
        let context = UrlContext::new("example-post").with_date(april_first());
        assert_eq!(
            template.render(&context).unwrap(),
            "2023-04-01/example-post/index.html"
        );
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["date", "date", "date", "slug"]);
    }

    #[test]
    fn test_escaped_braces() {
        let template = UrlTemplate::parse("{{raw}}/{slug}").unwrap();
        assert_eq!(template.render(&UrlContext::new("a")).unwrap(), "{raw}/a");
    }

    #[test]
    fn test_parse_errors() {
        assert!(UrlTemplate::parse("{slug").is_err());
        assert!(UrlTemplate::parse("slug}").is_err());
        assert!(UrlTemplate::parse("{}").is_err());
        assert!(UrlTemplate::parse("{slug:>10}").is_err());
        assert!(UrlTemplate::parse("{date:%Q}").is_err());
    }

    #[test]
    fn test_missing_field() {
        let template = UrlTemplate::parse("{category}/{slug}").unwrap();
        let err = template.render(&UrlContext::new("a")).unwrap_err();
        assert!(matches!(err, SettingsError::MissingField { ref field, .. } if field == "category"));

        let context = UrlContext::new("a").with_category("rust");
        assert_eq!(template.render(&context).unwrap(), "rust/a");
    }

    #[test]
    fn test_extra_metadata() {
        let template = UrlTemplate::parse("{series}/{slug}").unwrap();
        let context = UrlContext::new("part-1").with_extra("series", "intro");
        assert_eq!(template.render(&context).unwrap(), "intro/part-1");
    }

    #[test]
    fn test_render_url_with_disabled_save_as() {
        let settings = Settings {
            author_save_as: String::new(),
            ..Settings::default()
        };
        let rendered = settings
            .render_url(ContentKind::Author, &UrlContext::new("someone"))
            .unwrap();
        assert_eq!(rendered.url, "author/someone.html");
        assert_eq!(rendered.save_as, None);
    }

    #[test]
    fn test_links() {
        let mut settings = Settings {
            siteurl: "https://example.org/".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.link("/theme/css/main.css", Some("2023-04-01/post/index.html")),
            "https://example.org/theme/css/main.css"
        );

        settings.relative_urls = true;
        assert_eq!(
            settings.link("theme/css/main.css", Some("2023-04-01/post/index.html")),
            "../../theme/css/main.css"
        );
        assert_eq!(settings.link("about", None), "./about");
    }
}
