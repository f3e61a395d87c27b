use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use site_settings::core::{
    plan_static, prepare_output, validate, FeedPlan, LoadedSettings, SettingsLoader,
    SitemapFilter, UrlContext,
};
use site_settings::models::{ContentKind, Profile};
use site_settings::plugins::{PluginLocation, PluginRegistry};
use site_settings::theme::Theme;
use site_settings::SlugRules;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// 指定站点目录
    #[arg(short, long, default_value = ".", global = true)]
    pub path: PathBuf,

    /// 指定配置文件（默认按档案选择 siteconf.yml 或 publishconf.yml）
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 使用发布档案
    #[arg(long, global = true)]
    pub publish: bool,

    /// 输出更多日志（-v, -vv）
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 初始化新的站点配置
    Init(InitArgs),

    /// 校验配置
    Check,

    /// 显示合并后的有效配置
    Show(ShowArgs),

    /// 生成别名
    Slug(SlugArgs),

    /// 渲染内容的 URL 与输出路径
    Url(UrlArgs),

    /// 生成站内链接
    Link(LinkArgs),

    /// 检查 URL 是否被站点地图排除
    Sitemap(SitemapArgs),

    /// 列出启用的订阅源
    Feeds,

    /// 列出静态资源的复制计划
    Static,

    /// 列出插件及其位置
    Plugins,

    /// 准备输出目录
    Clean,
}

#[derive(Args)]
pub struct InitArgs {
    /// 站点目录名称
    #[arg(value_name = "NAME")]
    pub name: String,

    /// 站点标题
    #[arg(short, long)]
    pub title: Option<String>,

    /// 覆盖已有的配置文件
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

#[derive(Args)]
pub struct ShowArgs {
    /// 输出格式
    #[arg(short, long, value_enum, default_value = "yaml")]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct SlugArgs {
    /// 标题或文件名
    #[arg(required = true)]
    pub text: Vec<String>,
}

#[derive(Args)]
pub struct UrlArgs {
    /// 内容类别: article, page, category, tag, author
    pub kind: ContentKind,

    /// 标题或文件名，会先生成别名
    pub name: String,

    /// 将 NAME 直接作为别名
    #[arg(long)]
    pub raw: bool,

    /// 日期，格式 YYYY-MM-DD 或 YYYY-MM-DD HH:MM[:SS]
    #[arg(short, long)]
    pub date: Option<String>,

    #[arg(long)]
    pub lang: Option<String>,

    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub author: Option<String>,
}

#[derive(Args)]
pub struct LinkArgs {
    /// 站内目标路径
    pub target: String,

    /// 链接所在页面的输出路径
    #[arg(short, long)]
    pub from: Option<String>,
}

#[derive(Args)]
pub struct SitemapArgs {
    /// 相对于站点根的 URL
    #[arg(required = true)]
    pub urls: Vec<String>,
}

// 嵌入的默认配置模板
const SITECONF_TEMPLATE: &str = include_str!("../../embed/siteconf.yml");
const PUBLISHCONF_TEMPLATE: &str = include_str!("../../embed/publishconf.yml");

// 写入默认配置并创建内容目录
fn initialize_site(site_path: &Path, site_title: &str, force: bool) -> Result<()> {
    let siteconf = site_path.join(Profile::Development.default_file_name());
    let publishconf = site_path.join(Profile::Publish.default_file_name());

    if !force && (siteconf.exists() || publishconf.exists()) {
        bail!(
            "配置文件已存在: {}, 使用 --force 覆盖",
            site_path.display()
        );
    }

    for dir in [
        site_path.join("content").join("assets"),
        site_path.join("plugins"),
    ] {
        fs::create_dir_all(&dir)
            .with_context(|| format!("创建目录失败: {}", dir.display()))?;
    }

    let title = serde_yaml::to_string(&serde_yaml::Value::from(site_title))?;
    fs::write(
        &siteconf,
        SITECONF_TEMPLATE.replace("\"{sitename}\"", title.trim_end()),
    )?;
    fs::write(&publishconf, PUBLISHCONF_TEMPLATE)?;

    Ok(())
}

fn load(cli: &Cli) -> Result<LoadedSettings> {
    let profile = if cli.publish {
        Profile::Publish
    } else {
        Profile::Development
    };
    let loader = SettingsLoader::new(&cli.path);
    let path = loader.config_path(profile, cli.config.as_deref());
    loader
        .load(&path, profile)
        .with_context(|| format!("加载配置失败: {}", path.display()))
}

fn parse_date(value: &str) -> Result<NaiveDateTime> {
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(date) = NaiveDateTime::parse_from_str(value, format) {
            return Ok(date);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .with_context(|| format!("无效的日期: {}", value))
}

/// 执行命令
pub fn execute(cli: Cli) -> Result<()> {
    if let Commands::Init(args) = &cli.command {
        let site_path = cli.path.join(&args.name);
        let site_title = args.title.clone().unwrap_or_else(|| args.name.clone());
        initialize_site(&site_path, &site_title, args.force)?;
        info!("Initialized new site at: {}", site_path.display());
        println!("{} {}", "Initialized".green(), site_path.display());
        return Ok(());
    }

    let loaded = load(&cli)?;
    let settings = &loaded.settings;

    match &cli.command {
        Commands::Init(_) => unreachable!("handled above"),
        Commands::Check => {
            let report = validate(&loaded, &cli.path);
            for source in &loaded.sources {
                println!("{} {}", "loaded".cyan(), source.display());
            }
            for issue in &report.issues {
                let line = issue.to_string();
                if issue.severity == site_settings::core::Severity::Error {
                    println!("{}", line.red());
                } else {
                    println!("{}", line.yellow());
                }
            }
            let errors = report.errors().count();
            if errors > 0 {
                bail!("配置校验失败: {} 个错误", errors);
            }
            println!(
                "{} ({} warnings)",
                "Configuration OK".green(),
                report.warnings().count()
            );
        }
        Commands::Show(args) => match args.format {
            OutputFormat::Yaml => {
                for source in &loaded.sources {
                    println!("# {}", source.display());
                }
                print!("{}", serde_yaml::to_string(settings)?);
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(settings)?);
            }
        },
        Commands::Slug(args) => {
            let rules = SlugRules::from_settings(settings)?;
            for text in &args.text {
                println!("{}", rules.slugify(text));
            }
        }
        Commands::Url(args) => {
            let slug = if args.raw {
                args.name.clone()
            } else {
                SlugRules::from_settings(settings)?.slugify(&args.name)
            };
            let mut context = UrlContext::new(slug)
                .with_lang(args.lang.clone().unwrap_or_else(|| settings.default_lang.clone()));
            if let Some(date) = &args.date {
                context = context.with_date(parse_date(date)?);
            }
            if let Some(category) = &args.category {
                context = context.with_category(category.clone());
            }
            if let Some(author) = &args.author {
                context = context.with_author(author.clone());
            }

            let rendered = settings.render_url(args.kind, &context)?;
            println!("url:     {}", rendered.url);
            match &rendered.save_as {
                Some(save_as) => println!("save_as: {}", save_as),
                None => println!("save_as: {}", "(disabled)".dimmed()),
            }
            println!(
                "link:    {}",
                settings.link(&rendered.url, rendered.save_as.as_deref())
            );
        }
        Commands::Link(args) => {
            println!("{}", settings.link(&args.target, args.from.as_deref()));
        }
        Commands::Sitemap(args) => {
            let Some(filter) = SitemapFilter::from_settings(settings)? else {
                println!("{}", "sitemap plugin is not enabled".yellow());
                return Ok(());
            };
            println!("{} {}", "output".cyan(), filter.file_name());
            for url in &args.urls {
                if filter.is_excluded(url) {
                    println!("{} {}", "excluded".red(), url);
                } else {
                    println!("{} {}", "included".green(), url);
                }
            }
        }
        Commands::Feeds => {
            let plan = FeedPlan::from_settings(settings);
            if plan.is_empty() {
                println!("{}", "no feeds enabled".yellow());
                return Ok(());
            }
            for target in &plan.targets {
                let location = if target.kind.is_per_item() {
                    target.save_as.clone()
                } else {
                    plan.url_for(&target.save_as)?
                };
                println!(
                    "{:<20} {:<5} {}",
                    target.key.cyan(),
                    target.format,
                    location
                );
            }
        }
        Commands::Static => {
            let copies = plan_static(settings, &cli.path)?;
            for copy in &copies {
                println!("{} -> {}", copy.relative, copy.destination.green());
            }
            println!("{} files", copies.len());
        }
        Commands::Plugins => {
            let theme = Theme::resolve(&cli.path, &settings.theme);
            println!("{} {:?}", "theme".cyan(), theme.source);
            for plugin in PluginRegistry::new(&cli.path, settings).resolve() {
                let location = match &plugin.location {
                    PluginLocation::Local(path) => path.display().to_string().green(),
                    PluginLocation::Known => "provided by generator".normal(),
                    PluginLocation::Missing => "missing".red(),
                };
                let description = plugin.info.map(|i| i.description).unwrap_or("");
                println!("  - {:<12} {} {}", plugin.name, location, description.dimmed());
            }
        }
        Commands::Clean => {
            let report = prepare_output(settings, &cli.path)?;
            println!(
                "{} {} (removed {}, kept {})",
                "output".cyan(),
                report.output_dir.display(),
                report.removed.len(),
                report.retained.len()
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let date = parse_date("2023-04-01").unwrap();
        assert_eq!(date.format("%Y-%m-%d %H:%M").to_string(), "2023-04-01 00:00");
        assert!(parse_date("2023-04-01 08:15").is_ok());
        assert!(parse_date("April 1st").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "site-settings",
            "--publish",
            "url",
            "article",
            "2023-04-01-example-post",
            "--date",
            "2023-04-01",
        ])
        .unwrap();
        assert!(cli.publish);
        assert!(matches!(cli.command, Commands::Url(ref args) if args.kind == ContentKind::Article));
    }

    #[test]
    fn test_initialize_site_writes_both_profiles() {
        let dir = tempfile::TempDir::new().unwrap();
        initialize_site(dir.path(), "My \"Notes\"", false).unwrap();

        let loader = SettingsLoader::new(dir.path());
        let loaded = loader.load_profile(Profile::Development).unwrap();
        assert_eq!(loaded.settings.sitename, "My \"Notes\"");

        assert!(initialize_site(dir.path(), "Again", false).is_err());
        assert!(initialize_site(dir.path(), "Again", true).is_ok());
    }

    #[test]
    fn test_initialize_site_keeps_backslashes_in_title() {
        for title in [r"C:\temp notes", r"a\q", "key: value # not a comment"] {
            let dir = tempfile::TempDir::new().unwrap();
            initialize_site(dir.path(), title, false).unwrap();

            let loaded = SettingsLoader::new(dir.path())
                .load_profile(Profile::Development)
                .unwrap();
            assert_eq!(loaded.settings.sitename, title);
        }
    }
}
