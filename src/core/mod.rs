pub mod error;
pub mod feeds;
pub mod loader;
pub mod output;
pub mod profile;
pub mod sitemap;
pub mod urls;
pub mod validate;

pub use error::{Result, SettingsError};
pub use feeds::{FeedPlan, FeedTarget};
pub use loader::{LoadedSettings, SettingsLoader};
pub use output::{plan_static, prepare_output, StaticCopy};
pub use sitemap::SitemapFilter;
pub use urls::{UrlContext, UrlTemplate};
pub use validate::{validate, Issue, Report, Severity};
