pub mod settings;
pub mod types;

pub use settings::{FeedSettings, MarkdownSettings, PathMetadata, Settings, SitemapSettings};
pub use types::{ChangeFreq, ContentKind, Pagination, Profile, SitemapFormat, SitemapPageKind};
