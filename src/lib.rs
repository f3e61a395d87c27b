pub mod core;
pub mod models;
pub mod plugins;
pub mod theme;
pub mod utils;

// Re-export commonly used types
pub use crate::core::{validate, LoadedSettings, Report, SettingsError, SettingsLoader};
pub use crate::models::{Profile, Settings};
pub use crate::utils::SlugRules;
