// src/config/mod.rs
pub mod news_filter;
pub mod settings;

pub use news_filter::{NewsFilterConfig, QueryExpansion};
pub use settings::Settings;
