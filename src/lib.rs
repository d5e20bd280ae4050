// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod generator;
pub mod llm;
pub mod metrics;
pub mod models;
pub mod news;
pub mod pipeline;
pub mod prompts;
pub mod rate_limit;
pub mod text;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::error::{ColumnError, Result};
pub use crate::pipeline::ColumnPipeline;
