//! codeseek: developer Q&A search.
//!
//! This crate is the host around [`codeseek_search`]: it loads
//! configuration from TOML, wires the query pipeline with in-memory stores,
//! and reports analytics over the query log.
//!
//! # Architecture
//!
//! - **Config**: `~/.config/codeseek/config.toml`, every field optional
//! - **App**: builds the orchestrator, provider, cache and enrichment pipeline
//! - **Analytics**: totals, last-24h volume and top queries
//! - **Documents**: enriched documents looked up by question id
//! - **Binary**: `codeseek search <query>` prints the response as JSON

pub mod analytics;
pub mod app;
pub mod config;
pub mod documents;
pub mod error;

pub use analytics::{AnalyticsSummary, TopQuery};
pub use app::App;
pub use config::AppConfig;
pub use documents::DocumentView;
pub use error::{AppError, Result};
