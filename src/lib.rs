//! Skincare Analysis Server Library
//!
//! Accounts, face image uploads with pluggable analysis, and weekly
//! summaries of analysis scores. Exported for the binary and for testing.

pub mod analysis;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod security;

pub use analysis::{FacialAnalyzer, MockAnalyzer};
pub use config::Config;
pub use db::{open_database, Db};
pub use error::{AppError, Result};

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: Config,
    pub analyzer: Arc<dyn FacialAnalyzer>,
}

impl AppState {
    /// Create a new AppState using the mock analyzer
    pub fn new(db: Db, config: Config) -> Self {
        Self::with_analyzer(db, config, Arc::new(MockAnalyzer))
    }

    /// Create a new AppState with a specific analyzer implementation
    pub fn with_analyzer(db: Db, config: Config, analyzer: Arc<dyn FacialAnalyzer>) -> Self {
        Self {
            db,
            config,
            analyzer,
        }
    }
}
