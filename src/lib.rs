//! Libris library lending server
//!
//! A REST JSON API for a small lending library: members register and log in
//! with bearer tokens, administrators curate the catalog, and loans move
//! copies on and off the shelf.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
