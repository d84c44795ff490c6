//! Shelfmark library web application
//!
//! Server-rendered pages for browsing books and libraries, user accounts with
//! role-based landing pages, and permission-gated book management.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
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
