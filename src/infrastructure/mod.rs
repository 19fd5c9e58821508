// Infrastructure module - background services and utilities
pub mod backoff;
pub mod http;
pub mod task_manager;

pub use backoff::Backoff;
pub use http::{ApiClient, HourlyActivity, TeamActivity, UserProfile, spawn_chart_refresh};
pub use task_manager::TaskManager;
