pub mod app;
pub mod config;
pub mod credentials;
pub mod error;
pub mod notify;
pub mod rate_limit;
pub mod routes;
pub mod store;
pub mod web_pages;

pub use app::{AppState, build_router};
pub use config::Config;
pub use error::ApiError;
