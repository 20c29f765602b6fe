//! HTTP layer for the padawan demo: axum
//! routes over the cache and relational
//! gateways from `padawan-core`.

pub mod app_state;
pub mod auth;
pub mod errors;
pub mod handlers;
pub mod logging;
pub mod models;

pub use app_state::AppState;
pub use handlers::router;
