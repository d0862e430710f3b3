pub mod components;
pub mod monitoring;
pub mod resources;
pub mod server;


pub use server::{AppState, WebServer};

use axum::http::StatusCode;

/// Error half of every handler result
pub type ApiError = (StatusCode, String);

pub type ApiResult<T> = Result<T, ApiError>;
