pub mod api;
pub mod auth;
pub mod config;
pub mod constants;
pub mod core;
pub mod infrastructure;

pub use crate::core::errors::GeoLensError;
pub use crate::core::services::GeoLensService;

#[cfg(test)]
mod tests;
