//! Application service layer - use cases, config, preview export

pub mod app;
pub mod config;
pub mod export;
