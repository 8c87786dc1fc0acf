//! Domain layer - records parsed from raw driver text, cell map, file naming

pub mod model;
pub mod repository;
pub mod service;
