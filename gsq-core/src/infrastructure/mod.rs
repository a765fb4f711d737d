// gsq-core/src/infrastructure/mod.rs

pub mod adapters;
pub mod auth;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod evaluators;
pub mod fs;
