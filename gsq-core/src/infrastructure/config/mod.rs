pub mod loader;

pub use crate::domain::config::AnnotationConfig;
pub use loader::{apply_env_overrides, find_config, load_config, parse_config};
