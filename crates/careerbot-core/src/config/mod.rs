pub mod client_config;
pub mod config_repository;
pub mod error;

pub use client_config::{ClientConfig, Language, RevealSettings, DEFAULT_BASE_URL};
pub use config_repository::{ConfigRepository, JsonConfigRepository};
pub use error::{ConfigError, ConfigResult};
