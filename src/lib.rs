pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{cli::LocalStorage, CliConfig, Command};

pub use crate::config::toml_config::AppConfig;
pub use crate::core::PriocService;
pub use utils::error::{PriocError, Result};
