pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::{toml_config::TomlConfig, LocalStorage};

pub use core::{etl::EtlEngine, pipeline::AnalyticsPipeline};
pub use domain::model::{AnalysisReport, Dataset, Record};
pub use utils::error::{EtlError, Result};
