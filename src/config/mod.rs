#[cfg(feature = "cli")]
pub mod cli;
pub mod storage;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::CliConfig;
pub use storage::LocalStorage;

pub const DEFAULT_INPUT: &str = "Hospital_Management_Data.csv";
pub const DEFAULT_BUNDLE: &str = "hospital_report.zip";
pub const INPUT_EXTENSIONS: [&str; 3] = ["csv", "tsv", "txt"];
/// Forecast window and horizon are bounded to half a year.
pub const MAX_FORECAST_MONTHS: usize = 6;
