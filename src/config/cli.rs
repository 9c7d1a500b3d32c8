use crate::core::loader::parse_cell;
use crate::core::ConfigProvider;
use crate::domain::model::DType;
use crate::domain::ports::CleaningOptions;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_delimiter, validate_file_extensions, validate_path, validate_positive_number,
    validate_range, Validate,
};
use clap::{Args, Parser, Subcommand};

use super::{DEFAULT_BUNDLE, DEFAULT_INPUT, INPUT_EXTENSIONS, MAX_FORECAST_MONTHS};

#[derive(Debug, Clone, Parser)]
#[command(name = "hospital-etl")]
#[command(about = "Cleaning, inventory alerts and sales forecasting for hospital product sheets")]
pub struct CliConfig {
    /// CSV export of the hospital management sheet
    #[arg(long, global = true, default_value = DEFAULT_INPUT)]
    pub input: String,

    #[arg(long, global = true, default_value = "./output")]
    pub output_path: String,

    #[arg(long, global = true, default_value = ",")]
    pub delimiter: char,

    #[arg(long, global = true, default_value = "10")]
    pub top_n: usize,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log process CPU and memory between phases")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Show missing values, apply cleaning steps and write the cleaned sheet
    Clean(CleanArgs),
    /// List products at or below their reorder level
    Alerts(AlertArgs),
    /// Monthly sales overview and a moving-average forecast for one product
    Sales(SalesArgs),
    /// Write chart specifications as JSON
    Charts,
    /// Write the prepared sheet as CSV
    Export,
    /// Run the full pipeline and bundle every output
    Report(ReportArgs),
    /// Run the full pipeline from a TOML file
    Run(RunArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct CleanArgs {
    /// Replace missing cells with this value
    #[arg(long)]
    pub fill_missing: Option<String>,

    /// Drop rows that have any missing cell
    #[arg(long)]
    pub drop_missing: bool,

    /// Remove duplicate rows; pass column names to compare only those
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub dedupe: Option<Vec<String>>,

    /// Trim and collapse whitespace in these text columns
    #[arg(long, value_delimiter = ',')]
    pub clean_text: Vec<String>,

    /// Convert a column, e.g. `units_sold=int`
    #[arg(long = "convert", value_name = "COLUMN=TYPE", value_parser = parse_conversion)]
    pub conversions: Vec<(String, DType)>,

    /// Print the first 50 rows
    #[arg(long)]
    pub show_raw: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct AlertArgs {
    /// Also write the alerts to reorder_alerts.csv
    #[arg(long)]
    pub export: bool,
}

#[derive(Debug, Clone, Args)]
pub struct SalesArgs {
    /// Product id or name to forecast
    #[arg(long)]
    pub product: Option<String>,

    /// Moving-average window in months
    #[arg(long, default_value = "3")]
    pub window: usize,

    /// Months to forecast
    #[arg(long, default_value = "3")]
    pub periods: usize,
}

#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub cleaning: CleanArgs,

    #[command(flatten)]
    pub sales: SalesArgs,

    /// Write loose files instead of a ZIP bundle
    #[arg(long)]
    pub no_zip: bool,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Path to the TOML pipeline file
    #[arg(short, long, default_value = "hospital-etl.toml")]
    pub config: String,

    /// Show what would be processed without executing
    #[arg(long)]
    pub dry_run: bool,
}

/// Parses one `COLUMN=TYPE` pair.
pub fn parse_conversion(raw: &str) -> Result<(String, DType)> {
    let (column, dtype) = raw
        .split_once('=')
        .ok_or_else(|| EtlError::InvalidConfigValueError {
            field: "convert".to_string(),
            value: raw.to_string(),
            reason: "Expected COLUMN=TYPE".to_string(),
        })?;
    let column = column.trim();
    if column.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: "convert".to_string(),
            value: raw.to_string(),
            reason: "Column name cannot be empty".to_string(),
        });
    }
    Ok((column.to_string(), dtype.parse()?))
}

impl CleanArgs {
    pub fn options(&self) -> CleaningOptions {
        CleaningOptions {
            fill_missing: self.fill_missing.as_deref().map(parse_cell),
            drop_missing: self.drop_missing,
            dedupe_subset: self.dedupe.clone(),
            clean_text_columns: self.clean_text.clone(),
            conversions: self.conversions.clone(),
        }
    }
}

impl SalesArgs {
    fn validate(&self) -> Result<()> {
        validate_range("window", self.window, 1, MAX_FORECAST_MONTHS)?;
        validate_range("periods", self.periods, 1, MAX_FORECAST_MONTHS)
    }
}

impl CliConfig {
    pub fn delimiter_byte(&self) -> u8 {
        validate_delimiter("delimiter", self.delimiter).unwrap_or(b',')
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("input", &self.input)?;
        validate_file_extensions("input", std::slice::from_ref(&self.input), &INPUT_EXTENSIONS)?;
        validate_path("output_path", &self.output_path)?;
        validate_delimiter("delimiter", self.delimiter)?;
        validate_positive_number("top_n", self.top_n, 1)?;

        match &self.command {
            Command::Sales(args) => args.validate()?,
            Command::Report(args) => args.sales.validate()?,
            Command::Run(args) => validate_path("config", &args.config)?,
            Command::Clean(_) | Command::Alerts(_) | Command::Charts | Command::Export => {}
        }
        Ok(())
    }
}

impl ConfigProvider for CliConfig {
    fn input_path(&self) -> &str {
        &self.input
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn delimiter(&self) -> u8 {
        self.delimiter_byte()
    }

    fn top_n(&self) -> usize {
        self.top_n
    }

    fn cleaning(&self) -> CleaningOptions {
        match &self.command {
            Command::Clean(args) => args.options(),
            Command::Report(args) => args.cleaning.options(),
            _ => CleaningOptions::default(),
        }
    }

    fn forecast(&self) -> Option<(String, usize, usize)> {
        let sales = match &self.command {
            Command::Sales(args) => args,
            Command::Report(args) => &args.sales,
            _ => return None,
        };
        sales
            .product
            .clone()
            .map(|product| (product, sales.window, sales.periods))
    }

    fn compress_output(&self) -> bool {
        match &self.command {
            Command::Report(args) => !args.no_zip,
            _ => false,
        }
    }

    fn bundle_filename(&self) -> &str {
        DEFAULT_BUNDLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_sales_command() {
        let config = CliConfig::try_parse_from([
            "hospital-etl",
            "sales",
            "--product",
            "Gloves",
            "--window",
            "4",
        ])
        .unwrap();

        assert_eq!(config.input, DEFAULT_INPUT);
        assert!(config.validate().is_ok());
        assert_eq!(config.forecast(), Some(("Gloves".to_string(), 4, 3)));
        assert!(!config.compress_output());
    }

    #[test]
    fn test_forecast_window_is_bounded() {
        let config =
            CliConfig::try_parse_from(["hospital-etl", "sales", "--window", "7"]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clean_options_from_flags() {
        let config = CliConfig::try_parse_from([
            "hospital-etl",
            "--input",
            "data.csv",
            "clean",
            "--fill-missing",
            "0",
            "--dedupe",
            "product_id",
            "--clean-text",
            "product_name,supplier_name",
            "--convert",
            "units_sold=int",
        ])
        .unwrap();

        let options = config.cleaning();
        assert_eq!(options.fill_missing, Some(json!(0)));
        assert_eq!(options.dedupe_subset, Some(vec!["product_id".to_string()]));
        assert_eq!(options.clean_text_columns.len(), 2);
        assert_eq!(options.conversions, vec![("units_sold".to_string(), DType::Int)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_conversion_is_rejected() {
        for raw in ["units_sold", "units_sold=date", "=int"] {
            let parsed = CliConfig::try_parse_from(["hospital-etl", "clean", "--convert", raw]);
            assert!(parsed.is_err(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_report_carries_conversions() {
        let config = CliConfig::try_parse_from([
            "hospital-etl",
            "report",
            "--convert",
            "units_sold=bool",
            "--convert",
            "product_id=str",
            "--no-zip",
        ])
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(
            config.cleaning().conversions,
            vec![
                ("units_sold".to_string(), DType::Bool),
                ("product_id".to_string(), DType::Str),
            ]
        );
        assert!(!config.compress_output());
    }

    #[test]
    fn test_report_defaults_to_zip() {
        let config = CliConfig::try_parse_from(["hospital-etl", "report"]).unwrap();
        assert!(config.compress_output());
        assert_eq!(config.bundle_filename(), DEFAULT_BUNDLE);
        assert!(config.forecast().is_none());
    }

    #[test]
    fn test_input_extension_is_checked() {
        let config =
            CliConfig::try_parse_from(["hospital-etl", "--input", "data.xlsx", "charts"]).unwrap();
        assert!(config.validate().is_err());
    }
}
