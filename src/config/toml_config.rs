use crate::core::ConfigProvider;
use crate::domain::model::DType;
use crate::domain::ports::CleaningOptions;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_delimiter, validate_file_extensions, validate_non_empty_string, validate_path,
    validate_positive_number, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;

use super::{DEFAULT_BUNDLE, INPUT_EXTENSIONS, MAX_FORECAST_MONTHS};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub forecast: Option<ForecastConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub description: Option<String>,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub input_path: String,
    pub delimiter: Option<char>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformConfig {
    pub top_n: Option<usize>,
    pub operations: Option<TransformOperations>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformOperations {
    pub fill_missing: Option<toml::Value>,
    pub drop_missing: Option<bool>,
    pub remove_duplicates: Option<bool>,
    pub duplicate_subset: Option<Vec<String>>,
    pub clean_text_columns: Option<Vec<String>>,
    /// Column name to target type, e.g. `units_sold = "int"`.
    pub convert: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub product: String,
    pub window: Option<usize>,
    pub periods: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("static regex"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn operations(&self) -> TransformOperations {
        self.transform.operations.clone().unwrap_or_default()
    }

    pub fn forecast_window(&self) -> usize {
        self.forecast.as_ref().and_then(|f| f.window).unwrap_or(3)
    }

    pub fn forecast_periods(&self) -> usize {
        self.forecast.as_ref().and_then(|f| f.periods).unwrap_or(3)
    }

    /// Typed `transform.operations.convert` entries, sorted by column name.
    pub fn conversions(&self) -> Result<Vec<(String, DType)>> {
        self.operations()
            .convert
            .unwrap_or_default()
            .into_iter()
            .map(|(column, dtype)| Ok((column, dtype.parse()?)))
            .collect()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("pipeline.name", &self.pipeline.name)?;
        validate_path("source.input_path", &self.source.input_path)?;
        validate_file_extensions(
            "source.input_path",
            std::slice::from_ref(&self.source.input_path),
            &INPUT_EXTENSIONS,
        )?;
        if let Some(delimiter) = self.source.delimiter {
            validate_delimiter("source.delimiter", delimiter)?;
        }
        validate_path("load.output_path", &self.load.output_path)?;

        if let Some(top_n) = self.transform.top_n {
            validate_positive_number("transform.top_n", top_n, 1)?;
        }

        if let Some(value) = &self.operations().fill_missing {
            if matches!(value, toml::Value::Array(_) | toml::Value::Table(_)) {
                return Err(EtlError::InvalidConfigValueError {
                    field: "transform.operations.fill_missing".to_string(),
                    value: value.to_string(),
                    reason: "Fill value must be a number, string or boolean".to_string(),
                });
            }
        }

        self.conversions()
            .map_err(|e| EtlError::ConfigValidationError {
                field: "transform.operations.convert".to_string(),
                message: e.to_string(),
            })?;

        if let Some(forecast) = &self.forecast {
            validate_non_empty_string("forecast.product", &forecast.product)?;
            validate_range("forecast.window", self.forecast_window(), 1, MAX_FORECAST_MONTHS)?;
            validate_range("forecast.periods", self.forecast_periods(), 1, MAX_FORECAST_MONTHS)?;
        }

        if let Some(compression) = &self.load.compression {
            if let Some(filename) = &compression.filename {
                validate_file_extensions(
                    "load.compression.filename",
                    std::slice::from_ref(filename),
                    &["zip"],
                )?;
            }
        }

        Ok(())
    }
}

fn toml_to_json(value: &toml::Value) -> serde_json::Value {
    match value {
        toml::Value::String(s) => serde_json::Value::String(s.clone()),
        toml::Value::Integer(i) => serde_json::Value::from(*i),
        toml::Value::Float(f) => crate::domain::model::number_value(*f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(*b),
        other => serde_json::Value::String(other.to_string()),
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.source.input_path
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn delimiter(&self) -> u8 {
        self.source
            .delimiter
            .and_then(|d| validate_delimiter("source.delimiter", d).ok())
            .unwrap_or(b',')
    }

    fn top_n(&self) -> usize {
        self.transform.top_n.unwrap_or(10)
    }

    fn cleaning(&self) -> CleaningOptions {
        let ops = self.operations();
        let dedupe_subset = match (ops.remove_duplicates.unwrap_or(false), ops.duplicate_subset) {
            (true, subset) => Some(subset.unwrap_or_default()),
            (false, _) => None,
        };
        CleaningOptions {
            fill_missing: ops.fill_missing.as_ref().map(toml_to_json),
            drop_missing: ops.drop_missing.unwrap_or(false),
            dedupe_subset,
            clean_text_columns: ops.clean_text_columns.unwrap_or_default(),
            conversions: self.conversions().unwrap_or_default(),
        }
    }

    fn forecast(&self) -> Option<(String, usize, usize)> {
        self.forecast.as_ref().map(|f| {
            (
                f.product.clone(),
                self.forecast_window(),
                self.forecast_periods(),
            )
        })
    }

    fn compress_output(&self) -> bool {
        self.load
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(true)
    }

    fn bundle_filename(&self) -> &str {
        self.load
            .compression
            .as_ref()
            .and_then(|c| c.filename.as_deref())
            .unwrap_or(DEFAULT_BUNDLE)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
