use crate::core::Dataset;
use crate::domain::model::{cell_to_string, number_value, MissingCount};
pub use crate::domain::model::DType;
use crate::domain::ports::CleaningOptions;
use crate::utils::error::{EtlError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Columns coerced to numbers when a sheet is prepared; unparsable cells become 0.
pub const NUMERIC_COLUMNS: [&str; 6] = [
    "units_sold",
    "sales_revenue",
    "stock_available",
    "reorder_level",
    "cost_price",
    "selling_price",
];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%m/%d/%Y", "%d.%m.%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%m/%d/%Y %H:%M"];

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

pub fn normalize_column_name(name: &str) -> String {
    name.trim().replace(' ', "_").to_lowercase()
}

/// Returns `name`, or `name_1`, `name_2`, ... if it is already taken, and marks the result as used.
pub fn unique_column_name(name: &str, used: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut suffix = 1;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", name, suffix);
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Normalises every header. Headers that collide after normalising keep their data under a suffixed name.
pub fn rename_columns(mut dataset: Dataset) -> Dataset {
    let mut used = HashSet::new();
    let renamed: Vec<String> = dataset
        .columns
        .iter()
        .map(|c| unique_column_name(&normalize_column_name(c), &mut used))
        .collect();

    if renamed == dataset.columns {
        return dataset;
    }

    for (old, new) in dataset.columns.iter().zip(&renamed) {
        if *new != normalize_column_name(old) {
            tracing::warn!("Column '{}' collides with another column, renamed to '{}'", old, new);
        }
    }

    for row in &mut dataset.rows {
        let mut data = HashMap::with_capacity(renamed.len());
        for (old, new) in dataset.columns.iter().zip(&renamed) {
            if let Some(value) = row.data.remove(old) {
                data.insert(new.clone(), value);
            }
        }
        row.data = data;
    }
    dataset.columns = renamed;
    dataset
}

pub fn check_missing_values(dataset: &Dataset) -> Vec<MissingCount> {
    dataset
        .columns
        .iter()
        .map(|column| MissingCount {
            column: column.clone(),
            missing: dataset.column_values(column).filter(|v| v.is_null()).count(),
        })
        .collect()
}

pub fn fill_missing_values(mut dataset: Dataset, value: &Value) -> Dataset {
    for row in &mut dataset.rows {
        for column in &dataset.columns {
            let cell = row.data.entry(column.clone()).or_insert(Value::Null);
            if cell.is_null() {
                *cell = value.clone();
            }
        }
    }
    dataset
}

pub fn drop_missing_values(mut dataset: Dataset) -> Dataset {
    let columns = dataset.columns.clone();
    dataset
        .rows
        .retain(|row| columns.iter().all(|c| !row.get(c).is_null()));
    dataset
}

/// Keeps the first row for each distinct key; the key is the whole row unless `subset` is given.
pub fn remove_duplicates(mut dataset: Dataset, subset: Option<&[String]>) -> Result<Dataset> {
    let key_columns: Vec<String> = match subset {
        Some(columns) => {
            for column in columns {
                dataset.require_column(column)?;
            }
            columns.to_vec()
        }
        None => dataset.columns.clone(),
    };

    let mut seen = HashSet::new();
    let before = dataset.len();
    dataset.rows.retain(|row| {
        let key: Vec<String> = key_columns
            .iter()
            .map(|c| serde_json::to_string(row.get(c)).unwrap_or_default())
            .collect();
        seen.insert(key)
    });
    tracing::debug!("Removed {} duplicate rows", before - dataset.len());
    Ok(dataset)
}

fn convert_cell(value: &Value, dtype: DType) -> std::result::Result<Value, String> {
    match (dtype, value) {
        (DType::Int, Value::Null) => Err("cannot convert missing value to int".to_string()),
        (DType::Int, _) => {
            let number = as_number(value).ok_or_else(|| format!("invalid number {}", value))?;
            if number.fract() != 0.0 {
                return Err(format!("{} is not a whole number", number));
            }
            if !(i64::MIN as f64..i64::MAX as f64).contains(&number) {
                return Err(format!("{} is out of range for int", number));
            }
            Ok(Value::from(number as i64))
        }
        (_, Value::Null) => Ok(Value::Null),
        (DType::Float, _) => as_number(value)
            .map(number_value)
            .ok_or_else(|| format!("invalid number {}", value)),
        (DType::Str, _) => Ok(Value::String(cell_to_string(value).unwrap_or_default())),
        (DType::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
        (DType::Bool, Value::Number(n)) => Ok(Value::Bool(n.as_f64().unwrap_or(0.0) != 0.0)),
        (DType::Bool, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "n" | "0" => Ok(Value::Bool(false)),
            other => Err(format!("invalid boolean '{}'", other)),
        },
        (DType::Bool, other) => Err(format!("invalid boolean {}", other)),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Converts every cell of `column`. Either all cells convert or the column is left untouched.
pub fn change_column_dtype(dataset: &mut Dataset, column: &str, dtype: DType) -> Result<()> {
    dataset.require_column(column)?;

    let converted = dataset
        .rows
        .iter()
        .map(|row| convert_cell(row.get(column), dtype))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|message| EtlError::ConversionError {
            column: column.to_string(),
            dtype: dtype.to_string(),
            message,
        })?;

    for (row, value) in dataset.rows.iter_mut().zip(converted) {
        row.data.insert(column.to_string(), value);
    }
    Ok(())
}

pub fn clean_text(raw: &str) -> String {
    whitespace_run().replace_all(raw.trim(), " ").into_owned()
}

pub fn clean_text_column(mut dataset: Dataset, column: &str) -> Dataset {
    if !dataset.has_column(column) {
        return dataset;
    }
    for row in &mut dataset.rows {
        if let Some(cell) = row.data.get_mut(column) {
            if let Some(text) = cell_to_string(cell) {
                *cell = Value::String(clean_text(&text));
            }
        }
    }
    dataset
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Normalises headers, coerces numeric columns and parses `date` into ISO form.
pub fn prepare_dataset(dataset: Dataset) -> Dataset {
    let mut dataset = rename_columns(dataset);

    let numeric: Vec<&str> = NUMERIC_COLUMNS
        .iter()
        .copied()
        .filter(|c| dataset.has_column(c))
        .collect();
    let has_date = dataset.has_column("date");
    let mut unparsed_dates = 0usize;

    for row in &mut dataset.rows {
        for column in &numeric {
            let number = as_number(row.get(column)).unwrap_or(0.0);
            row.data.insert(column.to_string(), number_value(number));
        }
        if has_date {
            let parsed = match row.get("date") {
                Value::String(s) => parse_date(s),
                _ => None,
            };
            if parsed.is_none() {
                unparsed_dates += 1;
            }
            let cell = parsed
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null);
            row.data.insert("date".to_string(), cell);
        }
    }

    if unparsed_dates > 0 {
        tracing::warn!("{} rows have an unreadable date and will be left out of monthly series", unparsed_dates);
    }
    dataset
}

pub fn apply_cleaning(mut dataset: Dataset, options: &CleaningOptions) -> Result<Dataset> {
    if let Some(value) = &options.fill_missing {
        dataset = fill_missing_values(dataset, value);
        tracing::info!("Filled missing values with {}", value);
    }
    if options.drop_missing {
        let before = dataset.len();
        dataset = drop_missing_values(dataset);
        tracing::info!("Dropped {} rows with missing values", before - dataset.len());
    }
    if let Some(subset) = &options.dedupe_subset {
        let subset = (!subset.is_empty()).then_some(subset.as_slice());
        dataset = remove_duplicates(dataset, subset)?;
    }
    for column in &options.clean_text_columns {
        dataset = clean_text_column(dataset, column);
    }
    for (column, dtype) in &options.conversions {
        match change_column_dtype(&mut dataset, column, *dtype) {
            Ok(()) => tracing::info!("Converted {} to {}", column, dtype),
            Err(e @ EtlError::ConversionError { .. }) => tracing::warn!("{}", e),
            Err(e) => return Err(e),
        }
    }
    Ok(dataset)
}
