use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::utils::error::{EtlError, Result};

/// One row of the input sheet. `Value::Null` marks a missing cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

static NULL: serde_json::Value = serde_json::Value::Null;

impl Record {
    pub fn get(&self, column: &str) -> &serde_json::Value {
        self.data.get(column).unwrap_or(&NULL)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        match self.get(column) {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Text form of a cell; numbers are rendered without a trailing `.0`.
    pub fn text(&self, column: &str) -> Option<String> {
        cell_to_string(self.get(column))
    }
}

/// Renders a cell the way it is written to CSV. Null has no text form.
pub fn cell_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn number_value(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// An ordered table: column names plus rows keyed by those names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Record>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn require_column(&self, column: &str) -> Result<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(EtlError::MissingColumnError {
                column: column.to_string(),
            })
        }
    }

    pub fn column_values<'a>(
        &'a self,
        column: &'a str,
    ) -> impl Iterator<Item = &'a serde_json::Value> + 'a {
        self.rows.iter().map(move |row| row.get(column))
    }

    pub fn head(&self, n: usize) -> Dataset {
        Dataset {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

/// Target type of a column conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int,
    Float,
    Str,
    Bool,
}

impl FromStr for DType {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "int" | "int64" | "integer" => Ok(DType::Int),
            "float" | "float64" | "number" => Ok(DType::Float),
            "str" | "string" | "text" => Ok(DType::Str),
            "bool" | "boolean" => Ok(DType::Bool),
            other => Err(EtlError::InvalidConfigValueError {
                field: "dtype".to_string(),
                value: other.to_string(),
                reason: "Supported types: int, float, str, bool".to_string(),
            }),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DType::Int => "int",
            DType::Float => "float",
            DType::Str => "str",
            DType::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A calendar month, the bucket used by every time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    pub year: i32,
    pub month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn succ(self) -> Self {
        if self.month >= 12 {
            Self::new(self.year + 1, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// Every month from `self` to `end`, both inclusive.
    pub fn range_inclusive(self, end: Month) -> Vec<Month> {
        let mut months = Vec::new();
        let mut current = self;
        while current <= end {
            months.push(current);
            current = current.succ();
        }
        months
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for Month {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlyPoint {
    pub month: Month,
    pub value: f64,
}

pub type MonthlySeries = Vec<MonthlyPoint>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTotal {
    pub key: String,
    pub total: f64,
}

pub type RankedTotals = Vec<RankedTotal>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySales {
    pub month: Month,
    pub units_sold: f64,
    pub sales_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReorderAlert {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub region: Option<String>,
    pub stock_available: f64,
    pub reorder_level: f64,
    pub supplier_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueSummary {
    pub total_revenue: f64,
    pub by_category: RankedTotals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
    Pie,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub name: String,
    pub kind: ChartKind,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub product: String,
    pub window: usize,
    pub history: MonthlySeries,
    pub forecast: MonthlySeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingCount {
    pub column: String,
    pub missing: usize,
}

/// Everything the transform step derives from the cleaned sheet.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub cleaned: Dataset,
    pub missing_values: Vec<MissingCount>,
    pub top_products: RankedTotals,
    pub top_regions: RankedTotals,
    pub monthly_sales: Vec<MonthlySales>,
    pub revenue: RevenueSummary,
    pub alerts: Vec<ReorderAlert>,
    pub charts: Vec<ChartSpec>,
    pub forecast: Option<Forecast>,
}
