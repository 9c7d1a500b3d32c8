use crate::core::analysis::ALERT_COLUMNS;
use crate::core::charts::chart_path;
use crate::core::loader::write_csv;
use crate::core::{AnalysisReport, Dataset, Record, Storage};
use crate::domain::model::{
    number_value, Forecast, MissingCount, MonthlySales, RankedTotals, ReorderAlert,
    RevenueSummary,
};
use crate::utils::error::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CLEANED_DATA_FILE: &str = "hospital_cleaned_data.csv";
pub const ALERTS_FILE: &str = "reorder_alerts.csv";
pub const SUMMARY_FILE: &str = "summary.json";

pub async fn export_cleaned_data<S: Storage>(
    storage: &S,
    dataset: &Dataset,
    delimiter: u8,
) -> Result<String> {
    let bytes = write_csv(dataset, delimiter)?;
    storage.write_file(CLEANED_DATA_FILE, &bytes).await?;
    tracing::info!("Exported {} cleaned rows to {}", dataset.len(), CLEANED_DATA_FILE);
    Ok(CLEANED_DATA_FILE.to_string())
}

pub async fn export_alerts<S: Storage>(
    storage: &S,
    alerts: &[ReorderAlert],
    delimiter: u8,
) -> Result<String> {
    let bytes = write_csv(&alerts_table(alerts), delimiter)?;
    storage.write_file(ALERTS_FILE, &bytes).await?;
    tracing::info!("Exported {} reorder alerts to {}", alerts.len(), ALERTS_FILE);
    Ok(ALERTS_FILE.to_string())
}

pub fn alerts_table(alerts: &[ReorderAlert]) -> Dataset {
    let text = |value: &Option<String>| value.clone().map(Value::String).unwrap_or(Value::Null);

    let rows = alerts
        .iter()
        .map(|alert| {
            let data: HashMap<String, Value> = [
                ("product_id", text(&alert.product_id)),
                ("product_name", text(&alert.product_name)),
                ("region", text(&alert.region)),
                ("stock_available", number_value(alert.stock_available)),
                ("reorder_level", number_value(alert.reorder_level)),
                ("supplier_name", text(&alert.supplier_name)),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
            Record { data }
        })
        .collect();

    Dataset::new(ALERT_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

#[derive(Debug, Serialize)]
pub struct ReportSummary<'a> {
    pub rows: usize,
    pub missing_values: &'a [MissingCount],
    pub top_products: &'a RankedTotals,
    pub top_regions: &'a RankedTotals,
    pub monthly_sales: &'a [MonthlySales],
    pub revenue: &'a RevenueSummary,
    pub reorder_alerts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<&'a Forecast>,
}

impl<'a> From<&'a AnalysisReport> for ReportSummary<'a> {
    fn from(report: &'a AnalysisReport) -> Self {
        Self {
            rows: report.cleaned.len(),
            missing_values: &report.missing_values,
            top_products: &report.top_products,
            top_regions: &report.top_regions,
            monthly_sales: &report.monthly_sales,
            revenue: &report.revenue,
            reorder_alerts: report.alerts.len(),
            forecast: report.forecast.as_ref(),
        }
    }
}

/// Every output file of a report as (relative path, contents).
pub fn report_files(report: &AnalysisReport, delimiter: u8) -> Result<Vec<(String, Vec<u8>)>> {
    let mut files = vec![
        (
            CLEANED_DATA_FILE.to_string(),
            write_csv(&report.cleaned, delimiter)?,
        ),
        (
            ALERTS_FILE.to_string(),
            write_csv(&alerts_table(&report.alerts), delimiter)?,
        ),
        (
            SUMMARY_FILE.to_string(),
            serde_json::to_vec_pretty(&ReportSummary::from(report))?,
        ),
    ];
    for chart in &report.charts {
        files.push((chart_path(chart), serde_json::to_vec_pretty(chart)?));
    }
    Ok(files)
}

pub fn bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, contents) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(contents)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
