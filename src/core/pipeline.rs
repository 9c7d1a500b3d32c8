use crate::core::analysis::{
    monthly_sales, product_monthly_series, reorder_alerts, revenue_summary,
    top_n_products_by_revenue, top_n_regions_by_revenue,
};
use crate::core::charts::generate_charts;
use crate::core::cleaning::{apply_cleaning, check_missing_values, prepare_dataset};
use crate::core::export::{bundle, report_files};
use crate::core::forecast::moving_average_forecast;
use crate::core::loader::load_data;
use crate::core::{AnalysisReport, ConfigProvider, Dataset, Pipeline, Storage};
use crate::domain::model::Forecast;
use crate::utils::error::Result;

pub struct AnalyticsPipeline<S: Storage, C: ConfigProvider> {
    input: S,
    output: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AnalyticsPipeline<S, C> {
    /// `input` resolves the sheet path, `output` receives every exported file.
    pub fn new(input: S, output: S, config: C) -> Self {
        Self {
            input,
            output,
            config,
        }
    }

    fn forecast(&self, dataset: &Dataset) -> Result<Option<Forecast>> {
        let Some((product, window, periods)) = self.config.forecast() else {
            return Ok(None);
        };

        let history = product_monthly_series(dataset, &product)?;
        if history.is_empty() {
            tracing::warn!("No time series data for product '{}'", product);
        }
        let forecast = moving_average_forecast(&history, window, periods)?;
        Ok(Some(Forecast {
            product,
            window,
            history,
            forecast,
        }))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AnalyticsPipeline<S, C> {
    async fn extract(&self) -> Result<Dataset> {
        let raw = load_data(&self.input, self.config.input_path(), self.config.delimiter()).await?;
        Ok(prepare_dataset(raw))
    }

    async fn transform(&self, data: Dataset) -> Result<AnalysisReport> {
        let missing_values = check_missing_values(&data);
        let total_missing: usize = missing_values.iter().map(|m| m.missing).sum();
        tracing::debug!("{} missing cells before cleaning", total_missing);

        let cleaned = apply_cleaning(data, &self.config.cleaning())?;
        let top_n = self.config.top_n();

        let report = AnalysisReport {
            missing_values,
            top_products: top_n_products_by_revenue(&cleaned, top_n)?,
            top_regions: top_n_regions_by_revenue(&cleaned, top_n)?,
            monthly_sales: monthly_sales(&cleaned)?,
            revenue: revenue_summary(&cleaned)?,
            alerts: reorder_alerts(&cleaned)?,
            charts: generate_charts(&cleaned)?,
            forecast: self.forecast(&cleaned)?,
            cleaned,
        };

        tracing::info!(
            "Products needing reorder: {}, total revenue: {:.2}",
            report.alerts.len(),
            report.revenue.total_revenue
        );
        Ok(report)
    }

    async fn load(&self, report: AnalysisReport) -> Result<String> {
        let files = report_files(&report, self.config.delimiter())?;

        if self.config.compress_output() {
            let filename = self.config.bundle_filename();
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = bundle(&files)?;
            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.output.write_file(filename, &zip_data).await?;
            return Ok(format!("{}/{}", self.config.output_path(), filename));
        }

        for (name, contents) in &files {
            self.output.write_file(name, contents).await?;
        }
        tracing::debug!("Wrote {} files", files.len());
        Ok(self.config.output_path().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::DType;
    use crate::domain::ports::CleaningOptions;
    use crate::utils::error::EtlError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        cleaning: CleaningOptions,
        forecast: Option<(String, usize, usize)>,
        compress: bool,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                cleaning: CleaningOptions::default(),
                forecast: None,
                compress: true,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            "Hospital_Management_Data.csv"
        }

        fn output_path(&self) -> &str {
            "test_output"
        }

        fn delimiter(&self) -> u8 {
            b','
        }

        fn top_n(&self) -> usize {
            10
        }

        fn cleaning(&self) -> CleaningOptions {
            self.cleaning.clone()
        }

        fn forecast(&self) -> Option<(String, usize, usize)> {
            self.forecast.clone()
        }

        fn compress_output(&self) -> bool {
            self.compress
        }

        fn bundle_filename(&self) -> &str {
            "hospital_report.zip"
        }
    }

    const SHEET: &str = "\
Date,Product ID,Product Name,Category,Region,Units Sold,Sales Revenue,Stock Available,Reorder Level,Supplier Name
2024-01-05,P1,Gloves,Consumables,Pune,10,100,5,10,MedSupply
2024-02-11,P1,Gloves,Consumables,Pune,20,200,15,10,MedSupply
2024-02-11,P1,Gloves,Consumables,Pune,20,200,15,10,MedSupply
2024-03-15,P3,Stethoscope,Equipment,Nagpur,1,400,2,3,
";

    async fn pipeline_with(config: MockConfig) -> (AnalyticsPipeline<MockStorage, MockConfig>, MockStorage) {
        let input = MockStorage::new();
        input
            .write_file("Hospital_Management_Data.csv", SHEET.as_bytes())
            .await
            .unwrap();
        let output = MockStorage::new();
        (
            AnalyticsPipeline::new(input, output.clone(), config),
            output,
        )
    }

    #[tokio::test]
    async fn test_extract_prepares_sheet() {
        let (pipeline, _) = pipeline_with(MockConfig::new()).await;
        let dataset = pipeline.extract().await.unwrap();

        assert_eq!(dataset.len(), 4);
        assert!(dataset.has_column("sales_revenue"));
        assert_eq!(dataset.rows[0].number("units_sold"), Some(10.0));
    }

    #[tokio::test]
    async fn test_extract_missing_input() {
        let pipeline = AnalyticsPipeline::new(MockStorage::new(), MockStorage::new(), MockConfig::new());
        let err = pipeline.extract().await.unwrap_err();
        assert!(matches!(err, EtlError::DataLoadError { .. }));
    }

    #[tokio::test]
    async fn test_transform_with_cleaning_and_forecast() {
        let mut config = MockConfig::new();
        config.cleaning.dedupe_subset = Some(vec![]);
        config.forecast = Some(("Gloves".to_string(), 2, 3));
        let (pipeline, _) = pipeline_with(config).await;

        let dataset = pipeline.extract().await.unwrap();
        let report = pipeline.transform(dataset).await.unwrap();

        assert_eq!(report.cleaned.len(), 3);
        let supplier_missing = report
            .missing_values
            .iter()
            .find(|m| m.column == "supplier_name")
            .unwrap();
        assert_eq!(supplier_missing.missing, 1);

        assert_eq!(report.top_products[0].key, "Stethoscope");
        assert_eq!(report.top_products[1].total, 300.0);
        assert_eq!(report.revenue.total_revenue, 700.0);
        assert_eq!(report.alerts.len(), 2);
        assert_eq!(report.charts.len(), 5);

        let forecast = report.forecast.unwrap();
        assert_eq!(forecast.history.len(), 2);
        assert_eq!(forecast.forecast.len(), 3);
        assert_eq!(forecast.forecast[0].month.to_string(), "2024-03");
        assert_eq!(forecast.forecast[0].value, 15.0);
    }

    #[tokio::test]
    async fn test_conversions_reach_cleaned_csv() {
        let mut config = MockConfig::new();
        config.compress = false;
        config.cleaning.conversions = vec![
            ("units_sold".to_string(), DType::Bool),
            ("supplier_name".to_string(), DType::Int),
        ];
        let (pipeline, output) = pipeline_with(config).await;
        let dataset = pipeline.extract().await.unwrap();
        let report = pipeline.transform(dataset).await.unwrap();
        pipeline.load(report).await.unwrap();

        let cleaned =
            String::from_utf8(output.get_file("hospital_cleaned_data.csv").await.unwrap()).unwrap();
        let lines: Vec<&str> = cleaned.lines().collect();
        assert_eq!(lines[1], "2024-01-05,P1,Gloves,Consumables,Pune,true,100,5,10,MedSupply");
        assert_eq!(lines[4], "2024-03-15,P3,Stethoscope,Equipment,Nagpur,true,400,2,3,");
    }

    #[tokio::test]
    async fn test_load_writes_zip_bundle() {
        let (pipeline, output) = pipeline_with(MockConfig::new()).await;
        let dataset = pipeline.extract().await.unwrap();
        let report = pipeline.transform(dataset).await.unwrap();

        let path = pipeline.load(report).await.unwrap();
        assert_eq!(path, "test_output/hospital_report.zip");

        let zip_bytes = output.get_file("hospital_report.zip").await.unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        let mut names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        names.sort();

        assert_eq!(
            names,
            vec![
                "charts/low_stock_products.json",
                "charts/monthly_units_sold.json",
                "charts/region_sales.json",
                "charts/reorder_status.json",
                "charts/top_products_revenue.json",
                "hospital_cleaned_data.csv",
                "reorder_alerts.csv",
                "summary.json",
            ]
        );
    }

    #[tokio::test]
    async fn test_load_without_compression_writes_loose_files() {
        let mut config = MockConfig::new();
        config.compress = false;
        let (pipeline, output) = pipeline_with(config).await;
        let dataset = pipeline.extract().await.unwrap();
        let report = pipeline.transform(dataset).await.unwrap();

        let path = pipeline.load(report).await.unwrap();
        assert_eq!(path, "test_output");
        assert!(output.get_file("hospital_report.zip").await.is_none());

        let alerts = String::from_utf8(output.get_file("reorder_alerts.csv").await.unwrap()).unwrap();
        assert!(alerts.starts_with("product_id,product_name,region"));
        assert!(alerts.contains("P3,Stethoscope,Nagpur,2,3,"));

        let summary: serde_json::Value =
            serde_json::from_slice(&output.get_file("summary.json").await.unwrap()).unwrap();
        assert_eq!(summary["rows"], 4);
        assert_eq!(summary["reorder_alerts"], 2);
        assert!(summary.get("forecast").is_none());
    }
}
