use crate::domain::model::{AnalysisReport, DType, Dataset};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Cleaning steps applied after the sheet has been prepared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleaningOptions {
    pub fill_missing: Option<Value>,
    pub drop_missing: bool,
    pub dedupe_subset: Option<Vec<String>>,
    pub clean_text_columns: Vec<String>,
    /// Applied last, in order. A column that fails to convert is left as it was.
    pub conversions: Vec<(String, DType)>,
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    fn output_path(&self) -> &str;
    fn delimiter(&self) -> u8;
    fn top_n(&self) -> usize;
    fn cleaning(&self) -> CleaningOptions;
    /// Product to forecast with its (window, periods), if any.
    fn forecast(&self) -> Option<(String, usize, usize)>;
    fn compress_output(&self) -> bool;
    fn bundle_filename(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Dataset>;
    async fn transform(&self, data: Dataset) -> Result<AnalysisReport>;
    async fn load(&self, report: AnalysisReport) -> Result<String>;
}
